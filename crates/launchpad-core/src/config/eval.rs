use serde_json::{Map, Value};

use super::{Diagnostic, Diagnostics};

/// Variables available while a component's configuration body is applied.
///
/// Strings of the exact form `"${name}"` are replaced by the variable's value
/// (any JSON type); `${name}` embedded in a longer string is replaced by the
/// variable rendered as text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalContext {
    variables: Map<String, Value>,
}

impl EvalContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Resolve every variable reference in `body`.
    ///
    /// All unknown references are collected, not just the first one.
    pub fn evaluate(&self, body: &Value) -> Result<Value, Diagnostics> {
        let mut diags = Diagnostics::new();
        let out = self.eval_value(body, "", &mut diags);
        diags.into_result().map(|()| out)
    }

    fn eval_value(&self, value: &Value, path: &str, diags: &mut Diagnostics) -> Value {
        match value {
            Value::String(s) => self.eval_string(s, path, diags),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| self.eval_value(v, &join(path, &i.to_string()), diags))
                    .collect(),
            ),
            Value::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), self.eval_value(v, &join(path, k), diags)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    fn eval_string(&self, s: &str, path: &str, diags: &mut Diagnostics) -> Value {
        if let Some(name) = s.strip_prefix("${").and_then(|r| r.strip_suffix('}'))
            && !name.contains("${")
            && !name.contains('}')
        {
            return match self.variables.get(name) {
                Some(v) => v.clone(),
                None => {
                    diags.push(unknown_variable(name, path));
                    Value::String(s.to_string())
                }
            };
        }

        let mut out = String::with_capacity(s.len());
        let mut rest = s;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                out.push_str(&rest[start..]);
                rest = "";
                break;
            };
            let name = &after[..end];
            match self.variables.get(name) {
                Some(Value::String(v)) => out.push_str(v),
                Some(v) => out.push_str(&v.to_string()),
                None => {
                    diags.push(unknown_variable(name, path));
                    out.push_str(&rest[start..start + 2 + end + 1]);
                }
            }
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        Value::String(out)
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn unknown_variable(name: &str, path: &str) -> Diagnostic {
    let d = Diagnostic::error(format!("unknown variable {name:?}"));
    if path.is_empty() { d } else { d.at(path) }
}
