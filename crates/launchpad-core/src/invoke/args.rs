use std::any::Any;

use super::func::DynFunc;
use super::value::Value;

/// Everything available to satisfy a dynamic call's parameters.
///
/// Values added first win when several share a type, so callers push their
/// specific arguments before the ambient ones.
#[derive(Debug, Clone, Default)]
pub struct Args {
    pub(crate) typed: Vec<Value>,
    pub(crate) named: Vec<(String, Value)>,
    pub(crate) converters: Vec<DynFunc>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn typed<T: Any + Send + Sync>(self, value: T) -> Self {
        self.value(Value::new(value))
    }

    pub fn value(mut self, value: Value) -> Self {
        self.typed.push(value);
        self
    }

    pub fn named<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        self.named.push((name.into(), Value::new(value)));
        self
    }

    /// Converters (mappers) the resolver may chain to produce missing types.
    pub fn converters(mut self, converters: impl IntoIterator<Item = DynFunc>) -> Self {
        self.converters.extend(converters);
        self
    }

    /// Append `other`; values already present keep priority.
    pub fn extend(mut self, other: Args) -> Self {
        self.typed.extend(other.typed);
        self.named.extend(other.named);
        self.converters.extend(other.converters);
        self
    }
}
