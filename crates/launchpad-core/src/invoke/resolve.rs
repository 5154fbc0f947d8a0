//! Argument resolution - 型による引数解決
//!
//! Parameters are matched against the supplied values by type. A type with no
//! supplied value is produced by chaining converters, searching depth-first
//! through their inputs. Planning happens up front so that no converter runs
//! unless the whole call can be satisfied.

use std::any::TypeId;
use std::collections::HashMap;

use super::args::Args;
use super::func::{DynFunc, Param};
use super::value::{TypeKey, Value};
use crate::domain::AppError;

struct Step {
    converter: usize,
    inputs: Vec<usize>,
    output: usize,
}

/// A parameter of `function` for which no value or converter chain exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Unresolved {
    pub function: String,
    pub parameter: TypeKey,
}

impl From<Unresolved> for AppError {
    fn from(u: Unresolved) -> Self {
        AppError::Resolution {
            function: u.function,
            parameter: u.parameter.name().to_string(),
        }
    }
}

/// The values and converter calls needed to call one function.
pub(crate) struct Plan<'a> {
    function: String,
    args: &'a Args,
    slots: Vec<Option<Value>>,
    steps: Vec<Step>,
    params: Vec<usize>,
}

impl<'a> Plan<'a> {
    pub(crate) fn new(func: &DynFunc, args: &'a Args) -> Result<Self, Unresolved> {
        let mut planner = Planner::new(args);
        let mut params = Vec::with_capacity(func.params().len());
        for param in func.params() {
            match planner.resolve_param(param) {
                Some(slot) => params.push(slot),
                None => {
                    return Err(Unresolved {
                        function: func.name().to_string(),
                        parameter: param.ty,
                    });
                }
            }
        }
        Ok(Plan {
            function: func.name().to_string(),
            args,
            slots: planner.slots,
            steps: planner.steps,
            params,
        })
    }

    /// Number of converter calls the plan makes.
    pub(crate) fn steps(&self) -> usize {
        self.steps.len()
    }

    /// Run the converter chain and return the arguments in parameter order.
    pub(crate) async fn execute(mut self) -> Result<Vec<Value>, AppError> {
        for step in &self.steps {
            let converter = &self.args.converters[step.converter];
            let inputs = step
                .inputs
                .iter()
                .map(|&i| slot_value(&self.slots, i, converter.name()))
                .collect::<Result<Vec<_>, _>>()?;
            tracing::trace!(converter = converter.name(), "running converter");
            let out = converter.call(inputs).await?;
            self.slots[step.output] = Some(out);
        }

        self.params
            .iter()
            .map(|&i| slot_value(&self.slots, i, &self.function))
            .collect()
    }
}

fn slot_value(slots: &[Option<Value>], index: usize, function: &str) -> Result<Value, AppError> {
    slots
        .get(index)
        .and_then(Option::clone)
        .ok_or_else(|| AppError::Resolution {
            function: function.to_string(),
            parameter: format!("argument slot {index}"),
        })
}

struct Planner<'a> {
    args: &'a Args,
    slots: Vec<Option<Value>>,
    steps: Vec<Step>,
    known: HashMap<TypeId, usize>,
    learned: Vec<TypeId>,
    visiting: Vec<TypeId>,
}

impl<'a> Planner<'a> {
    fn new(args: &'a Args) -> Self {
        let mut known = HashMap::new();
        let mut slots = Vec::with_capacity(args.typed.len());
        for value in &args.typed {
            known.entry(value.type_key().id()).or_insert(slots.len());
            slots.push(Some(value.clone()));
        }
        Self {
            args,
            slots,
            steps: Vec::new(),
            known,
            learned: Vec::new(),
            visiting: Vec::new(),
        }
    }

    fn resolve_param(&mut self, param: &Param) -> Option<usize> {
        let args = self.args;
        let named = match &param.name {
            Some(name) => args
                .named
                .iter()
                .find(|(n, v)| n == name && v.type_key() == param.ty),
            // 名前なし: typed が無ければ同じ型の named を使う
            None if !self.known.contains_key(&param.ty.id()) => args
                .named
                .iter()
                .find(|(_, v)| v.type_key() == param.ty),
            None => None,
        };
        if let Some((_, value)) = named {
            self.slots.push(Some(value.clone()));
            return Some(self.slots.len() - 1);
        }
        self.resolve_type(param.ty)
    }

    fn resolve_type(&mut self, ty: TypeKey) -> Option<usize> {
        if let Some(&slot) = self.known.get(&ty.id()) {
            return Some(slot);
        }
        if self.visiting.contains(&ty.id()) {
            return None;
        }

        let args = self.args;
        self.visiting.push(ty.id());
        let found = args
            .converters
            .iter()
            .enumerate()
            .filter(|(_, c)| c.output() == ty)
            .find_map(|(i, _)| self.try_converter(i, ty));
        self.visiting.pop();
        found
    }

    fn try_converter(&mut self, index: usize, ty: TypeKey) -> Option<usize> {
        let mark = (self.slots.len(), self.steps.len(), self.learned.len());
        let args = self.args;
        let converter = &args.converters[index];

        let mut inputs = Vec::with_capacity(converter.params().len());
        for param in converter.params() {
            match self.resolve_param(param) {
                Some(slot) => inputs.push(slot),
                None => {
                    self.rewind(mark);
                    return None;
                }
            }
        }

        let output = self.slots.len();
        self.slots.push(None);
        self.steps.push(Step {
            converter: index,
            inputs,
            output,
        });
        self.known.insert(ty.id(), output);
        self.learned.push(ty.id());
        Some(output)
    }

    fn rewind(&mut self, (slots, steps, learned): (usize, usize, usize)) {
        self.slots.truncate(slots);
        self.steps.truncate(steps);
        for id in self.learned.drain(learned..) {
            self.known.remove(&id);
        }
    }
}
