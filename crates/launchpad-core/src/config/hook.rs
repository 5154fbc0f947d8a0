use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// When a hook runs relative to the stage's action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookWhen {
    Before,
    After,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnFailure {
    /// Abort the stage and record the hook failure as its error.
    #[default]
    Fail,
    /// Log and keep going.
    Continue,
}

/// A user-declared side command around a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookConfig {
    pub when: HookWhen,
    pub command: Vec<String>,
    #[serde(default)]
    pub on_failure: OnFailure,
}

impl HookConfig {
    pub fn new(when: HookWhen, command: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            when,
            command: command.into_iter().map(Into::into).collect(),
            on_failure: OnFailure::Fail,
        }
    }

    pub fn continue_on_failure(mut self) -> Self {
        self.on_failure = OnFailure::Continue;
        self
    }
}

/// Hooks of one component grouped by trigger point, declaration order kept.
pub type HookTable = BTreeMap<HookWhen, Vec<HookConfig>>;

pub(crate) fn group_hooks(hooks: &[HookConfig]) -> HookTable {
    let mut table = HookTable::new();
    for hook in hooks {
        table.entry(hook.when).or_default().push(hook.clone());
    }
    table
}
