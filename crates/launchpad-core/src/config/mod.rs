//! Application configuration as consumed by the core.
//!
//! Parsing the user-facing configuration language happens elsewhere; what
//! arrives here is the already-decoded structure. Everything derives serde so
//! a JSON document can stand in for it.

mod diagnostics;
mod eval;
mod hook;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::component::Role;
use crate::domain::Labels;

pub use self::diagnostics::{Diagnostic, Diagnostics, Severity};
pub use self::eval::EvalContext;
pub use self::hook::{HookConfig, HookTable, HookWhen, OnFailure};
pub(crate) use self::hook::group_hooks;

/// Configuration of one application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub name: String,

    /// Source path relative to the project root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(default)]
    pub labels: Labels,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy: Option<OperationConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<OperationConfig>,
}

impl AppConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// The operation configured for a role, if any.
    pub fn operation(&self, role: Role) -> Option<&OperationConfig> {
        match role {
            Role::Builder => self.build.as_ref().map(|b| &b.operation),
            Role::Registry => self.build.as_ref().and_then(|b| b.registry.as_ref()),
            Role::Platform => self.deploy.as_ref(),
            Role::ReleaseManager => self.release.as_ref(),
        }
    }
}

/// The build stanza: the builder itself plus the optional registry it pushes to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(flatten)]
    pub operation: OperationConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<OperationConfig>,
}

/// One stage's configuration: which plugin to use, labels and hooks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationConfig {
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_: Option<UseConfig>,

    #[serde(default)]
    pub labels: Labels,

    #[serde(default)]
    pub hooks: Vec<HookConfig>,
}

impl OperationConfig {
    pub fn using(kind: impl Into<String>) -> Self {
        Self {
            use_: Some(UseConfig::new(kind)),
            ..Self::default()
        }
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        if let Some(use_) = self.use_.as_mut() {
            use_.body = body;
        }
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_hook(mut self, hook: HookConfig) -> Self {
        self.hooks.push(hook);
        self
    }
}

/// `use "<type>" { body }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UseConfig {
    #[serde(rename = "type")]
    pub kind: String,

    /// Plugin-specific configuration body, handed to the component unparsed.
    #[serde(default)]
    pub body: serde_json::Value,
}

impl UseConfig {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            body: serde_json::Value::Null,
        }
    }
}
