//! HookRunner port - hook コマンドの実行

use std::path::Path;

use async_trait::async_trait;

use crate::config::HookConfig;

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("hook has an empty command")]
    EmptyCommand,

    #[error("hook {command:?} failed to start: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("hook {command:?} exited with {}", exit_code(.code))]
    Exit { command: String, code: Option<i32> },
}

fn exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

/// Runs one hook to completion.
#[async_trait]
pub trait HookRunner: Send + Sync {
    async fn run(&self, hook: &HookConfig, dir: &Path) -> Result<(), HookError>;
}
