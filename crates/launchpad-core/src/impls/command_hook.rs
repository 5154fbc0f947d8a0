//! CommandHookRunner - hook を子プロセスとして実行

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::HookConfig;
use crate::ports::{HookError, HookRunner};

/// Runs `command[0]` with the remaining elements as arguments, in the app's
/// source directory, and waits for it to exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandHookRunner;

impl CommandHookRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HookRunner for CommandHookRunner {
    async fn run(&self, hook: &HookConfig, dir: &Path) -> Result<(), HookError> {
        let (program, args) = hook.command.split_first().ok_or(HookError::EmptyCommand)?;
        let rendered = hook.command.join(" ");

        tracing::debug!(command = %rendered, dir = %dir.display(), "running hook");
        let status = Command::new(program)
            .args(args)
            .current_dir(dir)
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|source| HookError::Spawn {
                command: rendered.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(HookError::Exit {
                command: rendered,
                code: status.code(),
            })
        }
    }
}
