//! Plain process spawning with inherited stdio.

use std::{path::Path, process::Stdio};

use async_trait::async_trait;
use cxresume_core::{LaunchError, ProcessLauncher};
use cxresume_pty::posix_shell_command;
use tokio::process::Command;

/// Runs command lines through `/bin/sh`, which matches the `shlex` quoting
/// used to build them.
#[derive(Debug, Clone, Default)]
pub struct ShellLauncher;

impl ShellLauncher {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessLauncher for ShellLauncher {
    async fn run(&self, command: &str, working_dir: &Path) -> Result<i32, LaunchError> {
        let (shell, shell_arg) = posix_shell_command();
        tracing::debug!(%shell, command, cwd = %working_dir.display(), "Spawning");

        let mut child = Command::new(&shell)
            .arg(shell_arg)
            .arg(command)
            .current_dir(working_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| LaunchError::Spawn(format!("{shell}: {e}")))?;

        let status = child.wait().await?;
        // Killed by a signal: report a generic failure.
        Ok(status.code().unwrap_or(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mirrors_exit_code_and_working_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let marker = dir.path().join("ran");
        let launcher = ShellLauncher::new();
        let code = launcher.run("touch ran; exit 7", dir.path()).await.unwrap();
        assert_eq!(code, 7);
        assert!(marker.exists());
    }

    #[tokio::test]
    async fn quoted_primer_reaches_program_unchanged() {
        let dir = tempfile::TempDir::new().unwrap();
        let primer = "path C:\\tmp\\x, json {\"a\":\"b\\\"c\"}, it's 'quoted' $HOME `id`\nnext line";
        let command = crate::CommandBuilder::new("printf '%s' {contextInline} > got")
            .build_inline(primer)
            .unwrap();
        let code = ShellLauncher::new().run(&command, dir.path()).await.unwrap();
        assert_eq!(code, 0);
        assert_eq!(std::fs::read_to_string(dir.path().join("got")).unwrap(), primer);
    }

    #[tokio::test]
    async fn missing_working_dir_fails_to_spawn() {
        let err = ShellLauncher::new()
            .run("true", Path::new("/definitely/missing/dir"))
            .await
            .unwrap_err();
        assert!(matches!(err, LaunchError::Spawn(_)));
    }
}
