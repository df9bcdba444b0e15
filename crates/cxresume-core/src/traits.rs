//! Seams between the delivery pipeline and the operating system.
//!
//! Each trait has one production implementation and is substituted by fakes
//! in tests, so every delivery tier can be exercised without a terminal.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::InjectTiming;

/// Clipboard error.
#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("Clipboard write failed: {0}")]
    Write(String),
}

/// Launch error.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Spawn failed: {0}")]
    Spawn(String),
    /// No pseudo-terminal could be opened; callers degrade to a plain spawn.
    #[error("Pseudo-terminal unavailable: {0}")]
    PtyUnavailable(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// System clipboard.
pub trait Clipboard: Send + Sync {
    /// Replace the clipboard contents with `text`.
    ///
    /// # Errors
    /// Returns an error if no clipboard is reachable or the write fails.
    fn copy(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Plain process spawner with inherited stdio.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Run `command` through the user's shell in `working_dir` and wait for it.
    ///
    /// Returns the child's exit code.
    ///
    /// # Errors
    /// Returns [`LaunchError::Spawn`] if the process cannot be started.
    async fn run(&self, command: &str, working_dir: &Path) -> Result<i32, LaunchError>;
}

/// Pseudo-terminal host that types a payload into the program it runs.
#[async_trait]
pub trait PtyInjector: Send + Sync {
    /// Run `command` in a pseudo-terminal, write `payload` per `timing`,
    /// relay output and input until the child exits.
    ///
    /// # Errors
    /// Returns [`LaunchError::PtyUnavailable`] when no pseudo-terminal can be
    /// opened, or [`LaunchError::Spawn`] when the child fails to start.
    async fn run_injected(
        &self,
        command: &str,
        working_dir: &Path,
        payload: &str,
        timing: &InjectTiming,
    ) -> Result<i32, LaunchError>;
}
