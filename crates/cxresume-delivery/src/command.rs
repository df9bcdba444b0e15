//! Launch command construction.

use std::path::PathBuf;

use cxresume_pty::{program_name, resolve_executable_path};
use thiserror::Error;

/// Placeholder replaced by the shell-quoted primer in inline mode.
pub const INLINE_PLACEHOLDER: &str = "{contextInline}";

/// Command build error.
#[derive(Debug, Error)]
pub enum CommandBuildError {
    #[error("Base command cannot be parsed: {0}")]
    InvalidBase(String),
    #[error("Base command is empty after parsing")]
    EmptyCommand,
    #[error("Failed to quote primer: {0}")]
    QuoteError(#[from] shlex::QuoteError),
}

/// Builder for the shell command line that starts the agent program.
///
/// The base is a full shell command line, possibly containing
/// [`INLINE_PLACEHOLDER`].
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    /// Base command line.
    pub base: String,
}

impl CommandBuilder {
    /// Create a new command builder.
    #[must_use]
    pub fn new<S: Into<String>>(base: S) -> Self {
        Self { base: base.into() }
    }

    /// Check that the base parses into at least a program name.
    ///
    /// # Errors
    /// Returns [`CommandBuildError::InvalidBase`] for unbalanced quoting and
    /// [`CommandBuildError::EmptyCommand`] for a blank command.
    pub fn validate(&self) -> Result<(), CommandBuildError> {
        let parts = shlex::split(&self.base).ok_or_else(|| CommandBuildError::InvalidBase(self.base.clone()))?;
        if parts.is_empty() {
            return Err(CommandBuildError::EmptyCommand);
        }
        Ok(())
    }

    /// Command line without a primer. A placeholder, if present, is dropped.
    #[must_use]
    pub fn build_plain(&self) -> String {
        if self.base.contains(INLINE_PLACEHOLDER) {
            self.base.replace(INLINE_PLACEHOLDER, "").trim().to_string()
        } else {
            self.base.clone()
        }
    }

    /// Command line carrying the primer as one shell-quoted argument.
    ///
    /// Every placeholder occurrence is substituted; without a placeholder the
    /// argument is appended.
    ///
    /// # Errors
    /// Returns [`CommandBuildError::QuoteError`] if the primer cannot be quoted
    /// (it contains a NUL byte).
    pub fn build_inline(&self, primer: &str) -> Result<String, CommandBuildError> {
        let quoted = shlex::try_quote(primer)?;
        if self.base.contains(INLINE_PLACEHOLDER) {
            Ok(self.base.replace(INLINE_PLACEHOLDER, &quoted))
        } else {
            Ok(format!("{} {quoted}", self.base))
        }
    }

    /// Resolve the program to an absolute path.
    ///
    /// # Errors
    /// Returns error if the executable is not on `PATH`.
    pub async fn resolve_program(&self) -> Result<PathBuf, CommandBuildError> {
        let program = program_name(&self.build_plain()).ok_or(CommandBuildError::EmptyCommand)?;
        resolve_executable_path(&program)
            .await
            .ok_or_else(|| CommandBuildError::InvalidBase(format!("Executable not found: {program}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_quoted_primer() {
        let cmd = CommandBuilder::new("codex --model o3");
        let line = cmd.build_inline("it's done").unwrap();
        assert_eq!(
            shlex::split(&line).unwrap(),
            ["codex", "--model", "o3", "it's done"]
        );
    }

    #[test]
    fn substitutes_every_placeholder() {
        let cmd = CommandBuilder::new("codex -c {contextInline} --again {contextInline}");
        let quoted = shlex::try_quote("hi there").unwrap();
        assert_eq!(
            cmd.build_inline("hi there").unwrap(),
            format!("codex -c {quoted} --again {quoted}")
        );
        assert_eq!(cmd.build_plain(), "codex -c  --again");
    }

    #[test]
    fn quoted_primer_round_trips_through_shell_words() {
        let primer = "line 1\nline \"2\" $HOME `x`";
        let line = CommandBuilder::new("codex").build_inline(primer).unwrap();
        let words = shlex::split(&line).unwrap();
        assert_eq!(words, ["codex", primer]);
    }

    #[test]
    fn rejects_nul_and_bad_bases() {
        assert!(matches!(
            CommandBuilder::new("codex").build_inline("a\0b"),
            Err(CommandBuildError::QuoteError(_))
        ));
        assert!(matches!(
            CommandBuilder::new("   ").validate(),
            Err(CommandBuildError::EmptyCommand)
        ));
        assert!(matches!(
            CommandBuilder::new("codex 'open").validate(),
            Err(CommandBuildError::InvalidBase(_))
        ));
    }

    #[test]
    fn unresolvable_program_is_reported() {
        let cmd = CommandBuilder::new("cxresume-no-such-program --flag");
        let err = tokio_test::block_on(cmd.resolve_program()).unwrap_err();
        assert!(err.to_string().contains("cxresume-no-such-program"));
    }
}
