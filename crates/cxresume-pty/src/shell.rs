//! Shell detection and executable lookup.

use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

const FALLBACK_SHELL: &str = "/bin/sh";

/// Returns the user's shell and the flag used to run a command string through it.
///
/// Zsh and bash get `-lc` so profile-managed `PATH` entries are visible to the
/// launched program; anything else gets `-c`.
#[must_use]
pub fn get_shell_command() -> (String, &'static str) {
    UnixShell::current_shell().get_shell_command()
}

/// The POSIX shell that interprets `shlex`-quoted command lines.
#[must_use]
pub fn posix_shell_command() -> (String, &'static str) {
    UnixShell::Sh(PathBuf::from(FALLBACK_SHELL)).get_shell_command()
}

/// Resolve an executable by name.
///
/// Explicit paths are accepted when they point at a file; bare names are
/// looked up on the current `PATH`.
pub async fn resolve_executable_path(executable: &str) -> Option<PathBuf> {
    if executable.trim().is_empty() {
        return None;
    }

    let path = Path::new(executable);
    if path.is_absolute() && path.is_file() {
        return Some(path.to_path_buf());
    }

    let executable = executable.to_string();
    tokio::task::spawn_blocking(move || which::which(executable))
        .await
        .ok()
        .and_then(Result::ok)
}

/// First word of a shell command line, if it parses.
#[must_use]
pub fn program_name(command: &str) -> Option<String> {
    shlex::split(command).and_then(|words| words.into_iter().next())
}

/// Unix shell types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnixShell {
    Zsh(PathBuf),
    Bash(PathBuf),
    Sh(PathBuf),
    Other(PathBuf),
}

impl UnixShell {
    /// Get the shell path.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Zsh(p) | Self::Bash(p) | Self::Sh(p) | Self::Other(p) => p,
        }
    }

    /// Whether this shell supports login mode.
    #[must_use]
    pub const fn login(&self) -> bool {
        matches!(self, Self::Zsh(_) | Self::Bash(_))
    }

    /// Get the current shell from `$SHELL`.
    #[must_use]
    pub fn current_shell() -> Self {
        std::env::var("SHELL")
            .ok()
            .and_then(|shell| Self::from_path(Path::new(&shell)))
            .unwrap_or_else(|| Self::Sh(PathBuf::from(FALLBACK_SHELL)))
    }

    /// Create from an absolute path to an existing file.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        if !(path.is_absolute() && path.is_file()) {
            return None;
        }
        let path_buf = path.to_path_buf();
        Some(match path.file_name().and_then(OsStr::to_str) {
            Some("zsh") => Self::Zsh(path_buf),
            Some("bash") => Self::Bash(path_buf),
            Some("sh") => Self::Sh(path_buf),
            _ => Self::Other(path_buf),
        })
    }

    /// Get shell command tuple.
    #[must_use]
    pub fn get_shell_command(&self) -> (String, &'static str) {
        let flag = if self.login() { "-lc" } else { "-c" };
        (self.path().to_string_lossy().into_owned(), flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_relative_and_missing_paths() {
        assert!(UnixShell::from_path(Path::new("bash")).is_none());
        assert!(UnixShell::from_path(Path::new("/definitely/not/a/shell")).is_none());
    }

    #[test]
    fn plain_sh_runs_without_login() {
        let sh = UnixShell::Sh(PathBuf::from("/bin/sh"));
        assert_eq!(sh.get_shell_command(), ("/bin/sh".to_string(), "-c"));
        let zsh = UnixShell::Zsh(PathBuf::from("/bin/zsh"));
        assert_eq!(zsh.get_shell_command().1, "-lc");
        let fish = UnixShell::Other(PathBuf::from("/usr/bin/fish"));
        assert_eq!(fish.get_shell_command().1, "-c");
        assert_eq!(posix_shell_command(), ("/bin/sh".to_string(), "-c"));
    }

    #[test]
    fn program_name_takes_first_word() {
        assert_eq!(program_name("codex --model 'o 3'").as_deref(), Some("codex"));
        assert_eq!(program_name("  ").as_deref(), None);
        assert_eq!(program_name("'unterminated").as_deref(), None);
    }

    #[tokio::test]
    async fn resolves_absolute_executable() {
        let exe = std::env::current_exe().unwrap();
        let found = resolve_executable_path(exe.to_str().unwrap()).await;
        assert_eq!(found, Some(exe));
        assert!(resolve_executable_path("").await.is_none());
    }
}
