//! User configuration.
//!
//! Settings are merged as defaults, then the JSON file, then command-line
//! overrides. Every key in the file is optional.

use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use cxresume_core::{InjectTiming, PrimerBudget};
use cxresume_delivery::{DeliveryOptions, InjectStrategy};
use serde::Deserialize;
use thiserror::Error;

/// Environment variable consulted when `inlineArgMaxChars` is 0.
pub const INLINE_MAX_ENV: &str = "CXRESUME_INLINE_MAX";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub codex_cmd: String,
    pub logs_root: PathBuf,
    pub preview: bool,
    pub inject: InjectStrategy,
    pub inject_delay_ms: u64,
    pub inject_wake_enter: bool,
    pub inject_wake_delay_ms: u64,
    pub inline_arg_max_chars: usize,
    pub primer_all_per_message_max: usize,
    pub primer_all_target_chars: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            codex_cmd: "codex".to_string(),
            logs_root: default_logs_root(),
            preview: false,
            inject: InjectStrategy::Inline,
            inject_delay_ms: 1000,
            inject_wake_enter: false,
            inject_wake_delay_ms: 250,
            inline_arg_max_chars: 120_000,
            primer_all_per_message_max: 400,
            primer_all_target_chars: 10_000,
        }
    }
}

/// `~/.codex/sessions`.
#[must_use]
pub fn default_logs_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".codex")
        .join("sessions")
}

/// Location of the config file, if a config directory is known.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    config_path_from(std::env::var_os("XDG_CONFIG_HOME"), dirs::home_dir())
}

/// `$XDG_CONFIG_HOME/cxresume/config.json`, else `~/.config/cxresume/config.json`.
/// The platform config directory is used only when no home is known.
fn config_path_from(xdg_config_home: Option<OsString>, home: Option<PathBuf>) -> Option<PathBuf> {
    xdg_config_home
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| home.map(|home| home.join(".config")))
        .or_else(dirs::config_dir)
        .map(|dir| dir.join("cxresume").join("config.json"))
}

impl Config {
    /// Read `path`. A missing file yields defaults.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config.normalized())
    }

    /// Load from the standard location, falling back to defaults on any error.
    #[must_use]
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        match Self::load_from(&path) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "Loaded config");
                config
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring config file");
                Self::default()
            }
        }
    }

    /// Apply command-line overrides.
    #[must_use]
    pub fn with_overrides(mut self, codex: Option<String>, root: Option<PathBuf>) -> Self {
        if let Some(cmd) = codex.filter(|c| !c.trim().is_empty()) {
            self.codex_cmd = cmd;
        }
        if let Some(root) = root {
            self.logs_root = root;
        }
        self
    }

    /// Zero or empty values fall back to defaults, except the inline limit
    /// where 0 defers to [`INLINE_MAX_ENV`].
    fn normalized(mut self) -> Self {
        let defaults = Self::default();
        if self.codex_cmd.trim().is_empty() {
            self.codex_cmd = defaults.codex_cmd;
        }
        if self.logs_root.as_os_str().is_empty() {
            self.logs_root = defaults.logs_root;
        }
        if self.inject_delay_ms == 0 {
            self.inject_delay_ms = defaults.inject_delay_ms;
        }
        if self.inject_wake_delay_ms == 0 {
            self.inject_wake_delay_ms = defaults.inject_wake_delay_ms;
        }
        if self.primer_all_per_message_max == 0 {
            self.primer_all_per_message_max = defaults.primer_all_per_message_max;
        }
        if self.primer_all_target_chars == 0 {
            self.primer_all_target_chars = defaults.primer_all_target_chars;
        }
        self
    }

    /// The logs root, or the legacy singular `session` directory next to it
    /// when only that one exists.
    #[must_use]
    pub fn resolve_logs_root(&self) -> PathBuf {
        let root = &self.logs_root;
        if root.exists() {
            return root.clone();
        }
        if root.file_name().is_some_and(|n| n == "sessions") {
            let legacy = root.with_file_name("session");
            if legacy.exists() {
                tracing::debug!(root = %legacy.display(), "Using legacy logs root");
                return legacy;
            }
        }
        root.clone()
    }

    /// Inline argument limit; `env_value` is consulted when the key is 0.
    /// A result of 0 means unlimited.
    #[must_use]
    pub fn inline_limit(&self, env_value: Option<&str>) -> usize {
        if self.inline_arg_max_chars > 0 {
            return self.inline_arg_max_chars;
        }
        env_value.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
    }

    #[must_use]
    pub const fn primer_budget(&self) -> PrimerBudget {
        PrimerBudget {
            per_message_max: self.primer_all_per_message_max,
            target_chars: self.primer_all_target_chars,
        }
    }

    #[must_use]
    pub const fn inject_timing(&self) -> InjectTiming {
        InjectTiming {
            initial_delay: Duration::from_millis(self.inject_delay_ms),
            wake_enter: self.inject_wake_enter,
            wake_delay: Duration::from_millis(self.inject_wake_delay_ms),
        }
    }

    #[must_use]
    pub fn delivery_options(&self) -> DeliveryOptions {
        let env = std::env::var(INLINE_MAX_ENV).ok();
        DeliveryOptions {
            strategy: self.inject,
            inline_limit: self.inline_limit(env.as_deref()),
            timing: self.inject_timing(),
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("config.json");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn config_path_prefers_xdg_then_home_dot_config() {
        let home = Some(PathBuf::from("/home/u"));
        assert_eq!(
            config_path_from(Some("/xdg".into()), home.clone()),
            Some(PathBuf::from("/xdg/cxresume/config.json"))
        );
        assert_eq!(
            config_path_from(Some(OsString::new()), home.clone()),
            Some(PathBuf::from("/home/u/.config/cxresume/config.json"))
        );
        assert_eq!(
            config_path_from(None, home),
            Some(PathBuf::from("/home/u/.config/cxresume/config.json"))
        );
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{"codexCmd": "codex --model o3", "preview": true, "inject": "pty", "injectWakeEnter": true}"#,
        );
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.codex_cmd, "codex --model o3");
        assert!(config.preview);
        assert_eq!(config.inject, InjectStrategy::Pty);
        assert!(config.inject_wake_enter);
        assert_eq!(config.inject_delay_ms, 1000);
        assert_eq!(config.primer_all_target_chars, 10_000);
    }

    #[test]
    fn cli_values_override_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{"codexCmd": "from-file", "logsRoot": "/file/root"}"#);
        let config = Config::load_from(&path)
            .unwrap()
            .with_overrides(Some("from-cli".into()), Some(PathBuf::from("/cli/root")));
        assert_eq!(config.codex_cmd, "from-cli");
        assert_eq!(config.logs_root, PathBuf::from("/cli/root"));

        let config = Config::load_from(&path).unwrap().with_overrides(Some("  ".into()), None);
        assert_eq!(config.codex_cmd, "from-file");
        assert_eq!(config.logs_root, PathBuf::from("/file/root"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "{ not json");
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse { .. })));

        let path = write_config(&dir, r#"{"inject": "telepathy"}"#);
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn zero_values_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{"codexCmd": "", "injectDelayMs": 0, "primerAllPerMessageMax": 0, "inlineArgMaxChars": 0}"#,
        );
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.codex_cmd, "codex");
        assert_eq!(config.inject_delay_ms, 1000);
        assert_eq!(config.primer_all_per_message_max, 400);
        assert_eq!(config.inline_arg_max_chars, 0);
    }

    #[test]
    fn inline_limit_defers_to_env_only_when_zero() {
        let mut config = Config::default();
        assert_eq!(config.inline_limit(Some("5")), 120_000);
        config.inline_arg_max_chars = 0;
        assert_eq!(config.inline_limit(Some(" 5000 ")), 5000);
        assert_eq!(config.inline_limit(Some("lots")), 0);
        assert_eq!(config.inline_limit(None), 0);
    }

    #[test]
    fn legacy_root_used_when_plural_missing() {
        let dir = TempDir::new().unwrap();
        let legacy = dir.path().join("session");
        std::fs::create_dir(&legacy).unwrap();

        let config = Config::default().with_overrides(None, Some(dir.path().join("sessions")));
        assert_eq!(config.resolve_logs_root(), legacy);

        std::fs::create_dir(dir.path().join("sessions")).unwrap();
        assert_eq!(config.resolve_logs_root(), dir.path().join("sessions"));
    }

    #[test]
    fn missing_root_is_returned_unchanged() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("elsewhere");
        let config = Config::default().with_overrides(None, Some(root.clone()));
        assert_eq!(config.resolve_logs_root(), root);
    }

    #[test]
    fn timing_and_budget_follow_config() {
        let config = Config {
            inject_delay_ms: 300,
            inject_wake_delay_ms: 10,
            primer_all_target_chars: 2000,
            ..Config::default()
        };
        let timing = config.inject_timing();
        assert_eq!(timing.initial_delay, Duration::from_millis(300));
        assert_eq!(timing.effective_wake_delay(), InjectTiming::MIN_WAKE_DELAY);
        assert_eq!(config.primer_budget().target_chars, 2000);
    }
}
