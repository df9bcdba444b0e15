//! Primer delivery strategies.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// How the primer reaches the launched program.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjectStrategy {
    /// Shell-quoted command-line argument.
    #[default]
    Inline,
    /// Pty injection when available, otherwise manual paste.
    Auto,
    /// Pty injection, otherwise manual paste.
    Pty,
    /// Manual paste from the clipboard.
    Clipboard,
    /// Same as [`InjectStrategy::Clipboard`].
    None,
}

impl InjectStrategy {
    /// Whether the user is expected to paste the primer themselves.
    #[must_use]
    pub const fn is_manual(self) -> bool {
        matches!(self, Self::Clipboard | Self::None)
    }
}

impl FromStr for InjectStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" => Ok(Self::Inline),
            "auto" => Ok(Self::Auto),
            "pty" => Ok(Self::Pty),
            "clipboard" => Ok(Self::Clipboard),
            "none" => Ok(Self::None),
            other => Err(format!("unknown inject mode '{other}'")),
        }
    }
}

impl fmt::Display for InjectStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Inline => "inline",
            Self::Auto => "auto",
            Self::Pty => "pty",
            Self::Clipboard => "clipboard",
            Self::None => "none",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_serializes_lowercase() {
        assert_eq!("PTY".parse::<InjectStrategy>(), Ok(InjectStrategy::Pty));
        assert!("paste".parse::<InjectStrategy>().is_err());
        assert_eq!(
            serde_json::to_string(&InjectStrategy::Clipboard).unwrap(),
            "\"clipboard\""
        );
        let parsed: InjectStrategy = serde_json::from_str("\"auto\"").unwrap();
        assert_eq!(parsed, InjectStrategy::Auto);
    }

    #[test]
    fn only_clipboard_and_none_are_manual() {
        assert!(InjectStrategy::Clipboard.is_manual());
        assert!(InjectStrategy::None.is_manual());
        assert!(!InjectStrategy::Inline.is_manual());
        assert!(!InjectStrategy::Auto.is_manual());
        assert!(!InjectStrategy::Pty.is_manual());
    }
}
