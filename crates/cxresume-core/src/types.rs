//! Shared session types.

use std::{fmt, path::PathBuf, time::SystemTime};

use chrono::{DateTime, Utc};

/// A discovered session log file.
///
/// Identity is the absolute path; descriptors are never mutated after discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFile {
    /// Absolute path to the log.
    pub path: PathBuf,
    /// Path relative to the catalog root.
    pub rel: PathBuf,
    /// Last modification time.
    pub modified: SystemTime,
    /// File size in bytes.
    pub size: u64,
}

impl SessionFile {
    /// File name of the log, used when no session id is known.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map_or_else(|| self.path.display().to_string(), |n| n.to_string_lossy().into_owned())
    }

    /// Modification time as a UTC timestamp.
    #[must_use]
    pub fn modified_at(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from(self.modified)
    }
}

/// Speaker of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
    Other,
}

impl Role {
    /// Coerce a raw role string; unknown values map to [`Role::Other`].
    #[must_use]
    pub fn coerce(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "user" => Self::User,
            "assistant" => Self::Assistant,
            "system" => Self::System,
            "tool" => Self::Tool,
            _ => Self::Other,
        }
    }

    /// User or assistant.
    #[must_use]
    pub const fn is_dialog(self) -> bool {
        matches!(self, Self::User | Self::Assistant)
    }

    /// Display label used in primers and previews.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
            Self::System | Self::Tool | Self::Other => "System",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One dialogue entry reconstructed from a log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub text: String,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, text: impl Into<String>, timestamp: Option<DateTime<Utc>>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp,
        }
    }
}

/// Metadata read from the first record of a log only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuickMeta {
    pub session_id: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub working_dir: Option<PathBuf>,
}

impl QuickMeta {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.session_id.is_none() && self.start_time.is_none() && self.working_dir.is_none()
    }
}

/// Metadata aggregated over a full parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionMeta {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub working_dir: Option<PathBuf>,
    pub session_id: Option<String>,
}

/// Result of parsing a session log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSession {
    pub messages: Vec<Message>,
    pub meta: SessionMeta,
}

/// A catalog entry that matched a content search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub file: SessionFile,
    /// Number of matching records.
    pub hits: usize,
    /// Leading text of the last matching record.
    pub snippet: String,
}
