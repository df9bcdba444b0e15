//! Recent-dialog excerpts for previews.

use std::{collections::HashSet, fmt, str::FromStr};

use crate::{
    time::format_local,
    types::{Message, Role},
};

/// Messages shown in the picker preview.
pub const PICKER_PREVIEW_LIMIT: usize = 20;

/// Message kinds a user may hide from previews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HiddenKind {
    Tool,
    Thinking,
    User,
    Assistant,
    System,
}

impl HiddenKind {
    /// Kinds hidden when `--hide` is given without values.
    pub const DEFAULTS: [Self; 2] = [Self::Tool, Self::Thinking];

    /// Whether this kind covers messages of `role`.
    #[must_use]
    pub const fn covers(self, role: Role) -> bool {
        matches!(
            (self, role),
            (Self::User, Role::User)
                | (Self::Assistant, Role::Assistant)
                | (Self::System, Role::System)
                | (Self::Tool, Role::Tool)
        )
    }
}

impl FromStr for HiddenKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tool" => Ok(Self::Tool),
            "thinking" => Ok(Self::Thinking),
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "system" => Ok(Self::System),
            other => Err(format!(
                "unknown kind '{other}' (expected tool, thinking, user, assistant or system)"
            )),
        }
    }
}

impl fmt::Display for HiddenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tool => "tool",
            Self::Thinking => "thinking",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        })
    }
}

/// Set of hidden kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HideSet(HashSet<HiddenKind>);

impl HideSet {
    #[must_use]
    pub fn new(kinds: impl IntoIterator<Item = HiddenKind>) -> Self {
        Self(kinds.into_iter().collect())
    }

    #[must_use]
    pub fn hides(&self, role: Role) -> bool {
        self.0.iter().any(|k| k.covers(role))
    }
}

/// One rendered preview entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewLine {
    pub role: Role,
    pub text: String,
    /// Local display time, empty when the message had none.
    pub time: String,
}

impl fmt::Display for PreviewLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {} | {}", self.time, self.role, self.text)
    }
}

/// The most recent `limit` user/assistant messages, in chronological order.
#[must_use]
pub fn recent_dialog(messages: &[Message], limit: usize) -> Vec<&Message> {
    let mut subset: Vec<&Message> = messages
        .iter()
        .rev()
        .filter(|m| m.role.is_dialog())
        .take(limit)
        .collect();
    subset.reverse();
    subset
}

/// Build preview lines: recent dialog, then the hide-set filter.
#[must_use]
pub fn dialog_preview(messages: &[Message], limit: usize, hide: &HideSet) -> Vec<PreviewLine> {
    recent_dialog(messages, limit)
        .into_iter()
        .filter(|m| !hide.hides(m.role))
        .map(|m| PreviewLine {
            role: m.role,
            text: m.text.replace('\r', ""),
            time: m.timestamp.as_ref().map(format_local).unwrap_or_default(),
        })
        .collect()
}
