//! Full session log parsing across both schema generations.
//!
//! The first record that parses decides the schema. A leading `session_meta`
//! header selects the structured schema, where only `event_msg` records of type
//! `user_message` / `agent_message` become messages. Anything else selects the
//! legacy schema, where role and content are inferred per record.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{
    error::Result,
    jsonl::{JsonlReader, get_str, parse_record},
    metadata::is_session_meta,
    time::first_timestamp,
    types::{Message, ParsedSession, Role, SessionMeta},
};

const EVENT_MSG_TYPE: &str = "event_msg";
const USER_MESSAGE: &str = "user_message";
const AGENT_MESSAGE: &str = "agent_message";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Schema {
    Undecided,
    Structured,
    Legacy,
}

/// Incremental parser fed one line at a time.
#[derive(Debug)]
pub struct SessionParser {
    schema: Schema,
    messages: Vec<Message>,
    meta: SessionMeta,
}

impl Default for SessionParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionParser {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            schema: Schema::Undecided,
            messages: Vec::new(),
            meta: SessionMeta {
                start_time: None,
                end_time: None,
                working_dir: None,
                session_id: None,
            },
        }
    }

    /// Feed one raw line. Blank and malformed lines are ignored.
    pub fn push_line(&mut self, line: &str) {
        if let Some(record) = parse_record(line) {
            self.push_record(&record);
        }
    }

    /// Feed one decoded record.
    pub fn push_record(&mut self, record: &Value) {
        if self.schema == Schema::Undecided {
            if is_session_meta(record) {
                self.schema = Schema::Structured;
                self.absorb_header(&record["payload"], record);
                return;
            }
            self.schema = Schema::Legacy;
        }

        let message = match self.schema {
            Schema::Structured => structured_message(record),
            _ => legacy_message(record).filter(|m| {
                matches!(m.role, Role::User | Role::Assistant | Role::System) && !m.text.is_empty()
            }),
        };
        if let Some(message) = message {
            self.record_time(message.timestamp);
            self.messages.push(message);
        }
    }

    /// Finish parsing.
    #[must_use]
    pub fn finish(self) -> ParsedSession {
        ParsedSession {
            messages: self.messages,
            meta: self.meta,
        }
    }

    fn absorb_header(&mut self, payload: &Value, record: &Value) {
        self.meta.start_time = first_timestamp([payload.get("timestamp"), record.get("timestamp")]);
        self.meta.working_dir = get_str(payload, &["cwd"])
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);
        self.meta.session_id = get_str(payload, &["id"])
            .filter(|s| !s.is_empty())
            .map(str::to_string);
    }

    fn record_time(&mut self, ts: Option<DateTime<Utc>>) {
        if let Some(ts) = ts {
            self.meta.start_time.get_or_insert(ts);
            self.meta.end_time = Some(ts);
        }
    }
}

/// Parse a session log file.
///
/// # Errors
/// Returns [`crate::Error::NotFound`] if the file does not exist and
/// [`crate::Error::Io`] if it cannot be read. Malformed lines are skipped.
pub async fn parse_session(path: &Path) -> Result<ParsedSession> {
    let mut reader = JsonlReader::open(path).await?;
    let mut parser = SessionParser::new();
    while let Some(line) = reader.next_line().await? {
        parser.push_line(&line);
    }
    let parsed = parser.finish();
    tracing::debug!(
        path = %path.display(),
        messages = parsed.messages.len(),
        "Parsed session"
    );
    Ok(parsed)
}

/// Parse already-loaded log text.
#[must_use]
pub fn parse_str(text: &str) -> ParsedSession {
    let mut parser = SessionParser::new();
    for line in text.lines() {
        parser.push_line(line);
    }
    parser.finish()
}

fn structured_message(record: &Value) -> Option<Message> {
    if record.get("type").and_then(Value::as_str) != Some(EVENT_MSG_TYPE) {
        return None;
    }
    let payload = record.get("payload").filter(|p| p.is_object())?;
    let role = match payload.get("type").and_then(Value::as_str) {
        Some(USER_MESSAGE) => Role::User,
        Some(AGENT_MESSAGE) => Role::Assistant,
        _ => return None,
    };
    let text = match payload.get("message") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    let timestamp = first_timestamp([record.get("timestamp"), payload.get("timestamp")]);
    Some(Message::new(role, text, timestamp))
}

/// Interpret a legacy record. Fields may live at the top level or under `payload`.
fn legacy_message(record: &Value) -> Option<Message> {
    if !record.is_object() {
        return None;
    }
    let payload = record.get("payload");
    let role = payload
        .and_then(|p| p.get("role"))
        .and_then(Value::as_str)
        .or_else(|| record.get("role").and_then(Value::as_str))
        .map_or(Role::Other, Role::coerce);
    let timestamp = first_timestamp([record.get("timestamp"), payload.and_then(|p| p.get("timestamp"))]);
    let text = record_content(record).map(extract_text).unwrap_or_default();
    Some(Message::new(role, text, timestamp))
}

/// Raw content of a record: `payload.content`, else top-level `content`.
#[must_use]
pub fn record_content(record: &Value) -> Option<&Value> {
    record
        .get("payload")
        .and_then(|p| p.get("content"))
        .filter(|c| !c.is_null())
        .or_else(|| record.get("content"))
}

/// Extract text from content shaped as a string, an array of `{text}` fragments
/// (joined by newline) or a single `{text}` fragment.
#[must_use]
pub fn extract_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(|it| it.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(_) => content
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}
