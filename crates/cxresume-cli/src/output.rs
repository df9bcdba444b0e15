//! Plain console output for the non-interactive modes.

use std::{fmt::Write as _, path::Path};

use cxresume_core::{Message, Role, SessionFile, recent_dialog, time::format_local};
use owo_colors::OwoColorize;
use regex::RegexBuilder;

/// Files shown by `--list`.
pub const LIST_LIMIT: usize = 100;

/// Messages shown by the console preview.
pub const CONSOLE_PREVIEW_LIMIT: usize = 5;

/// The `--list` report.
#[must_use]
pub fn render_list(root: &Path, files: &[SessionFile]) -> String {
    if files.is_empty() {
        return format!("No session files found. Root: {}\n", root.display());
    }
    let mut out = format!(
        "{} {} sessions under {}\n",
        "Found".green(),
        files.len(),
        root.display()
    );
    for file in files.iter().take(LIST_LIMIT) {
        let _ = writeln!(
            out,
            "- {} ({})",
            file.rel.display(),
            format_local(&file.modified_at()).dimmed()
        );
    }
    if files.len() > LIST_LIMIT {
        let _ = writeln!(out, "... and {} more", files.len() - LIST_LIMIT);
    }
    out
}

/// The last few dialog messages as `Role: text`, with `query` highlighted.
#[must_use]
pub fn render_preview(messages: &[Message], limit: usize, query: Option<&str>) -> String {
    let mut out = String::new();
    for message in recent_dialog(messages, limit) {
        let label = match message.role {
            Role::User => message.role.label().cyan().to_string(),
            _ => message.role.label().green().to_string(),
        };
        let text = message.text.replace('\r', "");
        let _ = writeln!(out, "{label}: {}", highlight(&text, query));
    }
    out
}

/// Case-insensitive highlight of every occurrence of `query`.
#[must_use]
pub fn highlight(text: &str, query: Option<&str>) -> String {
    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return text.to_string();
    };
    let Ok(re) = RegexBuilder::new(&regex::escape(query)).case_insensitive(true).build() else {
        return text.to_string();
    };
    re.replace_all(text, |caps: &regex::Captures<'_>| (&caps[0]).black().on_yellow().to_string())
        .into_owned()
}

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, time::SystemTime};

    use regex::Regex;

    use super::*;

    fn plain(text: &str) -> String {
        Regex::new("\x1b\\[[0-9;]*m").unwrap().replace_all(text, "").into_owned()
    }

    fn file(rel: &str) -> SessionFile {
        SessionFile {
            path: PathBuf::from("/logs").join(rel),
            rel: PathBuf::from(rel),
            modified: SystemTime::now(),
            size: 1,
        }
    }

    #[test]
    fn empty_list_names_the_root() {
        assert_eq!(
            render_list(Path::new("/logs"), &[]),
            "No session files found. Root: /logs\n"
        );
    }

    #[test]
    fn list_is_capped() {
        let files: Vec<_> = (0..105).map(|i| file(&format!("s{i}.jsonl"))).collect();
        let out = plain(&render_list(Path::new("/logs"), &files));
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[0], "Found 105 sessions under /logs");
        assert!(lines[1].starts_with("- s0.jsonl ("));
        assert_eq!(lines.len(), 1 + LIST_LIMIT + 1);
        assert_eq!(lines.last().copied(), Some("... and 5 more"));
    }

    #[test]
    fn preview_keeps_last_dialog_messages() {
        let messages: Vec<_> = (0..7)
            .map(|i| {
                let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
                Message::new(role, format!("m{i}\r"), None)
            })
            .chain(std::iter::once(Message::new(Role::System, "sys", None)))
            .collect();
        let out = plain(&render_preview(&messages, CONSOLE_PREVIEW_LIMIT, None));
        assert_eq!(
            out.lines().collect::<Vec<_>>(),
            ["User: m2", "Assistant: m3", "User: m4", "Assistant: m5", "User: m6"]
        );
    }

    #[test]
    fn highlight_is_case_insensitive_and_literal() {
        let out = highlight("Fix the Bug, then bug (again)", Some("BUG"));
        assert_eq!(out.matches("\x1b[").count() % 2, 0);
        assert_eq!(plain(&out), "Fix the Bug, then bug (again)");
        assert_ne!(out, plain(&out));

        let out = highlight("call f(x)", Some("f(x)"));
        assert_ne!(out, "call f(x)");
        assert_eq!(highlight("text", Some("")), "text");
        assert_eq!(highlight("text", None), "text");
    }
}
