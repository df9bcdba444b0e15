//! Linear content search across the catalog.

use std::{cmp::Reverse, path::Path};

use serde_json::Value;

use crate::{
    catalog::discover,
    error::Result,
    jsonl::JsonlReader,
    parser::{extract_text, record_content},
    types::{SearchHit, SessionFile},
};

/// Most recent files scanned per search.
pub const SEARCH_LIMIT: usize = 2000;

const SNIPPET_CHARS: usize = 200;

/// Search every log under `root` for `query`, case-insensitively.
///
/// Matches raw record content, including tool and system records that never
/// appear as dialogue. Results are ordered newest first, then by hit count.
pub async fn search(root: &Path, query: &str) -> Vec<SearchHit> {
    if query.is_empty() {
        return Vec::new();
    }
    let files = discover(root).await;
    search_files(&files, query).await
}

/// Search an explicit list of files.
pub async fn search_files(files: &[SessionFile], query: &str) -> Vec<SearchHit> {
    let needle = query.to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut results = Vec::new();
    for file in files.iter().take(SEARCH_LIMIT) {
        match scan_file(&file.path, &needle).await {
            Ok(Some((hits, snippet))) => results.push(SearchHit {
                file: file.clone(),
                hits,
                snippet,
            }),
            Ok(None) => {}
            Err(e) => {
                tracing::debug!(path = %file.path.display(), error = %e, "Excluding unreadable file from search");
            }
        }
    }

    results.sort_by_key(|r| (Reverse(r.file.modified), Reverse(r.hits)));
    results
}

async fn scan_file(path: &Path, needle: &str) -> Result<Option<(usize, String)>> {
    let mut reader = JsonlReader::open(path).await?;
    let mut hits = 0;
    let mut snippet = String::new();
    while let Some(record) = reader.next_record().await? {
        let text = searchable_text(&record);
        if text.is_empty() {
            continue;
        }
        if text.to_lowercase().contains(needle) {
            hits += 1;
            snippet = text.chars().take(SNIPPET_CHARS).collect();
        }
    }
    Ok((hits > 0).then_some((hits, snippet)))
}

fn searchable_text(record: &Value) -> String {
    if let Some(content) = record_content(record) {
        return extract_text(content);
    }
    record
        .get("payload")
        .and_then(|p| p.get("message"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use filetime::{FileTime, set_file_mtime};
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn write(dir: &Path, name: &str, records: &[Value], mtime: i64) {
        let path = dir.join(name);
        let body: Vec<String> = records.iter().map(Value::to_string).collect();
        fs::write(&path, body.join("\n")).unwrap();
        set_file_mtime(&path, FileTime::from_unix_time(mtime, 0)).unwrap();
    }

    #[tokio::test]
    async fn empty_query_returns_nothing() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.jsonl", &[json!({"content": "anything"})], 1);
        assert!(search(dir.path(), "").await.is_empty());
    }

    #[tokio::test]
    async fn two_of_five_match_newest_first() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.jsonl", &[json!({"role": "user", "content": "nothing here"})], 100);
        write(
            dir.path(),
            "b.jsonl",
            &[json!({"role": "tool", "content": [{"text": "Found the NEEDLE"}]})],
            200,
        );
        write(dir.path(), "c.jsonl", &[json!({"content": "hay"})], 300);
        write(
            dir.path(),
            "d.jsonl",
            &[
                json!({"payload": {"content": "needle one"}}),
                json!({"payload": {"content": {"text": "needle two"}}}),
            ],
            400,
        );
        write(dir.path(), "e.jsonl", &[json!({"content": "more hay"})], 500);

        let results = search(dir.path(), "needle").await;
        let names: Vec<String> = results.iter().map(|r| r.file.file_name()).collect();
        assert_eq!(names, ["d.jsonl", "b.jsonl"]);
        assert!(results.iter().all(|r| r.hits >= 1));
        assert_eq!(results[0].hits, 2);
        assert_eq!(results[0].snippet, "needle two");
    }

    #[tokio::test]
    async fn equal_mtime_ranks_by_hits() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "one.jsonl", &[json!({"content": "x"})], 100);
        write(
            dir.path(),
            "two.jsonl",
            &[json!({"content": "x"}), json!({"content": "xx"})],
            100,
        );
        let results = search(dir.path(), "X").await;
        assert_eq!(results[0].file.file_name(), "two.jsonl");
        assert_eq!(results[1].file.file_name(), "one.jsonl");
    }

    #[tokio::test]
    async fn structured_event_messages_are_searchable() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "s.jsonl",
            &[
                json!({"type": "session_meta", "payload": {"id": "s"}}),
                json!({"type": "event_msg", "payload": {"type": "user_message", "message": "deploy the thing"}}),
            ],
            100,
        );
        let results = search(dir.path(), "DEPLOY").await;
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn snippet_is_truncated() {
        let dir = TempDir::new().unwrap();
        let long = format!("needle {}", "z".repeat(500));
        write(dir.path(), "l.jsonl", &[json!({"content": long})], 100);
        let results = search(dir.path(), "needle").await;
        assert_eq!(results[0].snippet.chars().count(), SNIPPET_CHARS);
    }
}
