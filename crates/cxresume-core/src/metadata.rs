//! Quick metadata extraction from the first record of a log.

use std::{
    collections::VecDeque,
    path::{Component, Path, PathBuf},
    sync::LazyLock,
};

use futures::{StreamExt, stream};
use regex::Regex;
use serde_json::Value;

use crate::{
    catalog::sort_newest_first,
    error::Result,
    jsonl::{JsonlReader, get_str, parse_record},
    time::first_timestamp,
    types::{QuickMeta, SessionFile},
};

/// Record type of the structured session header.
pub const SESSION_META_TYPE: &str = "session_meta";

/// Concurrent reads used by [`filter_by_working_dir`].
pub const FILTER_CONCURRENCY: usize = 8;

/// Files inspected by [`filter_by_working_dir`].
pub const FILTER_LIMIT: usize = 2000;

/// Known locations of the working directory in legacy records.
const LEGACY_CWD_PATHS: &[&[&str]] = &[
    &["cwd"],
    &["payload", "cwd"],
    &["workdir"],
    &["payload", "workdir"],
    &["working_directory"],
    &["payload", "working_directory"],
];

static CWD_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(cwd|work(ing)?dir(ectory)?|workspace(root)?|projectroot|repo(root|path)?|rootdir)$")
        .expect("static regex")
});

static WINDOWS_ABSOLUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]:[\\/]").expect("static regex"));

/// Read metadata from the first non-empty record of `path`.
///
/// A malformed first record yields empty metadata.
///
/// # Errors
/// Returns an error only if the file cannot be opened or read.
pub async fn quick_peek(path: &Path) -> Result<QuickMeta> {
    let mut reader = JsonlReader::open(path).await?;
    while let Some(line) = reader.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        return Ok(parse_record(&line)
            .map(|record| quick_meta_from_record(&record))
            .unwrap_or_default());
    }
    Ok(QuickMeta::default())
}

/// Whether a record is the structured session header.
#[must_use]
pub fn is_session_meta(record: &Value) -> bool {
    record.get("type").and_then(Value::as_str) == Some(SESSION_META_TYPE)
        && record.get("payload").is_some_and(Value::is_object)
}

/// Derive quick metadata from a single record.
#[must_use]
pub fn quick_meta_from_record(record: &Value) -> QuickMeta {
    if is_session_meta(record) {
        let payload = &record["payload"];
        return QuickMeta {
            session_id: get_str(payload, &["id"]).map(str::to_string),
            start_time: first_timestamp([payload.get("timestamp"), record.get("timestamp")]),
            working_dir: get_str(payload, &["cwd"])
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
        };
    }

    QuickMeta {
        session_id: None,
        start_time: first_timestamp([
            record.get("timestamp"),
            record.get("payload").and_then(|p| p.get("timestamp")),
        ]),
        working_dir: legacy_working_dir(record).map(PathBuf::from),
    }
}

fn legacy_working_dir(record: &Value) -> Option<String> {
    LEGACY_CWD_PATHS
        .iter()
        .filter_map(|path| get_str(record, path))
        .find(|v| looks_absolute(v))
        .map(str::to_string)
        .or_else(|| scan_working_dir(record))
}

/// Last resort: breadth-first search for any cwd-like key holding an absolute path.
fn scan_working_dir(record: &Value) -> Option<String> {
    let mut queue = VecDeque::from([record]);
    while let Some(cur) = queue.pop_front() {
        match cur {
            Value::Object(map) => {
                for (key, value) in map {
                    match value {
                        Value::String(s) if CWD_KEY.is_match(key) && looks_absolute(s) => {
                            return Some(s.clone());
                        }
                        Value::Object(_) | Value::Array(_) => queue.push_back(value),
                        _ => {}
                    }
                }
            }
            Value::Array(items) => {
                queue.extend(items.iter().filter(|v| v.is_object() || v.is_array()));
            }
            _ => {}
        }
    }
    None
}

fn looks_absolute(s: &str) -> bool {
    s.starts_with('/') || WINDOWS_ABSOLUTE.is_match(s)
}

/// Keep the files whose recorded working directory equals `cwd`, newest first.
///
/// Reads at most [`FILTER_LIMIT`] files with [`FILTER_CONCURRENCY`] reads in flight.
/// Unreadable files are skipped.
pub async fn filter_by_working_dir(files: &[SessionFile], cwd: &Path) -> Vec<SessionFile> {
    let target = normalize_path(cwd);
    let mut matches: Vec<SessionFile> = stream::iter(files.iter().take(FILTER_LIMIT))
        .map(peek_for_filter)
        .buffer_unordered(FILTER_CONCURRENCY)
        .filter_map(|found| {
            let keep = found.and_then(|(file, meta)| {
                meta.working_dir
                    .filter(|dir| normalize_path(dir) == target)
                    .map(|_| file.clone())
            });
            async move { keep }
        })
        .collect()
        .await;
    sort_newest_first(&mut matches);
    matches
}

async fn peek_for_filter(file: &SessionFile) -> Option<(&SessionFile, QuickMeta)> {
    match quick_peek(&file.path).await {
        Ok(meta) => Some((file, meta)),
        Err(e) => {
            tracing::debug!(path = %file.path.display(), error = %e, "Skipping during directory filter");
            None
        }
    }
}

/// Lexically normalize a path, resolving relative paths against the process cwd.
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };
    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::fs;

    use filetime::{FileTime, set_file_mtime};
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::catalog::discover;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[tokio::test]
    async fn structured_header_is_trusted() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "s.jsonl",
            "\n{\"type\":\"session_meta\",\"timestamp\":\"2025-03-01T10:00:00Z\",\"payload\":{\"id\":\"abc\",\"cwd\":\"/work/proj\",\"timestamp\":\"2025-03-01T09:59:00Z\"}}\n{\"type\":\"event_msg\"}\n",
        );
        let meta = quick_peek(&path).await.unwrap();
        assert_eq!(meta.session_id.as_deref(), Some("abc"));
        assert_eq!(meta.working_dir, Some(PathBuf::from("/work/proj")));
        assert_eq!(
            meta.start_time.unwrap().to_rfc3339(),
            "2025-03-01T09:59:00+00:00"
        );
    }

    #[test]
    fn legacy_known_path_wins_over_scan() {
        let record = json!({
            "timestamp": "2025-03-01T10:00:00Z",
            "payload": {"cwd": "/known", "nested": {"workspaceRoot": "/scanned"}}
        });
        let meta = quick_meta_from_record(&record);
        assert_eq!(meta.working_dir, Some(PathBuf::from("/known")));
        assert!(meta.session_id.is_none());
        assert!(meta.start_time.is_some());
    }

    #[test]
    fn legacy_scan_finds_nested_key_case_insensitively() {
        let record = json!({"env": [{"ProjectRoot": "relative/path"}, {"meta": {"WorkingDirectory": "/deep/dir"}}]});
        let meta = quick_meta_from_record(&record);
        assert_eq!(meta.working_dir, Some(PathBuf::from("/deep/dir")));
    }

    #[test]
    fn legacy_scan_accepts_windows_paths() {
        let record = json!({"context": {"repoPath": "C:\\src\\app"}});
        assert_eq!(
            quick_meta_from_record(&record).working_dir,
            Some(PathBuf::from("C:\\src\\app"))
        );
    }

    #[tokio::test]
    async fn malformed_first_line_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "bad.jsonl", "{oops\n{\"cwd\":\"/x\"}\n");
        assert!(quick_peek(&path).await.unwrap().is_empty());
    }

    #[test]
    fn peek_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "s.jsonl",
            "{\"type\":\"session_meta\",\"payload\":{\"id\":\"x\",\"cwd\":\"/a\"}}\n",
        );
        let first = tokio_test::block_on(quick_peek(&path)).unwrap();
        let second = tokio_test::block_on(quick_peek(&path)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn normalizes_dots() {
        assert_eq!(normalize_path(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
    }

    #[tokio::test]
    async fn filters_by_working_dir() {
        let dir = TempDir::new().unwrap();
        let header = |cwd: &str| {
            format!("{{\"type\":\"session_meta\",\"payload\":{{\"id\":\"i\",\"cwd\":\"{cwd}\"}}}}\n")
        };
        let a = write(dir.path(), "a.jsonl", &header("/proj/one"));
        let b = write(dir.path(), "b.jsonl", &header("/proj/two"));
        let c = write(dir.path(), "c.jsonl", &header("/proj/one/"));
        set_file_mtime(&a, FileTime::from_unix_time(1_000, 0)).unwrap();
        set_file_mtime(&b, FileTime::from_unix_time(2_000, 0)).unwrap();
        set_file_mtime(&c, FileTime::from_unix_time(3_000, 0)).unwrap();

        let files = discover(dir.path()).await;
        let matched = filter_by_working_dir(&files, Path::new("/proj/one")).await;
        let names: Vec<String> = matched.iter().map(SessionFile::file_name).collect();
        assert_eq!(names, ["c.jsonl", "a.jsonl"]);
    }
}
