//! Session log discovery.

use std::{
    cmp::Reverse,
    path::{Path, PathBuf},
};

use walkdir::{DirEntry, WalkDir};

use crate::types::SessionFile;

const LOG_EXTENSION: &str = "jsonl";

/// Discover every `*.jsonl` log under `root`, newest first.
///
/// A missing root yields an empty catalog. Unreadable subtrees are skipped.
pub async fn discover(root: &Path) -> Vec<SessionFile> {
    let root = root.to_path_buf();
    match tokio::task::spawn_blocking(move || discover_blocking(&root)).await {
        Ok(files) => files,
        Err(e) => {
            tracing::warn!(error = %e, "Session discovery task failed");
            Vec::new()
        }
    }
}

/// Blocking version of [`discover`].
#[must_use]
pub fn discover_blocking(root: &Path) -> Vec<SessionFile> {
    if !root.is_dir() {
        tracing::debug!(root = %root.display(), "Session root does not exist");
        return Vec::new();
    }

    let mut files: Vec<SessionFile> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unreadable entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file() && has_log_extension(e.path()))
        .filter_map(|e| describe(root, e.path()))
        .collect();

    sort_newest_first(&mut files);
    files
}

/// Sort descriptors by modification time, newest first.
pub fn sort_newest_first(files: &mut [SessionFile]) {
    files.sort_by_key(|f| Reverse(f.modified));
}

fn describe(root: &Path, path: &Path) -> Option<SessionFile> {
    let metadata = match path.metadata() {
        Ok(m) => m,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable log");
            return None;
        }
    };
    let modified = metadata.modified().ok()?;
    let rel = path
        .strip_prefix(root)
        .map_or_else(|_| path.to_path_buf(), Path::to_path_buf);
    Some(SessionFile {
        path: absolute(path),
        rel,
        modified,
        size: metadata.len(),
    })
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    }
}

fn has_log_extension(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == LOG_EXTENSION)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_str().is_some_and(|s| s.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use filetime::{FileTime, set_file_mtime};
    use tempfile::TempDir;

    use super::*;

    fn touch(root: &Path, rel: &str, mtime_secs: i64) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{}\n").unwrap();
        set_file_mtime(&path, FileTime::from_unix_time(mtime_secs, 0)).unwrap();
        path
    }

    #[tokio::test]
    async fn missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(discover(&dir.path().join("nope")).await.is_empty());
    }

    #[tokio::test]
    async fn sorted_newest_first_recursively() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "2025/01/01/old.jsonl", 1_000);
        touch(dir.path(), "2025/01/02/mid.jsonl", 2_000);
        touch(dir.path(), "new.jsonl", 3_000);
        touch(dir.path(), "notes.txt", 4_000);

        let files = discover(dir.path()).await;
        let names: Vec<String> = files.iter().map(SessionFile::file_name).collect();
        assert_eq!(names, ["new.jsonl", "mid.jsonl", "old.jsonl"]);
        assert!(files.windows(2).all(|w| w[0].modified >= w[1].modified));
        assert_eq!(files[1].rel, PathBuf::from("2025/01/02/mid.jsonl"));
        assert!(files.iter().all(|f| f.path.is_absolute()));
    }

    #[test]
    fn hidden_entries_below_root_are_skipped() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), ".cache/skip.jsonl", 1_000);
        touch(dir.path(), ".skip.jsonl", 1_000);
        touch(dir.path(), "keep.jsonl", 1_000);

        let files = discover_blocking(dir.path());
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name(), "keep.jsonl");
        assert_eq!(files[0].size, 3);
    }
}
