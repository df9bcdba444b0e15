//! Line reader for newline-delimited JSON logs.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, BufReader},
};

use crate::error::{Error, Result};

/// Reads a log line by line, decoding invalid UTF-8 lossily.
pub struct JsonlReader {
    path: PathBuf,
    inner: BufReader<File>,
    buf: Vec<u8>,
}

impl JsonlReader {
    /// Open a log for reading.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] or [`Error::Io`] if the file cannot be opened.
    pub async fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).await.map_err(|e| Error::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            inner: BufReader::new(file),
            buf: Vec::with_capacity(4096),
        })
    }

    /// Next raw line without its terminator, or `None` at end of file.
    ///
    /// # Errors
    /// Returns [`Error::Io`] if reading fails mid-file.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        self.buf.clear();
        let n = self
            .inner
            .read_until(b'\n', &mut self.buf)
            .await
            .map_err(|e| Error::io(&self.path, e))?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }

    /// Next line that parses as JSON. Blank and malformed lines are skipped.
    ///
    /// # Errors
    /// Returns [`Error::Io`] if reading fails mid-file.
    pub async fn next_record(&mut self) -> Result<Option<Value>> {
        while let Some(line) = self.next_line().await? {
            if let Some(record) = parse_record(&line) {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }
}

/// Parse one log line. Blank or malformed lines yield `None`.
#[must_use]
pub fn parse_record(line: &str) -> Option<Value> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    serde_json::from_str(line).ok()
}

/// Look up a nested field by key path.
#[must_use]
pub fn get_path<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |cur, key| cur.get(*key))
}

/// String field at `path`, ignoring non-string values.
#[must_use]
pub fn get_str<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    get_path(value, path).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn blank_and_malformed_lines_are_none() {
        assert!(parse_record("   ").is_none());
        assert!(parse_record("{not json").is_none());
        assert_eq!(parse_record(" {\"a\":1} \r"), Some(json!({"a": 1})));
    }

    #[test]
    fn nested_lookup() {
        let v = json!({"payload": {"cwd": "/tmp", "n": 3}});
        assert_eq!(get_str(&v, &["payload", "cwd"]), Some("/tmp"));
        assert!(get_str(&v, &["payload", "n"]).is_none());
        assert!(get_path(&v, &["missing", "cwd"]).is_none());
    }

    #[tokio::test]
    async fn reader_skips_garbage_and_handles_missing_newline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jsonl");
        std::fs::write(&path, b"\n{bad\n{\"n\":1}\n\xff\xfe\n{\"n\":2}").unwrap();

        let mut reader = JsonlReader::open(&path).await.unwrap();
        assert_eq!(reader.next_record().await.unwrap(), Some(json!({"n": 1})));
        assert_eq!(reader.next_record().await.unwrap(), Some(json!({"n": 2})));
        assert_eq!(reader.next_record().await.unwrap(), None);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = JsonlReader::open(&dir.path().join("nope.jsonl"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
