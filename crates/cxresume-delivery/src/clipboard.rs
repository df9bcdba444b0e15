//! System clipboard backed by `arboard`.

use cxresume_core::{Clipboard, ClipboardError};

/// The OS clipboard. A fresh handle is opened per copy.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClipboard;

impl SystemClipboard {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Clipboard for SystemClipboard {
    fn copy(&self, text: &str) -> Result<(), ClipboardError> {
        let mut clipboard = arboard::Clipboard::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
        clipboard
            .set_text(text)
            .map_err(|e| ClipboardError::Write(e.to_string()))?;
        tracing::debug!(chars = text.chars().count(), "Copied to clipboard");
        Ok(())
    }
}
