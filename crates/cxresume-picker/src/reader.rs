//! Metadata source for background loads.

use std::path::Path;

use async_trait::async_trait;
use cxresume_core::{QuickMeta, quick_peek};

/// Reads quick metadata for one session log.
#[async_trait]
pub trait MetaReader: Send + Sync {
    async fn read(&self, path: &Path) -> cxresume_core::Result<QuickMeta>;
}

/// Peeks at the first record of the log on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeekReader;

#[async_trait]
impl MetaReader for PeekReader {
    async fn read(&self, path: &Path) -> cxresume_core::Result<QuickMeta> {
        quick_peek(path).await
    }
}
