//! Interactive session picker.
//!
//! Provides:
//! - `PickerSession` - Paged selection with background metadata prefetch
//! - Per-picker caches for metadata and previews
//! - `MetaReader` - Source of quick metadata for background loads

pub mod cache;
pub mod picker;
pub mod reader;

pub use cache::MemoryCache;
pub use picker::{
    ITEMS_PER_PAGE, Mode, PREFETCH_WORKERS, PickerDecision, PickerEvent, PickerOp, PickerOptions, PickerSession,
    PreviewPane, PreviewState, Row,
};
pub use reader::{MetaReader, PeekReader};
