//! Core of the session resume tool.
//!
//! This crate provides the building blocks:
//! - `catalog` - Discovery of session logs under a root
//! - `metadata` - Single-record quick peek and the working-directory filter
//! - `parser` - Full parse across both log schema generations
//! - `search` - Linear content search
//! - `compress` - Bounded-size primer construction
//! - `preview` - Recent-dialog excerpts
//! - Seam traits for clipboard, process and pseudo-terminal launching

pub mod catalog;
pub mod compress;
pub mod context;
pub mod error;
pub mod jsonl;
pub mod metadata;
pub mod parser;
pub mod preview;
pub mod search;
pub mod time;
pub mod traits;
pub mod types;

pub use catalog::discover;
pub use compress::{PrimerBudget, PrimerSummary, build_primer};
pub use context::{InjectTiming, LaunchContext};
pub use error::{Error, Result};
pub use metadata::{filter_by_working_dir, quick_peek};
pub use parser::parse_session;
pub use preview::{HiddenKind, HideSet, PreviewLine, dialog_preview, recent_dialog};
pub use search::search;
pub use traits::{Clipboard, ClipboardError, LaunchError, ProcessLauncher, PtyInjector};
pub use types::{Message, ParsedSession, QuickMeta, Role, SearchHit, SessionFile, SessionMeta};
