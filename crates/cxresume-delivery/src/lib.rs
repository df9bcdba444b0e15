//! Launch the agent program and hand it a primer.
//!
//! Provides:
//! - Command building with inline primer substitution
//! - Clipboard and plain-spawn implementations of the core seams
//! - `DeliveryPipeline` - Ordered inline, pty and manual-paste tiers

pub mod clipboard;
pub mod command;
pub mod launcher;
pub mod pipeline;
pub mod strategy;

pub use clipboard::SystemClipboard;
pub use command::{CommandBuildError, CommandBuilder, INLINE_PLACEHOLDER};
pub use launcher::ShellLauncher;
pub use pipeline::{Attempt, DeliveryError, DeliveryOptions, DeliveryPipeline, DeliveryReport, Notice};
pub use strategy::InjectStrategy;
