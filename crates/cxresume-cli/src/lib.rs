//! The `cxresume` command.
//!
//! Provides:
//! - Argument parsing and layered configuration
//! - The ratatui picker front end
//! - The resume flow with its exit codes

pub mod app;
pub mod args;
pub mod config;
pub mod output;
pub mod tui;

pub use app::run;
pub use args::Args;
pub use config::{Config, ConfigError};
