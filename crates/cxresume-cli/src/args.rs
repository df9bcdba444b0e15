//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use cxresume_core::{HiddenKind, HideSet};

#[derive(Debug, Clone, Parser)]
#[command(name = "cxresume", version, about = "Pick a recorded Codex session and resume it with its context")]
pub struct Args {
    /// Pass `.` to show only sessions recorded in the current directory
    #[arg(value_name = "FILTER")]
    pub filters: Vec<String>,

    /// Print the most recent session files and exit
    #[arg(long)]
    pub list: bool,

    /// Resume a specific session file
    #[arg(long, value_name = "FILE")]
    pub open: Option<PathBuf>,

    /// Directory holding the session logs
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Command used to start Codex
    #[arg(long, value_name = "CMD")]
    pub codex: Option<String>,

    /// Only offer sessions whose content contains TEXT
    #[arg(long, value_name = "TEXT")]
    pub search: Option<String>,

    /// Print the recent dialog before launching
    #[arg(long, overrides_with = "no_preview")]
    pub preview: bool,

    #[arg(long, overrides_with = "preview", hide = true)]
    pub no_preview: bool,

    /// Hide message kinds in the picker preview (tool, thinking, user, assistant, system)
    #[arg(long, value_name = "KIND", num_args = 0..)]
    pub hide: Option<Vec<HiddenKind>>,

    /// Accepted for compatibility; has no effect
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Print the primer instead of launching
    #[arg(long)]
    pub print: bool,

    /// Build the primer and copy it, but do not launch
    #[arg(long)]
    pub no_launch: bool,

    /// Verbose diagnostics on stderr
    #[arg(long)]
    pub debug: bool,
}

impl Args {
    /// Whether `.` was given.
    #[must_use]
    pub fn current_dir_only(&self) -> bool {
        self.filters.iter().any(|f| f == ".")
    }

    /// Positional values other than `.`.
    pub fn unknown_filters(&self) -> impl Iterator<Item = &str> {
        self.filters.iter().map(String::as_str).filter(|f| *f != ".")
    }

    /// Explicit preview choice, if any.
    #[must_use]
    pub const fn preview_override(&self) -> Option<bool> {
        if self.preview {
            Some(true)
        } else if self.no_preview {
            Some(false)
        } else {
            None
        }
    }

    /// Kinds to hide; a bare `--hide` hides tool and thinking output.
    #[must_use]
    pub fn hide_set(&self) -> HideSet {
        match &self.hide {
            None => HideSet::default(),
            Some(kinds) if kinds.is_empty() => HideSet::new(HiddenKind::DEFAULTS),
            Some(kinds) => HideSet::new(kinds.iter().copied()),
        }
    }
}
