//! Top-level command flow.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use cxresume_core::{
    Clipboard, LaunchContext, ParsedSession, PrimerSummary, SessionFile, build_primer, discover, parse_session,
    search,
};
use cxresume_delivery::{DeliveryPipeline, Notice, ShellLauncher, SystemClipboard};
use cxresume_picker::{PickerDecision, PickerOptions, PickerSession};
use cxresume_pty::NativePtyInjector;
use owo_colors::OwoColorize;

use crate::{
    args::Args,
    config::Config,
    output::{CONSOLE_PREVIEW_LIMIT, render_list, render_preview},
    tui::run_picker,
};

/// The target file was not found.
pub const EXIT_NOT_FOUND: i32 = 2;
/// The target file held no messages.
pub const EXIT_NO_MESSAGES: i32 = 3;

/// What to resume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Resume { path: PathBuf, extra_args: String },
    StartNew { working_dir: Option<PathBuf>, extra_args: String },
    Quit,
}

impl From<PickerDecision> for Target {
    fn from(decision: PickerDecision) -> Self {
        match decision {
            PickerDecision::Resume { path, extra_args } => Self::Resume { path, extra_args },
            PickerDecision::StartNew { working_dir, extra_args } => Self::StartNew { working_dir, extra_args },
            PickerDecision::Abort => Self::Quit,
        }
    }
}

/// Resolve `--open`: relative paths prefer an existing file under `root`.
#[must_use]
pub fn resolve_open_path(open: &Path, root: &Path) -> PathBuf {
    if open.is_relative() {
        let under_root = root.join(open);
        if under_root.exists() {
            return under_root;
        }
    }
    open.to_path_buf()
}

/// Identifier printed in the primer: the recorded id, else the path under `root`.
#[must_use]
pub fn primer_session_id(parsed: &ParsedSession, path: &Path, root: &Path) -> String {
    parsed.meta.session_id.clone().unwrap_or_else(|| {
        path.strip_prefix(root)
            .unwrap_or(path)
            .display()
            .to_string()
    })
}

/// Build the primer for a parsed session.
#[must_use]
pub fn primer_for(parsed: &ParsedSession, path: &Path, root: &Path, config: &Config) -> String {
    let session_id = primer_session_id(parsed, path, root);
    let summary = PrimerSummary {
        session_id: &session_id,
        start_time: parsed.meta.start_time,
        end_time: parsed.meta.end_time,
    };
    build_primer(&parsed.messages, &summary, config.primer_budget())
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn print_notice(notice: &Notice) {
    match notice {
        Notice::Launching => eprintln!("{}", notice.cyan()),
        Notice::PasteTip => eprintln!("{}", notice.dimmed()),
        _ => eprintln!("{}", notice.yellow()),
    }
}

fn pipeline(config: &Config, clipboard: Arc<dyn Clipboard>) -> DeliveryPipeline {
    DeliveryPipeline::new(
        clipboard,
        Arc::new(ShellLauncher::new()),
        Some(Arc::new(NativePtyInjector::new())),
        config.delivery_options(),
    )
    .with_notifier(print_notice)
}

async fn pick(files: Vec<SessionFile>, args: &Args, clipboard: Arc<dyn Clipboard>) -> anyhow::Result<Target> {
    let options = PickerOptions::new(clipboard).with_hide(args.hide_set());
    let mut session = PickerSession::new(files, options);
    let dir_filter = args.current_dir_only().then(current_dir);
    let decision = run_picker(&mut session, dir_filter)
        .await
        .context("Terminal UI failed")?;
    Ok(decision.into())
}

/// Run the command and return the process exit code.
///
/// # Errors
/// Returns error for failures that have no dedicated exit code.
pub async fn run(args: Args) -> anyhow::Result<i32> {
    for unknown in args.unknown_filters() {
        tracing::warn!(argument = unknown, "Ignoring unknown argument");
    }

    let config = Config::load().with_overrides(args.codex.clone(), args.root.clone());
    let root = config.resolve_logs_root();
    tracing::debug!(root = %root.display(), codex = %config.codex_cmd, inject = %config.inject, "Resolved settings");

    if args.list {
        print!("{}", render_list(&root, &discover(&root).await));
        return Ok(0);
    }

    let clipboard: Arc<dyn Clipboard> = Arc::new(SystemClipboard::new());

    let target = if let Some(query) = args.search.as_deref() {
        let hits = search(&root, query).await;
        if hits.is_empty() {
            println!("No matches for \"{query}\" under {}", root.display());
            return Ok(0);
        }
        let files = hits.into_iter().map(|hit| hit.file).collect();
        pick(files, &args, Arc::clone(&clipboard)).await?
    } else if let Some(open) = &args.open {
        Target::Resume {
            path: resolve_open_path(open, &root),
            extra_args: String::new(),
        }
    } else {
        let files = discover(&root).await;
        if files.is_empty() {
            print!("{}", render_list(&root, &files));
            return Ok(0);
        }
        pick(files, &args, Arc::clone(&clipboard)).await?
    };

    let (path, extra_args) = match target {
        Target::Quit => return Ok(0),
        Target::StartNew { working_dir, extra_args } => {
            let context = LaunchContext::new(working_dir.unwrap_or_else(current_dir)).with_extra_args(extra_args);
            let command = context.command(&config.codex_cmd);
            let code = pipeline(&config, clipboard)
                .launch_raw(&command, &context.working_dir)
                .await
                .context("Unable to start Codex")?;
            return Ok(code);
        }
        Target::Resume { path, extra_args } => (path, extra_args),
    };

    if !path.exists() {
        eprintln!("{} {}", "File not found:".red(), path.display());
        return Ok(EXIT_NOT_FOUND);
    }

    let parsed = match parse_session(&path).await {
        Ok(parsed) => parsed,
        Err(cxresume_core::Error::NotFound(missing)) => {
            eprintln!("{} {}", "File not found:".red(), missing.display());
            return Ok(EXIT_NOT_FOUND);
        }
        Err(e) => return Err(e.into()),
    };
    if parsed.messages.is_empty() {
        eprintln!("{}", "No messages could be parsed from the session.".red());
        return Ok(EXIT_NO_MESSAGES);
    }

    if args.preview_override().unwrap_or(config.preview) && !args.print {
        println!("{}", "Preview of recent dialog (auto-continue):".bold());
        print!(
            "{}",
            render_preview(&parsed.messages, CONSOLE_PREVIEW_LIMIT, args.search.as_deref())
        );
        println!();
    }

    let primer = primer_for(&parsed, &path, &root, &config);

    if args.print {
        print!("{primer}");
        return Ok(0);
    }

    if args.no_launch {
        match clipboard.copy(&primer) {
            Ok(()) => println!("Primer copied to the clipboard ({} chars). Not launching.", primer.chars().count()),
            Err(e) => println!("Not launching; clipboard unavailable ({e}). Use --print to see the primer."),
        }
        return Ok(0);
    }

    let context = LaunchContext::new(current_dir()).with_extra_args(extra_args);
    let command = context.command(&config.codex_cmd);
    match pipeline(&config, clipboard)
        .deliver(&primer, &command, &context.working_dir)
        .await
    {
        Ok(report) => {
            tracing::debug!(attempt = ?report.attempt, exit_code = report.exit_code, "Codex exited");
            Ok(report.exit_code)
        }
        Err(e) => {
            eprintln!("{} {e}", "Unable to launch Codex:".red());
            eprintln!("Run `{}` yourself and paste the primer from the clipboard.", config.codex_cmd);
            Ok(1)
        }
    }
}
