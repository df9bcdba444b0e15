//! Staged-fallback primer delivery.
//!
//! A delivery is planned as an ordered list of [`Attempt`]s. Each attempt
//! either finishes the launch or asks for the next one, so every tier can be
//! exercised on its own with fake launchers.

use std::{path::Path, sync::Arc};

use cxresume_core::{Clipboard, InjectTiming, LaunchError, ProcessLauncher, PtyInjector};
use thiserror::Error;

use crate::{
    command::{CommandBuildError, CommandBuilder},
    strategy::InjectStrategy,
};

/// Delivery error.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Launch(#[from] LaunchError),
    #[error(transparent)]
    Command(#[from] CommandBuildError),
    #[error("No delivery method could start the program")]
    Exhausted,
}

/// One delivery tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// Primer passed as a quoted argument.
    Inline,
    /// Primer typed into a pseudo-terminal.
    Pty,
    /// Program started bare; the user pastes the primer.
    Plain,
}

#[derive(Debug)]
enum Outcome {
    Done(i32),
    NeedsFallback,
}

/// User-facing progress messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Launching,
    /// The primer is on the clipboard and must be pasted by hand.
    PasteTip,
    ClipboardFailed(String),
    InlineTooLong { len: usize, limit: usize },
    PtyUnavailable(String),
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Launching => f.write_str("Launching..."),
            Self::PasteTip => f.write_str(
                "Tip: once inside, paste (Cmd/Ctrl+V) then press Enter to silently ingest the context.",
            ),
            Self::ClipboardFailed(e) => write!(f, "Could not copy the primer to the clipboard: {e}"),
            Self::InlineTooLong { len, limit } => write!(
                f,
                "Inline argument length ({len}) exceeds limit ({limit}), falling back to injection"
            ),
            Self::PtyUnavailable(e) => write!(f, "Pseudo-terminal unavailable ({e}), falling back to clipboard mode"),
        }
    }
}

type Notifier = Box<dyn Fn(&Notice) + Send + Sync>;

/// Delivery knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryOptions {
    pub strategy: InjectStrategy,
    /// Maximum primer length for inline delivery; 0 means unlimited.
    pub inline_limit: usize,
    pub timing: InjectTiming,
}

/// Result of a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    /// The tier that launched the program.
    pub attempt: Attempt,
    pub exit_code: i32,
    /// Whether the primer reached the clipboard.
    pub clipboard_ok: bool,
}

/// Launches the agent program and hands it the primer.
pub struct DeliveryPipeline {
    clipboard: Arc<dyn Clipboard>,
    launcher: Arc<dyn ProcessLauncher>,
    pty: Option<Arc<dyn PtyInjector>>,
    options: DeliveryOptions,
    notify: Notifier,
}

impl DeliveryPipeline {
    /// Create a pipeline. Pass `None` for `pty` where no pseudo-terminal support exists.
    #[must_use]
    pub fn new(
        clipboard: Arc<dyn Clipboard>,
        launcher: Arc<dyn ProcessLauncher>,
        pty: Option<Arc<dyn PtyInjector>>,
        options: DeliveryOptions,
    ) -> Self {
        Self {
            clipboard,
            launcher,
            pty,
            options,
            notify: Box::new(|notice| tracing::info!(%notice, "Delivery")),
        }
    }

    /// Route progress messages to `notify` instead of the log.
    #[must_use]
    pub fn with_notifier(mut self, notify: impl Fn(&Notice) + Send + Sync + 'static) -> Self {
        self.notify = Box::new(notify);
        self
    }

    /// Ordered tiers for `primer` under the configured strategy.
    #[must_use]
    pub fn plan(&self, primer: &str) -> Vec<Attempt> {
        let strategy = self.options.strategy;
        if strategy == InjectStrategy::Inline && !self.exceeds_inline_limit(primer) {
            return vec![Attempt::Inline];
        }
        if !strategy.is_manual() && self.pty.is_some() {
            vec![Attempt::Pty, Attempt::Plain]
        } else {
            vec![Attempt::Plain]
        }
    }

    fn exceeds_inline_limit(&self, primer: &str) -> bool {
        let limit = self.options.inline_limit;
        limit > 0 && primer.chars().count() > limit
    }

    /// Launch `command` in `working_dir` and deliver `primer` to it.
    ///
    /// The primer is copied to the clipboard first whatever the strategy, so
    /// it can be pasted by hand if injection misbehaves.
    ///
    /// # Errors
    /// Returns [`DeliveryError::Launch`] when the program cannot be started and
    /// [`DeliveryError::Command`] when the command line cannot be built.
    pub async fn deliver(&self, primer: &str, command: &str, working_dir: &Path) -> Result<DeliveryReport, DeliveryError> {
        let clipboard_ok = match self.clipboard.copy(primer) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Clipboard copy failed");
                (self.notify)(&Notice::ClipboardFailed(e.to_string()));
                false
            }
        };

        let builder = CommandBuilder::new(command);
        builder.validate()?;
        warn_if_unresolved(&builder).await;
        (self.notify)(&Notice::Launching);

        let plan = self.plan(primer);
        tracing::debug!(strategy = %self.options.strategy, ?plan, "Delivery plan");

        if self.options.strategy == InjectStrategy::Inline && plan.first() != Some(&Attempt::Inline) {
            (self.notify)(&Notice::InlineTooLong {
                len: primer.chars().count(),
                limit: self.options.inline_limit,
            });
        }

        for attempt in plan {
            let outcome = self
                .run_attempt(attempt, &builder, primer, working_dir, clipboard_ok)
                .await?;
            match outcome {
                Outcome::Done(exit_code) => {
                    return Ok(DeliveryReport {
                        attempt,
                        exit_code,
                        clipboard_ok,
                    });
                }
                Outcome::NeedsFallback => {
                    tracing::debug!(?attempt, "Delivery tier needs fallback");
                }
            }
        }
        Err(DeliveryError::Exhausted)
    }

    /// Start the program without a primer.
    ///
    /// # Errors
    /// Returns [`DeliveryError::Launch`] when the program cannot be started.
    pub async fn launch_raw(&self, command: &str, working_dir: &Path) -> Result<i32, DeliveryError> {
        let builder = CommandBuilder::new(command);
        builder.validate()?;
        warn_if_unresolved(&builder).await;
        (self.notify)(&Notice::Launching);
        Ok(self.launcher.run(&builder.build_plain(), working_dir).await?)
    }

    async fn run_attempt(
        &self,
        attempt: Attempt,
        builder: &CommandBuilder,
        primer: &str,
        working_dir: &Path,
        clipboard_ok: bool,
    ) -> Result<Outcome, DeliveryError> {
        match attempt {
            Attempt::Inline => {
                let line = builder.build_inline(primer)?;
                Ok(Outcome::Done(self.launcher.run(&line, working_dir).await?))
            }
            Attempt::Pty => {
                let Some(pty) = &self.pty else {
                    return Ok(Outcome::NeedsFallback);
                };
                match pty
                    .run_injected(&builder.build_plain(), working_dir, primer, &self.options.timing)
                    .await
                {
                    Ok(code) => Ok(Outcome::Done(code)),
                    Err(LaunchError::PtyUnavailable(reason)) => {
                        tracing::warn!(%reason, "Pty unavailable");
                        (self.notify)(&Notice::PtyUnavailable(reason));
                        Ok(Outcome::NeedsFallback)
                    }
                    Err(e) => Err(e.into()),
                }
            }
            Attempt::Plain => {
                if clipboard_ok {
                    (self.notify)(&Notice::PasteTip);
                }
                Ok(Outcome::Done(self.launcher.run(&builder.build_plain(), working_dir).await?))
            }
        }
    }
}

async fn warn_if_unresolved(builder: &CommandBuilder) {
    // Shell aliases and functions do not resolve; the spawn may still work.
    if let Err(e) = builder.resolve_program().await {
        tracing::warn!(error = %e, "Launch program not found on PATH");
    }
}
