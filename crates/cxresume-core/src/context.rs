//! Launch context shared by the picker and the delivery layer.

use std::{path::PathBuf, time::Duration};

/// Where and how to start the external program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchContext {
    /// Working directory for the spawned program.
    pub working_dir: PathBuf,

    /// Extra arguments typed in the picker's option editor, appended verbatim.
    pub extra_args: String,
}

impl LaunchContext {
    /// Create a context with no extra arguments.
    #[must_use]
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            extra_args: String::new(),
        }
    }

    /// Attach extra arguments.
    #[must_use]
    pub fn with_extra_args(mut self, extra_args: impl Into<String>) -> Self {
        self.extra_args = extra_args.into();
        self
    }

    /// The base command followed by the trimmed extra arguments, if any.
    #[must_use]
    pub fn command(&self, base: &str) -> String {
        let extra = self.extra_args.trim();
        if extra.is_empty() {
            base.to_string()
        } else {
            format!("{base} {extra}")
        }
    }
}

/// Timing of the pseudo-terminal write sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectTiming {
    /// Wait before the first write.
    pub initial_delay: Duration,
    /// Send a bare carriage return before the primer.
    pub wake_enter: bool,
    /// Wait after the wake keypress; never shorter than [`InjectTiming::MIN_WAKE_DELAY`].
    pub wake_delay: Duration,
}

impl InjectTiming {
    pub const MIN_WAKE_DELAY: Duration = Duration::from_millis(50);

    /// Gap between the primer and the final submitting carriage return.
    pub const SUBMIT_DELAY: Duration = Duration::from_millis(100);

    /// Wake delay with the floor applied.
    #[must_use]
    pub fn effective_wake_delay(&self) -> Duration {
        self.wake_delay.max(Self::MIN_WAKE_DELAY)
    }
}

impl Default for InjectTiming {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1000),
            wake_enter: false,
            wake_delay: Duration::from_millis(250),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_appends_trimmed_args() {
        let ctx = LaunchContext::new("/w").with_extra_args("  --model o3 ");
        assert_eq!(ctx.command("codex"), "codex --model o3");
        assert_eq!(LaunchContext::new("/w").command("codex"), "codex");
    }

    #[test]
    fn wake_delay_has_floor() {
        let timing = InjectTiming {
            wake_delay: Duration::from_millis(10),
            ..InjectTiming::default()
        };
        assert_eq!(timing.effective_wake_delay(), Duration::from_millis(50));
        assert_eq!(
            InjectTiming::default().effective_wake_delay(),
            Duration::from_millis(250)
        );
    }
}
