//! Primer compression: full history to a bounded-size digest.
//!
//! Every message is kept. When the estimated size exceeds the target, the
//! per-message cap is scaled down once, linearly, and applied uniformly.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::{time::format_local, types::Message};

/// Estimated formatting overhead per entry (ordinal, role, timestamp).
pub const OVERHEAD_PER_MESSAGE: usize = 80;

/// Smallest cap the scaling step may produce.
pub const MIN_PER_MESSAGE: usize = 80;

const MIN_RATIO: f64 = 0.2;

const ELLIPSIS: char = '…';

const HEADER: &str = "System: Resume previous session context. Do not reply.\n\
Instructions:\n\
- Ingest the following compressed full history and update internal context only.\n\
- Do not send a message; wait for the user.";

/// Size knobs for [`build_primer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimerBudget {
    /// Cap on characters kept per message.
    pub per_message_max: usize,
    /// Approximate total size target.
    pub target_chars: usize,
}

impl Default for PrimerBudget {
    fn default() -> Self {
        Self {
            per_message_max: 400,
            target_chars: 10_000,
        }
    }
}

/// Session details printed in the primer summary.
#[derive(Debug, Clone, Copy)]
pub struct PrimerSummary<'a> {
    pub session_id: &'a str,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Collapse runs of whitespace to one space and trim.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Estimated primer body size when every message is capped at `per_message_max`.
#[must_use]
pub fn estimate(messages: &[Message], per_message_max: usize) -> usize {
    messages
        .iter()
        .map(|m| collapse_whitespace(&m.text).chars().count().min(per_message_max) + OVERHEAD_PER_MESSAGE)
        .sum()
}

/// Cap actually applied to each message.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn effective_cap(messages: &[Message], budget: PrimerBudget) -> usize {
    let est = estimate(messages, budget.per_message_max);
    if messages.is_empty() || est <= budget.target_chars {
        return budget.per_message_max;
    }
    let ratio = (budget.target_chars as f64 / est as f64).clamp(MIN_RATIO, 1.0);
    let scaled = (budget.per_message_max as f64 * ratio).floor() as usize;
    scaled.max(MIN_PER_MESSAGE).min(budget.per_message_max)
}

/// Collapse whitespace and truncate to `max` characters, ending in `…` when cut.
#[must_use]
pub fn truncate_text(text: &str, max: usize) -> String {
    let collapsed = collapse_whitespace(text);
    if collapsed.chars().count() <= max {
        return collapsed;
    }
    let mut out: String = collapsed.chars().take(max.saturating_sub(1)).collect();
    out.push(ELLIPSIS);
    out
}

/// Build the primer text.
///
/// Pure: identical inputs produce identical output.
#[must_use]
pub fn build_primer(messages: &[Message], summary: &PrimerSummary<'_>, budget: PrimerBudget) -> String {
    let cap = effective_cap(messages, budget);

    let entries = messages
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let mut head = format!("{}. [{}", i + 1, m.role.label());
            if let Some(ts) = &m.timestamp {
                let _ = write!(head, " @ {}", format_local(ts));
            }
            format!("{head}]\n{}", truncate_text(&m.text, cap))
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let range = |ts: Option<DateTime<Utc>>| ts.as_ref().map_or_else(|| "?".to_string(), format_local);
    let meta = format!(
        "Session: {}\nRange: {} -> {}\nMessages: {} (compressed all)",
        summary.session_id,
        range(summary.start_time),
        range(summary.end_time),
        messages.len()
    );

    let primer = format!("{HEADER}\n\n{meta}\n\nFull context (compressed, chronological):\n{entries}");
    format!("{}\n", primer.trim())
}
