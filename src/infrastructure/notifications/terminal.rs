use std::borrow::Cow;

use colored::Colorize;

use crate::domain::entities::alert::{Dispatch, DispatchReason};
use crate::domain::ports::notifier::{NotificationError, Notifier};
use crate::domain::value_objects::severity::Severity;

const SEPARATOR_WIDTH: usize = 70;

/// Prints dispatches to stdout.
pub struct TerminalNotifier;

impl TerminalNotifier {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for TerminalNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for TerminalNotifier {
    fn notify(&self, dispatch: &Dispatch) -> Result<(), NotificationError> {
        let separator = "\u{2500}".repeat(SEPARATOR_WIDTH);
        let event = &dispatch.event;

        println!("\n{}", separator.dimmed());
        println!(
            "{} {} {}",
            severity_badge(event.severity),
            reason_label(dispatch.reason),
            sanitize(&event.message).bold()
        );
        println!(
            "{}",
            format!(
                "{} | seen {}x since {} | {}",
                event.facet,
                event.occurrence_count,
                event.first_seen_at.format("%Y-%m-%d %H:%M:%S UTC"),
                event.fingerprint
            )
            .dimmed()
        );
        println!("{}", separator.dimmed());
        Ok(())
    }
}

/// Strip ANSI escape sequences and C0/C1 control characters from a string,
/// preserving only printable content, newlines, and tabs.
fn sanitize(s: &str) -> Cow<'_, str> {
    if s.bytes()
        .any(|b| matches!(b, 0x00..=0x08 | 0x0B..=0x0C | 0x0E..=0x1F | 0x7F))
    {
        Cow::Owned(
            s.chars()
                .filter(|&c| !matches!(c as u32, 0x00..=0x08 | 0x0B..=0x0C | 0x0E..=0x1F | 0x7F))
                .collect(),
        )
    } else {
        Cow::Borrowed(s)
    }
}

#[must_use]
fn severity_badge(severity: Severity) -> String {
    let label = format!(" {} {} ", severity.emoji(), severity);
    match severity {
        Severity::Critical => label.on_red().white().bold().to_string(),
        Severity::Warning => label.on_yellow().black().bold().to_string(),
    }
}

#[must_use]
fn reason_label(reason: DispatchReason) -> String {
    match reason {
        DispatchReason::New => "[new]".cyan().to_string(),
        DispatchReason::Escalated => "[escalated]".red().to_string(),
        DispatchReason::Reminder => "[reminder]".yellow().to_string(),
        DispatchReason::Resolved => "[resolved]".green().to_string(),
    }
}
