//! Recurring tasks
//!
//! A task tagged `rec:1w` comes back after it is completed. The successor is
//! the same line without the completion marker, created today, with its due
//! and start dates moved forward:
//!
//! - `rec:1w` (normal): the new due date is one week from today
//! - `rec:+1w` (strict): the new due date is one week after the old due date
//!
//! A start date keeps its distance to the due date. A recurring task without
//! any date gets a due date one interval from today.

use chrono::{Duration, NaiveDate};

use super::collection::PARENT_ID_TAG;
use super::date::{days_between, is_date_shaped, Interval};
use super::parser::priority_prefix_len;
use super::settings::Settings;
use super::task::Task;

/// Parsed `rec:` value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recurrence {
    pub interval: Interval,
    pub strict: bool,
}

impl Recurrence {
    /// Parses `[+]N[dwmyb]`; zero and negative intervals are rejected
    pub fn parse(value: &str) -> Option<Self> {
        let (strict, rest) = match value.strip_prefix('+') {
            Some(rest) => (true, rest),
            None => (false, value),
        };
        if rest.starts_with(['+', '-']) {
            return None;
        }
        let interval: Interval = rest.parse().ok()?;
        if interval.amount <= 0 {
            return None;
        }
        Some(Self { interval, strict })
    }
}

/// The recurrence of a task, if it carries a valid `rec:` tag
pub fn recurrence_of(task: &Task, settings: &Settings) -> Option<Recurrence> {
    task.tag_value(&settings.tags.recurrence)
        .and_then(Recurrence::parse)
}

/// Builds the successor of a recurring task completed on `today`
///
/// Returns `None` for tasks without a valid `rec:` tag. The successor does
/// not inherit the `id:` tag, so dependency ids stay unique; `p:` tags are
/// kept and the successor depends on the same parents.
pub fn advance(task: &Task, settings: &Settings, today: NaiveDate) -> Option<Task> {
    let recurrence = recurrence_of(task, settings)?;
    let interval = recurrence.interval;

    let old_due = task.due_date(settings);
    let old_start = task.start_date(settings);

    let mut next = Task::new(successor_line(task, today));
    next.remove_tag(PARENT_ID_TAG, None);

    match (old_due, old_start) {
        (Some(due), start) => {
            let base = if recurrence.strict { due } else { today };
            let new_due = interval.apply(base)?;
            next.set_tag(&settings.tags.due, &new_due.to_string());
            if let Some(start) = start {
                let offset = days_between(start, due);
                let new_start = new_due.checked_sub_signed(Duration::days(offset))?;
                next.set_tag(&settings.tags.start, &new_start.to_string());
            }
        }
        (None, Some(start)) => {
            let base = if recurrence.strict { start } else { today };
            let new_start = interval.apply(base)?;
            next.set_tag(&settings.tags.start, &new_start.to_string());
        }
        (None, None) => {
            let new_due = interval.apply(today)?;
            next.set_tag(&settings.tags.due, &new_due.to_string());
        }
    }

    log::debug!("recurrence: '{}' -> '{}'", task.source(), next.source());
    Some(next)
}

/// The line with completion marker and creation date replaced by `today`
fn successor_line(task: &Task, today: NaiveDate) -> String {
    let mut rest = task.source();
    if task.is_completed() {
        rest = rest.strip_prefix("x ").unwrap_or(rest);
        rest = skip_date(rest);
    }

    let mut priority = "";
    if let Some(len) = priority_prefix_len(rest) {
        priority = &rest[..len];
        rest = &rest[len..];
    }
    rest = skip_date(rest);

    if rest.is_empty() {
        format!("{}{}", priority, today)
    } else {
        format!("{}{} {}", priority, today, rest)
    }
}

fn skip_date(s: &str) -> &str {
    match s.get(..10) {
        Some(head) if is_date_shaped(head) => s[10..].trim_start(),
        _ => s,
    }
}
