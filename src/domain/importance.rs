//! Importance scoring
//!
//! | Factor | Bonus |
//! |--------|-------|
//! | base | 2 |
//! | priority A / B / C | 3 / 2 / 1 |
//! | overdue | 6 |
//! | due today | 5 |
//! | due tomorrow | 3 |
//! | due in 2-6 days | 2 |
//! | due in 7-13 days | 1 |
//! | star tag | 1 |
//! | due next Monday, today Friday or weekend | 1 |
//!
//! Completed tasks always score 0.

use chrono::{Datelike, NaiveDate, Weekday};

use super::collection::TaskCollection;
use super::date::is_weekend;
use super::id::TaskKey;
use super::settings::Settings;
use super::task::Task;

const BASE: u32 = 2;

/// Urgency score of a single task
pub fn importance(task: &Task, settings: &Settings, today: NaiveDate) -> u32 {
    if task.is_completed() {
        return 0;
    }

    let mut score = BASE;
    score += match task.priority() {
        Some('A') => 3,
        Some('B') => 2,
        Some('C') => 1,
        _ => 0,
    };

    if let Some(due) = task.due_date(settings) {
        score += due_bonus(task.days_till_due(settings, today));
        if settings.ignore_weekends && due_next_monday(due, today) {
            score += 1;
        }
    }

    if task.has_tag(&settings.tags.star, None) {
        score += 1;
    }
    score
}

fn due_bonus(days: i64) -> u32 {
    match days {
        d if d < 0 => 6,
        0 => 5,
        1 => 3,
        2..=6 => 2,
        7..=13 => 1,
        _ => 0,
    }
}

/// The due date is the coming Monday and today is Friday or a weekend day
fn due_next_monday(due: NaiveDate, today: NaiveDate) -> bool {
    let friday_or_weekend = today.weekday() == Weekday::Fri || is_weekend(today.weekday());
    let days = (due - today).num_days();
    friday_or_weekend && due.weekday() == Weekday::Mon && (1..=3).contains(&days)
}

/// Mean importance of a task and all its ancestors, never below its own
pub fn average_importance(
    list: &TaskCollection,
    key: TaskKey,
    settings: &Settings,
    today: NaiveDate,
) -> f64 {
    let Some(task) = list.get(key) else {
        return 0.0;
    };
    let own = f64::from(importance(task, settings, today));

    let ancestors: Vec<f64> = list
        .parents(key, false)
        .into_iter()
        .filter_map(|parent| list.get(parent))
        .map(|parent| f64::from(importance(parent, settings, today)))
        .collect();

    let average = (own + ancestors.iter().sum::<f64>()) / (ancestors.len() as f64 + 1.0);
    average.max(own)
}
