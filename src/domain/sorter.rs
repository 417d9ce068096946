//! Multi-key task sorting
//!
//! A sort expression is a comma-separated list of `[asc:|desc:]field`
//! clauses, e.g. `desc:importance,due,desc:priority`. Clauses are applied
//! as stable sorts from last to first, so the first clause dominates and
//! later clauses break its ties.
//!
//! | Field | Sorts by |
//! |-------|----------|
//! | `priority` | priority letter, missing lowest |
//! | `creation`, `created` | creation date |
//! | `completion`, `done` | completion date |
//! | `text` | free text, case-insensitive |
//! | `project`, `projects` | project names |
//! | `context`, `contexts` | context names |
//! | `length` | days from start to due |
//! | `importance` | importance score |
//! | `importance-avg` | importance averaged over ancestors |
//! | `line` | position in the file |
//! | `completed` | open tasks first |
//! | anything else | that tag's first value |
//!
//! Missing values sort last in ascending order.

use std::cmp::Ordering;

use chrono::NaiveDate;

use super::collection::TaskCollection;
use super::date::parse_date;
use super::filter::{parse_decimal, priority_rank};
use super::id::TaskKey;
use super::importance::{average_importance, importance};
use super::settings::Settings;
#[cfg(test)]
use super::task::Task;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortField {
    Priority,
    Creation,
    Completion,
    Text,
    Projects,
    Contexts,
    Length,
    Importance,
    ImportanceAverage,
    Line,
    Completed,
    Tag(String),
}

impl SortField {
    fn from_name(name: &str) -> Self {
        match name {
            "priority" => Self::Priority,
            "creation" | "created" => Self::Creation,
            "completion" | "done" => Self::Completion,
            "text" => Self::Text,
            "project" | "projects" => Self::Projects,
            "context" | "contexts" => Self::Contexts,
            "length" => Self::Length,
            "importance" => Self::Importance,
            "importance-avg" => Self::ImportanceAverage,
            "line" => Self::Line,
            "completed" => Self::Completed,
            tag => Self::Tag(tag.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortClause {
    pub field: SortField,
    pub descending: bool,
}

/// Value a task is sorted by for one clause
#[derive(Debug, Clone, PartialEq)]
enum SortValue {
    Number(f64),
    Date(NaiveDate),
    Text(String),
    Missing,
}

impl SortValue {
    fn from_tag(value: Option<&str>) -> Self {
        match value {
            None => Self::Missing,
            Some(v) => {
                if let Some(n) = parse_decimal(v) {
                    Self::Number(n)
                } else if let Some(date) = parse_date(v) {
                    Self::Date(date)
                } else {
                    Self::Text(v.to_lowercase())
                }
            }
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Number(_) => 0,
            Self::Date(_) => 1,
            Self::Text(_) => 2,
            Self::Missing => 3,
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Stable multi-pass sorter
#[derive(Debug, Clone)]
pub struct Sorter {
    clauses: Vec<SortClause>,
    settings: Settings,
    today: NaiveDate,
}

impl Sorter {
    /// Parses a sort expression; an empty expression keeps list order
    pub fn parse(expression: &str, settings: &Settings, today: NaiveDate) -> Self {
        let clauses = expression
            .split(',')
            .map(str::trim)
            .filter(|clause| !clause.is_empty())
            .map(|clause| {
                let (descending, name) = if let Some(name) = clause.strip_prefix("desc:") {
                    (true, name)
                } else if let Some(name) = clause.strip_prefix("asc:") {
                    (false, name)
                } else {
                    (false, clause)
                };
                SortClause {
                    field: SortField::from_name(&name.to_lowercase()),
                    descending,
                }
            })
            .collect();

        Self {
            clauses,
            settings: settings.clone(),
            today,
        }
    }

    pub fn clauses(&self) -> &[SortClause] {
        &self.clauses
    }

    /// Sorts keys; ties keep their incoming order
    pub fn sort(&self, list: &TaskCollection, keys: &[TaskKey]) -> Vec<TaskKey> {
        let mut sorted = keys.to_vec();
        for clause in self.clauses.iter().rev() {
            let mut keyed: Vec<(SortValue, TaskKey)> = sorted
                .iter()
                .map(|key| (self.value(list, *key, &clause.field), *key))
                .collect();
            keyed.sort_by(|(a, _), (b, _)| {
                let ordering = a.compare(b);
                if clause.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
            sorted = keyed.into_iter().map(|(_, key)| key).collect();
        }
        sorted
    }

    fn value(&self, list: &TaskCollection, key: TaskKey, field: &SortField) -> SortValue {
        let Some(task) = list.get(key) else {
            return SortValue::Missing;
        };
        let settings = &self.settings;
        match field {
            SortField::Priority => SortValue::Number(f64::from(priority_rank(task.priority()))),
            SortField::Creation => date_value(task.creation_date()),
            SortField::Completion => date_value(task.completion_date()),
            SortField::Text => SortValue::Text(task.text().to_lowercase()),
            SortField::Projects => joined(task.projects()),
            SortField::Contexts => joined(task.contexts()),
            SortField::Length => SortValue::Number(task.length(settings) as f64),
            SortField::Importance => {
                SortValue::Number(f64::from(importance(task, settings, self.today)))
            }
            SortField::ImportanceAverage => {
                SortValue::Number(average_importance(list, key, settings, self.today))
            }
            SortField::Line => match list.number(key) {
                Some(n) => SortValue::Number(n as f64),
                None => SortValue::Missing,
            },
            SortField::Completed => SortValue::Number(if task.is_completed() { 1.0 } else { 0.0 }),
            SortField::Tag(name) => SortValue::from_tag(task.tag_value(name)),
        }
    }
}

fn date_value(date: Option<NaiveDate>) -> SortValue {
    date.map_or(SortValue::Missing, SortValue::Date)
}

fn joined(names: &[String]) -> SortValue {
    if names.is_empty() {
        return SortValue::Missing;
    }
    let mut names: Vec<String> = names.iter().map(|n| n.to_lowercase()).collect();
    names.sort();
    SortValue::Text(names.join(","))
}

/// Sorts a single task list by an expression; convenience for one-off use
pub fn sort_tasks(
    list: &TaskCollection,
    expression: &str,
    settings: &Settings,
    today: NaiveDate,
) -> Vec<TaskKey> {
    Sorter::parse(expression, settings, today).sort(list, &list.keys())
}
