//! Task domain model
//!
//! A task is one todo.txt line. The raw source text is the source of truth;
//! the parsed fields are a cache that every mutation re-derives, so the two
//! can never drift apart.
//!
//! Mutations never fail. Input that would produce an invalid line (a bad
//! priority letter, a tag key with spaces, ...) is ignored and the method
//! reports `false` ("nothing changed").

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;

use super::date::{days_between, parse_date};
use super::parser::{self, classify, priority_prefix_len, tag_parts, ParsedFields, Token};
use super::settings::Settings;

/// A single todo.txt task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    source: String,
    fields: ParsedFields,
}

impl Task {
    /// Creates a task from a raw line
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into().trim().to_string();
        let fields = parser::parse(&source);
        Self { source, fields }
    }

    /// The raw todo.txt line
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The parsed fields
    pub fn fields(&self) -> &ParsedFields {
        &self.fields
    }

    /// Free text without projects, contexts or tags
    pub fn text(&self) -> &str {
        &self.fields.text
    }

    /// Free text with projects and contexts, without tags
    pub fn visible_text(&self) -> &str {
        &self.fields.visible_text
    }

    pub fn priority(&self) -> Option<char> {
        self.fields.priority
    }

    pub fn is_completed(&self) -> bool {
        self.fields.completed
    }

    pub fn creation_date(&self) -> Option<NaiveDate> {
        self.fields.creation_date
    }

    pub fn completion_date(&self) -> Option<NaiveDate> {
        self.fields.completion_date
    }

    pub fn projects(&self) -> &[String] {
        &self.fields.projects
    }

    pub fn contexts(&self) -> &[String] {
        &self.fields.contexts
    }

    pub fn tags(&self) -> &BTreeMap<String, Vec<String>> {
        &self.fields.tags
    }

    /// All values of a tag in order of occurrence
    pub fn tag_values(&self, key: &str) -> &[String] {
        self.fields.tags.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The first value of a tag
    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tag_values(key).first().map(String::as_str)
    }

    /// True if the tag is present, or present with the given value
    pub fn has_tag(&self, key: &str, value: Option<&str>) -> bool {
        match value {
            Some(value) => self.tag_values(key).iter().any(|v| v == value),
            None => !self.tag_values(key).is_empty(),
        }
    }

    /// Replaces the whole line
    pub fn set_source(&mut self, source: impl Into<String>) -> bool {
        let source = source.into().trim().to_string();
        if source == self.source {
            return false;
        }
        self.source = source;
        self.fields = parser::parse(&self.source);
        true
    }

    /// Sets a tag: replaces the first existing value in place, or appends `key:value`
    ///
    /// An empty value removes the tag entirely.
    pub fn set_tag(&mut self, key: &str, value: &str) -> bool {
        if value.is_empty() {
            return self.remove_tag(key, None);
        }
        match self.tag_value(key).map(str::to_string) {
            Some(old) => self.replace_tag(key, &old, value),
            None => self.add_tag(key, value),
        }
    }

    /// Appends `key:value` even if the key already has values
    ///
    /// Adding an exact duplicate is a no-op.
    pub fn add_tag(&mut self, key: &str, value: &str) -> bool {
        let Some(token) = tag_token(key, value) else {
            return false;
        };
        if self.has_tag(key, Some(value)) {
            return false;
        }
        let source = if self.source.is_empty() {
            token
        } else {
            format!("{} {}", self.source, token)
        };
        self.set_source(source)
    }

    /// Replaces the first `key:old` occurrence with `key:new`
    pub fn replace_tag(&mut self, key: &str, old: &str, new: &str) -> bool {
        if new.is_empty() {
            return self.remove_tag(key, Some(old));
        }
        if old == new {
            return false;
        }
        let Some(token) = tag_token(key, new) else {
            return false;
        };

        let mut replaced = false;
        let words: Vec<String> = self
            .source
            .split_whitespace()
            .map(|word| {
                if !replaced && is_tag(word, key, Some(old)) {
                    replaced = true;
                    token.clone()
                } else {
                    word.to_string()
                }
            })
            .collect();

        replaced && self.set_source(words.join(" "))
    }

    /// Removes every occurrence of a tag, or only those with the given value
    pub fn remove_tag(&mut self, key: &str, value: Option<&str>) -> bool {
        if !self.has_tag(key, value) {
            return false;
        }
        let words: Vec<&str> = self
            .source
            .split_whitespace()
            .filter(|word| !is_tag(word, key, value))
            .collect();
        let source = words.join(" ");
        self.set_source(source)
    }

    /// Sets or clears the `(X) ` priority marker
    ///
    /// Only `A`-`Z` are accepted, and completed tasks keep their state.
    pub fn set_priority(&mut self, priority: Option<char>) -> bool {
        if self.is_completed() || priority == self.priority() {
            return false;
        }
        if let Some(p) = priority {
            if !p.is_ascii_uppercase() {
                return false;
            }
        }
        let body = self.without_priority().to_string();
        let source = match priority {
            Some(p) => format!("({}) {}", p, body),
            None => body,
        };
        self.set_source(source)
    }

    /// Marks the task completed on `date`; the priority marker is dropped
    pub fn set_completed(&mut self, date: NaiveDate) -> bool {
        if self.is_completed() {
            return false;
        }
        let body = self.without_priority();
        let source = if body.is_empty() {
            format!("x {}", date)
        } else {
            format!("x {} {}", date, body)
        };
        self.set_source(source)
    }

    /// Inserts a creation date after the priority marker if the task has none
    pub fn set_creation_date(&mut self, date: NaiveDate) -> bool {
        if self.is_completed() || self.creation_date().is_some() {
            return false;
        }
        let body = self.without_priority();
        let dated = if body.is_empty() {
            date.to_string()
        } else {
            format!("{} {}", date, body)
        };
        let source = match self.priority() {
            Some(p) => format!("({}) {}", p, dated),
            None => dated,
        };
        self.set_source(source)
    }

    /// Appends free text to the end of the line
    pub fn append_text(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        let source = if self.source.is_empty() {
            text.to_string()
        } else {
            format!("{} {}", self.source, text)
        };
        self.set_source(source)
    }

    fn without_priority(&self) -> &str {
        match priority_prefix_len(&self.source) {
            Some(len) => &self.source[len..],
            None => &self.source,
        }
    }

    /// The first value of a tag, read as a date
    pub fn date_tag(&self, key: &str) -> Option<NaiveDate> {
        self.tag_value(key).and_then(parse_date)
    }

    pub fn due_date(&self, settings: &Settings) -> Option<NaiveDate> {
        self.date_tag(&settings.tags.due)
    }

    pub fn start_date(&self, settings: &Settings) -> Option<NaiveDate> {
        self.date_tag(&settings.tags.start)
    }

    /// Not completed and not waiting for a future start date
    pub fn is_active(&self, settings: &Settings, today: NaiveDate) -> bool {
        !self.is_completed() && self.start_date(settings).map_or(true, |start| start <= today)
    }

    pub fn is_overdue(&self, settings: &Settings, today: NaiveDate) -> bool {
        !self.is_completed() && self.due_date(settings).is_some_and(|due| due < today)
    }

    /// Days until the due date, 0 without one
    pub fn days_till_due(&self, settings: &Settings, today: NaiveDate) -> i64 {
        self.due_date(settings)
            .map(|due| days_between(today, due))
            .unwrap_or(0)
    }

    /// Days between the start (or creation) date and the due date
    pub fn length(&self, settings: &Settings) -> i64 {
        let start = self.start_date(settings).or(self.creation_date());
        match (start, self.due_date(settings)) {
            (Some(start), Some(due)) if start < due => days_between(start, due),
            _ => 0,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Builds `key:value`, or `None` if it would not read back as exactly that tag
fn tag_token(key: &str, value: &str) -> Option<String> {
    let token = format!("{}:{}", key, value);
    match classify(&token) {
        Token::Tag { key: k, value: v } if k == key && v == value => Some(token),
        _ => None,
    }
}

fn is_tag(word: &str, key: &str, value: Option<&str>) -> bool {
    match tag_parts(word) {
        Some((k, v)) => k == key && value.map_or(true, |value| v == value),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn assert_cache_matches_source(task: &Task) {
        assert_eq!(task.fields(), &parser::parse(task.source()));
    }

    #[test]
    fn remove_all_values_of_a_tag() {
        let mut task = Task::new("Foo due:2020-01-01 due:2020-01-02");
        assert!(task.remove_tag("due", None));
        assert_eq!(task.source(), "Foo");
        assert!(!task.has_tag("due", None));
    }

    #[test]
    fn remove_single_value() {
        let mut task = Task::new("Foo p:1 p:2 id:3");
        assert!(task.remove_tag("p", Some("2")));
        assert_eq!(task.source(), "Foo p:1 id:3");
        assert!(!task.remove_tag("p", Some("9")));
        assert_cache_matches_source(&task);
    }

    #[test]
    fn set_tag_appends_then_replaces() {
        let mut task = Task::new("(B) Foo +proj");
        assert!(task.set_tag("due", "2020-01-01"));
        assert_eq!(task.source(), "(B) Foo +proj due:2020-01-01");

        assert!(task.set_tag("due", "2020-02-01"));
        assert_eq!(task.source(), "(B) Foo +proj due:2020-02-01");
        assert_eq!(task.tag_values("due"), ["2020-02-01"]);

        assert!(!task.set_tag("due", "2020-02-01"));
        assert_cache_matches_source(&task);
    }

    #[test]
    fn set_tag_replaces_first_of_many() {
        let mut task = Task::new("Foo a:1 bar a:2");
        assert!(task.set_tag("a", "3"));
        assert_eq!(task.source(), "Foo a:3 bar a:2");
    }

    #[test]
    fn replace_explicit_value() {
        let mut task = Task::new("Foo a:1 bar a:2");
        assert!(task.replace_tag("a", "2", "5"));
        assert_eq!(task.source(), "Foo a:1 bar a:5");
        assert!(!task.replace_tag("a", "9", "6"));
    }

    #[test]
    fn empty_value_removes_tag() {
        let mut task = Task::new("Foo a:1");
        assert!(task.set_tag("a", ""));
        assert_eq!(task.source(), "Foo");
    }

    #[test]
    fn invalid_tags_are_ignored() {
        let mut task = Task::new("Foo");
        assert!(!task.set_tag("bad key", "1"));
        assert!(!task.set_tag("k", "two words"));
        assert!(!task.set_tag("3", "30"));
        assert!(!task.set_tag("", "x"));
        assert_eq!(task.source(), "Foo");
    }

    #[test]
    fn add_tag_keeps_existing_values() {
        let mut task = Task::new("Foo p:1");
        assert!(task.add_tag("p", "2"));
        assert!(!task.add_tag("p", "2"));
        assert_eq!(task.tag_values("p"), ["1", "2"]);
    }

    #[test]
    fn priority_changes() {
        let mut task = Task::new("2020-01-01 Foo");
        assert!(task.set_priority(Some('C')));
        assert_eq!(task.source(), "(C) 2020-01-01 Foo");
        assert!(task.set_priority(Some('A')));
        assert_eq!(task.source(), "(A) 2020-01-01 Foo");
        assert!(!task.set_priority(Some('a')));
        assert!(!task.set_priority(Some('1')));
        assert_eq!(task.priority(), Some('A'));
        assert!(task.set_priority(None));
        assert_eq!(task.source(), "2020-01-01 Foo");
        assert!(!task.set_priority(None));
    }

    #[test]
    fn completed_task_keeps_priority_state() {
        let mut task = Task::new("x 2020-01-01 Foo");
        assert!(!task.set_priority(Some('A')));
        assert_eq!(task.source(), "x 2020-01-01 Foo");
    }

    #[test]
    fn completion_drops_priority() {
        let mut task = Task::new("(A) 2020-01-01 Foo due:2020-02-01");
        assert!(task.set_completed(d(2020, 1, 10)));
        assert_eq!(task.source(), "x 2020-01-10 2020-01-01 Foo due:2020-02-01");
        assert!(task.is_completed());
        assert_eq!(task.completion_date(), Some(d(2020, 1, 10)));
        assert_eq!(task.creation_date(), Some(d(2020, 1, 1)));
        assert!(!task.set_completed(d(2020, 1, 11)));
    }

    #[test]
    fn creation_date_insertion() {
        let mut task = Task::new("(A) Foo");
        assert!(task.set_creation_date(d(2021, 3, 4)));
        assert_eq!(task.source(), "(A) 2021-03-04 Foo");
        assert!(!task.set_creation_date(d(2021, 3, 5)));
    }

    #[test]
    fn append_text() {
        let mut task = Task::new("Foo");
        assert!(task.append_text("bar +baz"));
        assert_eq!(task.source(), "Foo bar +baz");
        assert_eq!(task.projects(), ["baz"]);
        assert!(!task.append_text("  "));
    }

    #[test]
    fn activity_and_overdue() {
        let settings = Settings::default();
        let today = d(2021, 1, 10);

        let pending = Task::new("Foo t:2021-01-11");
        assert!(!pending.is_active(&settings, today));
        assert!(pending.is_active(&settings, d(2021, 1, 11)));

        let overdue = Task::new("Foo due:2021-01-09");
        assert!(overdue.is_overdue(&settings, today));
        assert_eq!(overdue.days_till_due(&settings, today), -1);

        let done = Task::new("x 2021-01-01 Foo due:2021-01-09");
        assert!(!done.is_overdue(&settings, today));
        assert!(!done.is_active(&settings, today));
    }

    #[test]
    fn malformed_due_is_absent() {
        let settings = Settings::default();
        let task = Task::new("Foo due:soon");
        assert_eq!(task.due_date(&settings), None);
        assert_eq!(task.days_till_due(&settings, d(2021, 1, 1)), 0);
    }

    #[test]
    fn length_uses_start_or_creation() {
        let settings = Settings::default();
        assert_eq!(Task::new("2021-01-01 Foo due:2021-01-11").length(&settings), 10);
        assert_eq!(Task::new("2021-01-01 Foo t:2021-01-05 due:2021-01-11").length(&settings), 6);
        assert_eq!(Task::new("2021-01-20 Foo due:2021-01-11").length(&settings), 0);
        assert_eq!(Task::new("Foo due:2021-01-11").length(&settings), 0);
    }

    #[test]
    fn custom_tag_names() {
        let mut settings = Settings::default();
        settings.tags.due = "deadline".to_string();
        let task = Task::new("Foo deadline:2021-02-02 due:2021-01-01");
        assert_eq!(task.due_date(&settings), Some(d(2021, 2, 2)));
    }
}
