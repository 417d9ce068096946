//! todo.txt line parser
//!
//! Turns one raw line into [`ParsedFields`]. Parsing is total: malformed
//! dates or priorities degrade to "absent" and never produce an error.
//!
//! Token precedence after the header is fixed:
//!
//! 1. `key:value` tags (not kept in any text)
//! 2. `+project` and `@context` (kept in [`ParsedFields::visible_text`])
//! 3. plain words
//!
//! A token shaped like a clock time (`3:30`, `12:05`) is never a tag.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::date::{is_date_shaped, parse_date};

/// Structured fields of a todo.txt line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedFields {
    pub completed: bool,
    pub completion_date: Option<NaiveDate>,
    pub priority: Option<char>,
    pub creation_date: Option<NaiveDate>,
    /// Free text without tags, projects or contexts
    pub text: String,
    /// Free text without tags, projects and contexts left in place
    pub visible_text: String,
    pub projects: Vec<String>,
    pub contexts: Vec<String>,
    /// Tag values per key, in order of occurrence
    pub tags: BTreeMap<String, Vec<String>>,
}

/// Classification of one whitespace-separated token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    Tag { key: &'a str, value: &'a str },
    Project(&'a str),
    Context(&'a str),
    Word,
}

/// Parses one todo.txt line
pub fn parse(line: &str) -> ParsedFields {
    let mut fields = ParsedFields::default();
    let rest = parse_header(line.trim(), &mut fields);

    let mut text = Vec::new();
    let mut visible = Vec::new();

    for word in rest.split_whitespace() {
        match classify(word) {
            Token::Tag { key, value } => {
                fields
                    .tags
                    .entry(key.to_string())
                    .or_default()
                    .push(value.to_string());
            }
            Token::Project(name) => {
                fields.projects.push(name.to_string());
                visible.push(word);
            }
            Token::Context(name) => {
                fields.contexts.push(name.to_string());
                visible.push(word);
            }
            Token::Word => {
                text.push(word);
                visible.push(word);
            }
        }
    }

    fields.text = text.join(" ");
    fields.visible_text = visible.join(" ");
    fields
}

/// Consumes the completion or priority/creation header and returns the rest
fn parse_header<'a>(line: &'a str, fields: &mut ParsedFields) -> &'a str {
    if let Some(after_x) = line.strip_prefix("x ") {
        if let Some((completion, rest)) = take_date(after_x) {
            fields.completed = true;
            fields.completion_date = parse_date(completion);
            if let Some((creation, rest)) = take_date(rest) {
                fields.creation_date = parse_date(creation);
                return rest;
            }
            return rest;
        }
    }

    let mut rest = line;
    if let Some(len) = priority_prefix_len(rest) {
        fields.priority = rest[1..2].chars().next();
        rest = &rest[len..];
    }
    if let Some((creation, after)) = take_date(rest) {
        fields.creation_date = parse_date(creation);
        rest = after;
    }
    rest
}

/// Splits a leading `YYYY-MM-DD` token followed by a space (or the end of input)
fn take_date(s: &str) -> Option<(&str, &str)> {
    let candidate = s.get(..10)?;
    if !is_date_shaped(candidate) {
        return None;
    }
    match s.get(10..) {
        Some("") => Some((candidate, "")),
        Some(tail) => tail.strip_prefix(' ').map(|rest| (candidate, rest)),
        None => None,
    }
}

/// Length of a leading `(X) ` priority marker, if present
pub(crate) fn priority_prefix_len(s: &str) -> Option<usize> {
    let b = s.as_bytes();
    if b.len() >= 4 && b[0] == b'(' && b[1].is_ascii_uppercase() && b[2] == b')' && b[3] == b' ' {
        Some(4)
    } else {
        None
    }
}

/// Classifies a single token
pub(crate) fn classify(word: &str) -> Token<'_> {
    if let Some((key, value)) = tag_parts(word) {
        return Token::Tag { key, value };
    }
    if let Some(name) = word.strip_prefix('+').and_then(word_name) {
        return Token::Project(name);
    }
    if let Some(name) = word.strip_prefix('@').and_then(word_name) {
        return Token::Context(name);
    }
    Token::Word
}

/// Splits a `key:value` token, rejecting clock times and URLs
pub(crate) fn tag_parts(word: &str) -> Option<(&str, &str)> {
    let (key, value) = word.split_once(':')?;
    if key.is_empty() || value.is_empty() || value.starts_with("//") || is_clock_time(word) {
        return None;
    }
    Some((key, value))
}

/// `H:M`, `HH:MM` and friends: one or two digits on each side of a single colon
fn is_clock_time(word: &str) -> bool {
    let short_digits = |s: &str| (1..=2).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit());
    match word.split_once(':') {
        Some((h, m)) => short_digits(h) && short_digits(m),
        None => false,
    }
}

/// Project/context name: trailing non-word characters are not part of it
fn word_name(s: &str) -> Option<&str> {
    let name = s.trim_end_matches(|c: char| !(c.is_alphanumeric() || c == '_'));
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn full_line() {
        let fields = parse("(A) 2020-01-01 Call mom +family @phone due:2020-01-05");

        assert!(!fields.completed);
        assert_eq!(fields.priority, Some('A'));
        assert_eq!(fields.creation_date, Some(d(2020, 1, 1)));
        assert_eq!(fields.projects, vec!["family"]);
        assert_eq!(fields.contexts, vec!["phone"]);
        assert_eq!(fields.tags.get("due"), Some(&vec!["2020-01-05".to_string()]));
        assert_eq!(fields.tags.len(), 1);
        assert_eq!(fields.text, "Call mom");
        assert_eq!(fields.visible_text, "Call mom +family @phone");
    }

    #[test]
    fn empty_and_blank_lines() {
        assert_eq!(parse(""), ParsedFields::default());
        assert_eq!(parse("   \t "), ParsedFields::default());
    }

    #[test]
    fn completed_header() {
        let fields = parse("x 2020-02-02 2020-01-01 Done thing");
        assert!(fields.completed);
        assert_eq!(fields.completion_date, Some(d(2020, 2, 2)));
        assert_eq!(fields.creation_date, Some(d(2020, 1, 1)));
        assert_eq!(fields.text, "Done thing");

        let fields = parse("x 2020-02-02 Done");
        assert!(fields.completed);
        assert_eq!(fields.creation_date, None);
    }

    #[test]
    fn completed_header_with_malformed_date() {
        let fields = parse("x 2020-13-45 Odd");
        assert!(fields.completed);
        assert_eq!(fields.completion_date, None);
        assert_eq!(fields.text, "Odd");
    }

    #[test]
    fn x_without_date_is_plain_text() {
        let fields = parse("x marks the spot");
        assert!(!fields.completed);
        assert_eq!(fields.text, "x marks the spot");

        let fields = parse("X 2020-01-01 upper case");
        assert!(!fields.completed);
    }

    #[test]
    fn priority_requires_trailing_space() {
        assert_eq!(parse("(A) foo").priority, Some('A'));
        assert_eq!(parse("(a) foo").priority, None);
        assert_eq!(parse("(A)foo").priority, None);
        assert_eq!(parse("foo (A) bar").priority, None);
    }

    #[test]
    fn repeated_tags_keep_order() {
        let fields = parse("Foo due:2020-01-02 x:1 due:2020-01-01");
        assert_eq!(
            fields.tags.get("due"),
            Some(&vec!["2020-01-02".to_string(), "2020-01-01".to_string()])
        );
        assert_eq!(fields.text, "Foo");
    }

    #[test]
    fn clock_times_are_not_tags() {
        let fields = parse("Meeting at 3:30 with bob 12:05");
        assert!(fields.tags.is_empty());
        assert_eq!(fields.text, "Meeting at 3:30 with bob 12:05");
    }

    #[test]
    fn clock_time_with_suffix_is_a_tag() {
        // Only the bare H:M shape is protected; anything longer reads as key:value.
        let fields = parse("Call 10:30am");
        assert_eq!(fields.tags.get("10"), Some(&vec!["30am".to_string()]));
    }

    #[test]
    fn urls_are_not_tags() {
        let fields = parse("Read https://example.com/a");
        assert!(fields.tags.is_empty());
        assert_eq!(fields.text, "Read https://example.com/a");
    }

    #[test]
    fn degenerate_colons() {
        let fields = parse("a: :b :");
        assert!(fields.tags.is_empty());
        assert_eq!(fields.text, "a: :b :");
    }

    #[test]
    fn project_punctuation_and_bare_prefixes() {
        let fields = parse("Fix +web. and + then @home!");
        assert_eq!(fields.projects, vec!["web"]);
        assert_eq!(fields.contexts, vec!["home"]);
        assert_eq!(fields.text, "Fix and + then");
        assert_eq!(fields.visible_text, "Fix +web. and + then @home!");
    }

    #[test]
    fn tags_take_precedence_over_projects() {
        let fields = parse("Foo +a:b");
        assert!(fields.projects.is_empty());
        assert_eq!(fields.tags.get("+a"), Some(&vec!["b".to_string()]));
    }

    #[test]
    fn creation_date_without_priority() {
        let fields = parse("2021-05-06 Plain");
        assert_eq!(fields.creation_date, Some(d(2021, 5, 6)));
        assert_eq!(fields.priority, None);
        assert_eq!(fields.text, "Plain");
    }

    #[test]
    fn header_only_line() {
        let fields = parse("(B) 2021-05-06");
        assert_eq!(fields.priority, Some('B'));
        assert_eq!(fields.creation_date, Some(d(2021, 5, 6)));
        assert_eq!(fields.text, "");
    }
}
