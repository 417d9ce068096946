//! Task filters
//!
//! A [`Filter`] decides per task whether it belongs in a view. Filters are
//! composable and never change the collection.
//!
//! | Filter | Matches |
//! |--------|---------|
//! | [`GrepFilter`] | substring of the line |
//! | [`NegationFilter`] | the inner filter does not match |
//! | [`AndFilter`] / [`OrFilter`] | all / any of the inner filters |
//! | [`DependencyFilter`] | no uncompleted descendants |
//! | [`RelevanceFilter`] | active and urgent enough to show |
//! | [`OrdinalTagFilter`] | `due:<today`, `size:>=3`, ... |
//! | [`PriorityFilter`] | `(A)`, `(<B)`, `(>=C)`, ... |
//! | [`HiddenTagFilter`] | no `h:1` tag |
//! | [`InstanceFilter`] | an explicit set of tasks |
//! | [`CompletedFilter`] | completed tasks |
//! | [`LimitFilter`] | the first N tasks |
//!
//! [`parse_expression`] turns a command-line word into one of these.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::NaiveDate;

use super::collection::TaskCollection;
use super::date::{parse_date, relative_date};
use super::id::TaskKey;
use super::parser::tag_parts;
use super::settings::Settings;
use super::task::Task;

pub trait Filter {
    /// True if the task belongs in the result
    fn matches(&self, list: &TaskCollection, key: TaskKey) -> bool;

    /// Keeps the matching keys, preserving order
    fn filter(&self, list: &TaskCollection, keys: &[TaskKey]) -> Vec<TaskKey> {
        keys.iter()
            .copied()
            .filter(|key| self.matches(list, *key))
            .collect()
    }
}

/// Substring match over the whole line
///
/// Case-insensitive unless the expression contains an uppercase letter.
#[derive(Debug, Clone)]
pub struct GrepFilter {
    expression: String,
    case_sensitive: bool,
}

impl GrepFilter {
    pub fn new(expression: &str) -> Self {
        let case_sensitive = expression.chars().any(char::is_uppercase);
        Self::with_case(expression, case_sensitive)
    }

    pub fn with_case(expression: &str, case_sensitive: bool) -> Self {
        let expression = if case_sensitive {
            expression.to_string()
        } else {
            expression.to_lowercase()
        };
        Self {
            expression,
            case_sensitive,
        }
    }

    pub fn matches_task(&self, task: &Task) -> bool {
        if self.case_sensitive {
            task.source().contains(&self.expression)
        } else {
            task.source().to_lowercase().contains(&self.expression)
        }
    }
}

impl Filter for GrepFilter {
    fn matches(&self, list: &TaskCollection, key: TaskKey) -> bool {
        list.get(key).is_some_and(|task| self.matches_task(task))
    }
}

pub struct NegationFilter(Box<dyn Filter>);

impl NegationFilter {
    pub fn new(inner: Box<dyn Filter>) -> Self {
        Self(inner)
    }
}

impl Filter for NegationFilter {
    fn matches(&self, list: &TaskCollection, key: TaskKey) -> bool {
        !self.0.matches(list, key)
    }
}

pub struct AndFilter(Vec<Box<dyn Filter>>);

impl AndFilter {
    pub fn new(filters: Vec<Box<dyn Filter>>) -> Self {
        Self(filters)
    }
}

impl Filter for AndFilter {
    fn matches(&self, list: &TaskCollection, key: TaskKey) -> bool {
        self.0.iter().all(|f| f.matches(list, key))
    }
}

pub struct OrFilter(Vec<Box<dyn Filter>>);

impl OrFilter {
    pub fn new(filters: Vec<Box<dyn Filter>>) -> Self {
        Self(filters)
    }
}

impl Filter for OrFilter {
    fn matches(&self, list: &TaskCollection, key: TaskKey) -> bool {
        self.0.iter().any(|f| f.matches(list, key))
    }
}

/// Tasks that are not blocked by an unfinished child
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyFilter;

impl Filter for DependencyFilter {
    fn matches(&self, list: &TaskCollection, key: TaskKey) -> bool {
        list.children(key, false)
            .into_iter()
            .filter_map(|child| list.get(child))
            .all(Task::is_completed)
    }
}

/// Tasks worth showing by default
///
/// Active, and either undated, unprioritized, priority A, priority B due
/// within 30 days, or priority C due within 14 days.
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    settings: Settings,
    today: NaiveDate,
}

impl RelevanceFilter {
    pub fn new(settings: &Settings, today: NaiveDate) -> Self {
        Self {
            settings: settings.clone(),
            today,
        }
    }

    pub fn matches_task(&self, task: &Task) -> bool {
        if !task.is_active(&self.settings, self.today) {
            return false;
        }
        if task.due_date(&self.settings).is_none() {
            return true;
        }
        let days = task.days_till_due(&self.settings, self.today);
        match task.priority() {
            None | Some('A') => true,
            Some('B') => days <= 30,
            Some('C') => days <= 14,
            Some(_) => false,
        }
    }
}

impl Filter for RelevanceFilter {
    fn matches(&self, list: &TaskCollection, key: TaskKey) -> bool {
        list.get(key).is_some_and(|task| self.matches_task(task))
    }
}

/// Comparison operator of ordinal and priority filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl Operator {
    /// Splits a leading operator off `s`; no operator means equality
    fn split(s: &str) -> (Self, &str) {
        for (prefix, op) in [
            ("<=", Self::LessEqual),
            (">=", Self::GreaterEqual),
            ("<", Self::Less),
            (">", Self::Greater),
            ("=", Self::Equal),
            ("!", Self::NotEqual),
        ] {
            if let Some(rest) = s.strip_prefix(prefix) {
                return (op, rest);
            }
        }
        (Self::Equal, s)
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Equal => ordering == Ordering::Equal,
            Self::NotEqual => ordering != Ordering::Equal,
            Self::Less => ordering == Ordering::Less,
            Self::LessEqual => ordering != Ordering::Greater,
            Self::Greater => ordering == Ordering::Greater,
            Self::GreaterEqual => ordering != Ordering::Less,
        }
    }
}

/// Compares a tag's first value against a reference value
///
/// Values are compared as numbers if both sides are numeric, as dates if
/// both sides are dates (the reference may be relative, e.g. `today`),
/// and otherwise as text: `=` and `!` test for a substring, the other
/// operators compare lexically.
#[derive(Debug, Clone)]
pub struct OrdinalTagFilter {
    key: String,
    operator: Operator,
    value: String,
    today: NaiveDate,
}

impl OrdinalTagFilter {
    /// Parses `key:value`, `key:<value`, `key:>=value`, ...
    pub fn parse(expression: &str, today: NaiveDate) -> Option<Self> {
        let (key, rest) = expression.split_once(':')?;
        let (operator, value) = Operator::split(rest);
        if key.is_empty() || value.is_empty() {
            return None;
        }
        Some(Self {
            key: key.to_string(),
            operator,
            value: value.to_string(),
            today,
        })
    }

    fn compare(&self, actual: &str) -> bool {
        if let (Some(a), Some(b)) = (parse_decimal(actual), parse_decimal(&self.value)) {
            return a.partial_cmp(&b).is_some_and(|o| self.operator.accepts(o));
        }
        if let (Some(a), Some(b)) = (parse_date(actual), relative_date(&self.value, self.today)) {
            return self.operator.accepts(a.cmp(&b));
        }
        match self.operator {
            Operator::Equal => actual.contains(&self.value),
            Operator::NotEqual => !actual.contains(&self.value),
            op => op.accepts(actual.cmp(&self.value)),
        }
    }
}

impl Filter for OrdinalTagFilter {
    fn matches(&self, list: &TaskCollection, key: TaskKey) -> bool {
        list.get(key)
            .and_then(|task| task.tag_value(&self.key))
            .is_some_and(|actual| self.compare(actual))
    }
}

/// Compares priorities; `A` is the highest and a missing priority the lowest
#[derive(Debug, Clone, Copy)]
pub struct PriorityFilter {
    operator: Operator,
    priority: char,
}

impl PriorityFilter {
    /// Parses `(A)`, `(<B)`, `(>=C)`, `(!A)`, ...
    pub fn parse(expression: &str) -> Option<Self> {
        let inner = expression.strip_prefix('(')?.strip_suffix(')')?;
        let (operator, rest) = Operator::split(inner);
        let mut chars = rest.chars();
        match (chars.next(), chars.next()) {
            (Some(p), None) if p.is_ascii_uppercase() => Some(Self {
                operator,
                priority: p,
            }),
            _ => None,
        }
    }
}

/// Parses plain decimal numbers (`12`, `-3`, `2.5`)
///
/// `inf`, `nan` and exponent forms are rejected so that such tag values
/// are compared as text.
pub fn parse_decimal(s: &str) -> Option<f64> {
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, "0"));
    let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !digits(whole) || !digits(fraction) {
        return None;
    }
    s.parse().ok()
}

/// `A` ranks highest, no priority ranks 0
pub fn priority_rank(priority: Option<char>) -> u32 {
    match priority {
        Some(p) if p.is_ascii_uppercase() => u32::from(b'Z' - p as u8) + 1,
        _ => 0,
    }
}

impl Filter for PriorityFilter {
    fn matches(&self, list: &TaskCollection, key: TaskKey) -> bool {
        list.get(key).is_some_and(|task| {
            let ordering = priority_rank(task.priority()).cmp(&priority_rank(Some(self.priority)));
            self.operator.accepts(ordering)
        })
    }
}

/// Hides tasks tagged `h:1`
#[derive(Debug, Clone)]
pub struct HiddenTagFilter {
    tag: String,
}

impl HiddenTagFilter {
    pub fn new(settings: &Settings) -> Self {
        Self {
            tag: settings.tags.hidden.clone(),
        }
    }
}

impl Filter for HiddenTagFilter {
    fn matches(&self, list: &TaskCollection, key: TaskKey) -> bool {
        list.get(key)
            .is_some_and(|task| !task.has_tag(&self.tag, Some("1")))
    }
}

/// Matches exactly the given tasks
#[derive(Debug, Clone, Default)]
pub struct InstanceFilter(HashSet<TaskKey>);

impl InstanceFilter {
    pub fn new(keys: impl IntoIterator<Item = TaskKey>) -> Self {
        Self(keys.into_iter().collect())
    }
}

impl Filter for InstanceFilter {
    fn matches(&self, _list: &TaskCollection, key: TaskKey) -> bool {
        self.0.contains(&key)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CompletedFilter;

impl Filter for CompletedFilter {
    fn matches(&self, list: &TaskCollection, key: TaskKey) -> bool {
        list.get(key).is_some_and(Task::is_completed)
    }
}

/// Keeps the first `limit` tasks
#[derive(Debug, Clone, Copy)]
pub struct LimitFilter(usize);

impl LimitFilter {
    pub fn new(limit: usize) -> Self {
        Self(limit)
    }
}

impl Filter for LimitFilter {
    fn matches(&self, _list: &TaskCollection, _key: TaskKey) -> bool {
        true
    }

    fn filter(&self, _list: &TaskCollection, keys: &[TaskKey]) -> Vec<TaskKey> {
        keys.iter().copied().take(self.0).collect()
    }
}

/// Turns one command-line word into a filter
///
/// | Word | Filter |
/// |------|--------|
/// | `-word` | negation of `word` |
/// | `(A)`, `(<B)` | [`PriorityFilter`] |
/// | `key:value`, `key:<value` | [`OrdinalTagFilter`] |
/// | anything else | [`GrepFilter`] |
pub fn parse_expression(word: &str, today: NaiveDate) -> Box<dyn Filter> {
    if let Some(inner) = word.strip_prefix('-').filter(|rest| !rest.is_empty()) {
        return Box::new(NegationFilter::new(parse_expression(inner, today)));
    }
    if let Some(filter) = PriorityFilter::parse(word) {
        return Box::new(filter);
    }
    if looks_like_tag_expression(word) {
        if let Some(filter) = OrdinalTagFilter::parse(word, today) {
            return Box::new(filter);
        }
    }
    Box::new(GrepFilter::new(word))
}

fn looks_like_tag_expression(word: &str) -> bool {
    match word.split_once(':') {
        Some((_, rest)) if rest.starts_with(['<', '>', '=', '!']) => true,
        _ => tag_parts(word).is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn list(lines: &[&str]) -> TaskCollection {
        TaskCollection::from_lines(lines.iter().copied(), Settings::default())
    }

    fn texts(list: &TaskCollection, filter: &dyn Filter) -> Vec<String> {
        filter
            .filter(list, &list.keys())
            .into_iter()
            .map(|k| list.get(k).unwrap().source().to_string())
            .collect()
    }

    #[test]
    fn grep_case_detection() {
        let list = list(&["Buy Milk", "buy bread"]);
        assert_eq!(texts(&list, &GrepFilter::new("buy")).len(), 2);
        assert_eq!(texts(&list, &GrepFilter::new("Buy")), vec!["Buy Milk"]);
        assert_eq!(texts(&list, &GrepFilter::with_case("BUY", false)).len(), 2);
    }

    #[test]
    fn negation_and_composition() {
        let list = list(&["a b", "a", "b", "c"]);
        let and = AndFilter::new(vec![Box::new(GrepFilter::new("a")), Box::new(GrepFilter::new("b"))]);
        assert_eq!(texts(&list, &and), vec!["a b"]);

        let or = OrFilter::new(vec![Box::new(GrepFilter::new("a")), Box::new(GrepFilter::new("c"))]);
        assert_eq!(texts(&list, &or), vec!["a b", "a", "c"]);

        let not = NegationFilter::new(Box::new(GrepFilter::new("a")));
        assert_eq!(texts(&list, &not), vec!["b", "c"]);
    }

    #[test]
    fn dependency_filter_hides_blocked_parents() {
        let list = list(&["Parent id:1", "Child p:1", "Other id:2", "x 2024-01-01 Done p:2"]);
        assert_eq!(
            texts(&list, &DependencyFilter),
            vec!["Child p:1", "Other id:2", "x 2024-01-01 Done p:2"]
        );
    }

    #[test]
    fn relevance_rules() {
        let today = d(2024, 5, 15);
        let filter = RelevanceFilter::new(&Settings::default(), today);
        let relevant = |line: &str| filter.matches_task(&Task::new(line));

        assert!(relevant("Plain"));
        assert!(relevant("(D) No due date"));
        assert!(relevant("Due far due:2025-01-01"));
        assert!(relevant("(A) Due far due:2025-01-01"));
        assert!(relevant("(B) Soon due:2024-06-14"));
        assert!(!relevant("(B) Later due:2024-06-15"));
        assert!(relevant("(C) Soon due:2024-05-29"));
        assert!(!relevant("(C) Later due:2024-05-30"));
        assert!(!relevant("(D) Due far due:2025-01-01"));
        assert!(!relevant("x 2024-05-01 Done"));
        assert!(!relevant("(A) Waiting t:2024-05-16"));
        assert!(relevant("(A) Started t:2024-05-15"));
    }

    #[test]
    fn ordinal_numeric_and_dates() {
        let today = d(2024, 5, 15);
        let list = list(&["a size:3", "b size:10", "c due:2024-05-14", "d due:2024-05-16", "e"]);

        let f = OrdinalTagFilter::parse("size:>=5", today).unwrap();
        assert_eq!(texts(&list, &f), vec!["b size:10"]);

        let f = OrdinalTagFilter::parse("size:3", today).unwrap();
        assert_eq!(texts(&list, &f), vec!["a size:3"]);

        let f = OrdinalTagFilter::parse("due:<today", today).unwrap();
        assert_eq!(texts(&list, &f), vec!["c due:2024-05-14"]);

        let f = OrdinalTagFilter::parse("due:>=2024-05-15", today).unwrap();
        assert_eq!(texts(&list, &f), vec!["d due:2024-05-16"]);
    }

    #[test]
    fn ordinal_text_fallback() {
        let today = d(2024, 5, 15);
        let list = list(&["a who:alice", "b who:bob"]);
        let f = OrdinalTagFilter::parse("who:ali", today).unwrap();
        assert_eq!(texts(&list, &f), vec!["a who:alice"]);
        let f = OrdinalTagFilter::parse("who:!ali", today).unwrap();
        assert_eq!(texts(&list, &f), vec!["b who:bob"]);
    }

    #[test]
    fn special_float_words_compare_as_text() {
        let today = d(2024, 5, 15);
        let list = list(&["a who:nan", "b size:5", "c size:inf"]);

        let f = OrdinalTagFilter::parse("who:nan", today).unwrap();
        assert_eq!(texts(&list, &f), vec!["a who:nan"]);

        // "5" > "1e3" as text, but not as a number
        let f = OrdinalTagFilter::parse("size:>1e3", today).unwrap();
        assert_eq!(texts(&list, &f), vec!["b size:5", "c size:inf"]);
    }

    #[test]
    fn decimal_parsing() {
        assert_eq!(parse_decimal("12"), Some(12.0));
        assert_eq!(parse_decimal("-3"), Some(-3.0));
        assert_eq!(parse_decimal("2.5"), Some(2.5));
        assert_eq!(parse_decimal("inf"), None);
        assert_eq!(parse_decimal("NaN"), None);
        assert_eq!(parse_decimal("1e3"), None);
        assert_eq!(parse_decimal("1."), None);
        assert_eq!(parse_decimal(".5"), None);
        assert_eq!(parse_decimal("-"), None);
        assert_eq!(parse_decimal("+5"), None);
    }

    #[test]
    fn priority_filter() {
        let list = list(&["(A) a", "(B) b", "(C) c", "none"]);
        let f = PriorityFilter::parse("(B)").unwrap();
        assert_eq!(texts(&list, &f), vec!["(B) b"]);
        let f = PriorityFilter::parse("(>B)").unwrap();
        assert_eq!(texts(&list, &f), vec!["(A) a"]);
        let f = PriorityFilter::parse("(<=B)").unwrap();
        assert_eq!(texts(&list, &f), vec!["(B) b", "(C) c", "none"]);
        assert!(PriorityFilter::parse("(b)").is_none());
        assert!(PriorityFilter::parse("(AB)").is_none());
    }

    #[test]
    fn hidden_instance_completed_and_limit() {
        let list = list(&["a h:1", "b h:0", "x 2024-01-01 c", "d"]);
        assert_eq!(
            texts(&list, &HiddenTagFilter::new(&Settings::default())),
            vec!["b h:0", "x 2024-01-01 c", "d"]
        );

        let keys = list.keys();
        assert_eq!(texts(&list, &InstanceFilter::new([keys[3], keys[0]])), vec!["a h:1", "d"]);
        assert_eq!(texts(&list, &CompletedFilter), vec!["x 2024-01-01 c"]);
        assert_eq!(texts(&list, &LimitFilter::new(2)), vec!["a h:1", "b h:0"]);
        assert_eq!(texts(&list, &LimitFilter::new(0)), Vec::<String>::new());
    }

    #[test]
    fn expression_parsing() {
        let today = d(2024, 5, 15);
        let list = list(&[
            "(A) Call +work due:2024-05-10",
            "Read https://example.com",
            "Meet at 10:30",
        ]);

        assert_eq!(texts(&list, &*parse_expression("+work", today)).len(), 1);
        assert_eq!(texts(&list, &*parse_expression("-+work", today)).len(), 2);
        assert_eq!(texts(&list, &*parse_expression("(A)", today)).len(), 1);
        assert_eq!(texts(&list, &*parse_expression("due:<today", today)).len(), 1);
        assert_eq!(texts(&list, &*parse_expression("https://example.com", today)).len(), 1);
        assert_eq!(texts(&list, &*parse_expression("10:30", today)).len(), 1);
        // a lone dash is a plain search
        assert_eq!(texts(&list, &*parse_expression("-", today)).len(), 1);
    }
}
