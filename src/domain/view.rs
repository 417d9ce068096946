//! Read-only projections of a collection

use super::collection::TaskCollection;
use super::filter::Filter;
use super::id::TaskKey;
use super::sorter::Sorter;
use super::task::Task;

/// A sorted and filtered snapshot of a collection
///
/// Nothing is cached: every call to [`View::tasks`] recomputes the result
/// from the current collection.
pub struct View<'a> {
    sorter: Sorter,
    filters: Vec<Box<dyn Filter>>,
    list: &'a TaskCollection,
}

impl<'a> View<'a> {
    pub fn new(sorter: Sorter, filters: Vec<Box<dyn Filter>>, list: &'a TaskCollection) -> Self {
        Self {
            sorter,
            filters,
            list,
        }
    }

    /// Keys in view order: sorted first, then narrowed by each filter in turn
    pub fn tasks(&self) -> Vec<TaskKey> {
        let sorted = self.sorter.sort(self.list, &self.list.keys());
        self.filters
            .iter()
            .fold(sorted, |keys, filter| filter.filter(self.list, &keys))
    }

    /// Tasks in view order
    pub fn entries(&self) -> Vec<(TaskKey, &'a Task)> {
        self.tasks()
            .into_iter()
            .filter_map(|key| self.list.get(key).map(|task| (key, task)))
            .collect()
    }

    pub fn list(&self) -> &'a TaskCollection {
        self.list
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::filter::{GrepFilter, LimitFilter};
    use crate::domain::settings::Settings;

    #[test]
    fn sorts_then_filters() {
        let list = TaskCollection::from_lines(
            ["(C) work c", "(A) home a", "(B) work b", "(A) work a"],
            Settings::default(),
        );
        let today = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
        let sorter = Sorter::parse("desc:priority", &Settings::default(), today);
        let view = View::new(
            sorter,
            vec![Box::new(GrepFilter::new("work")), Box::new(LimitFilter::new(2))],
            &list,
        );

        let sources: Vec<&str> = view.entries().into_iter().map(|(_, t)| t.source()).collect();
        assert_eq!(sources, vec!["(A) work a", "(B) work b"]);
    }

    #[test]
    fn view_does_not_touch_the_collection() {
        let list = TaskCollection::from_lines(["b", "a"], Settings::default());
        let today = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
        let view = View::new(Sorter::parse("text", &Settings::default(), today), Vec::new(), &list);

        assert_eq!(view.tasks(), vec![list.keys()[1], list.keys()[0]]);
        assert_eq!(list.print_todos(), "b\na");
        assert!(!list.is_dirty());
    }
}
