//! Task collection
//!
//! An ordered list of tasks plus the dependency graph derived from their
//! `id:`/`p:` tags. The tags are the source of truth: the edge `A -> B`
//! exists exactly when `B` carries `p:v` and `A` is the first task in the
//! list carrying `id:v`. Every mutation that can touch those tags goes
//! through the collection so the graph is re-derived in the same step.
//!
//! The collection never performs I/O. It only records whether anything
//! changed (see [`TaskCollection::is_dirty`]) so the caller knows whether
//! to write the file back.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

use super::filter::GrepFilter;
use super::graph::DependencyGraph;
use super::id::{text_identifiers, TaskKey};
use super::settings::{IdentifierMode, Settings};
use super::task::Task;

/// Tag holding a parent's dependency id
pub const PARENT_ID_TAG: &str = "id";
/// Tag pointing a child at its parent's dependency id
pub const CHILD_OF_TAG: &str = "p";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TodoError {
    /// The identifier resolves to no task
    #[error("Invalid todo identifier: {0}")]
    InvalidTodo(String),

    /// The identifier's text matches more than one task
    #[error("Identifier '{0}' matches {1} todos")]
    Ambiguous(String, usize),
}

/// Answer of a chooser asked which of several tag values to update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagChoice {
    /// Update the value at this index
    One(usize),
    /// Replace all values with the new one
    All,
    /// Leave the task alone
    None,
}

#[derive(Debug, Clone)]
struct Entry {
    key: TaskKey,
    task: Task,
}

/// Ordered tasks with their dependency graph
#[derive(Debug, Clone)]
pub struct TaskCollection {
    entries: Vec<Entry>,
    graph: DependencyGraph<TaskKey>,
    settings: Settings,
    next_key: u64,
    dirty: bool,
}

impl Default for TaskCollection {
    fn default() -> Self {
        Self::with_settings(Settings::default())
    }
}

impl TaskCollection {
    /// Creates an empty collection with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty collection
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            entries: Vec::new(),
            graph: DependencyGraph::new(),
            settings,
            next_key: 1,
            dirty: false,
        }
    }

    /// Builds a collection from raw lines; blank lines are skipped
    ///
    /// The result is not dirty.
    pub fn from_lines<I, S>(lines: I, settings: Settings) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut collection = Self::with_settings(settings);
        collection.load(lines);
        collection.dirty = false;
        collection
    }

    fn load<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            let line = line.as_ref();
            if line.trim().is_empty() {
                continue;
            }
            let key = self.allocate_key();
            self.entries.push(Entry {
                key,
                task: Task::new(line),
            });
        }
        self.rebuild_graph();
        log::debug!("collection: loaded {} tasks", self.entries.len());
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn allocate_key(&mut self) -> TaskKey {
        let key = TaskKey::new(self.next_key);
        self.next_key += 1;
        key
    }

    /// Parses and appends a task; blank input is ignored
    pub fn add(&mut self, text: &str) -> Option<TaskKey> {
        if text.trim().is_empty() {
            return None;
        }
        Some(self.add_todo(Task::new(text)))
    }

    /// Appends an already parsed task and links it to existing tasks
    pub fn add_todo(&mut self, task: Task) -> TaskKey {
        let key = self.allocate_key();
        log::debug!("collection: adding {} '{}'", key, task.source());
        self.entries.push(Entry { key, task });
        self.register(key);
        self.dirty = true;
        key
    }

    /// Removes a task and its relationships
    ///
    /// Unless `leave_tags` is set, the `p:`/`id:` tags on surviving tasks that
    /// described relationships with the deleted task are removed as well.
    pub fn delete(&mut self, key: TaskKey, leave_tags: bool) -> bool {
        let Some(index) = self.index_of(key) else {
            return false;
        };
        for child in self.children(key, true) {
            self.unlink(key, child, leave_tags);
        }
        for parent in self.parents(key, true) {
            self.unlink(parent, key, leave_tags);
        }
        self.graph.remove_node(key, true);

        let entry = self.entries.remove(index);
        if entry.task.has_tag(PARENT_ID_TAG, None) {
            // a later task may carry the same id and take over its children
            self.rebuild_graph();
        }
        log::debug!("collection: deleted {} '{}'", key, entry.task.source());
        self.dirty = true;
        true
    }

    /// Appends text to a task; an empty suffix does nothing
    pub fn append(&mut self, key: TaskKey, suffix: &str) -> bool {
        self.mutate(key, |task| task.append_text(suffix))
    }

    /// Replaces a task's whole line
    pub fn modify(&mut self, key: TaskKey, source: &str) -> bool {
        if source.trim().is_empty() {
            return false;
        }
        self.mutate(key, |task| task.set_source(source))
    }

    pub fn set_tag(&mut self, key: TaskKey, tag: &str, value: &str) -> bool {
        self.mutate(key, |task| task.set_tag(tag, value))
    }

    pub fn add_tag(&mut self, key: TaskKey, tag: &str, value: &str) -> bool {
        self.mutate(key, |task| task.add_tag(tag, value))
    }

    pub fn replace_tag(&mut self, key: TaskKey, tag: &str, old: &str, new: &str) -> bool {
        self.mutate(key, |task| task.replace_tag(tag, old, new))
    }

    pub fn remove_tag(&mut self, key: TaskKey, tag: &str, value: Option<&str>) -> bool {
        self.mutate(key, |task| task.remove_tag(tag, value))
    }

    /// Sets a tag that may already hold several values
    ///
    /// With more than one existing value the `chooser` decides which value is
    /// replaced; with zero or one the update is unambiguous and the chooser is
    /// not consulted.
    pub fn set_tag_with<F>(&mut self, key: TaskKey, tag: &str, value: &str, chooser: F) -> bool
    where
        F: FnOnce(&[String]) -> TagChoice,
    {
        let values = match self.get(key) {
            Some(task) => task.tag_values(tag).to_vec(),
            None => return false,
        };
        if values.len() <= 1 {
            return self.set_tag(key, tag, value);
        }
        match chooser(&values) {
            TagChoice::One(index) => match values.get(index) {
                Some(old) => self.replace_tag(key, tag, old, value),
                None => false,
            },
            TagChoice::All => self.mutate(key, |task| {
                let removed = task.remove_tag(tag, None);
                task.add_tag(tag, value) || removed
            }),
            TagChoice::None => false,
        }
    }

    pub fn set_priority(&mut self, key: TaskKey, priority: Option<char>) -> bool {
        self.mutate(key, |task| task.set_priority(priority))
    }

    pub fn set_completed(&mut self, key: TaskKey, date: NaiveDate) -> bool {
        self.mutate(key, |task| task.set_completed(date))
    }

    /// Applies a task mutation, re-deriving the graph if dependency tags changed
    fn mutate<F>(&mut self, key: TaskKey, f: F) -> bool
    where
        F: FnOnce(&mut Task) -> bool,
    {
        let Some(index) = self.index_of(key) else {
            return false;
        };
        let task = &mut self.entries[index].task;
        let before = dependency_tags(task);
        if !f(task) {
            return false;
        }
        if dependency_tags(task) != before {
            self.rebuild_graph();
        }
        self.dirty = true;
        true
    }

    /// Adds the edges implied by this task's `id:` and `p:` tags
    fn register(&mut self, key: TaskKey) {
        let Some(task) = self.get(key) else {
            return;
        };
        let mut edges = Vec::new();

        for value in task.tag_values(PARENT_ID_TAG) {
            if self.parent_by_id(value) != Some(key) {
                continue;
            }
            for entry in &self.entries {
                if entry.key != key && entry.task.has_tag(CHILD_OF_TAG, Some(value)) {
                    edges.push((key, entry.key, value.clone()));
                }
            }
        }
        for value in task.tag_values(CHILD_OF_TAG) {
            if let Some(parent) = self.parent_by_id(value) {
                edges.push((parent, key, value.clone()));
            }
        }

        for (from, to, label) in edges {
            self.graph.add_edge(from, to, label);
        }
    }

    /// Re-derives the whole graph from the tags
    fn rebuild_graph(&mut self) {
        self.graph.clear();
        let mut parents: HashMap<&str, TaskKey> = HashMap::new();
        for entry in &self.entries {
            for value in entry.task.tag_values(PARENT_ID_TAG) {
                parents.entry(value.as_str()).or_insert(entry.key);
            }
        }
        for entry in &self.entries {
            for value in entry.task.tag_values(CHILD_OF_TAG) {
                if let Some(parent) = parents.get(value.as_str()) {
                    self.graph.add_edge(*parent, entry.key, value.clone());
                }
            }
        }
    }

    /// The first task in list order carrying `id:value`
    fn parent_by_id(&self, value: &str) -> Option<TaskKey> {
        self.entries
            .iter()
            .find(|e| e.task.has_tag(PARENT_ID_TAG, Some(value)))
            .map(|e| e.key)
    }

    /// Makes `to` depend on `from`
    ///
    /// `from` gets an `id:` tag if it has none, `to` gets the matching `p:`
    /// tag. Self-dependencies and existing edges are left alone.
    pub fn add_dependency(&mut self, from: TaskKey, to: TaskKey) -> bool {
        if from == to || !self.contains(from) || !self.contains(to) || self.graph.has_edge(from, to)
        {
            return false;
        }

        // an id shared with an earlier task belongs to that task
        let existing = self.get(from).and_then(|t| {
            t.tag_values(PARENT_ID_TAG)
                .iter()
                .find(|v| self.parent_by_id(v) == Some(from))
                .cloned()
        });
        let dep_id = match existing {
            Some(id) => id,
            None => {
                let id = self.next_dependency_id();
                if let Some(task) = self.task_mut(from) {
                    task.add_tag(PARENT_ID_TAG, &id);
                }
                id
            }
        };
        if let Some(task) = self.task_mut(to) {
            task.add_tag(CHILD_OF_TAG, &dep_id);
        }
        self.graph.add_edge(from, to, dep_id.clone());
        self.inherit_from_parent(from, to);

        log::debug!("collection: {} -> {} (id:{})", from, to, dep_id);
        self.dirty = true;
        true
    }

    fn inherit_from_parent(&mut self, from: TaskKey, to: TaskKey) {
        let (Some(parent), Some(child)) = (self.get(from), self.get(to)) else {
            return;
        };
        let mut additions = Vec::new();
        if self.settings.append_parent_projects {
            additions.extend(
                parent
                    .projects()
                    .iter()
                    .filter(|p| !child.projects().contains(*p))
                    .map(|p| format!("+{}", p)),
            );
        }
        if self.settings.append_parent_contexts {
            additions.extend(
                parent
                    .contexts()
                    .iter()
                    .filter(|c| !child.contexts().contains(*c))
                    .map(|c| format!("@{}", c)),
            );
        }
        if !additions.is_empty() {
            let suffix = additions.join(" ");
            if let Some(task) = self.task_mut(to) {
                task.append_text(&suffix);
            }
        }
    }

    /// The lowest positive integer no `id:` or `p:` tag carries
    fn next_dependency_id(&self) -> String {
        let used: HashSet<&str> = self
            .entries
            .iter()
            .flat_map(|e| {
                e.task
                    .tag_values(PARENT_ID_TAG)
                    .iter()
                    .chain(e.task.tag_values(CHILD_OF_TAG))
            })
            .map(String::as_str)
            .collect();
        (1u64..)
            .map(|n| n.to_string())
            .find(|id| !used.contains(id.as_str()))
            .unwrap_or_default()
    }

    /// Removes the dependency `from -> to`
    ///
    /// Unless `leave_tags` is set, `to` loses the matching `p:` tag and `from`
    /// loses its `id:` once no child refers to it. Nodes left without any edge
    /// are pruned from the graph.
    pub fn remove_dependency(&mut self, from: TaskKey, to: TaskKey, leave_tags: bool) -> bool {
        self.unlink(from, to, leave_tags)
    }

    fn unlink(&mut self, from: TaskKey, to: TaskKey, leave_tags: bool) -> bool {
        if !self.graph.remove_edge(from, to, true) {
            return false;
        }

        if !leave_tags {
            let owned: Vec<String> = self
                .get(from)
                .map(|t| t.tag_values(PARENT_ID_TAG).to_vec())
                .unwrap_or_default()
                .into_iter()
                .filter(|v| self.parent_by_id(v) == Some(from))
                .collect();
            if let Some(child) = self.task_mut(to) {
                for label in &owned {
                    child.remove_tag(CHILD_OF_TAG, Some(label));
                }
            }
            let unused: Vec<&String> = owned
                .iter()
                .filter(|label| {
                    !self
                        .entries
                        .iter()
                        .any(|e| e.task.has_tag(CHILD_OF_TAG, Some(label.as_str())))
                })
                .collect();
            if let Some(parent) = self.task_mut(from) {
                for label in unused {
                    parent.remove_tag(PARENT_ID_TAG, Some(label));
                }
            }
        }

        log::debug!("collection: removed {} -> {}", from, to);
        self.dirty = true;
        true
    }

    /// Drops redundant edges and the dependency tags nothing refers to
    ///
    /// Runs a transitive reduction, then removes `p:` tags without a matching
    /// edge, then `id:` tags without any outgoing edge.
    pub fn clean_dependencies(&mut self) -> bool {
        let reduced = self.graph.transitive_reduction();
        let mut changed = false;

        let mut dangling_children = Vec::new();
        for entry in &self.entries {
            for value in entry.task.tag_values(CHILD_OF_TAG) {
                let linked = self
                    .parent_by_id(value)
                    .is_some_and(|parent| {
                        self.graph.edge_label(parent, entry.key) == Some(value.as_str())
                    });
                if !linked {
                    dangling_children.push((entry.key, value.clone()));
                }
            }
        }
        for (key, value) in dangling_children {
            if let Some(task) = self.task_mut(key) {
                changed |= task.remove_tag(CHILD_OF_TAG, Some(&value));
            }
        }

        let mut unused_parents = Vec::new();
        for entry in &self.entries {
            for value in entry.task.tag_values(PARENT_ID_TAG) {
                let used = self
                    .graph
                    .outgoing_neighbors(entry.key, false)
                    .into_iter()
                    .any(|c| self.graph.edge_label(entry.key, c) == Some(value.as_str()));
                if !used {
                    unused_parents.push((entry.key, value.clone()));
                }
            }
        }
        for (key, value) in unused_parents {
            if let Some(task) = self.task_mut(key) {
                changed |= task.remove_tag(PARENT_ID_TAG, Some(&value));
            }
        }

        for node in self.graph.nodes() {
            if self.graph.is_isolated(node) {
                self.graph.remove_node(node, false);
            }
        }

        log::debug!("collection: clean removed {} redundant edges", reduced);
        if changed {
            self.dirty = true;
        }
        changed
    }

    /// Tasks depending on this one, in list order
    pub fn children(&self, key: TaskKey, direct_only: bool) -> Vec<TaskKey> {
        let related = self.graph.outgoing_neighbors(key, !direct_only);
        self.in_list_order(&related, key)
    }

    /// Tasks this one depends on, in list order
    pub fn parents(&self, key: TaskKey, direct_only: bool) -> Vec<TaskKey> {
        let related = self.graph.incoming_neighbors(key, !direct_only);
        self.in_list_order(&related, key)
    }

    fn in_list_order(&self, keys: &BTreeSet<TaskKey>, exclude: TaskKey) -> Vec<TaskKey> {
        self.entries
            .iter()
            .map(|e| e.key)
            .filter(|k| *k != exclude && keys.contains(k))
            .collect()
    }

    /// True if the dependency graph agrees with the `id:`/`p:` tags
    pub fn graph_matches_tags(&self) -> bool {
        let mut parents: HashMap<&str, TaskKey> = HashMap::new();
        for entry in &self.entries {
            for value in entry.task.tag_values(PARENT_ID_TAG) {
                parents.entry(value.as_str()).or_insert(entry.key);
            }
        }
        let mut expected = BTreeSet::new();
        for entry in &self.entries {
            for value in entry.task.tag_values(CHILD_OF_TAG) {
                if let Some(parent) = parents.get(value.as_str()) {
                    if *parent != entry.key {
                        expected.insert((*parent, entry.key));
                    }
                }
            }
        }
        let actual: BTreeSet<_> = self.graph.edges().into_iter().map(|(f, t, _)| (f, t)).collect();
        expected == actual
    }

    pub fn graph(&self) -> &DependencyGraph<TaskKey> {
        &self.graph
    }

    /// Every project across all tasks
    pub fn projects(&self) -> BTreeSet<String> {
        self.iter().flat_map(|(_, t)| t.projects().iter().cloned()).collect()
    }

    /// Every context across all tasks
    pub fn contexts(&self) -> BTreeSet<String> {
        self.iter().flat_map(|(_, t)| t.contexts().iter().cloned()).collect()
    }

    pub fn get(&self, key: TaskKey) -> Option<&Task> {
        self.entries.iter().find(|e| e.key == key).map(|e| &e.task)
    }

    fn task_mut(&mut self, key: TaskKey) -> Option<&mut Task> {
        self.entries.iter_mut().find(|e| e.key == key).map(|e| &mut e.task)
    }

    pub fn contains(&self, key: TaskKey) -> bool {
        self.index_of(key).is_some()
    }

    fn index_of(&self, key: TaskKey) -> Option<usize> {
        self.entries.iter().position(|e| e.key == key)
    }

    /// Keys in list order
    pub fn keys(&self) -> Vec<TaskKey> {
        self.entries.iter().map(|e| e.key).collect()
    }

    /// Tasks in list order
    pub fn iter(&self) -> impl Iterator<Item = (TaskKey, &Task)> {
        self.entries.iter().map(|e| (e.key, &e.task))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 1-based position of a task
    pub fn number(&self, key: TaskKey) -> Option<usize> {
        self.index_of(key).map(|i| i + 1)
    }

    /// Text identifiers for all tasks, in list order
    pub fn text_ids(&self) -> Vec<String> {
        text_identifiers(self.entries.iter().map(|e| e.task.source()))
    }

    /// The external identifier of a task under the configured scheme
    pub fn identifier(&self, key: TaskKey) -> Option<String> {
        let index = self.index_of(key)?;
        match self.settings.identifiers {
            IdentifierMode::Linenumber => Some((index + 1).to_string()),
            IdentifierMode::Text => self.text_ids().into_iter().nth(index),
        }
    }

    /// External identifiers of all tasks
    pub fn identifiers(&self) -> HashMap<TaskKey, String> {
        match self.settings.identifiers {
            IdentifierMode::Linenumber => self
                .entries
                .iter()
                .enumerate()
                .map(|(i, e)| (e.key, (i + 1).to_string()))
                .collect(),
            IdentifierMode::Text => self
                .entries
                .iter()
                .map(|e| e.key)
                .zip(self.text_ids())
                .collect(),
        }
    }

    /// Resolves a user-supplied identifier to exactly one task
    ///
    /// Tries the configured identifier scheme first, then falls back to a
    /// substring match over the task text, which must be unique.
    pub fn resolve(&self, identifier: &str) -> Result<TaskKey, TodoError> {
        let identifier = identifier.trim();
        let invalid = || TodoError::InvalidTodo(identifier.to_string());
        if identifier.is_empty() {
            return Err(invalid());
        }

        match self.settings.identifiers {
            IdentifierMode::Text => {
                if let Some(index) = self.text_ids().iter().position(|id| id == identifier) {
                    return Ok(self.entries[index].key);
                }
            }
            IdentifierMode::Linenumber => {
                if let Ok(number) = identifier.parse::<usize>() {
                    if let Some(entry) = number.checked_sub(1).and_then(|i| self.entries.get(i)) {
                        return Ok(entry.key);
                    }
                }
            }
        }

        let grep = GrepFilter::new(identifier);
        let matches: Vec<TaskKey> = self
            .entries
            .iter()
            .filter(|e| grep.matches_task(&e.task))
            .map(|e| e.key)
            .collect();
        match matches.as_slice() {
            [key] => Ok(*key),
            [] => Err(invalid()),
            many => Err(TodoError::Ambiguous(identifier.to_string(), many.len())),
        }
    }

    /// Reorders the list; keys not mentioned keep their relative order at the end
    pub fn sort_by_keys(&mut self, order: &[TaskKey]) -> bool {
        let before = self.keys();
        let mut rank: HashMap<TaskKey, usize> = HashMap::new();
        for (i, key) in order.iter().enumerate() {
            rank.entry(*key).or_insert(i);
        }
        self.entries
            .sort_by_key(|e| rank.get(&e.key).copied().unwrap_or(usize::MAX));
        let changed = self.keys() != before;
        if changed {
            // ownership of a shared id follows list order
            self.rebuild_graph();
            self.dirty = true;
        }
        changed
    }

    /// The current lines, for a changeset backup
    pub fn snapshot(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.task.source().to_string()).collect()
    }

    /// Replaces the whole collection with previously saved lines
    pub fn restore<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.entries.clear();
        self.load(lines);
        self.dirty = true;
    }

    /// The todo.txt serialization, one task per line
    pub fn print_todos(&self) -> String {
        self.entries
            .iter()
            .map(|e| e.task.source())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// True if anything changed since loading (or the last [`mark_clean`](Self::mark_clean))
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

impl fmt::Display for TaskCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.print_todos())
    }
}

fn dependency_tags(task: &Task) -> (Vec<String>, Vec<String>) {
    (
        task.tag_values(PARENT_ID_TAG).to_vec(),
        task.tag_values(CHILD_OF_TAG).to_vec(),
    )
}

/// Keys of all completed tasks, in list order
pub fn completed_keys(collection: &TaskCollection) -> Vec<TaskKey> {
    collection
        .iter()
        .filter(|(_, t)| t.is_completed())
        .map(|(k, _)| k)
        .collect()
}
