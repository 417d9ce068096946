//! Task CLI commands

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::Args;

use super::output::Output;
use crate::domain::date::{parse_date, relative_date, today};
use crate::domain::recurrence;
use crate::domain::{Settings, TagChoice, Task, TaskCollection, TaskKey};
use crate::storage::Workspace;

/// Tags understood by `add` that become dependencies instead of staying in the text
const BEFORE_TAG: &str = "before";
const AFTER_TAG: &str = "after";
const PART_OF_TAG: &str = "partof";

#[derive(Args)]
pub struct TagArgs {
    /// Task identifier
    pub id: String,

    /// Tag name
    pub name: String,

    /// New value; omit to remove the tag
    pub value: Option<String>,

    /// Replace all existing values of the tag
    #[arg(long, short = 'a', conflicts_with = "index")]
    pub all: bool,

    /// Replace only the Nth existing value (1-based)
    #[arg(long, short = 'i')]
    pub index: Option<usize>,
}

/// Resolves every identifier, reporting the ones that fail
pub(crate) fn resolve_all(
    list: &TaskCollection,
    ids: &[String],
    output: &Output,
) -> (Vec<TaskKey>, usize) {
    let mut keys = Vec::new();
    let mut failures = 0;
    for id in ids {
        match list.resolve(id) {
            Ok(key) => keys.push(key),
            Err(e) => {
                output.error(&e.to_string());
                failures += 1;
            }
        }
    }
    (keys, failures)
}

fn finish(failures: usize, total: usize) -> Result<()> {
    if failures > 0 {
        bail!("{} of {} tasks could not be processed", failures, total);
    }
    Ok(())
}

fn source_of(list: &TaskCollection, key: TaskKey) -> String {
    list.get(key)
        .map(|t| t.source().to_string())
        .unwrap_or_default()
}

/// Turns `due:tomorrow`-style values into absolute dates
pub(crate) fn expand_date_value(
    name: &str,
    value: &str,
    settings: &Settings,
    today: NaiveDate,
) -> String {
    let is_date_tag = name == settings.tags.due || name == settings.tags.start;
    if is_date_tag && parse_date(value).is_none() {
        if let Some(date) = relative_date(value, today) {
            return date.to_string();
        }
    }
    value.to_string()
}

fn expand_relative_dates(task: &mut Task, settings: &Settings, today: NaiveDate) {
    for name in [&settings.tags.due, &settings.tags.start] {
        for value in task.tag_values(name).to_vec() {
            let expanded = expand_date_value(name, &value, settings, today);
            if expanded != value {
                task.replace_tag(name, &value, &expanded);
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Relation {
    /// The new task must be done before the other one
    Before,
    /// The new task waits for the other one
    After,
}

/// Strips `before:`/`after:`/`partof:` tags off a new task
fn take_relations(task: &mut Task) -> Vec<(Relation, String)> {
    let mut relations = Vec::new();
    for (tag, relation) in [
        (BEFORE_TAG, Relation::Before),
        (PART_OF_TAG, Relation::Before),
        (AFTER_TAG, Relation::After),
    ] {
        let values = task.tag_values(tag).to_vec();
        if values.is_empty() {
            continue;
        }
        task.remove_tag(tag, None);
        relations.extend(values.into_iter().map(|value| (relation, value)));
    }
    relations
}

pub fn add(output: &Output, workspace: &mut Workspace, text: &str) -> Result<()> {
    let today = today();
    let settings = workspace.config().todo.clone();
    let mut list = workspace.load()?;

    let mut task = Task::new(text);
    if task.source().is_empty() {
        bail!("Nothing to add");
    }
    expand_relative_dates(&mut task, &settings, today);

    let mut related = Vec::new();
    for (relation, id) in take_relations(&mut task) {
        match list.resolve(&id) {
            Ok(other) => related.push((relation, other)),
            Err(e) => output.error(&e.to_string()),
        }
    }

    if settings.auto_creation_date {
        task.set_creation_date(today);
    }
    let key = list.add_todo(task);
    output.verbose_ctx("add", &format!("added {}", key));

    for (relation, other) in related {
        match relation {
            Relation::Before => list.add_dependency(other, key),
            Relation::After => list.add_dependency(key, other),
        };
    }

    workspace.commit(&mut list, &format!("add {}", text))?;
    output.tasks(&list, &[key]);
    Ok(())
}

pub fn complete(
    output: &Output,
    workspace: &mut Workspace,
    ids: &[String],
    with_children: bool,
) -> Result<()> {
    let today = today();
    let settings = workspace.config().todo.clone();
    let mut list = workspace.load()?;
    let (keys, mut failures) = resolve_all(&list, ids, output);

    for key in keys {
        if list.get(key).is_some_and(Task::is_completed) {
            output.error(&format!("Task already completed: {}", source_of(&list, key)));
            failures += 1;
            continue;
        }

        let open_children: Vec<TaskKey> = list
            .children(key, false)
            .into_iter()
            .filter(|child| list.get(*child).is_some_and(|t| !t.is_completed()))
            .collect();
        if with_children {
            for child in open_children {
                complete_one(output, &mut list, child, &settings, today);
            }
        } else if !open_children.is_empty() {
            output.verbose_ctx(
                "do",
                &format!("{} still has {} open subtasks", key, open_children.len()),
            );
        }

        complete_one(output, &mut list, key, &settings, today);
    }

    workspace.commit(&mut list, &format!("do {}", ids.join(" ")))?;
    finish(failures, ids.len())
}

fn complete_one(
    output: &Output,
    list: &mut TaskCollection,
    key: TaskKey,
    settings: &Settings,
    today: NaiveDate,
) {
    let successor = list
        .get(key)
        .and_then(|task| recurrence::advance(task, settings, today));

    if list.set_completed(key, today) {
        output.success(&format!("Completed: {}", source_of(list, key)));
    }
    if let Some(next) = successor {
        let next_key = list.add_todo(next);
        output.success(&format!("Recurring: {}", source_of(list, next_key)));
    }
}

pub fn delete(
    output: &Output,
    workspace: &mut Workspace,
    ids: &[String],
    leave_tags: bool,
) -> Result<()> {
    let mut list = workspace.load()?;
    let (keys, failures) = resolve_all(&list, ids, output);

    for key in keys {
        let source = source_of(&list, key);
        if list.delete(key, leave_tags) {
            output.success(&format!("Deleted: {}", source));
        }
    }

    workspace.commit(&mut list, &format!("del {}", ids.join(" ")))?;
    finish(failures, ids.len())
}

fn parse_priority(s: &str) -> Result<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => Ok(c.to_ascii_uppercase()),
        _ => bail!("Invalid priority: {} (expected a letter A-Z)", s),
    }
}

pub fn prioritize(output: &Output, workspace: &mut Workspace, args: &[String]) -> Result<()> {
    let Some((priority, ids)) = args.split_last() else {
        bail!("Usage: pri <ID>... <PRIORITY>");
    };
    let priority = parse_priority(priority)?;

    let mut list = workspace.load()?;
    let (keys, mut failures) = resolve_all(&list, ids, output);

    for key in keys {
        if list.get(key).is_some_and(Task::is_completed) {
            output.error(&format!("Cannot prioritize completed task: {}", source_of(&list, key)));
            failures += 1;
        } else if list.set_priority(key, Some(priority)) {
            output.success(&format!("Priority set to {}: {}", priority, source_of(&list, key)));
        } else {
            output.success(&format!("Priority unchanged: {}", source_of(&list, key)));
        }
    }

    workspace.commit(&mut list, &format!("pri {}", args.join(" ")))?;
    finish(failures, ids.len())
}

pub fn deprioritize(output: &Output, workspace: &mut Workspace, ids: &[String]) -> Result<()> {
    let mut list = workspace.load()?;
    let (keys, failures) = resolve_all(&list, ids, output);

    for key in keys {
        if list.set_priority(key, None) {
            output.success(&format!("Priority removed: {}", source_of(&list, key)));
        }
    }

    workspace.commit(&mut list, &format!("depri {}", ids.join(" ")))?;
    finish(failures, ids.len())
}

pub fn tag(output: &Output, workspace: &mut Workspace, args: &TagArgs) -> Result<()> {
    let settings = workspace.config().todo.clone();
    let mut list = workspace.load()?;
    let key = list.resolve(&args.id)?;

    let changed = match &args.value {
        None => list.remove_tag(key, &args.name, None),
        Some(value) => {
            let value = expand_date_value(&args.name, value, &settings, today());
            let mut ambiguous = None;
            let changed = list.set_tag_with(key, &args.name, &value, |values| {
                if args.all {
                    TagChoice::All
                } else if let Some(index) = args.index.and_then(|i| i.checked_sub(1)) {
                    TagChoice::One(index)
                } else {
                    ambiguous = Some(values.len());
                    TagChoice::None
                }
            });
            if let Some(count) = ambiguous {
                bail!(
                    "Task has {} values for '{}'; use --all or --index to pick",
                    count,
                    args.name
                );
            }
            changed
        }
    };

    workspace.commit(&mut list, &format!("tag {} {}", args.id, args.name))?;
    if changed {
        output.tasks(&list, &[key]);
    } else {
        output.success(&format!("Unchanged: {}", source_of(&list, key)));
    }
    Ok(())
}

pub fn append(output: &Output, workspace: &mut Workspace, id: &str, text: &str) -> Result<()> {
    let mut list = workspace.load()?;
    let key = list.resolve(id)?;

    if list.append(key, text) {
        workspace.commit(&mut list, &format!("append {} {}", id, text))?;
    }
    output.tasks(&list, &[key]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn relative_due_dates_are_expanded() {
        let settings = Settings::default();
        let today = d(2024, 5, 15);
        assert_eq!(expand_date_value("due", "tomorrow", &settings, today), "2024-05-16");
        assert_eq!(expand_date_value("t", "1w", &settings, today), "2024-05-22");
        assert_eq!(expand_date_value("due", "2024-01-01", &settings, today), "2024-01-01");
        assert_eq!(expand_date_value("due", "someday", &settings, today), "someday");
        assert_eq!(expand_date_value("other", "tomorrow", &settings, today), "tomorrow");
    }

    #[test]
    fn expand_in_task() {
        let mut task = Task::new("Call due:tom t:today");
        expand_relative_dates(&mut task, &Settings::default(), d(2024, 5, 15));
        assert_eq!(task.source(), "Call due:2024-05-16 t:2024-05-15");
    }

    #[test]
    fn relations_are_stripped() {
        let mut task = Task::new("Write tests before:3 after:1 partof:2");
        let relations = take_relations(&mut task);
        assert_eq!(task.source(), "Write tests");
        let targets: Vec<&str> = relations.iter().map(|(_, id)| id.as_str()).collect();
        assert_eq!(targets, vec!["3", "2", "1"]);
    }

    #[test]
    fn priority_argument() {
        assert_eq!(parse_priority("b").unwrap(), 'B');
        assert_eq!(parse_priority("Z").unwrap(), 'Z');
        assert!(parse_priority("AB").is_err());
        assert!(parse_priority("1").is_err());
    }
}
