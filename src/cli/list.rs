//! Listing and sorting commands

use anyhow::Result;
use clap::Args;

use super::output::Output;
use crate::domain::date::today;
use crate::domain::filter::{
    parse_expression, CompletedFilter, DependencyFilter, HiddenTagFilter, LimitFilter,
    RelevanceFilter,
};
use crate::domain::{Filter, Sorter, View};
use crate::storage::Workspace;

#[derive(Args)]
pub struct LsArgs {
    /// Filter expressions: words, +project, @context, (A), (<B), due:<today, -negation
    pub expressions: Vec<String>,

    /// Show all tasks, including hidden, blocked and completed ones
    #[arg(long, short = 'x')]
    pub all: bool,

    /// Sort expression, e.g. "desc:priority,due"
    #[arg(long, short = 's')]
    pub sort: Option<String>,

    /// Show at most N tasks
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show only completed tasks
    #[arg(long, conflicts_with = "all")]
    pub done: bool,
}

/// Builds the filter chain for `ls`
fn build_filters(
    args: &LsArgs,
    workspace: &Workspace,
    today: chrono::NaiveDate,
) -> Vec<Box<dyn Filter>> {
    let config = workspace.config();
    let settings = &config.todo;
    let mut filters: Vec<Box<dyn Filter>> = Vec::new();

    if args.done {
        filters.push(Box::new(CompletedFilter));
    } else if !(args.all || config.list.show_all) {
        filters.push(Box::new(HiddenTagFilter::new(settings)));
        filters.push(Box::new(DependencyFilter));
        filters.push(Box::new(RelevanceFilter::new(settings, today)));
    }

    filters.extend(
        args.expressions
            .iter()
            .map(|expression| parse_expression(expression, today)),
    );

    // Limit goes last so it counts what survived the other filters
    if let Some(limit) = args.limit.or(config.list.limit) {
        filters.push(Box::new(LimitFilter::new(limit)));
    }
    filters
}

pub fn ls(output: &Output, workspace: &mut Workspace, args: &LsArgs) -> Result<()> {
    let today = today();
    let list = workspace.load()?;
    let settings = workspace.config().todo.clone();

    let expression = args.sort.as_deref().unwrap_or(&settings.sort_string);
    output.verbose_ctx("ls", &format!("sorting by {}", expression));
    let sorter = Sorter::parse(expression, &settings, today);

    let filters = build_filters(args, workspace, today);
    output.verbose_ctx("ls", &format!("{} filters", filters.len()));

    let keys = View::new(sorter, filters, &list).tasks();
    output.verbose_ctx("ls", &format!("{} of {} tasks shown", keys.len(), list.len()));

    if keys.is_empty() && !output.is_json() {
        println!("No tasks.");
        return Ok(());
    }
    output.tasks(&list, &keys);
    Ok(())
}

/// Rewrites the todo file in sorted order
pub fn sort(output: &Output, workspace: &mut Workspace, expression: Option<&str>) -> Result<()> {
    let settings = workspace.config().todo.clone();
    let mut list = workspace.load()?;

    let expression = expression.unwrap_or(&settings.sort_string);
    let order = Sorter::parse(expression, &settings, today()).sort(&list, &list.keys());

    if list.sort_by_keys(&order) {
        workspace.commit(&mut list, &format!("sort {}", expression))?;
        output.success(&format!("Sorted {} tasks by {}", list.len(), expression));
    } else {
        output.success("Already sorted");
    }
    Ok(())
}
