//! Dependency commands

use anyhow::Result;
use clap::Subcommand;

use super::output::Output;
use crate::storage::Workspace;

#[derive(Subcommand)]
pub enum DepCommands {
    /// Make FROM depend on TO (TO becomes a subtask of FROM)
    Add {
        /// Task that waits
        from: String,
        /// Task that must be done first
        to: String,
    },

    /// Remove the dependency of FROM on TO
    Rm {
        from: String,
        to: String,

        /// Keep the id:/p: tags in place
        #[arg(long)]
        leave_tags: bool,
    },

    /// List the subtasks of a task
    Ls {
        id: String,

        /// List the tasks waiting on this one instead
        #[arg(long)]
        parents: bool,

        /// Follow dependencies transitively
        #[arg(long, short = 'a')]
        all: bool,
    },

    /// Remove redundant dependencies and dangling id:/p: tags
    Clean,
}

pub fn run(cmd: DepCommands, output: &Output, workspace: &mut Workspace) -> Result<()> {
    match cmd {
        DepCommands::Add { from, to } => add(output, workspace, &from, &to),
        DepCommands::Rm {
            from,
            to,
            leave_tags,
        } => remove(output, workspace, &from, &to, leave_tags),
        DepCommands::Ls { id, parents, all } => ls(output, workspace, &id, parents, all),
        DepCommands::Clean => clean(output, workspace),
    }
}

fn add(output: &Output, workspace: &mut Workspace, from: &str, to: &str) -> Result<()> {
    let mut list = workspace.load()?;
    let parent = list.resolve(from)?;
    let child = list.resolve(to)?;

    if list.add_dependency(parent, child) {
        workspace.commit(&mut list, &format!("dep add {} {}", from, to))?;
        output.success(&format!("{} now depends on {}", from, to));
    } else {
        output.success(&format!("No dependency added between {} and {}", from, to));
    }
    output.tasks(&list, &[parent, child]);
    Ok(())
}

fn remove(
    output: &Output,
    workspace: &mut Workspace,
    from: &str,
    to: &str,
    leave_tags: bool,
) -> Result<()> {
    let mut list = workspace.load()?;
    let parent = list.resolve(from)?;
    let child = list.resolve(to)?;

    if list.remove_dependency(parent, child, leave_tags) {
        workspace.commit(&mut list, &format!("dep rm {} {}", from, to))?;
        output.success(&format!("{} no longer depends on {}", from, to));
    } else {
        output.success(&format!("{} does not depend on {}", from, to));
    }
    Ok(())
}

fn ls(
    output: &Output,
    workspace: &mut Workspace,
    id: &str,
    parents: bool,
    all: bool,
) -> Result<()> {
    let list = workspace.load()?;
    let key = list.resolve(id)?;

    let related = if parents {
        list.parents(key, !all)
    } else {
        list.children(key, !all)
    };
    output.verbose_ctx("dep", &format!("{} related tasks", related.len()));

    if related.is_empty() && !output.is_json() {
        println!("No related tasks.");
        return Ok(());
    }
    output.tasks(&list, &related);
    Ok(())
}

fn clean(output: &Output, workspace: &mut Workspace) -> Result<()> {
    let mut list = workspace.load()?;

    if list.clean_dependencies() {
        workspace.commit(&mut list, "dep clean")?;
        output.success("Cleaned up dependencies");
    } else {
        output.success("Dependencies already clean");
    }
    Ok(())
}
