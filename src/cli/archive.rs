//! Archive and revert commands

use anyhow::Result;

use super::output::Output;
use crate::domain::collection::completed_keys;
use crate::storage::Workspace;

/// Moves completed tasks from the todo file to the done file
pub fn archive(output: &Output, workspace: &mut Workspace) -> Result<()> {
    let mut list = workspace.load()?;
    let completed = completed_keys(&list);
    if completed.is_empty() {
        output.success("Nothing to archive");
        return Ok(());
    }

    let archived: Vec<String> = completed
        .iter()
        .filter_map(|key| list.get(*key).map(|t| t.source().to_string()))
        .collect();
    for key in completed {
        list.delete(key, false);
    }

    workspace.archive(&mut list, &archived, "archive")?;
    output.verbose_ctx(
        "archive",
        &format!("appended to {}", workspace.done_file().path().display()),
    );
    output.success(&format!("Archived {} tasks", archived.len()));
    Ok(())
}

/// Restores the todo and done files from the last changeset
pub fn revert(output: &Output, workspace: &mut Workspace) -> Result<()> {
    match workspace.revert()? {
        Some(changeset) => output.success(&format!(
            "Reverted: {} ({})",
            changeset.label,
            changeset.timestamp.format("%Y-%m-%d %H:%M:%S")
        )),
        None => output.success("Nothing to revert"),
    }
    Ok(())
}
