//! Changeset backups for `revert`
//!
//! Before a command writes the todo file, the previous contents of the todo
//! and done files are stored as a changeset in a JSON file next to them.
//! Changesets are kept newest first and capped at a configurable count.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

/// Snapshot of the files before one command ran
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changeset {
    pub timestamp: DateTime<Utc>,

    /// The command that made the change
    pub label: String,

    pub todo: Vec<String>,

    /// Done file contents, only when the command touched it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<Vec<String>>,
}

impl Changeset {
    pub fn new(label: impl Into<String>, todo: Vec<String>, done: Option<Vec<String>>) -> Self {
        Self {
            timestamp: Utc::now(),
            label: label.into(),
            todo,
            done,
        }
    }
}

/// JSON list of changesets
pub struct BackupStore {
    path: PathBuf,
    max_changesets: usize,
}

impl BackupStore {
    pub fn new(path: impl Into<PathBuf>, max_changesets: usize) -> Self {
        Self {
            path: path.into(),
            max_changesets,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads all changesets, newest first
    pub fn read_all(&self) -> Result<Vec<Changeset>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open backup file: {}", self.path.display()))?;
        file.lock_shared()
            .context("Failed to acquire read lock on backup file")?;

        serde_json::from_reader(BufReader::new(&file))
            .with_context(|| format!("Failed to parse backup file: {}", self.path.display()))
    }

    fn write_all(&self, changesets: &[Changeset]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;
            file.lock_exclusive()
                .context("Failed to acquire write lock on backup file")?;

            let mut writer = BufWriter::new(&file);
            serde_json::to_writer_pretty(&mut writer, changesets)
                .context("Failed to serialize changesets")?;
            writer.flush().context("Failed to flush backup file")?;
        }

        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })
    }

    /// Records a changeset, dropping the oldest beyond the cap
    pub fn push(&self, changeset: Changeset) -> Result<()> {
        if self.max_changesets == 0 {
            return Ok(());
        }
        let mut changesets = self.read_all()?;
        changesets.insert(0, changeset);
        changesets.truncate(self.max_changesets);
        log::debug!("backup: {} changesets stored", changesets.len());
        self.write_all(&changesets)
    }

    /// Removes and returns the newest changeset
    pub fn pop(&self) -> Result<Option<Changeset>> {
        let mut changesets = self.read_all()?;
        if changesets.is_empty() {
            return Ok(None);
        }
        let newest = changesets.remove(0);
        self.write_all(&changesets)?;
        Ok(Some(newest))
    }
}
