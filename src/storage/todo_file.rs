//! todo.txt file storage
//!
//! One task per line, plain text. Reads take a shared `fs2` lock; writes go
//! to a temp file under an exclusive lock and are renamed into place, so a
//! reader never sees a half-written file.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

use crate::domain::{Settings, TaskCollection};

/// A todo.txt (or done.txt) file
pub struct TodoFile {
    path: PathBuf,
}

impl TodoFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path to the file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Reads all lines; a missing file reads as empty
    pub fn read_lines(&self) -> Result<Vec<String>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open todo file: {}", self.path.display()))?;

        file.lock_shared()
            .context("Failed to acquire read lock on todo file")?;

        let reader = BufReader::new(&file);
        let mut lines = Vec::new();
        for (line_num, line) in reader.lines().enumerate() {
            let line = line.with_context(|| {
                format!("Failed to read line {} of {}", line_num + 1, self.path.display())
            })?;
            lines.push(line);
        }

        log::debug!("todo file: read {} lines from {}", lines.len(), self.path.display());
        Ok(lines)
    }

    /// Reads the file into a collection
    pub fn load(&self, settings: &Settings) -> Result<TaskCollection> {
        let lines = self.read_lines()?;
        Ok(TaskCollection::from_lines(lines, settings.clone()))
    }

    /// Replaces the file contents (full rewrite)
    pub fn write_lines<S: AsRef<str>>(&self, lines: &[S]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let temp_path = temp_path(&self.path);

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            file.lock_exclusive()
                .context("Failed to acquire write lock on todo file")?;

            let mut writer = BufWriter::new(&file);
            for line in lines {
                writeln!(writer, "{}", line.as_ref()).context("Failed to write task")?;
            }
            writer.flush().context("Failed to flush todo file")?;
        }

        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })?;

        log::debug!("todo file: wrote {} lines to {}", lines.len(), self.path.display());
        Ok(())
    }

    /// Writes a collection back
    pub fn save(&self, collection: &TaskCollection) -> Result<()> {
        self.write_lines(&collection.snapshot())
    }

    /// Appends lines at the end (used when archiving into done.txt)
    pub fn append_lines<S: AsRef<str>>(&self, lines: &[S]) -> Result<()> {
        if lines.is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let needs_newline = ends_without_newline(&self.path)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open todo file: {}", self.path.display()))?;

        file.lock_exclusive()
            .context("Failed to acquire write lock on todo file")?;

        let mut writer = BufWriter::new(&file);
        if needs_newline {
            writeln!(writer).context("Failed to write task")?;
        }
        for line in lines {
            writeln!(writer, "{}", line.as_ref()).context("Failed to write task")?;
        }
        writer.flush().context("Failed to flush todo file")?;

        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn ends_without_newline(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    let content =
        fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(content.last().is_some_and(|b| *b != b'\n'))
}
