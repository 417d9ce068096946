//! Workspace management
//!
//! Ties the configuration to the files it names and gives commands one
//! place to load the collection and write it back, recording a changeset
//! for `revert` along the way.

use std::path::{Path, PathBuf};

use anyhow::Result;

use super::{BackupStore, Changeset, Config, TodoFile};
use crate::domain::TaskCollection;

/// The todo, done and backup files of one todo list
pub struct Workspace {
    config: Config,
    todo: TodoFile,
    done: TodoFile,
    backup: BackupStore,
    loaded: Vec<String>,
}

impl Workspace {
    /// Opens the workspace described by `config`
    ///
    /// With `todo_override`, relative done and backup paths are resolved
    /// next to that file instead of the configuration's base directory.
    pub fn open(config: Config, todo_override: Option<&Path>) -> Self {
        let (todo, done, backup) = match todo_override {
            Some(todo) => {
                let dir = todo.parent().map(Path::to_path_buf).unwrap_or_default();
                (
                    todo.to_path_buf(),
                    beside(&dir, &config.files.done),
                    beside(&dir, &config.files.backup),
                )
            }
            None => (config.todo_path(), config.done_path(), config.backup_path()),
        };
        log::debug!("workspace: todo file {}", todo.display());

        Self {
            todo: TodoFile::new(todo),
            done: TodoFile::new(done),
            backup: BackupStore::new(backup, config.backup.max_changesets),
            config,
            loaded: Vec::new(),
        }
    }

    /// Loads configuration and opens the workspace in one step
    pub fn load_from(config_path: Option<&Path>, todo_override: Option<&Path>) -> Result<Self> {
        let config = Config::load(config_path)?;
        Ok(Self::open(config, todo_override))
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn todo_file(&self) -> &TodoFile {
        &self.todo
    }

    pub fn done_file(&self) -> &TodoFile {
        &self.done
    }

    pub fn backup_store(&self) -> &BackupStore {
        &self.backup
    }

    /// Reads the todo file into a collection and remembers its contents
    pub fn load(&mut self) -> Result<TaskCollection> {
        self.loaded = self.todo.read_lines()?;
        Ok(TaskCollection::from_lines(
            self.loaded.iter(),
            self.config.todo.clone(),
        ))
    }

    /// Writes the collection back if it changed; returns whether it did
    pub fn commit(&mut self, list: &mut TaskCollection, label: &str) -> Result<bool> {
        if !list.is_dirty() {
            return Ok(false);
        }
        self.record(label, None)?;
        self.todo.save(list)?;
        self.loaded = list.snapshot();
        list.mark_clean();
        Ok(true)
    }

    /// Appends `archived` to the done file and writes the collection back
    pub fn archive(
        &mut self,
        list: &mut TaskCollection,
        archived: &[String],
        label: &str,
    ) -> Result<()> {
        let done_before = self.done.read_lines()?;
        self.record(label, Some(done_before))?;
        self.done.append_lines(archived)?;
        self.todo.save(list)?;
        self.loaded = list.snapshot();
        list.mark_clean();
        Ok(())
    }

    fn record(&self, label: &str, done: Option<Vec<String>>) -> Result<()> {
        if !self.config.backup.enabled {
            return Ok(());
        }
        self.backup
            .push(Changeset::new(label, self.loaded.clone(), done))
    }

    /// Restores the files from the newest changeset
    pub fn revert(&mut self) -> Result<Option<Changeset>> {
        let Some(changeset) = self.backup.pop()? else {
            return Ok(None);
        };
        self.todo.write_lines(&changeset.todo)?;
        if let Some(done) = &changeset.done {
            self.done.write_lines(done)?;
        }
        self.loaded = changeset.todo.clone();
        Ok(Some(changeset))
    }
}

fn beside(dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn workspace(dir: &TempDir) -> Workspace {
        Workspace::open(Config::default(), Some(&dir.path().join("todo.txt")))
    }

    #[test]
    fn override_places_files_together() {
        let dir = TempDir::new().unwrap();
        let ws = workspace(&dir);
        assert_eq!(ws.todo_file().path(), dir.path().join("todo.txt"));
        assert_eq!(ws.done_file().path(), dir.path().join("done.txt"));
        assert_eq!(ws.backup_store().path(), dir.path().join(".todo.txt.bak.json"));
    }

    #[test]
    fn commit_only_when_dirty() {
        let dir = TempDir::new().unwrap();
        let mut ws = workspace(&dir);

        let mut list = ws.load().unwrap();
        assert!(!ws.commit(&mut list, "noop").unwrap());
        assert!(!ws.todo_file().exists());

        list.add("Foo");
        assert!(ws.commit(&mut list, "add Foo").unwrap());
        assert!(!list.is_dirty());
        assert_eq!(ws.todo_file().read_lines().unwrap(), vec!["Foo"]);
    }

    #[test]
    fn revert_restores_previous_state() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("todo.txt"), "Foo\n").unwrap();
        let mut ws = workspace(&dir);

        let mut list = ws.load().unwrap();
        list.add("Bar");
        ws.commit(&mut list, "add Bar").unwrap();

        let changeset = ws.revert().unwrap().unwrap();
        assert_eq!(changeset.label, "add Bar");
        assert_eq!(ws.todo_file().read_lines().unwrap(), vec!["Foo"]);
        assert!(ws.revert().unwrap().is_none());
    }

    #[test]
    fn archive_moves_lines_and_can_be_reverted() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("todo.txt"), "x 2024-01-01 Done\nOpen\n").unwrap();
        let mut ws = workspace(&dir);

        let mut list = ws.load().unwrap();
        let done_key = list.keys()[0];
        let line = list.get(done_key).unwrap().source().to_string();
        list.delete(done_key, true);
        ws.archive(&mut list, &[line], "archive").unwrap();

        assert_eq!(ws.todo_file().read_lines().unwrap(), vec!["Open"]);
        assert_eq!(ws.done_file().read_lines().unwrap(), vec!["x 2024-01-01 Done"]);

        ws.revert().unwrap();
        assert_eq!(
            ws.todo_file().read_lines().unwrap(),
            vec!["x 2024-01-01 Done", "Open"]
        );
        assert!(ws.done_file().read_lines().unwrap().is_empty());
    }

    #[test]
    fn backups_can_be_disabled() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.backup.enabled = false;
        let mut ws = Workspace::open(config, Some(&dir.path().join("todo.txt")));

        let mut list = ws.load().unwrap();
        list.add("Foo");
        ws.commit(&mut list, "add").unwrap();
        assert!(!ws.backup_store().path().exists());
    }
}
