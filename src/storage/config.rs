//! Configuration handling for todograph
//!
//! Configuration is TOML, read from two places and merged key by key:
//!
//! 1. the global file `config.toml` in the platform config directory
//! 2. the project file `.todograph.toml`, found by walking up from the
//!    current directory
//!
//! An explicit `--config` path replaces both. Relative file paths in the
//! `[files]` section are resolved against the directory holding the
//! project (or explicit) configuration file, or the current directory.
//!
//! ```toml
//! [todo]
//! identifiers = "text"
//! sort_string = "desc:importance,due,desc:priority"
//!
//! [todo.tags]
//! due = "due"
//!
//! [files]
//! todo = "todo.txt"
//! done = "done.txt"
//!
//! [backup]
//! max_changesets = 5
//!
//! [list]
//! limit = 20
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Settings;

/// Name of the project configuration file
pub const PROJECT_CONFIG_FILE: &str = ".todograph.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Locations of the data files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    pub todo: PathBuf,
    pub done: PathBuf,
    pub backup: PathBuf,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            todo: PathBuf::from("todo.txt"),
            done: PathBuf::from("done.txt"),
            backup: PathBuf::from(".todo.txt.bak.json"),
        }
    }
}

/// Undo history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    pub enabled: bool,

    /// Changesets kept for `revert`
    pub max_changesets: usize,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_changesets: 5,
        }
    }
}

/// Defaults for `ls`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListConfig {
    /// Maximum tasks shown; unlimited when absent
    pub limit: Option<usize>,

    /// Show completed, hidden and blocked tasks by default
    pub show_all: bool,
}

/// Combined configuration (global + project)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Engine settings
    pub todo: Settings,
    pub files: FilesConfig,
    pub backup: BackupConfig,
    pub list: ListConfig,

    /// Directory relative file paths are resolved against
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from an explicit file, or from the default locations
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_explicit(path),
            None => Self::load_layered(),
        }
    }

    fn load_explicit(path: &Path) -> Result<Self> {
        let table = read_table(path)?
            .ok_or_else(|| anyhow::anyhow!("Config file not found: {}", path.display()))?;
        let mut config = Self::from_table(table)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    fn load_layered() -> Result<Self> {
        let mut merged = toml::Table::new();

        if let Some(dir) = Self::global_config_dir() {
            if let Some(global) = read_table(&dir.join("config.toml"))? {
                log::debug!("config: global file in {}", dir.display());
                merge_tables(&mut merged, global);
            }
        }

        let project_root = std::env::current_dir()
            .ok()
            .and_then(|cwd| Self::find_project_root(&cwd));
        if let Some(root) = &project_root {
            if let Some(project) = read_table(&root.join(PROJECT_CONFIG_FILE))? {
                log::debug!("config: project file in {}", root.display());
                merge_tables(&mut merged, project);
            }
        }

        let mut config = Self::from_table(merged).context("Failed to parse configuration")?;
        config.base_dir = project_root;
        Ok(config)
    }

    /// Parses one configuration document
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let table: toml::Table =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::from_table(table)
    }

    fn from_table(table: toml::Table) -> Result<Self, ConfigError> {
        let config: Self = toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let tags = &self.todo.tags;
        for (name, value) in [
            ("due", &tags.due),
            ("start", &tags.start),
            ("star", &tags.star),
            ("hidden", &tags.hidden),
            ("recurrence", &tags.recurrence),
        ] {
            if value.is_empty() || value.contains(char::is_whitespace) || value.contains(':') {
                return Err(ConfigError::Invalid(format!(
                    "tag name for '{}' must be a single word, got '{}'",
                    name, value
                )));
            }
        }
        if self.files.todo.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("files.todo must not be empty".to_string()));
        }
        Ok(())
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "todograph", "todograph")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Finds the nearest directory at or above `start` holding a project config file
    pub fn find_project_root(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            if current.join(PROJECT_CONFIG_FILE).is_file() {
                return Some(current);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Resolves a configured path against the base directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match &self.base_dir {
            Some(base) => base.join(path),
            None => path.to_path_buf(),
        }
    }

    pub fn todo_path(&self) -> PathBuf {
        self.resolve(&self.files.todo)
    }

    pub fn done_path(&self) -> PathBuf {
        self.resolve(&self.files.done)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.resolve(&self.files.backup)
    }
}

/// Reads a TOML file; a missing file is `None`
fn read_table(path: &Path) -> Result<Option<toml::Table>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let table = toml::from_str(&content)
        .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))
        .with_context(|| format!("Failed to parse config: {}", path.display()))?;
    Ok(Some(table))
}

/// Overlays `overlay` onto `base`, descending into nested tables
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(nested)) => {
                merge_tables(existing, nested);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IdentifierMode;
    use tempfile::TempDir;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.todo, Settings::default());
        assert_eq!(config.files.todo, PathBuf::from("todo.txt"));
        assert_eq!(config.backup.max_changesets, 5);
        assert_eq!(config.list.limit, None);
    }

    #[test]
    fn parse_sections() {
        let toml = r#"
[todo]
identifiers = "text"
append_parent_projects = true

[todo.tags]
due = "deadline"

[files]
todo = "tasks.txt"

[backup]
max_changesets = 2

[list]
limit = 10
"#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.todo.identifiers, IdentifierMode::Text);
        assert!(config.todo.append_parent_projects);
        assert_eq!(config.todo.tags.due, "deadline");
        assert_eq!(config.todo.tags.start, "t");
        assert_eq!(config.files.todo, PathBuf::from("tasks.txt"));
        assert_eq!(config.files.done, PathBuf::from("done.txt"));
        assert_eq!(config.backup.max_changesets, 2);
        assert_eq!(config.list.limit, Some(10));
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(Config::parse("[todo"), Err(ConfigError::Parse(_))));
        assert!(matches!(
            Config::parse("[todo]\nidentifiers = \"uuid\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            Config::parse("[todo.tags]\ndue = \"my due\""),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn merge_is_deep() {
        let mut base: toml::Table = toml::from_str("[todo]\nidentifiers = \"text\"\nignore_weekends = false").unwrap();
        let overlay: toml::Table = toml::from_str("[todo]\nidentifiers = \"linenumber\"").unwrap();
        merge_tables(&mut base, overlay);

        let config = Config::from_table(base).unwrap();
        assert_eq!(config.todo.identifiers, IdentifierMode::Linenumber);
        assert!(!config.todo.ignore_weekends);
    }

    #[test]
    fn find_project_root() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(PROJECT_CONFIG_FILE), "").unwrap();

        let sub_dir = dir.path().join("sub").join("dir");
        fs::create_dir_all(&sub_dir).unwrap();

        let root = Config::find_project_root(&sub_dir);
        assert_eq!(root.as_deref(), Some(dir.path()));

        let elsewhere = TempDir::new().unwrap();
        assert_eq!(Config::find_project_root(elsewhere.path()), None);
    }

    #[test]
    fn explicit_file_sets_base_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[files]\ntodo = \"list.txt\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.todo_path(), dir.path().join("list.txt"));
        assert_eq!(config.done_path(), dir.path().join("done.txt"));

        assert!(Config::load(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn absolute_paths_are_kept() {
        let dir = TempDir::new().unwrap();
        let absolute = dir.path().join("abs.txt");
        let config = Config {
            base_dir: Some(PathBuf::from("/somewhere/else")),
            ..Config::default()
        };
        assert_eq!(config.resolve(&absolute), absolute);
        assert_eq!(config.resolve(Path::new("rel.txt")), PathBuf::from("/somewhere/else/rel.txt"));
    }
}
