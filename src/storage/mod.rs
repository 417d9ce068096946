//! # Storage Layer
//!
//! Persistence for todograph. Everything here is thin I/O around the
//! domain layer, which never touches the filesystem itself.
//!
//! ## Files
//!
//! | Data | Format | Default location |
//! |------|--------|------------------|
//! | Tasks | todo.txt, one task per line | `todo.txt` |
//! | Archived tasks | todo.txt | `done.txt` |
//! | Undo history | JSON list of changesets | `.todo.txt.bak.json` |
//! | Config | TOML | `.todograph.toml`, global `config.toml` |
//!
//! ## Concurrency Safety
//!
//! - [`TodoFile`] and [`BackupStore`] take `fs2` locks while reading and writing
//! - All rewrites are atomic (temp file + rename)
//!
//! ## Key Types
//!
//! - [`Workspace`] - Entry point: config plus the files it names
//! - [`TodoFile`] - Read/write todo.txt lines
//! - [`BackupStore`] - Changesets for `revert`
//! - [`Config`] - Project and global configuration

mod backup;
mod config;
mod todo_file;
mod workspace;

pub use backup::{BackupStore, Changeset};
pub use config::{BackupConfig, Config, ConfigError, FilesConfig, ListConfig, PROJECT_CONFIG_FILE};
pub use todo_file::TodoFile;
pub use workspace::Workspace;
