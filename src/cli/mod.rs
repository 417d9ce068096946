//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Setup and listing | `init`, `ls`, `sort` |
//! | Task | Editing tasks | `add`, `do`, `del`, `pri`, `depri`, `tag`, `append` |
//! | Dependencies | Task graph | `dep add`, `dep rm`, `dep ls`, `dep clean` |
//! | History | Done file and undo | `archive`, `revert` |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output; `RUST_LOG` controls the
//! engine's log messages:
//! ```bash
//! todograph --verbose ls +work
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod archive;
mod dep;
mod list;
mod output;
mod task;

pub use app::{Cli, Commands, run};
pub use output::{Output, OutputFormat};
