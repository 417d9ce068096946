//! todograph - a todo.txt task manager with task dependencies
//!
//! Tasks live in a plain todo.txt file. Dependencies between tasks are
//! expressed with `id:`/`p:` tags and kept consistent by a dependency
//! graph, which drives filtering ("what can I work on now?") and sorting.

pub mod cli;
pub mod domain;
pub mod storage;

pub use domain::{Task, TaskCollection, TaskKey, TodoError};
