//! Domain models for todograph
//!
//! The todo.txt engine: parsing, tasks, the dependency graph, the task
//! collection and its sorted/filtered views. Contains no I/O.

pub mod collection;
pub mod date;
pub mod filter;
pub mod graph;
pub mod id;
pub mod importance;
pub mod parser;
pub mod recurrence;
pub mod settings;
pub mod sorter;
pub mod task;
pub mod view;

pub use collection::{TagChoice, TaskCollection, TodoError};
pub use filter::Filter;
pub use graph::DependencyGraph;
pub use id::TaskKey;
pub use parser::{parse, ParsedFields};
pub use settings::{IdentifierMode, Settings, TagNames};
pub use sorter::Sorter;
pub use task::Task;
pub use view::View;
