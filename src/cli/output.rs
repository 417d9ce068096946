//! Output formatting for CLI commands

use std::collections::HashMap;

use serde::Serialize;

use crate::domain::{ParsedFields, TaskCollection, TaskKey};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Output helper for consistent formatting
pub struct Output {
    format: OutputFormat,
    verbose: bool,
}

impl Output {
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        Self { format, verbose }
    }

    /// Prints a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Text => println!("{}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "success": true,
                        "message": message
                    })
                );
            }
        }
    }

    /// Prints an error message
    pub fn error(&self, message: &str) {
        match self.format {
            OutputFormat::Text => eprintln!("Error: {}", message),
            OutputFormat::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({
                        "success": false,
                        "error": message
                    })
                );
            }
        }
    }

    /// Prints structured data
    pub fn data<T: Serialize>(&self, data: &T) {
        match self.format {
            OutputFormat::Text => {
                if let Ok(json) = serde_json::to_string_pretty(data) {
                    println!("{}", json);
                }
            }
            OutputFormat::Json => {
                if let Ok(json) = serde_json::to_string(data) {
                    println!("{}", json);
                }
            }
        }
    }

    /// Prints tasks, one per line in text mode or as a JSON array
    pub fn tasks(&self, list: &TaskCollection, keys: &[TaskKey]) {
        let ids = list.identifiers();
        if self.is_json() {
            let records: Vec<TaskRecord> = keys
                .iter()
                .filter_map(|key| TaskRecord::new(list, &ids, *key))
                .collect();
            self.data(&records);
            return;
        }

        let width = ids.values().map(String::len).max().unwrap_or(1);
        for key in keys {
            if let (Some(id), Some(task)) = (ids.get(key), list.get(*key)) {
                println!("{:>width$} {}", id, task.source(), width = width);
            }
        }
    }

    /// Returns true if using JSON format
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Returns true if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Prints a verbose debug message (only when --verbose is set)
    pub fn verbose(&self, message: &str) {
        if self.verbose {
            eprintln!("[verbose] {}", message);
        }
    }

    /// Prints a verbose debug message with context (only when --verbose is set)
    pub fn verbose_ctx(&self, context: &str, message: &str) {
        if self.verbose {
            eprintln!("[verbose:{}] {}", context, message);
        }
    }
}

/// JSON shape of one task
#[derive(Debug, Serialize)]
pub struct TaskRecord<'a> {
    pub id: &'a str,
    pub number: usize,
    pub source: &'a str,
    #[serde(flatten)]
    pub fields: &'a ParsedFields,
}

impl<'a> TaskRecord<'a> {
    pub fn new(
        list: &'a TaskCollection,
        ids: &'a HashMap<TaskKey, String>,
        key: TaskKey,
    ) -> Option<Self> {
        let task = list.get(key)?;
        Some(Self {
            id: ids.get(&key)?,
            number: list.number(key)?,
            source: task.source(),
            fields: task.fields(),
        })
    }
}
