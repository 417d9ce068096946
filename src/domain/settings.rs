//! Engine settings
//!
//! Everything the engine needs to know about user preferences lives in a
//! single [`Settings`] value that is built once per process (usually from the
//! `[todo]` section of the configuration file) and passed by reference to the
//! filters, sorters and importance functions.

use serde::{Deserialize, Serialize};

/// How tasks are addressed on the command line and in listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierMode {
    /// 1-based position in the todo file
    #[default]
    Linenumber,
    /// Short base-36 codes derived from the task text
    Text,
}

/// Names of the tags that carry engine-level meaning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagNames {
    pub due: String,
    pub start: String,
    pub star: String,
    pub hidden: String,
    pub recurrence: String,
}

impl Default for TagNames {
    fn default() -> Self {
        Self {
            due: "due".to_string(),
            start: "t".to_string(),
            star: "star".to_string(),
            hidden: "h".to_string(),
            recurrence: "rec".to_string(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub tags: TagNames,

    /// Whether tasks due next Monday get a bonus on Fridays and weekends
    pub ignore_weekends: bool,

    pub identifiers: IdentifierMode,

    /// Sort expression used when none is given
    pub sort_string: String,

    /// Copy the parent's projects onto a new child in `add_dependency`
    pub append_parent_projects: bool,

    /// Copy the parent's contexts onto a new child in `add_dependency`
    pub append_parent_contexts: bool,

    /// Add a creation date to new tasks added through the CLI
    pub auto_creation_date: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tags: TagNames::default(),
            ignore_weekends: true,
            identifiers: IdentifierMode::Linenumber,
            sort_string: "desc:importance,due,desc:priority".to_string(),
            append_parent_projects: false,
            append_parent_contexts: false,
            auto_creation_date: true,
        }
    }
}
