//! Main CLI application structure

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use super::output::{Output, OutputFormat};
use super::{archive, dep, list, task};
use crate::storage::{Workspace, PROJECT_CONFIG_FILE};

#[derive(Parser)]
#[command(name = "todograph")]
#[command(author, version, about = "todo.txt task manager with task dependencies")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Todo file to use instead of the configured one
    #[arg(long, short = 't', global = true, env = "TODOGRAPH_FILE")]
    pub file: Option<PathBuf>,

    /// Configuration file to use instead of the global and project files
    #[arg(long, short = 'c', global = true, env = "TODOGRAPH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a project configuration and an empty todo file
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Add a task
    ///
    /// Examples:
    ///   todograph add "(A) Call mom +family due:tomorrow"
    ///   todograph add "Write tests before:3"   # task 3 waits for this one
    ///   todograph add "Draft outline partof:2" # subtask of task 2
    Add {
        /// Task text (words are joined with spaces)
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// List tasks
    #[command(alias = "list")]
    Ls(list::LsArgs),

    /// Mark tasks as done
    Do {
        /// Task identifiers
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,

        /// Also complete unfinished subtasks
        #[arg(long)]
        children: bool,
    },

    /// Delete tasks
    #[command(alias = "rm")]
    Del {
        /// Task identifiers
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,

        /// Keep id:/p: tags on related tasks
        #[arg(long)]
        leave_tags: bool,
    },

    /// Set the priority of tasks
    ///
    /// Example: todograph pri 1 4 B
    Pri {
        /// Task identifiers followed by the priority letter
        #[arg(required = true, num_args = 2..)]
        args: Vec<String>,
    },

    /// Remove the priority of tasks
    Depri {
        /// Task identifiers
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },

    /// Set, change or remove a tag
    Tag(task::TagArgs),

    /// Append text to a task
    Append {
        /// Task identifier
        id: String,

        /// Text to append
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Manage dependencies between tasks
    #[command(subcommand)]
    Dep(dep::DepCommands),

    /// Reorder the todo file
    Sort {
        /// Sort expression (defaults to the configured one)
        expression: Option<String>,
    },

    /// Move completed tasks to the done file
    Archive,

    /// Undo the last change
    Revert,
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };

    // RUST_LOG overrides the default level
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .try_init();
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);
    let output = Output::new(cli.format, cli.verbose);

    output.verbose("todograph starting");

    let config_path = cli.config;
    let file = cli.file;
    let open = || -> Result<Workspace> {
        let workspace = Workspace::load_from(config_path.as_deref(), file.as_deref())?;
        output.verbose_ctx(
            "workspace",
            &format!("todo file: {}", workspace.todo_file().path().display()),
        );
        Ok(workspace)
    };

    match cli.command {
        Commands::Init { path } => init(&output, &path)?,
        Commands::Add { text } => task::add(&output, &mut open()?, &text.join(" "))?,
        Commands::Ls(args) => list::ls(&output, &mut open()?, &args)?,
        Commands::Do { ids, children } => task::complete(&output, &mut open()?, &ids, children)?,
        Commands::Del { ids, leave_tags } => task::delete(&output, &mut open()?, &ids, leave_tags)?,
        Commands::Pri { args } => task::prioritize(&output, &mut open()?, &args)?,
        Commands::Depri { ids } => task::deprioritize(&output, &mut open()?, &ids)?,
        Commands::Tag(args) => task::tag(&output, &mut open()?, &args)?,
        Commands::Append { id, text } => task::append(&output, &mut open()?, &id, &text.join(" "))?,
        Commands::Dep(cmd) => dep::run(cmd, &output, &mut open()?)?,
        Commands::Sort { expression } => list::sort(&output, &mut open()?, expression.as_deref())?,
        Commands::Archive => archive::archive(&output, &mut open()?)?,
        Commands::Revert => archive::revert(&output, &mut open()?)?,
    }

    Ok(())
}

fn init(output: &Output, path: &Path) -> Result<()> {
    output.verbose_ctx("init", &format!("Initializing at: {}", path.display()));

    fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory: {}", path.display()))?;

    let config_path = path.join(PROJECT_CONFIG_FILE);
    if !config_path.exists() {
        let default_config = r#"# todograph configuration

[todo]
# "linenumber" or "text"
identifiers = "linenumber"
sort_string = "desc:importance,due,desc:priority"

[files]
todo = "todo.txt"
done = "done.txt"
"#;
        fs::write(&config_path, default_config)
            .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
    }

    let todo_path = path.join("todo.txt");
    if !todo_path.exists() {
        fs::write(&todo_path, "")
            .with_context(|| format!("Failed to create todo file: {}", todo_path.display()))?;
    }

    output.success(&format!("Initialized todograph in {}", path.display()));
    Ok(())
}
