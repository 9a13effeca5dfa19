use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dp", about = concat!("dayplan v", env!("CARGO_PKG_VERSION"), " - build day / destroy day schedules"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Sign in as this user (admin or user)
    #[arg(long = "as", global = true, default_value = "user")]
    pub user: String,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Data directory (overrides config and DATA_PATH)
    #[arg(short = 'D', long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Config file (default: ./dayplan.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the data directory and default documents
    Init,
    /// Show a project's schedule
    List(ProjectArg),
    /// Show schedule statistics
    Stats(ProjectArg),
    /// Add a main task
    Add(AddArgs),
    /// Add a subtask to a main task
    Sub(SubArgs),
    /// Set one field on a task
    Set(SetArgs),
    /// Delete a task
    Rm(TaskRef),
    /// Lock or unlock a task
    Lock(TaskRef),
    /// Expand or collapse a main task
    Expand(ExpandArgs),
    /// List projects
    Projects,
    /// Update a project's title and date
    Project(ProjectUpdateArgs),
    /// Backup maintenance
    Backup(BackupCmd),
    /// Check that the data files are usable
    Health,
}

#[derive(Args)]
pub struct ProjectArg {
    /// build or destroy
    pub project: String,
}

#[derive(Args)]
pub struct AddArgs {
    pub project: String,
    pub title: String,
}

#[derive(Args)]
pub struct SubArgs {
    pub project: String,
    /// Main task that gets the new subtask
    pub parent: String,
}

#[derive(Args)]
pub struct SetArgs {
    pub project: String,
    pub id: String,
    /// title, start, end, status or progress
    pub field: String,
    /// New value (empty clears a time)
    #[arg(allow_hyphen_values = true)]
    pub value: String,
    /// Parent main task, when the target is a subtask
    #[arg(long)]
    pub parent: Option<String>,
}

#[derive(Args)]
pub struct TaskRef {
    pub project: String,
    pub id: String,
    /// Parent main task, when the target is a subtask
    #[arg(long)]
    pub parent: Option<String>,
}

#[derive(Args)]
pub struct ExpandArgs {
    pub project: String,
    pub id: String,
}

#[derive(Args)]
pub struct ProjectUpdateArgs {
    pub project: String,
    /// New title (default title when omitted)
    #[arg(long)]
    pub title: Option<String>,
    /// Project date, YYYY-MM-DD (cleared when omitted)
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Args)]
pub struct BackupCmd {
    #[command(subcommand)]
    pub action: BackupAction,
}

#[derive(Subcommand)]
pub enum BackupAction {
    /// Delete backups older than N days
    Prune {
        /// Age cutoff in days (default: storage.retention_days)
        #[arg(long)]
        days: Option<i64>,
    },
}
