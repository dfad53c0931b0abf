use crate::filter::TrackerFilter;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "HabitKeeper",
    about = "Habit tracking with schedules, filters and completion statistics"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    Category {
        #[command(subcommand)]
        command: CategoryCommands,
    },
    Tracker {
        #[command(subcommand)]
        command: TrackerCommands,
    },
    /// Mark a tracker completed on a day (default: today)
    Done {
        tracker: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Remove the completion of a tracker on a day (default: today)
    Undo {
        tracker: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Show trackers active on a day
    List {
        #[arg(long)]
        date: Option<String>,
        #[arg(long, value_enum, default_value_t = TrackerFilter::All)]
        filter: TrackerFilter,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    Stats {
        /// Also write Markdown and JSON reports to the report directory
        #[arg(long, default_value_t = false)]
        save: bool,
    },
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    Status,
}

#[derive(Debug, Subcommand)]
pub enum CategoryCommands {
    Add { name: String },
    List,
}

#[derive(Debug, Subcommand)]
pub enum TrackerCommands {
    Add(TrackerArgs),
    Update {
        tracker: String,
        #[command(flatten)]
        fields: TrackerUpdateArgs,
    },
    Delete {
        tracker: String,
    },
    /// Pin or unpin a tracker
    Pin {
        tracker: String,
    },
}

#[derive(Debug, Args)]
pub struct TrackerArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub category: String,
    /// Comma separated weekdays (mon,wed or daily). Omit for a one-off event.
    #[arg(long, default_value = "")]
    pub days: String,
    #[arg(long)]
    pub emoji: Option<String>,
    #[arg(long)]
    pub color: Option<String>,
}

#[derive(Debug, Args)]
pub struct TrackerUpdateArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub days: Option<String>,
    #[arg(long)]
    pub emoji: Option<String>,
    #[arg(long)]
    pub color: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Set { key: String, value: String },
    Get { key: String },
}
