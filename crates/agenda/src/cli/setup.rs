use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "agenda", bin_name = "agenda", version)]
#[command(about = "Weekly availability editor for practitioners", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Practitioner whose schedule to work on
    #[arg(short, long, global = true, default_value = "default", help_heading = "Options")]
    pub owner: String,

    /// Directory holding schedules, blackouts and agenda.toml [env: AGENDA_DATA_DIR]
    #[arg(long, global = true, help_heading = "Options")]
    pub data_dir: Option<PathBuf>,

    /// Any date inside the week to work on (YYYY-MM-DD). Block edits default to
    /// the week that shows the block, starting from today
    #[arg(short, long, global = true, help_heading = "Options")]
    pub week: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true, help_heading = "Options")]
    pub json: bool,

    /// Verbose output (debug logs on stderr)
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Every block becomes a rule for its weekday, in all weeks
    Weekly,
    /// Every block applies to its exact date only
    Date,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the week: availability, blackouts and ids
    #[command(alias = "w")]
    Week {
        /// Any date inside the week (defaults to --week, then today)
        date: Option<String>,
    },

    /// Show which availability applies on one date
    #[command(alias = "d")]
    Day {
        /// The date (YYYY-MM-DD)
        date: String,
    },

    /// Add blocks, all or nothing
    #[command(alias = "a")]
    Add {
        /// Whether blocks recur weekly or apply to their date only
        #[arg(short, long, value_enum, default_value_t = ModeArg::Date)]
        mode: ModeArg,

        /// Blocks as DATE@HH:MM-HH:MM (e.g. 2024-05-06@08:00-12:00)
        #[arg(required = true, num_args = 1..)]
        blocks: Vec<String>,
    },

    /// Move a block, keeping its duration
    #[command(alias = "mv")]
    Move {
        /// Block id as shown by `agenda week`
        id: String,

        /// New position as DATE@HH:MM
        to: String,
    },

    /// Change a block's start and end on its date
    Resize {
        /// Block id as shown by `agenda week`
        id: String,

        /// New bounds as HH:MM-HH:MM
        range: String,
    },

    /// Delete a block; template ids remove the rule from every week
    #[command(alias = "rm")]
    Delete {
        /// Block id as shown by `agenda week`
        id: String,
    },

    /// Print the stored schedule document
    Show,
}
