use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "rostersync",
    version,
    about = "Overlay pending shift edits on a remote schedule baseline and compute sync plans"
)]
pub struct Cli {
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub format: Format,

    /// Directory holding roster.json, templates.json and the per-month
    /// schedule-YYYY-MM.json fixtures
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the effective grid (baseline plus pending edits) for a month
    Grid {
        #[arg(long)]
        year: i32,

        #[arg(long)]
        month: u8,

        /// Limit output to one line; all lines when omitted
        #[arg(long)]
        line: Option<String>,
    },

    /// Compute the create/update/delete plan for one line
    Plan {
        #[arg(long)]
        year: i32,

        #[arg(long)]
        month: u8,

        #[arg(long)]
        line: String,

        /// Treat the plan as confirmed: promote the effective grid to the
        /// new baseline and clear the line's pending edits
        #[arg(long)]
        confirm: bool,
    },

    /// Manage pending edits
    #[command(subcommand)]
    Overlay(OverlayAction),
}

#[derive(Subcommand)]
pub enum OverlayAction {
    /// Record (or replace) a pending shift for one cell
    Set {
        #[arg(long)]
        line: String,

        #[arg(long)]
        year: i32,

        #[arg(long)]
        month: u8,

        #[arg(long)]
        employee: u64,

        #[arg(long)]
        day: u8,

        /// Local start time, HH:MM
        #[arg(long)]
        start: String,

        /// Local end time, HH:MM; not after start means crossing midnight
        #[arg(long)]
        end: String,

        #[arg(long)]
        template: Option<u32>,

        #[arg(long)]
        amount: Option<u32>,
    },

    /// Record a pending deletion for one cell
    Delete {
        #[arg(long)]
        line: String,

        #[arg(long)]
        year: i32,

        #[arg(long)]
        month: u8,

        #[arg(long)]
        employee: u64,

        #[arg(long)]
        day: u8,
    },

    /// Drop every pending edit for one line and month
    Clear {
        #[arg(long)]
        line: String,

        #[arg(long)]
        year: i32,

        #[arg(long)]
        month: u8,
    },
}
