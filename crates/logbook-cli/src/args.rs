use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "logbook")]
#[command(about = "Browse and index AI coding-agent session logs", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Override the state directory (cache tables and config)
    #[arg(long, global = true)]
    pub state_dir: Option<String>,

    /// Additional log root to index (repeatable)
    #[arg(long = "root", global = true)]
    pub roots: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List indexed sessions, newest first
    List {
        #[arg(long, default_value_t = 50)]
        limit: usize,

        /// Emit JSON instead of the table view
        #[arg(long)]
        json: bool,
    },

    /// Show the parsed conversation for one session log
    Show {
        path: PathBuf,

        /// Emit JSON instead of the transcript view
        #[arg(long)]
        json: bool,
    },

    /// Watch all roots and stream index updates until interrupted
    Watch,

    /// Print the log roots that would be indexed
    Roots,
}
