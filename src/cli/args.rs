// src/cli/args.rs
use crate::infrastructure::BackendKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)] // Read from `Cargo.toml`
#[command(arg_required_else_help = true, disable_help_subcommand = true)]
pub struct Args {
    /// Path to config file (optional)
    #[arg(long, value_name = "CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Backend to use, overrides config and environment
    #[arg(short, long, value_enum, global = true)]
    pub backend: Option<BackendKind>,

    /// Directory holding the local favorites file
    #[arg(long, value_name = "DIR", global = true)]
    pub favorites_dir: Option<PathBuf>,

    /// Verbosity level (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List poems, optionally narrowed by dynasty, author or keyword
    List {
        /// Dynasty (唐诗), author (李白) or keyword (月)
        #[arg(short, long, value_name = "CATEGORY")]
        category: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a single poem by title or id
    Show {
        /// Poem title
        #[arg(value_name = "TITLE", required_unless_present = "id", conflicts_with = "id")]
        title: Option<String>,

        /// Poem id
        #[arg(long)]
        id: Option<i64>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Toggle the favorite flag of a poem
    Toggle {
        /// Poem id
        #[arg(value_name = "POEM_ID")]
        id: i64,
    },

    /// Create a poem on the backend
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        dynasty: String,
        #[arg(long)]
        content: String,
        #[arg(long)]
        appreciation: Option<String>,
    },

    /// Delete a poem from the backend and from local favorites
    Delete {
        /// Poem id
        #[arg(value_name = "POEM_ID")]
        id: i64,
    },

    /// Insert every poem from a JSON array file
    Import {
        /// Path to JSON file
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Show or clear the favorites stored on this device
    Favorites {
        /// Remove all local favorites
        #[arg(long)]
        clear: bool,
    },

    /// Check that the backend is reachable
    Health,
}
