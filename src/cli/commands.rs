use clap::{Parser, Subcommand};

use crate::config::Surface;

#[derive(Parser, Debug)]
#[command(name = "jotter")]
#[command(version, about = "A tabbed note workspace with debounced saving")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new jotter workspace in the current directory
    Init {
        /// Editor surface, sets the default save delay (desktop, mobile)
        #[arg(long, default_value = "desktop")]
        surface: Surface,
    },

    /// List notes, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a new note
    Add {
        /// Note title (defaults to "New Note")
        #[arg(long, short = 't')]
        title: Option<String>,

        /// Read content from stdin
        #[arg(long)]
        stdin: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a single note
    Show {
        /// Note ID (full UUID or unique prefix like "a1b2c")
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change a note's title or content
    Edit {
        /// Note ID (full UUID or unique prefix)
        id: String,

        /// New title
        #[arg(long, short = 't')]
        title: Option<String>,

        /// New content
        #[arg(long, short = 'c', conflicts_with = "stdin")]
        content: Option<String>,

        /// Read new content from stdin
        #[arg(long)]
        stdin: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a note
    Delete {
        /// Note ID (full UUID or unique prefix)
        id: String,

        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Find notes by title
    Search {
        /// Search terms, all must appear in the title
        query: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive session with tabs and background saving
    Shell,
}
