use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "cssnip",
    bin_name = "cssnip",
    version,
    about = "Manage message-linked CSS snippets inside one shared stylesheet",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the stylesheet buffer (defaults to the platform data dir)
    #[arg(short, long, global = true)]
    pub buffer: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract the css from a message and embed it as a snippet
    Add {
        /// Message id the snippet will be linked to
        id: String,
        /// Read the message text from a file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Author id recorded with the snippet
        #[arg(long)]
        author: Option<String>,
    },
    /// Remove a snippet and erase its record from the buffer
    Delete { id: String },
    /// Re-embed a disabled snippet
    Enable { id: String },
    /// Pull a snippet out of the buffer but keep it cached
    Disable { id: String },
    /// Enable or disable, whichever applies
    Toggle { id: String },
    /// List snippets
    List {
        /// Include disabled snippets
        #[arg(short, long)]
        cached: bool,
        /// Show snippet contents too
        #[arg(short, long)]
        details: bool,
    },
    /// Print one snippet's content
    Show { id: String },
    /// Re-parse the buffer and rebuild the index
    Fetch,
    /// Watch the buffer and reconcile on external edits
    Watch,
}
