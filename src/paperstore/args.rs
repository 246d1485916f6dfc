use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "paperstore", version)]
#[command(about = "File-backed PDF library with generated covers", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Store root (defaults to the platform data directory)
    #[arg(long, global = true, env = "PAPERSTORE_ROOT")]
    pub root: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a PDF to the store
    Add {
        /// Path to the PDF
        file: PathBuf,

        /// Title (defaults to the file name)
        #[arg(short, long)]
        title: Option<String>,

        /// Comma-separated tags
        #[arg(long, default_value = "")]
        tags: String,

        /// PNG to use as the cover instead of rendering one
        #[arg(long)]
        cover: Option<PathBuf>,
    },

    /// List documents, newest first
    #[command(alias = "ls")]
    List,

    /// Show one document's metadata
    Show { id: String },

    /// Delete a document
    #[command(alias = "delete")]
    Rm { id: String },

    /// Resolve a document's cover, rendering it if needed
    Cover {
        id: String,

        /// Copy the cover to this path instead of printing its location
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print the path of a document's PDF
    File { id: String },

    /// Rebuild the index from per-document metadata
    Doctor,

    /// Report store and renderer status as JSON
    Health,

    /// Get or set configuration
    Config {
        /// Configuration key (e.g., renderer)
        key: Option<String>,

        /// Value to set (if omitted, prints current value)
        value: Option<String>,
    },
}
