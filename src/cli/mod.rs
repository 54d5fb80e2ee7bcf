//! CLI interface for recipevault.
//!
//! Provides command-line argument parsing using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command-line interface for recipevault.
#[derive(Parser)]
#[command(name = "recipevault")]
#[command(author, version, about = "Versioned recipe store with photo attachments", long_about = None)]
pub struct Cli {
    /// Recipe root directory (overrides the config file and $RECIPES_DIR).
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// List a directory (photos are hidden).
    List {
        /// Directory relative to the root.
        #[arg(default_value = "")]
        path: String,

        /// List every file below the directory instead.
        #[arg(short, long)]
        recursive: bool,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Print a document.
    Read {
        /// Document path (e.g., "desserts/cake.md").
        path: String,

        /// Print the document with its version as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Write a document from a file or stdin.
    Write {
        /// Document path.
        path: String,

        /// Read content from file instead of stdin.
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Only overwrite if the document is still at this version.
        #[arg(short = 'e', long)]
        expected_version: Option<u64>,
    },

    /// Create a recipe from the template (".md" is appended if missing).
    New {
        /// Recipe path (e.g., "desserts/carrot-cake").
        path: String,
    },

    /// Delete a document and its photo.
    Delete {
        /// Document path.
        path: String,
    },

    /// Move a document and its photo.
    Move {
        /// Current path.
        from: String,
        /// New path; must not exist.
        to: String,
    },

    /// Create a directory.
    Mkdir {
        /// Directory path.
        path: String,
    },

    /// Remove an empty directory.
    Rmdir {
        /// Directory path.
        path: String,
    },

    /// Search recipe contents.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results to return.
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Find files by name.
    Find {
        /// The file name query.
        query: String,

        /// Maximum number of results to return.
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Check a recipe's structure.
    Validate {
        /// Recipe path.
        path: String,
    },

    /// Manage recipe photos.
    Photo {
        #[command(subcommand)]
        action: PhotoCommand,
    },

    /// Start the MCP server for AI editor integration.
    #[cfg(feature = "mcp")]
    Serve,
}

/// Photo subcommands. Recipes may be named with or without ".md".
#[derive(Subcommand)]
pub enum PhotoCommand {
    /// Attach a JPEG photo to a recipe.
    Put {
        /// Recipe path.
        recipe: String,

        /// JPEG file to upload.
        file: PathBuf,

        /// Declared MIME type of the file.
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Write a recipe's photo to a file or stdout.
    Get {
        /// Recipe path.
        recipe: String,

        /// Output file (stdout if omitted).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Remove a recipe's photo.
    Delete {
        /// Recipe path.
        recipe: String,
    },

    /// Print whether a recipe has a photo.
    Exists {
        /// Recipe path.
        recipe: String,
    },
}
