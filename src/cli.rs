use clap::{Parser, Subcommand};
use mq_core::{ItemId, UserId};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "marquee")]
#[command(author, version, about = "Next-up episodes and box sets for a media library")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the next episode to watch for each series in progress
    NextUp {
        /// User to build the list for
        #[arg(long)]
        user: UserId,

        /// Only this series
        #[arg(long)]
        series: Option<ItemId>,

        /// Only series under this folder
        #[arg(long)]
        parent: Option<ItemId>,

        /// Also suggest episodes to rewatch
        #[arg(long)]
        rewatch: bool,

        /// Never suggest the first episode of an unstarted series
        #[arg(long)]
        disable_first_episode: bool,

        /// Skip this many entries
        #[arg(long, default_value = "0")]
        start: usize,

        /// Page size (defaults to next_up.default_limit)
        #[arg(long)]
        limit: Option<usize>,

        /// Report the total number of entries
        #[arg(long)]
        count: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace box set members in a list of items with their box sets
    Collapse {
        /// User the list is shown to
        #[arg(long)]
        user: UserId,

        /// Items to collapse, in display order
        #[arg(required = true)]
        items: Vec<ItemId>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create and edit box sets
    Collection {
        /// Print each published event as a JSON line after the edit
        #[arg(long)]
        events: bool,

        #[command(subcommand)]
        action: CollectionAction,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

#[derive(Subcommand)]
pub enum CollectionAction {
    /// Create a box set
    Create {
        /// Box set name
        name: String,

        /// Folder to create the box set in
        #[arg(long)]
        parent: Option<ItemId>,

        /// Initial members
        items: Vec<ItemId>,
    },

    /// Add items to a box set
    Add {
        /// Box set to edit
        collection: ItemId,

        /// Items to add
        #[arg(required = true)]
        items: Vec<ItemId>,
    },

    /// Remove items from a box set
    Remove {
        /// Box set to edit
        collection: ItemId,

        /// Items to remove
        #[arg(required = true)]
        items: Vec<ItemId>,
    },
}
