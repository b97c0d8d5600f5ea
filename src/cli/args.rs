//! Command-line arguments for the `argot` manifest tool.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "argot",
    version,
    about = "Compile, inspect and diff chat-bot command manifests."
)]
pub struct ArgotArgs {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Framework configuration (prefixes, log filter).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the registration payload of every compiled root.
    Schema {
        #[arg(required = true)]
        manifest: PathBuf,
        /// Only print this root.
        #[arg(long)]
        root: Option<String>,
    },
    /// Compile every manifest under a directory and report rejected roots.
    Check {
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Print the usage line of every routable command.
    Usage {
        #[arg(required = true)]
        manifest: PathBuf,
        /// Prefix shown in front of each line; defaults to the first configured prefix.
        #[arg(long)]
        prefix: Option<String>,
    },
    /// Compare a registration snapshot with the root compiled from a manifest.
    Diff {
        #[arg(required = true)]
        snapshot: PathBuf,
        #[arg(required = true)]
        manifest: PathBuf,
    },
}
