use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fluxforge")]
#[command(author, version, about = "Flux container rewrite tool with per-record warp transforms")]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rewrite a flux container, applying the warp to every entry
    Warp {
        /// Output container to create
        #[arg(required = true)]
        output: PathBuf,

        /// Input container to read
        #[arg(required = true)]
        input: PathBuf,

        /// Copy entries through unchanged instead of warping
        #[arg(long)]
        no_warp: bool,

        /// Lower edge of the resampled energy range in GeV
        #[arg(long, default_value_t = 0.01)]
        e_min: f64,

        /// Upper edge of the resampled energy range in GeV
        #[arg(long, default_value_t = 20.0)]
        e_max: f64,
    },

    /// Print entries and their metadata in stream order
    Dump {
        /// Container file to dump
        #[arg(required = true)]
        file: PathBuf,

        /// Number of entries to print (all if omitted)
        #[arg(short = 'n', long)]
        entries: Option<u64>,
    },

    /// Print the metadata records
    Meta {
        /// Container file to read
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Display version information
    Version,
}
