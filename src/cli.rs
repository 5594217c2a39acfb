//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Weft static site generator CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root (default: current directory)
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Config file name (default: weft.toml)
    #[arg(short = 'C', long, default_value = "weft.toml")]
    pub config: PathBuf,

    /// Source directory path (relative to project root)
    #[arg(short, long)]
    pub src: Option<PathBuf>,

    /// Output directory path (relative to project root)
    #[arg(short, long)]
    pub dest: Option<PathBuf>,

    /// Silence pipeline diagnostics
    #[arg(short, long)]
    pub quiet: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Shared build arguments for Build and Serve commands
#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Clean output directory completely before building
    #[arg(long)]
    pub clean: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create the source layout and a default weft.toml
    Init {
        /// Also write starter templates, components and content
        #[arg(long)]
        seed: bool,
    },

    /// Build the whole site once
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Serve the site. Rebuild on change automatically
    Serve {
        #[command(flatten)]
        build_args: BuildArgs,

        /// Interface to bind on
        #[arg(short, long)]
        interface: Option<String>,

        /// The port you should provide
        #[arg(short, long)]
        port: Option<u16>,

        /// enable watch
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        watch: Option<bool>,
    },
}

impl Cli {
    /// `--clean` given to `build` or `serve`.
    pub const fn clean(&self) -> bool {
        match &self.command {
            Commands::Build { build_args } | Commands::Serve { build_args, .. } => build_args.clean,
            Commands::Init { .. } => false,
        }
    }
}
