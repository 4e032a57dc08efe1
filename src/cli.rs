// src/cli.rs
//! CLI definitions for pantry
//!
//! Every command takes a recipe (a bundled recipe name or a path to a
//! recipe file) followed by build flags written the Homebrew way:
//! `with-qt`, `without-python`, `contrib`, `cuda-generation=Kepler`.

use clap::{Args, Parser, Subcommand};
use pantry::platform::{OsFamily, OsVersion};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pantry")]
#[command(author = "Pantry Contributors")]
#[command(version)]
#[command(about = "Resolve, plan and cook declarative package build recipes", long_about = None)]
pub struct Cli {
    /// Settings file (default: ~/.config/pantry/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the options a recipe recognizes and their resolved values
    Options {
        #[command(flatten)]
        target: Target,
    },

    /// Show the effective dependency set
    Deps {
        #[command(flatten)]
        target: Target,
    },

    /// Validate a recipe and an option combination without building
    Check {
        #[command(flatten)]
        target: Target,
    },

    /// Compute the full build plan: arguments, environment and edits
    Plan {
        #[command(flatten)]
        target: Target,
    },

    /// Fetch, configure, build and install a recipe
    Cook {
        #[command(flatten)]
        target: Target,

        /// Directory for caching downloaded sources
        #[arg(long)]
        source_cache: Option<PathBuf>,

        /// Number of parallel build jobs
        #[arg(short, long)]
        jobs: Option<u32>,

        /// Keep the build directory after completion
        #[arg(long)]
        keep_builddir: bool,

        /// Only fetch sources, don't build
        #[arg(long)]
        fetch_only: bool,
    },
}

/// Recipe, platform and build flags shared by every command
#[derive(Args, Debug, Clone)]
pub struct Target {
    /// Bundled recipe name or path to a recipe file
    pub recipe: String,

    /// Build flags: with-X, without-X, X or X=value
    pub flags: Vec<String>,

    /// Set an option explicitly (repeatable)
    #[arg(long = "set", value_name = "ID=VALUE")]
    pub set: Vec<String>,

    #[command(flatten)]
    pub platform: PlatformArgs,
}

/// Overrides of the detected platform
#[derive(Args, Debug, Clone, Default)]
pub struct PlatformArgs {
    /// Target OS family (linux, macos, freebsd, windows)
    #[arg(long)]
    pub os: Option<OsFamily>,

    /// Target OS release, e.g. 10.13
    #[arg(long, value_name = "VERSION")]
    pub os_version: Option<OsVersion>,

    /// Target CPU architecture
    #[arg(long)]
    pub arch: Option<String>,

    /// Compiler build number (Apple clang)
    #[arg(long, value_name = "BUILD")]
    pub toolchain_version: Option<u32>,
}
