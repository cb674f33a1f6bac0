//! CLI commands for Tug.

pub mod package;
pub mod refresh;
pub mod repository;

use crate::context::Context;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Tug - mirror private VCS repositories into a Composer package index
#[derive(Parser, Debug)]
#[command(name = "tug")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (JSON)
    #[arg(short, long, global = true, env = "TUG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Metadata snapshot file
    #[arg(short, long, global = true, env = "TUG_DATA")]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Enable a repository
    Enable(repository::EnableArgs),

    /// Disable a repository (stored versions are kept)
    Disable(repository::DisableArgs),

    /// List enabled repositories
    #[command(alias = "repos")]
    Repositories(repository::RepositoriesArgs),

    /// Refresh package versions
    Refresh(refresh::RefreshArgs),

    /// Delete package versions
    Delete(package::DeleteArgs),

    /// Drop cached VCS data
    #[command(name = "refresh-cache")]
    RefreshCache(refresh::RefreshCacheArgs),

    /// List stored versions of a package
    Versions(package::VersionsArgs),
}

/// Run the selected command.
pub async fn run(command: Commands, ctx: &Context) -> Result<()> {
    match command {
        Commands::Enable(args) => repository::enable(args, ctx).await,
        Commands::Disable(args) => repository::disable(args, ctx).await,
        Commands::Repositories(args) => repository::list(args, ctx).await,
        Commands::Refresh(args) => refresh::run(args, ctx).await,
        Commands::Delete(args) => package::delete(args, ctx).await,
        Commands::RefreshCache(args) => refresh::run_cache(args, ctx).await,
        Commands::Versions(args) => package::versions(args, ctx).await,
    }
}
