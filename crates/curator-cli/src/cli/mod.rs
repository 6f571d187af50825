mod config;
mod init;
mod purge;
mod repos;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "curator")]
#[command(about = "Retention and purge tool for Maven-layout repositories", long_about = None)]
pub struct Cli {
    /// Enable verbose output (info logs)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a curator configuration
    Init(init::InitArgs),

    /// Run the configured purge policies
    Purge(purge::PurgeArgs),

    /// Manage the configured repositories
    Repos(repos::ReposArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

/// Execute the CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init(args) => init::execute(args).await,
        Commands::Purge(args) => purge::execute(args).await,
        Commands::Repos(args) => repos::execute(args).await,
        Commands::Config(args) => config::execute(args).await,
    }
}
