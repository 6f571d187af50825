use anyhow::Result;
use clap::{Args, Subcommand};
use curator::config::ConfigService;
use curator::repository::ManagedRepository;
use std::path::PathBuf;

#[derive(Args)]
pub struct ReposArgs {
    #[command(subcommand)]
    command: Option<ReposCommands>,

    /// Project root directory
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
}

#[derive(Subcommand)]
enum ReposCommands {
    /// List configured repositories and their retention settings
    List,

    /// Register a managed repository
    Add {
        /// Repository identifier
        id: String,
        /// Root of the Maven-layout tree
        path: PathBuf,
    },

    /// Remove a managed repository from the configuration
    Remove {
        /// Repository identifier
        id: String,
    },
}

pub async fn execute(args: ReposArgs) -> Result<()> {
    let config_service = ConfigService::new(&args.root);
    if !config_service.exists() {
        return Err(anyhow::anyhow!(
            "Curator not initialized. Run 'curator init' first."
        ));
    }

    match args.command.unwrap_or(ReposCommands::List) {
        ReposCommands::List => {
            let config = config_service.load()?;
            if config.repositories.is_empty() {
                println!("No repositories configured.");
                return Ok(());
            }
            for repo in &config.repositories {
                print_repository(repo);
            }
        },

        ReposCommands::Add { id, path } => {
            let added = config_service.add_repository(ManagedRepository::new(&id, path))?;
            if !added {
                return Err(anyhow::anyhow!("Repository '{}' already exists", id));
            }
            println!("Added repository '{}'", id);
        },

        ReposCommands::Remove { id } => {
            if !config_service.remove_repository(&id)? {
                return Err(anyhow::anyhow!("Unknown repository: {}", id));
            }
            println!("Removed repository '{}'", id);
        },
    }

    Ok(())
}

fn print_repository(repo: &ManagedRepository) {
    println!("{} ({})", repo.id, repo.root.display());
    println!("  retention_count: {}", repo.retention_count);
    println!("  retention_period_days: {}", repo.retention_period_days);
    println!(
        "  delete_released_snapshots: {}",
        repo.delete_released_snapshots
    );
    println!(
        "  cross_repository_search: {}",
        repo.cross_repository_search
    );
}
