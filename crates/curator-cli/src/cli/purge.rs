use anyhow::Result;
use clap::Args;
use curator::config::ConfigService;
use curator::listener::ListenerBus;
use curator::metadata::InMemoryMetadataRepository;
use curator::scanner::{harvest_records, ScanDriver, ScanStats};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Args)]
pub struct PurgeArgs {
    /// Only purge this repository id
    #[arg(long)]
    repository: Option<String>,

    /// Print machine-readable stats
    #[arg(long)]
    json: bool,

    /// Project root directory
    #[arg(long, default_value = ".")]
    root: PathBuf,
}

pub async fn execute(args: PurgeArgs) -> Result<()> {
    let config_service = ConfigService::new(&args.root);
    if !config_service.exists() {
        return Err(anyhow::anyhow!(
            "Curator not initialized. Run 'curator init' first."
        ));
    }
    let config = config_service.load()?;

    let repositories: Vec<_> = match &args.repository {
        Some(id) => {
            let repo = config
                .repository(id)
                .ok_or_else(|| anyhow::anyhow!("Unknown repository: {}", id))?;
            vec![repo.clone()]
        },
        None => config.repositories.clone(),
    };
    if repositories.is_empty() {
        return Err(anyhow::anyhow!(
            "No repositories configured. Run 'curator repos add' first."
        ));
    }

    // The bundled backend is rebuilt from the trees on every run.
    let store = Arc::new(InMemoryMetadataRepository::new());
    for repository in &repositories {
        let records = harvest_records(repository)?;
        info!(
            repository = repository.id,
            records = records.len(),
            "harvested metadata records"
        );
        for record in records {
            store.add_record(record);
        }
    }

    let driver = ScanDriver::new(store, ListenerBus::new(), &config.excluded_patterns);
    let all_stats = driver.scan_all(&repositories).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&all_stats)?);
    } else {
        for stats in &all_stats {
            print_stats(stats);
        }
    }

    if all_stats.iter().any(|s| s.failures > 0) {
        return Err(anyhow::anyhow!("One or more repository scans failed"));
    }
    Ok(())
}

fn print_stats(stats: &ScanStats) {
    println!("{}", stats.repository_id);
    println!("  candidates: {}", stats.candidates);
    println!("  builds removed: {}", stats.builds_removed);
    println!("  files removed: {}", stats.files_removed);
    if stats.failures > 0 {
        println!("  failures: {}", stats.failures);
    }
}
