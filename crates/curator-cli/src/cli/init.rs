use anyhow::Result;
use clap::Args;
use curator::config::ConfigService;
use std::path::PathBuf;

#[derive(Args)]
pub struct InitArgs {
    /// Project root directory
    #[arg(default_value = ".")]
    path: PathBuf,
}

pub async fn execute(args: InitArgs) -> Result<()> {
    let config_service = ConfigService::new(&args.path);
    if config_service.exists() {
        return Err(anyhow::anyhow!(
            "Configuration already exists at {}",
            args.path.join(".curator/config.toml").display()
        ));
    }

    let config = config_service.init()?;
    println!("Initialized curator at {}", args.path.display());
    println!("  Repositories: {}", config.repositories.len());
    println!(
        "  Excluded patterns: {}",
        config.excluded_patterns.join(", ")
    );
    Ok(())
}
