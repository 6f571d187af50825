use anyhow::Result;
use clap::{Args, Subcommand};
use curator::config::ConfigService;
use std::path::PathBuf;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,

    /// Project root directory
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Key in the form repository.<id>.<field>
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Key in the form repository.<id>.<field>
        key: String,
        /// New value
        value: String,
    },
}

pub async fn execute(args: ConfigArgs) -> Result<()> {
    let config_service = ConfigService::new(&args.root);
    if !config_service.exists() {
        return Err(anyhow::anyhow!(
            "Curator not initialized. Run 'curator init' first."
        ));
    }

    match args.command {
        ConfigCommands::Get { key } => {
            let value = config_service.get(&key)?;
            println!("{}", value);
        },

        ConfigCommands::Set { key, value } => {
            config_service.set(&key, &value)?;
            println!("Set {} = {}", key, value);
        },
    }

    Ok(())
}
