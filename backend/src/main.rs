//! Tessera server entrypoint.
//!
//! Loads configuration, installs logging and runs the bootstrap. The work
//! itself lives in `lifecycle`.

use std::env;
use std::path::Path;

use anyhow::Result;
use log::info;
use tessera_configs::TesseraConfig;
use tessera_server::{lifecycle, logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Optional first argument: config path (defaults to ./config.toml)
    let config_path = env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());

    let config = if Path::new(&config_path).exists() {
        match TesseraConfig::from_file(&config_path) {
            Ok(cfg) => {
                eprintln!("Loaded config from: {}", config_path);
                cfg
            }
            Err(e) => {
                eprintln!("FATAL: Failed to load {}: {:#}", config_path, e);
                std::process::exit(1);
            }
        }
    } else {
        eprintln!("No config at {}, using defaults and environment", config_path);
        TesseraConfig::from_env()?
    };

    logging::init_logging(&config.logging)?;

    info!("Tessera server v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Backend: {} ({}), region {}",
        config.backend.kind, config.backend.endpoint, config.backend.region
    );

    let components = lifecycle::bootstrap(&config).await?;
    info!(
        "Shard registry is {}; {} transaction log shard table(s) available",
        components.migration_report.final_state,
        components.transaction_log_shards.len()
    );
    Ok(())
}
