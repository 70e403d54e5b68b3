//! Server bootstrap.
//!
//! Wires backends, the batch engine and shard bookkeeping from configuration
//! and brings the control tables to their target state. Default transaction
//! log shards get their physical table before they are registered.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use log::{info, warn};
use tessera_commons::EntityType;
use tessera_configs::TesseraConfig;
use tessera_store::{BackendProvider, BatchRetryEngine, RetryPolicy};
use tessera_system::{MigrationReport, MigrationState, ShardManager, ShardMigration, ShardRegistry};
use tessera_tables::TransactionLogProvisioner;

/// Components shared by everything that runs after bootstrap.
pub struct ApplicationComponents {
    pub provider: BackendProvider,
    pub engine: BatchRetryEngine,
    pub manager: Arc<ShardManager>,
    pub migration_report: MigrationReport,
    /// Default transaction log shards whose physical table was created or
    /// confirmed during bootstrap. Each one is registered.
    pub transaction_log_shards: Vec<String>,
}

/// Build backends from `config.backend` and bootstrap on them.
pub async fn bootstrap(config: &TesseraConfig) -> Result<ApplicationComponents> {
    let provider = BackendProvider::from_settings(&config.backend)
        .context("Failed to initialize table service backend")?;
    bootstrap_with_provider(config, provider).await
}

/// Bootstrap on an already built provider.
///
/// Control-plane calls (table creation and status probes) use the raw
/// endpoint; row traffic uses the preferred one.
pub async fn bootstrap_with_provider(
    config: &TesseraConfig,
    provider: BackendProvider,
) -> Result<ApplicationComponents> {
    let phase_start = Instant::now();

    let policy = RetryPolicy::from_settings(&config.batch);
    let engine = BatchRetryEngine::new(provider.preferred(), policy);
    let registry = Arc::new(ShardRegistry::new(
        provider.preferred(),
        engine.clone(),
        &config.shards,
    ));
    let manager = Arc::new(ShardManager::new(registry));

    let transaction_log_tables = TransactionLogProvisioner::new(provider.raw(), &config.shards);
    let migration = ShardMigration::new(provider.raw(), manager.clone(), config.shards.clone())
        .with_provisioner(EntityType::TransactionLog, Arc::new(transaction_log_tables));
    let migration_report = migration.run().await.context("Shard migration failed")?;
    info!(
        "Shard control tables ready: {} -> {} ({:.2}ms)",
        migration_report.initial_state,
        migration_report.final_state,
        phase_start.elapsed().as_secs_f64() * 1000.0
    );

    let transaction_log_shards = migration_report
        .provisioned_shards
        .iter()
        .map(ToString::to_string)
        .collect();

    let components = ApplicationComponents {
        provider,
        engine,
        manager,
        migration_report,
        transaction_log_shards,
    };
    log_report(&components);
    Ok(components)
}

fn log_report(components: &ApplicationComponents) {
    let report = &components.migration_report;
    info!(
        "Bootstrap complete: state={}, created tables={:?}, existing tables={:?}",
        report.final_state, report.created_tables, report.existing_tables
    );
    info!(
        "Default shards: {} seeded, {} already registered; transaction log tables: {:?}",
        report.seeded_shards.len(),
        report.skipped_shards.len(),
        components.transaction_log_shards
    );
    if report.final_state != MigrationState::Ready {
        warn!(
            "Entity types without shards: {:?}. Add shards before serving them.",
            report.unserved_entity_types
        );
    }
    if components.provider.has_accelerated() {
        info!("Row traffic uses the accelerated endpoint");
    }
}
