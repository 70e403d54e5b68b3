//! Bootstrap of the shard control tables.
//!
//! ```text
//! Uninitialized ──create tables──▶ TablesCreated ──seed defaults──▶ Seeded ──every entity type served──▶ Ready
//! ```
//!
//! Running the migration is idempotent: existing tables and rows are left
//! alone, a concurrent creator's "table in use" answer counts as success and
//! default shards already registered for the same entity type are skipped.
//!
//! Entity types whose shards need a physical table get a [`ShardProvisioner`].
//! A default shard of such a type is only registered after its provisioner
//! succeeded, so a registered shard always has a table behind it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{error, info, warn};
use tessera_commons::{EntityType, ShardName};
use tessera_configs::ShardSettings;
use tessera_store::{table_exists, wait_for_table_active, TableBackend, TableSchema, TableStatus};

use crate::error::{Result, ShardError};
use crate::manager::{AddShardOutcome, ShardManager};
use crate::system_table_definitions::{
    available_shards_table_definition, managed_shards_table_definition,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MigrationState {
    /// At least one control table does not exist.
    Uninitialized,
    /// Both tables exist, but they are not active yet or configured default
    /// shards are missing.
    TablesCreated,
    /// Configured defaults are registered, but some entity type has no shard.
    Seeded,
    /// Every entity type has at least one registered shard.
    Ready,
}

impl MigrationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationState::Uninitialized => "uninitialized",
            MigrationState::TablesCreated => "tablesCreated",
            MigrationState::Seeded => "seeded",
            MigrationState::Ready => "ready",
        }
    }
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a migration run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub initial_state: MigrationState,
    pub final_state: MigrationState,
    pub created_tables: Vec<String>,
    pub existing_tables: Vec<String>,
    /// Default shards registered by this run.
    pub seeded_shards: Vec<ShardName>,
    /// Default shards that were already registered.
    pub skipped_shards: Vec<ShardName>,
    /// Default shards whose storage a provisioner prepared, registered or not.
    pub provisioned_shards: Vec<ShardName>,
    /// Entity types left without any shard.
    pub unserved_entity_types: Vec<EntityType>,
}

/// Prepares the storage behind a shard before it is registered.
///
/// Must be idempotent: migrations call it again for shards that are already
/// registered.
#[async_trait]
pub trait ShardProvisioner: Send + Sync {
    async fn provision(&self, shard_name: &ShardName) -> Result<()>;
}

pub struct ShardMigration {
    control: Arc<dyn TableBackend>,
    manager: Arc<ShardManager>,
    settings: ShardSettings,
    provisioners: BTreeMap<EntityType, Arc<dyn ShardProvisioner>>,
}

impl ShardMigration {
    /// `control` is used for table creation and status probes; row writes go
    /// through the manager's registry.
    pub fn new(
        control: Arc<dyn TableBackend>,
        manager: Arc<ShardManager>,
        settings: ShardSettings,
    ) -> Self {
        Self {
            control,
            manager,
            settings,
            provisioners: BTreeMap::new(),
        }
    }

    /// Provision default shards of `entity_type` before registering them.
    pub fn with_provisioner(
        mut self,
        entity_type: EntityType,
        provisioner: Arc<dyn ShardProvisioner>,
    ) -> Self {
        self.provisioners.insert(entity_type, provisioner);
        self
    }

    fn table_definitions(&self) -> [TableSchema; 2] {
        let registry = self.manager.registry();
        [
            available_shards_table_definition(registry.available_shards_table()),
            managed_shards_table_definition(registry.managed_shards_table()),
        ]
    }

    /// Configured default shards, grouped by entity type in a stable order.
    fn default_shards(&self) -> Result<Vec<(EntityType, Vec<ShardName>)>> {
        let mut defaults = Vec::with_capacity(self.settings.defaults.len());
        for (entity_type, names) in &self.settings.defaults {
            let entity_type: EntityType = entity_type.parse()?;
            let names = names
                .iter()
                .map(ShardName::new)
                .collect::<std::result::Result<Vec<_>, _>>()?;
            defaults.push((entity_type, names));
        }
        defaults.sort_by_key(|(entity_type, _)| *entity_type);
        Ok(defaults)
    }

    /// Probe the current state without changing anything.
    pub async fn state(&self) -> Result<MigrationState> {
        let mut all_active = true;
        for schema in self.table_definitions() {
            let existence = table_exists(self.control.as_ref(), &schema.table_name)
                .await
                .map_err(|e| ShardError::backend("sh_mig_state_1", &schema.table_name, e))?;
            if existence.status == TableStatus::Deleted {
                return Ok(MigrationState::Uninitialized);
            }
            all_active &= existence.exists;
        }
        if !all_active || !self.defaults_registered().await? {
            return Ok(MigrationState::TablesCreated);
        }
        if self.unserved_entity_types().await?.is_empty() {
            Ok(MigrationState::Ready)
        } else {
            Ok(MigrationState::Seeded)
        }
    }

    async fn defaults_registered(&self) -> Result<bool> {
        let registry = self.manager.registry();
        for (entity_type, names) in self.default_shards()? {
            for name in names {
                match registry.get_available_shard(&name).await? {
                    Some(shard) if shard.entity_type == entity_type => {}
                    _ => return Ok(false),
                }
            }
        }
        Ok(true)
    }

    async fn unserved_entity_types(&self) -> Result<Vec<EntityType>> {
        let registry = self.manager.registry();
        let mut unserved = Vec::new();
        for entity_type in EntityType::ALL {
            if registry.get_shards_by_type(entity_type).await?.is_empty() {
                unserved.push(entity_type);
            }
        }
        Ok(unserved)
    }

    /// Create missing control tables, wait for them, seed default shards.
    pub async fn run(&self) -> Result<MigrationReport> {
        // Validate configured defaults before creating anything.
        let defaults = self.default_shards()?;
        let initial_state = self.state().await?;
        info!("Shard migration starting from state {}", initial_state);

        let mut report = MigrationReport {
            initial_state,
            final_state: initial_state,
            created_tables: Vec::new(),
            existing_tables: Vec::new(),
            seeded_shards: Vec::new(),
            skipped_shards: Vec::new(),
            provisioned_shards: Vec::new(),
            unserved_entity_types: Vec::new(),
        };

        for schema in self.table_definitions() {
            self.ensure_table(&schema, &mut report).await?;
        }
        let poll = Duration::from_millis(self.settings.table_ready_poll_ms);
        for schema in self.table_definitions() {
            wait_for_table_active(
                self.control.as_ref(),
                &schema.table_name,
                poll,
                self.settings.table_ready_max_polls,
            )
            .await
            .map_err(|e| ShardError::backend("sh_mig_wait_1", &schema.table_name, e))?;
        }
        report.final_state = MigrationState::TablesCreated;

        for (entity_type, names) in defaults {
            let provisioner = self.provisioners.get(&entity_type);
            for name in names {
                if let Some(provisioner) = provisioner {
                    if let Err(err) = provisioner.provision(&name).await {
                        error!("Provisioning default shard {} for {} failed: {}", name, entity_type, err);
                        return Err(err);
                    }
                    report.provisioned_shards.push(name.clone());
                }
                match self.manager.add_shard(name.as_str(), entity_type).await? {
                    AddShardOutcome::Created => report.seeded_shards.push(name),
                    AddShardOutcome::AlreadyRegistered => report.skipped_shards.push(name),
                }
            }
        }
        report.final_state = MigrationState::Seeded;

        report.unserved_entity_types = self.unserved_entity_types().await?;
        if report.unserved_entity_types.is_empty() {
            report.final_state = MigrationState::Ready;
        } else {
            for entity_type in &report.unserved_entity_types {
                warn!("No shard registered for {}; assignments will fail until one is added", entity_type);
            }
        }

        info!(
            "Shard migration finished in state {} (created tables: {:?}, seeded shards: {})",
            report.final_state,
            report.created_tables,
            report.seeded_shards.len()
        );
        Ok(report)
    }

    async fn ensure_table(&self, schema: &TableSchema, report: &mut MigrationReport) -> Result<()> {
        let table = &schema.table_name;
        let existence = table_exists(self.control.as_ref(), table)
            .await
            .map_err(|e| ShardError::backend("sh_mig_create_1", table, e))?;
        if existence.status != TableStatus::Deleted {
            info!("Control table {} already exists ({})", table, existence.status);
            report.existing_tables.push(table.clone());
            return Ok(());
        }

        match self.control.create_table(schema).await {
            Ok(description) => {
                info!("Created control table {} ({})", table, description.status);
                report.created_tables.push(table.clone());
                Ok(())
            }
            Err(tessera_store::BackendError::ResourceInUse(_)) => {
                info!("Control table {} was created concurrently", table);
                report.existing_tables.push(table.clone());
                Ok(())
            }
            Err(err) => Err(ShardError::backend("sh_mig_create_2", table, err)),
        }
    }
}
