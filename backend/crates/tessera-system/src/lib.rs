//! # tessera-system
//!
//! Shard bookkeeping over two control tables:
//!
//! - **available shards**: every physical backing table, its entity type and
//!   whether it serves traffic (`allocated`) or is held in reserve (`disabled`)
//! - **managed shards**: which shard a sharding key `(identifier, entity_type)`
//!   is assigned to
//!
//! [`ShardMigration`] bootstraps the control tables (with a
//! [`ShardProvisioner`] preparing shard storage before registration), [`ShardManager`] registers
//! shards and hands them out, and [`ShardRegistry`] is the typed access layer
//! both build on.

pub mod error;
pub mod manager;
pub mod migration;
pub mod providers;
pub mod registry;
pub mod system_table_definitions;

pub use error::{Result, ShardError};
pub use manager::{AddShardOutcome, ShardManager};
pub use migration::{MigrationReport, MigrationState, ShardMigration, ShardProvisioner};
pub use providers::{AvailableShardsProvider, ManagedShardsProvider};
pub use registry::ShardRegistry;
