//! Typed access to the shard control tables.

pub mod available_shards;
pub mod managed_shards;

pub use available_shards::AvailableShardsProvider;
pub use managed_shards::ManagedShardsProvider;
