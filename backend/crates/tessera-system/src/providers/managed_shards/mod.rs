//! Managed shards control table.

mod managed_shards_provider;
mod managed_shards_table;

pub use managed_shards_provider::ManagedShardsProvider;
pub use managed_shards_table::{
    decode_managed_shard, encode_managed_shard, managed_key, MANAGED_SHARD_NAMES,
};
