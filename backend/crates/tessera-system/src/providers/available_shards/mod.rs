//! Available shards control table.

mod available_shards_provider;
mod available_shards_table;

pub use available_shards_provider::AvailableShardsProvider;
pub use available_shards_table::{
    decode_available_shard, encode_available_shard, shard_key, AVAILABLE_SHARD_NAMES,
};
