//! Shared models: the backend wire format and the shard bookkeeping rows.

mod allocation_type;
mod attribute_value;
mod entity_type;
mod shard_name;
mod shards;

pub use allocation_type::AllocationType;
pub use attribute_value::{AttributeValue, Item};
pub use entity_type::EntityType;
pub use shard_name::ShardName;
pub use shards::{AvailableShard, ManagedShard};
