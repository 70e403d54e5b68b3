//! Schemas of the shard control tables.
//!
//! Attribute names are the compact wire names from the providers' name maps.

use tessera_store::{KeyAttribute, TableSchema};

/// Index on the available shards table: hash `ET`, range `AT`.
pub const ENTITY_ALLOCATION_INDEX: &str = "entity_allocation_index";

/// Available shards: hash key `SN` (shard name).
pub fn available_shards_table_definition(table_name: &str) -> TableSchema {
    TableSchema::new(table_name, KeyAttribute::string("SN")).with_index(
        ENTITY_ALLOCATION_INDEX,
        KeyAttribute::string("ET"),
        Some(KeyAttribute::string("AT")),
    )
}

/// Managed shards: hash key `ID` (identifier), range key `ET` (entity type).
pub fn managed_shards_table_definition(table_name: &str) -> TableSchema {
    TableSchema::new(table_name, KeyAttribute::string("ID"))
        .with_range_key(KeyAttribute::string("ET"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definitions() {
        let available = available_shards_table_definition("available_shards");
        assert_eq!(available.hash_key.name, "SN");
        assert!(available.index(ENTITY_ALLOCATION_INDEX).is_some());

        let managed = managed_shards_table_definition("managed_shards");
        assert_eq!(managed.range_key.map(|k| k.name), Some("ET".to_string()));
    }
}
