//! Request and response shapes of the backing table service.
//!
//! Batch types serialize with the service's own field names so the HTTP
//! backend can send them as-is.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tessera_commons::{AttributeValue, Item};

/// One entry of a batch write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteRequest {
    #[serde(rename = "PutRequest")]
    Put {
        #[serde(rename = "Item")]
        item: Item,
    },
    #[serde(rename = "DeleteRequest")]
    Delete {
        #[serde(rename = "Key")]
        key: Item,
    },
}

impl WriteRequest {
    pub fn put(item: Item) -> Self {
        WriteRequest::Put { item }
    }

    pub fn delete(key: Item) -> Self {
        WriteRequest::Delete { key }
    }
}

/// Table name to the write requests targeting it.
pub type WriteRequestsByTable = BTreeMap<String, Vec<WriteRequest>>;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeysAndAttributes {
    #[serde(rename = "Keys")]
    pub keys: Vec<Item>,
    #[serde(rename = "ConsistentRead", default, skip_serializing_if = "Option::is_none")]
    pub consistent_read: Option<bool>,
}

impl KeysAndAttributes {
    pub fn new(keys: Vec<Item>) -> Self {
        Self {
            keys,
            consistent_read: None,
        }
    }
}

/// Table name to the keys to fetch from it.
pub type KeysByTable = BTreeMap<String, KeysAndAttributes>;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchWriteOutput {
    #[serde(rename = "UnprocessedItems", default)]
    pub unprocessed_items: WriteRequestsByTable,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchGetOutput {
    #[serde(rename = "Responses", default)]
    pub responses: BTreeMap<String, Vec<Item>>,
    #[serde(rename = "UnprocessedKeys", default)]
    pub unprocessed_keys: KeysByTable,
}

/// Scalar type of a key attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    String,
    Number,
}

impl ScalarType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarType::String => "S",
            ScalarType::Number => "N",
        }
    }

    /// Whether `value` carries this scalar tag.
    pub fn matches(&self, value: &AttributeValue) -> bool {
        matches!(
            (self, value),
            (ScalarType::String, AttributeValue::String(_))
                | (ScalarType::Number, AttributeValue::Number(_))
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttribute {
    pub name: String,
    pub scalar_type: ScalarType,
}

impl KeyAttribute {
    pub fn string(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scalar_type: ScalarType::String,
        }
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scalar_type: ScalarType::Number,
        }
    }
}

/// Secondary index projecting all attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalSecondaryIndex {
    pub index_name: String,
    pub hash_key: KeyAttribute,
    pub range_key: Option<KeyAttribute>,
}

/// Table definition passed to `create_table`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub table_name: String,
    pub hash_key: KeyAttribute,
    pub range_key: Option<KeyAttribute>,
    pub global_secondary_indexes: Vec<GlobalSecondaryIndex>,
}

impl TableSchema {
    pub fn new(table_name: impl Into<String>, hash_key: KeyAttribute) -> Self {
        Self {
            table_name: table_name.into(),
            hash_key,
            range_key: None,
            global_secondary_indexes: Vec::new(),
        }
    }

    pub fn with_range_key(mut self, range_key: KeyAttribute) -> Self {
        self.range_key = Some(range_key);
        self
    }

    pub fn with_index(
        mut self,
        index_name: impl Into<String>,
        hash_key: KeyAttribute,
        range_key: Option<KeyAttribute>,
    ) -> Self {
        self.global_secondary_indexes.push(GlobalSecondaryIndex {
            index_name: index_name.into(),
            hash_key,
            range_key,
        });
        self
    }

    pub fn index(&self, name: &str) -> Option<&GlobalSecondaryIndex> {
        self.global_secondary_indexes
            .iter()
            .find(|index| index.index_name == name)
    }

    /// Key attributes of the table, hash first.
    pub fn key_attributes(&self) -> impl Iterator<Item = &KeyAttribute> {
        std::iter::once(&self.hash_key).chain(self.range_key.iter())
    }

    /// Every attribute referenced by a table or index key, deduplicated by name.
    pub fn attribute_definitions(&self) -> Vec<&KeyAttribute> {
        let mut defs: Vec<&KeyAttribute> = Vec::new();
        let index_keys = self
            .global_secondary_indexes
            .iter()
            .flat_map(|index| std::iter::once(&index.hash_key).chain(index.range_key.iter()));
        for attr in self.key_attributes().chain(index_keys) {
            if !defs.iter().any(|d| d.name == attr.name) {
                defs.push(attr);
            }
        }
        defs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    Creating,
    Active,
    Updating,
    Deleting,
    /// Reported by `table_exists` for tables the service does not know.
    Deleted,
}

impl TableStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableStatus::Creating => "CREATING",
            TableStatus::Active => "ACTIVE",
            TableStatus::Updating => "UPDATING",
            TableStatus::Deleting => "DELETING",
            TableStatus::Deleted => "DELETED",
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "CREATING" => Some(TableStatus::Creating),
            "ACTIVE" => Some(TableStatus::Active),
            "UPDATING" => Some(TableStatus::Updating),
            "DELETING" => Some(TableStatus::Deleting),
            "DELETED" => Some(TableStatus::Deleted),
            _ => None,
        }
    }
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescription {
    pub table_name: String,
    pub status: TableStatus,
}

/// Guard evaluated against the currently stored row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// No row with this key exists (or it lacks the attribute).
    AttributeNotExists(String),
    /// The stored row has the attribute with exactly this value.
    AttributeEquals { name: String, value: AttributeValue },
}

impl Condition {
    /// Evaluate against the stored row, if any.
    pub fn holds(&self, existing: Option<&Item>) -> bool {
        match self {
            Condition::AttributeNotExists(name) => {
                existing.map_or(true, |row| !row.contains_key(name))
            }
            Condition::AttributeEquals { name, value } => {
                existing.and_then(|row| row.get(name)) == Some(value)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutItemRequest {
    pub table: String,
    pub item: Item,
    pub condition: Option<Condition>,
}

impl PutItemRequest {
    pub fn new(table: impl Into<String>, item: Item) -> Self {
        Self {
            table: table.into(),
            item,
            condition: None,
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// Equality query against a table or one of its indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub table: String,
    pub index: Option<String>,
    pub key_conditions: Vec<(String, AttributeValue)>,
}

impl QueryRequest {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            index: None,
            key_conditions: Vec::new(),
        }
    }

    pub fn on_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn key_eq(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.key_conditions.push((name.into(), value));
        self
    }

    /// Whether `item` satisfies every key condition.
    pub fn matches(&self, item: &Item) -> bool {
        self.key_conditions
            .iter()
            .all(|(name, value)| item.get(name) == Some(value))
    }
}

/// Total number of write requests across tables.
pub fn count_write_requests(requests: &WriteRequestsByTable) -> usize {
    requests.values().map(Vec::len).sum()
}

/// Total number of keys across tables.
pub fn count_keys(keys: &KeysByTable) -> usize {
    keys.values().map(|k| k.keys.len()).sum()
}
