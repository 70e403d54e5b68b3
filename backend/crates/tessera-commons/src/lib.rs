//! # tessera-commons
//!
//! Shared types for Tessera crates.
//!
//! - `models`: the backend wire format (`AttributeValue`, `Item`) and the shard
//!   bookkeeping models (`EntityType`, `AllocationType`, `ShardName`,
//!   `AvailableShard`, `ManagedShard`).
//! - `codec`: the long-name/short-name attribute compaction and the typed value
//!   encoding used to materialize logical records into `Item`s.
//! - `errors`: error categories shared by every crate plus the codec errors.
//!
//! ## Example Usage
//!
//! ```rust
//! use tessera_commons::codec::{NameMap, RecordEncoder};
//!
//! static PAIRS: &[(&str, &str)] = &[("transaction_uuid", "txu"), ("status", "s")];
//! let names = NameMap::new(PAIRS);
//!
//! let mut encoder = RecordEncoder::new(&names);
//! encoder.key("transaction_uuid", "ABC-123").unwrap();
//! encoder.optional("status", None::<u64>).unwrap();
//! let item = encoder.finish();
//!
//! assert_eq!(item["txu"].as_str(), Some("abc-123"));
//! assert!(!item.contains_key("s"));
//! ```

pub mod codec;
pub mod errors;
pub mod models;

pub use codec::{
    decode_item, encode_field, encode_value, DecodedRecord, Decimal, LogicalValue, NameMap,
    RecordEncoder,
};
pub use errors::{CodecError, CommonError, ErrorCategory, Result};
pub use models::{
    AllocationType, AttributeValue, AvailableShard, EntityType, Item, ManagedShard, ShardName,
};

/// Current time as Unix epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
