//! Compact record codec.
//!
//! Logical records use human-readable field names; persisted items use short
//! wire names to keep attribute overhead low. A `NameMap` holds one fixed,
//! hand-maintained vocabulary per record family and must stay bijective.
//!
//! ```text
//! LogicalValue (long names) --RecordEncoder--> Item (short names, tagged values)
//! Item                      --decode_item----> DecodedRecord (long names)
//! ```
//!
//! Only fields present on the input are emitted. A present-but-empty attribute
//! means something different to the backend than an absent one, so `None`
//! never becomes an attribute.

mod decoder;
mod encoder;
mod names;
mod value;

pub use decoder::{decode_item, DecodedRecord};
pub use encoder::{encode_field, encode_value, RecordEncoder};
pub use names::NameMap;
pub use value::{Decimal, LogicalValue};
