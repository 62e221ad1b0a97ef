//! Models module for the SDK
//!
//! Defines the raw structure tree (tabs, tables, fields) exactly as written in a
//! structure definition, the identifier newtypes, and the record payloads
//! shared by every layer.

pub mod document;
pub mod field;
pub mod record;
pub mod table;

pub use document::{Document, Tab};
pub use field::{Field, FieldId, FieldType, RecordId};
pub use record::{IdRecord, IdRow, Record, Row};
pub use table::Table;
