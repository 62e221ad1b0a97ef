//! Record payloads
//!
//! Name-keyed records are what callers see; id-keyed records are what the
//! remote service sees. Both use ordered maps so equal records compare equal
//! regardless of insertion order.

use super::field::{FieldId, RecordId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Field name -> value
pub type Record = BTreeMap<String, Value>;

/// Field id -> value
pub type IdRecord = BTreeMap<FieldId, Value>;

/// A name-keyed row returned by the access layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<RecordId>,
    pub values: Record,
    /// System values kept from the service response (e.g. `_create_date`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, Value>,
    /// Sub-table rows by sub-table name, present when sub-tables were requested.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sub_rows: BTreeMap<String, Vec<Row>>,
}

/// An id-keyed row exchanged with a transport
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<RecordId>,
    pub values: IdRecord,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, Value>,
    /// Sub-table rows by sub-table id.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sub_rows: BTreeMap<String, Vec<IdRow>>,
}

impl IdRow {
    pub fn new(record_id: Option<RecordId>, values: IdRecord) -> Self {
        Self {
            record_id,
            values,
            ..Self::default()
        }
    }
}
