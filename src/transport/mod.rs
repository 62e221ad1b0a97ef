//! Transport abstraction
//!
//! The access layer never performs I/O itself; it hands id-keyed requests to
//! an injected [`Transport`]. Implementations:
//! - MemoryTransport: in-process tables, for tests and offline tooling
//! - RagicTransport: the service's HTTP API (feature `api-backend`)
//!
//! Retries, timeouts and cancellation belong to the transport or its caller.

use crate::access::query::{Direction, Operator};
use crate::model::TableDescriptor;
use crate::models::{FieldId, IdRecord, IdRow, RecordId};
use async_trait::async_trait;
use std::sync::Arc;

pub mod memory;
#[cfg(feature = "api-backend")]
pub mod ragic;

pub use memory::MemoryTransport;
#[cfg(feature = "api-backend")]
pub use ragic::RagicTransport;

/// Error type for transport operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Failed to decode response: {0}")]
    Decode(String),
    #[error("Record not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Rejected by service: {0}")]
    Rejected(String),
}

/// Where a table lives on the service
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableLocator {
    pub tab_id: String,
    pub table_id: String,
}

impl TableLocator {
    pub fn new(tab_id: impl Into<String>, table_id: impl Into<String>) -> Self {
        Self {
            tab_id: tab_id.into(),
            table_id: table_id.into(),
        }
    }
}

impl From<&TableDescriptor> for TableLocator {
    fn from(table: &TableDescriptor) -> Self {
        Self::new(table.tab_id.clone(), table.id.clone())
    }
}

/// Filter on one field, by id
#[derive(Debug, Clone, PartialEq)]
pub struct IdCondition {
    pub field: FieldId,
    pub operator: Operator,
    pub value: String,
}

/// Id-keyed list request
#[derive(Debug, Clone, PartialEq)]
pub struct FetchQuery {
    pub conditions: Vec<IdCondition>,
    pub offset: usize,
    pub limit: usize,
    pub ordering: Option<(FieldId, Direction)>,
    pub subtables: bool,
}

impl Default for FetchQuery {
    fn default() -> Self {
        Self {
            conditions: Vec::new(),
            offset: 0,
            limit: 100,
            ordering: None,
            subtables: false,
        }
    }
}

/// Data access capability consumed by the access layer
///
/// Implementations must tolerate concurrent calls.
#[async_trait]
pub trait Transport: Send + Sync {
    /// One record when `record` is set (empty if it does not exist), otherwise
    /// the rows matching `query`.
    async fn fetch(
        &self,
        table: &TableLocator,
        record: Option<RecordId>,
        query: &FetchQuery,
    ) -> Result<Vec<IdRow>, TransportError>;

    /// Create a record (`record` is `None`) or update the given fields of an
    /// existing one. Returns the stored row.
    async fn write(
        &self,
        table: &TableLocator,
        record: Option<RecordId>,
        values: &IdRecord,
    ) -> Result<IdRow, TransportError>;

    async fn delete(&self, table: &TableLocator, record: RecordId) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn fetch(
        &self,
        table: &TableLocator,
        record: Option<RecordId>,
        query: &FetchQuery,
    ) -> Result<Vec<IdRow>, TransportError> {
        (**self).fetch(table, record, query).await
    }

    async fn write(
        &self,
        table: &TableLocator,
        record: Option<RecordId>,
        values: &IdRecord,
    ) -> Result<IdRow, TransportError> {
        (**self).write(table, record, values).await
    }

    async fn delete(&self, table: &TableLocator, record: RecordId) -> Result<(), TransportError> {
        (**self).delete(table, record).await
    }
}
