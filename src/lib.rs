//! Ragic Structure - schema resolution and name-based record access
//!
//! Provides:
//! - Parsing and serialization of structure definitions (tabs, tables, fields)
//! - Validation that reports every violation at once
//! - A read-only, indexed schema model with resolved references
//! - Name <-> id translation and name-keyed CRUD over an injected transport

pub mod access;
pub mod config;
pub mod error;
pub mod export;
pub mod import;
pub mod model;
pub mod models;
pub mod storage;
pub mod transport;
pub mod validation;

// Re-export commonly used types
pub use access::{AccessFacade, Condition, Direction, ListQuery, Operator, Ordering};
pub use config::{AccessConfig, ClientConfig, ConfigError, ResolverOptions};
pub use error::{Result, StructureError};
pub use export::StructureExporter;
pub use import::StructureImporter;
pub use model::{
    FieldDescriptor, ReferenceResolver, Relation, SchemaModel, SchemaRegistry, StructureLoader,
    TableDescriptor, TableIndex, TableTranslator, load_structure, load_structure_with,
};
pub use storage::{StorageBackend, StorageError};
#[cfg(feature = "native-fs")]
pub use storage::filesystem::FileSystemStorageBackend;
pub use transport::{FetchQuery, IdCondition, MemoryTransport, TableLocator, Transport, TransportError};
#[cfg(feature = "api-backend")]
pub use transport::RagicTransport;
pub use validation::{SchemaValidator, ValidationReport, Violation, Warning};

// Re-export models
pub use models::{Document, Field, FieldId, FieldType, IdRecord, IdRow, Record, RecordId, Row, Tab, Table};
