//! Name <-> id translation
//!
//! Rewrites the keys of a record between the field names callers use and the
//! numeric ids the service requires. Values are never touched. A key that is
//! not part of the table fails the whole translation; nothing is dropped.

use super::schema::{FieldDescriptor, TableDescriptor};
use crate::error::{Result, StructureError};
use crate::models::{FieldId, IdRecord, Record};
use serde_json::Value;

/// Translator scoped to one table
#[derive(Debug, Clone, Copy)]
pub struct TableTranslator<'a> {
    table: &'a TableDescriptor,
}

impl<'a> TableTranslator<'a> {
    pub fn new(table: &'a TableDescriptor) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &'a TableDescriptor {
        self.table
    }

    /// Descriptor for a field name, or `UnknownField`.
    pub fn field(&self, name: &str) -> Result<&'a FieldDescriptor> {
        self.table
            .field(name)
            .ok_or_else(|| self.unknown(name.to_string()))
    }

    /// Descriptor for a field id, or `UnknownField`.
    pub fn field_for_id(&self, id: FieldId) -> Result<&'a FieldDescriptor> {
        self.table
            .field_by_id(id)
            .ok_or_else(|| self.unknown(id.to_string()))
    }

    pub fn names_to_ids(&self, record: &Record) -> Result<IdRecord> {
        record
            .iter()
            .map(|(name, value)| -> Result<(FieldId, Value)> {
                Ok((self.field(name)?.id, value.clone()))
            })
            .collect()
    }

    pub fn ids_to_names(&self, record: &IdRecord) -> Result<Record> {
        record
            .iter()
            .map(|(id, value)| -> Result<(String, Value)> {
                Ok((self.field_for_id(*id)?.name.clone(), value.clone()))
            })
            .collect()
    }

    fn unknown(&self, field: String) -> StructureError {
        StructureError::UnknownField {
            table: self.table.qualified_name(),
            field,
        }
    }
}
