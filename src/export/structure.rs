//! Structure definition exporter
//!
//! Emits the same key vocabulary the parser reads, in document order, so an
//! exported definition parses back to an equal document. Optional keys are
//! only written when set.

use crate::error::{Result, StructureError};
use crate::models::{Document, Field, Tab, Table};
use serde_yaml::{Mapping, Value};

/// Writes documents as YAML structure definitions
#[derive(Debug, Default)]
pub struct StructureExporter;

impl StructureExporter {
    pub fn new() -> Self {
        Self
    }

    pub fn to_yaml(&self, document: &Document) -> Result<String> {
        serde_yaml::to_string(&self.to_value(document))
            .map_err(|e| StructureError::Serialization(e.to_string()))
    }

    pub fn to_value(&self, document: &Document) -> Value {
        let tabs: Mapping = document
            .tabs
            .iter()
            .map(|tab| (Value::from(tab.name.as_str()), tab_value(tab)))
            .collect();
        let mut root = Mapping::new();
        root.insert("tabs".into(), Value::Mapping(tabs));
        Value::Mapping(root)
    }
}

fn tab_value(tab: &Tab) -> Value {
    let tables: Mapping = tab
        .tables
        .iter()
        .map(|table| (Value::from(table.name.as_str()), table_value(table)))
        .collect();
    let mut map = Mapping::new();
    map.insert("tab_id".into(), identifier(&tab.id));
    map.insert("tables".into(), Value::Mapping(tables));
    Value::Mapping(map)
}

fn table_value(table: &Table) -> Value {
    let fields: Mapping = table
        .fields
        .iter()
        .map(|field| (Value::from(field.name.as_str()), field_value(field)))
        .collect();
    let mut map = Mapping::new();
    map.insert("table_id".into(), identifier(&table.id));
    if !table.sub_tables.is_empty() {
        map.insert("sub_tables".into(), string_list(&table.sub_tables));
    }
    map.insert("fields".into(), Value::Mapping(fields));
    Value::Mapping(map)
}

fn field_value(field: &Field) -> Value {
    let mut map = Mapping::new();
    map.insert("field_id".into(), Value::from(field.id.0));
    map.insert("field_type".into(), Value::from(field.field_type.as_str()));
    if let Some(allow) = field.allow_user_add_new_options {
        map.insert("allow_user_add_new_options".into(), Value::from(allow));
    }
    if let Some(source) = &field.source_table {
        map.insert("source_table".into(), Value::from(source.as_str()));
    }
    if !field.options.is_empty() {
        map.insert("options".into(), string_list(&field.options));
    }
    Value::Mapping(map)
}

/// Purely numeric identifiers are written as numbers, as they usually are by hand.
fn identifier(id: &str) -> Value {
    match id.parse::<u64>() {
        Ok(n) if n.to_string() == id => Value::from(n),
        _ => Value::from(id),
    }
}

fn string_list(items: &[String]) -> Value {
    Value::Sequence(items.iter().map(|s| Value::from(s.as_str())).collect())
}
