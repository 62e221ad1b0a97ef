//! Schema model
//!
//! The validated, indexed, read-only view of a document. Every lookup is a
//! hash probe into indices built once in [`SchemaModel::build`]; lookups for
//! names that do not exist return `None` rather than failing.

use super::resolver::ReferenceResolver;
use crate::config::ResolverOptions;
use crate::error::{Result, StructureError};
use crate::models::{Document, FieldId, FieldType};
use crate::validation::SchemaValidator;
use std::collections::HashMap;
use tracing::info;

/// Position of a table inside a [`SchemaModel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableIndex(pub(crate) usize);

/// A field with its type resolved
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub id: FieldId,
    pub field_type: FieldType,
    pub allow_new_options: bool,
    /// Statically known options; empty when none were declared.
    pub options: Vec<String>,
    /// Name of the referenced table, if this field is a relation.
    pub source_table: Option<String>,
}

impl FieldDescriptor {
    pub fn is_relation(&self) -> bool {
        self.source_table.is_some()
    }
}

/// A table with its fields indexed by name and id
#[derive(Debug, Clone)]
pub struct TableDescriptor {
    index: TableIndex,
    pub tab: String,
    pub tab_id: String,
    pub name: String,
    pub id: String,
    fields: Vec<FieldDescriptor>,
    field_by_name: HashMap<String, usize>,
    field_by_id: HashMap<FieldId, usize>,
    sub_tables: Vec<TableIndex>,
}

impl TableDescriptor {
    pub fn index(&self) -> TableIndex {
        self.index
    }

    /// `tab.table`, used in messages.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.tab, self.name)
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.field_by_name.get(name).map(|&i| &self.fields[i])
    }

    pub fn field_by_id(&self, id: FieldId) -> Option<&FieldDescriptor> {
        self.field_by_id.get(&id).map(|&i| &self.fields[i])
    }

    pub fn sub_table_indices(&self) -> &[TableIndex] {
        &self.sub_tables
    }
}

/// Read-only schema built from a validated document
#[derive(Debug, Clone)]
pub struct SchemaModel {
    document: Document,
    tables: Vec<TableDescriptor>,
    by_pair: HashMap<(String, String), TableIndex>,
    by_id: HashMap<String, TableIndex>,
    by_name: HashMap<String, Vec<TableIndex>>,
    field_owner: HashMap<FieldId, TableIndex>,
    references: ReferenceResolver,
}

impl SchemaModel {
    /// Validate `document` and index it with default resolver options.
    pub fn build(document: Document) -> Result<Self> {
        Self::build_with(document, ResolverOptions::default())
    }

    /// Validate `document`, index it and resolve its references.
    ///
    /// # Errors
    ///
    /// `SchemaViolation` or `CyclicReference` from validation, or
    /// `CyclicReference` when a reference chain exceeds the traversal bound.
    pub fn build_with(document: Document, options: ResolverOptions) -> Result<Self> {
        let document = SchemaValidator::new().validate(document)?;

        let mut tables = Vec::with_capacity(document.table_count());
        let mut by_pair = HashMap::new();
        let mut by_id = HashMap::new();
        let mut by_name: HashMap<String, Vec<TableIndex>> = HashMap::new();
        let mut field_owner = HashMap::new();

        for (tab, table) in document.tables() {
            let index = TableIndex(tables.len());
            let mut fields = Vec::with_capacity(table.fields.len());
            let mut field_by_name = HashMap::with_capacity(table.fields.len());
            let mut field_by_id = HashMap::with_capacity(table.fields.len());

            for field in &table.fields {
                // Validation guarantees every type is known.
                let field_type = field.kind().ok_or_else(|| {
                    StructureError::malformed(
                        format!(
                            "tabs.{}.tables.{}.fields.{}.field_type",
                            tab.name, table.name, field.name
                        ),
                        format!("unrecognised type '{}'", field.field_type),
                    )
                })?;
                field_by_name.insert(field.name.clone(), fields.len());
                field_by_id.insert(field.id, fields.len());
                field_owner.insert(field.id, index);
                fields.push(FieldDescriptor {
                    name: field.name.clone(),
                    id: field.id,
                    field_type,
                    allow_new_options: field.allows_new_options(),
                    options: field.options.clone(),
                    source_table: field.source_table.clone(),
                });
            }

            by_pair.insert((tab.name.clone(), table.name.clone()), index);
            by_id.insert(table.id.clone(), index);
            by_name.entry(table.name.clone()).or_default().push(index);
            tables.push(TableDescriptor {
                index,
                tab: tab.name.clone(),
                tab_id: tab.id.clone(),
                name: table.name.clone(),
                id: table.id.clone(),
                fields,
                field_by_name,
                field_by_id,
                sub_tables: Vec::new(),
            });
        }

        // Sub-table names resolve uniquely once validation has passed.
        for (position, (_, table)) in document.tables().enumerate() {
            let resolved = table
                .sub_tables
                .iter()
                .filter_map(|name| match by_name.get(name).map(Vec::as_slice) {
                    Some([index]) => Some(*index),
                    _ => None,
                })
                .collect();
            tables[position].sub_tables = resolved;
        }

        let mut model = Self {
            document,
            tables,
            by_pair,
            by_id,
            by_name,
            field_owner,
            references: ReferenceResolver::default(),
        };
        model.references = ReferenceResolver::new(&model, options)?;

        info!(
            "Built schema model: {} tabs, {} tables, {} fields, {} relations",
            model.document.tabs.len(),
            model.tables.len(),
            model.field_owner.len(),
            model.references.relations().len()
        );
        Ok(model)
    }

    /// The document this model was built from.
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn references(&self) -> &ReferenceResolver {
        &self.references
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Every table in document order.
    pub fn tables(&self) -> impl Iterator<Item = &TableDescriptor> {
        self.tables.iter()
    }

    pub fn table(&self, tab: &str, table: &str) -> Option<&TableDescriptor> {
        self.by_pair
            .get(&(tab.to_string(), table.to_string()))
            .and_then(|&i| self.table_at(i))
    }

    /// Like [`SchemaModel::table`], failing with `UnknownTable`.
    pub fn require_table(&self, tab: &str, table: &str) -> Result<&TableDescriptor> {
        self.table(tab, table)
            .ok_or_else(|| StructureError::UnknownTable(format!("{}.{}", tab, table)))
    }

    pub fn table_at(&self, index: TableIndex) -> Option<&TableDescriptor> {
        self.tables.get(index.0)
    }

    /// Table with the given service identifier.
    pub fn table_by_id(&self, id: &str) -> Option<&TableDescriptor> {
        self.by_id.get(id).and_then(|&i| self.table_at(i))
    }

    /// Table with the given bare name, if exactly one tab declares it.
    pub fn table_named(&self, name: &str) -> Option<&TableDescriptor> {
        match self.by_name.get(name).map(Vec::as_slice) {
            Some([index]) => self.table_at(*index),
            _ => None,
        }
    }

    pub fn field(&self, tab: &str, table: &str, field: &str) -> Option<&FieldDescriptor> {
        self.table(tab, table)?.field(field)
    }

    /// Fields of a table in declaration order.
    pub fn fields(&self, tab: &str, table: &str) -> Option<&[FieldDescriptor]> {
        self.table(tab, table).map(TableDescriptor::fields)
    }

    /// Sub-tables of a table, resolved to their descriptors.
    pub fn sub_tables(&self, tab: &str, table: &str) -> Option<Vec<&TableDescriptor>> {
        let table = self.table(tab, table)?;
        Some(
            table
                .sub_tables
                .iter()
                .filter_map(|&i| self.table_at(i))
                .collect(),
        )
    }

    /// The field with a given id and the table that owns it.
    pub fn field_by_id(&self, id: FieldId) -> Option<(&TableDescriptor, &FieldDescriptor)> {
        let table = self.table_at(*self.field_owner.get(&id)?)?;
        Some((table, table.field_by_id(id)?))
    }
}
