//! Structure definition parser
//!
//! Walks the YAML node tree by hand rather than deriving `Deserialize`, so a
//! failure can name the exact path of the offending key
//! (e.g. `tabs.Sales.tables.sales.fields.quantity.field_id`). Unknown keys are
//! ignored. Mapping order is preserved, which fixes table and field order.
//! Repeated tab, table and field names are kept for the validator to report.

use super::yaml::Node;
use crate::error::{Result, StructureError};
use crate::models::{Document, Field, FieldId, Tab, Table};
use tracing::debug;

/// Parses structure definitions into documents
#[derive(Debug, Default)]
pub struct StructureImporter;

impl StructureImporter {
    pub fn new() -> Self {
        Self
    }

    /// Parse a structure definition.
    ///
    /// # Errors
    ///
    /// `MalformedDefinition` naming the offending path when the text is not
    /// valid YAML, a mandatory key is missing, or a value has the wrong shape.
    pub fn parse(&self, content: &str) -> Result<Document> {
        let root = Node::parse(content)
            .map_err(|e| StructureError::malformed("<root>", format!("invalid YAML: {}", e)))?;
        if root.as_mapping().is_none() {
            return Err(StructureError::malformed(
                "<root>",
                format!("expected a mapping, found {}", root.shape()),
            ));
        }
        let tabs_value = root
            .get("tabs")
            .ok_or_else(|| StructureError::malformed("tabs", "missing mandatory key"))?;

        let mut tabs = Vec::new();
        for (key, value) in as_mapping(tabs_value, "tabs")? {
            let name = key_name(key, "tabs")?;
            tabs.push(parse_tab(&name, value, &format!("tabs.{}", name))?);
        }

        let document = Document::new(tabs);
        debug!(
            "Parsed structure definition with {} tabs and {} tables",
            document.tabs.len(),
            document.table_count()
        );
        Ok(document)
    }
}

fn parse_tab(name: &str, node: &Node, path: &str) -> Result<Tab> {
    as_mapping(node, path)?;
    let id = scalar_string(required(node, "tab_id", path)?, &format!("{}.tab_id", path))?;

    let tables_path = format!("{}.tables", path);
    let mut tables = Vec::new();
    for (key, value) in as_mapping(required(node, "tables", path)?, &tables_path)? {
        let table_name = key_name(key, &tables_path)?;
        let table_path = format!("{}.{}", tables_path, table_name);
        tables.push(parse_table(&table_name, value, &table_path)?);
    }

    Ok(Tab::new(name, id, tables))
}

fn parse_table(name: &str, node: &Node, path: &str) -> Result<Table> {
    as_mapping(node, path)?;
    let id = scalar_string(
        required(node, "table_id", path)?,
        &format!("{}.table_id", path),
    )?;

    let fields_path = format!("{}.fields", path);
    let mut fields = Vec::new();
    for (key, value) in as_mapping(required(node, "fields", path)?, &fields_path)? {
        let field_name = key_name(key, &fields_path)?;
        let field_path = format!("{}.{}", fields_path, field_name);
        fields.push(parse_field(&field_name, value, &field_path)?);
    }

    let sub_tables = match optional(node, "sub_tables") {
        None => Vec::new(),
        Some(value) => string_list(value, &format!("{}.sub_tables", path))?,
    };

    Ok(Table::new(name, id, fields).with_sub_tables(sub_tables))
}

fn parse_field(name: &str, node: &Node, path: &str) -> Result<Field> {
    as_mapping(node, path)?;
    let id = field_id(required(node, "field_id", path)?, &format!("{}.field_id", path))?;
    let field_type = required(node, "field_type", path)?
        .as_text()
        .ok_or_else(|| StructureError::malformed(format!("{}.field_type", path), "expected a type name"))?
        .to_string();

    let allow_user_add_new_options = match optional(node, "allow_user_add_new_options") {
        None => None,
        Some(v) => Some(v.as_bool().ok_or_else(|| {
            StructureError::malformed(
                format!("{}.allow_user_add_new_options", path),
                "expected a boolean",
            )
        })?),
    };

    let source_table = match optional(node, "source_table") {
        None => None,
        Some(v) => Some(
            v.as_text()
                .ok_or_else(|| {
                    StructureError::malformed(format!("{}.source_table", path), "expected a table name")
                })?
                .to_string(),
        ),
    };

    let options = match optional(node, "options") {
        None => Vec::new(),
        Some(v) => string_list(v, &format!("{}.options", path))?,
    };

    Ok(Field {
        name: name.to_string(),
        id,
        field_type,
        allow_user_add_new_options,
        source_table,
        options,
    })
}

fn required<'a>(node: &'a Node, key: &str, path: &str) -> Result<&'a Node> {
    node.get(key)
        .ok_or_else(|| StructureError::malformed(format!("{}.{}", path, key), "missing mandatory key"))
}

/// A key that is absent or set to null.
fn optional<'a>(node: &'a Node, key: &str) -> Option<&'a Node> {
    node.get(key).filter(|v| !v.is_null())
}

fn as_mapping<'a>(node: &'a Node, path: &str) -> Result<&'a [(Node, Node)]> {
    node.as_mapping()
        .ok_or_else(|| StructureError::malformed(path, format!("expected a mapping, found {}", node.shape())))
}

/// Names are taken as written: `007`, `true` and `null` are names like any other.
fn key_name(key: &Node, parent: &str) -> Result<String> {
    match key {
        Node::Scalar { text, .. } if !text.is_empty() => Ok(text.clone()),
        other => Err(StructureError::malformed(
            parent,
            format!("expected a name as key, found {}", other.shape()),
        )),
    }
}

/// Identifiers may be written as strings or bare numbers.
fn scalar_string(node: &Node, path: &str) -> Result<String> {
    let id = node
        .as_text()
        .ok_or_else(|| {
            StructureError::malformed(path, format!("expected a string or number, found {}", node.shape()))
        })?
        .trim();
    if id.is_empty() {
        return Err(StructureError::malformed(path, "identifier cannot be empty"));
    }
    Ok(id.to_string())
}

fn field_id(node: &Node, path: &str) -> Result<FieldId> {
    let text = node.as_text().ok_or_else(|| {
        StructureError::malformed(path, format!("expected a numeric id, found {}", node.shape()))
    })?;
    text.parse::<FieldId>().map_err(|_| {
        StructureError::malformed(path, format!("expected a non-negative integer, found '{}'", text))
    })
}

fn string_list(node: &Node, path: &str) -> Result<Vec<String>> {
    let seq = node
        .as_sequence()
        .ok_or_else(|| StructureError::malformed(path, format!("expected a list, found {}", node.shape())))?;
    seq.iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_text().map(str::to_string).ok_or_else(|| {
                StructureError::malformed(
                    format!("{}[{}]", path, i),
                    format!("expected a scalar, found {}", item.shape()),
                )
            })
        })
        .collect()
}
