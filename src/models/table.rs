//! Table model for the SDK

use super::field::Field;
use serde::{Deserialize, Serialize};

/// Table as declared in a structure definition
///
/// Field order is declaration order. `sub_tables` holds table names; they are
/// resolved against the owning document, never stored as links.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Table {
    pub name: String,
    pub id: String,
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_tables: Vec<String>,
}

impl Table {
    pub fn new(name: impl Into<String>, id: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            fields,
            sub_tables: Vec::new(),
        }
    }

    pub fn with_sub_tables<I, S>(mut self, sub_tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sub_tables = sub_tables.into_iter().map(Into::into).collect();
        self
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}
