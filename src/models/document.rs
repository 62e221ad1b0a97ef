//! Document and tab models for the SDK

use super::table::Table;
use serde::{Deserialize, Serialize};

/// Top-level navigation section of the remote service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tab {
    pub name: String,
    pub id: String,
    pub tables: Vec<Table>,
}

impl Tab {
    pub fn new(name: impl Into<String>, id: impl Into<String>, tables: Vec<Table>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            tables,
        }
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }
}

/// Root of a parsed structure definition
///
/// A document is never edited after it has been parsed. Reloading a definition
/// produces a new document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub tabs: Vec<Tab>,
}

impl Document {
    pub fn new(tabs: Vec<Tab>) -> Self {
        Self { tabs }
    }

    pub fn tab(&self, name: &str) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.name == name)
    }

    /// Every table in document order, paired with its tab.
    pub fn tables(&self) -> impl Iterator<Item = (&Tab, &Table)> {
        self.tabs
            .iter()
            .flat_map(|tab| tab.tables.iter().map(move |table| (tab, table)))
    }

    pub fn table_count(&self) -> usize {
        self.tabs.iter().map(|t| t.tables.len()).sum()
    }
}
