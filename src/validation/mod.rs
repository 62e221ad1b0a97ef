//! Validation functionality
//!
//! Provides validation logic for parsed structure definitions:
//! - Table validation (uniqueness of names and ids, type legality, attribute applicability)
//! - Relationship validation (source table / sub-table integrity, sub-table cycles)
//!
//! Every check runs and every problem is collected, so a single report lists
//! everything wrong with a definition.

pub mod relationships;
pub mod tables;

use crate::error::{Result, StructureError};
use crate::models::{Document, FieldId};
use std::fmt;
use tracing::warn;

/// A fatal problem with a structure definition
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("tab name '{name}' is declared more than once")]
    DuplicateTabName { name: String },

    #[error("tab id '{id}' is used by both '{first}' and '{second}'")]
    DuplicateTabId {
        id: String,
        first: String,
        second: String,
    },

    #[error("table name '{name}' is declared more than once in tab '{tab}'")]
    DuplicateTableName { tab: String, name: String },

    #[error("table id '{id}' is used by both '{first}' and '{second}'")]
    DuplicateTableId {
        id: String,
        first: String,
        second: String,
    },

    #[error("field name '{name}' is declared more than once in table '{table}'")]
    DuplicateFieldName { table: String, name: String },

    #[error("field id {id} is used by both '{first}' and '{second}'")]
    DuplicateFieldId {
        id: FieldId,
        first: String,
        second: String,
    },

    #[error("field '{field}' has unrecognised type '{field_type}'")]
    UnknownFieldType { field: String, field_type: String },

    #[error("field '{field}' references missing source table '{source_table}'")]
    MissingSourceTable { field: String, source_table: String },

    #[error("field '{field}' references source table '{source_table}', which exists in several tabs: {}", .tabs.join(", "))]
    AmbiguousSourceTable {
        field: String,
        source_table: String,
        tabs: Vec<String>,
    },

    #[error("field '{field}' of type '{field_type}' cannot carry a source table")]
    SourceTableNotAllowed { field: String, field_type: String },

    #[error("table '{table}' lists missing sub-table '{sub_table}'")]
    MissingSubTable { table: String, sub_table: String },

    #[error("table '{table}' lists sub-table '{sub_table}', which exists in several tabs: {}", .tabs.join(", "))]
    AmbiguousSubTable {
        table: String,
        sub_table: String,
        tabs: Vec<String>,
    },

    #[error("sub-tables form a cycle: {}", .cycle.join(" -> "))]
    CyclicSubTables { cycle: Vec<String> },
}

impl Violation {
    pub fn is_cycle(&self) -> bool {
        matches!(self, Violation::CyclicSubTables { .. })
    }
}

/// A problem that does not stop a definition from loading
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Warning {
    #[error("field '{field}' of type '{field_type}' sets allow_user_add_new_options, which only applies to selection fields")]
    InertOptionFlag { field: String, field_type: String },

    #[error("field '{field}' of type '{field_type}' lists options, which only apply to selection fields")]
    InertOptions { field: String, field_type: String },
}

/// Everything found wrong with a definition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
    pub warnings: Vec<Warning>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub(crate) fn violation(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    pub(crate) fn warning(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    /// Cycles found, in the order they were detected.
    pub fn cycles(&self) -> impl Iterator<Item = &[String]> {
        self.violations.iter().filter_map(|v| match v {
            Violation::CyclicSubTables { cycle } => Some(cycle.as_slice()),
            _ => None,
        })
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} violation(s)", self.violations.len())?;
        for (i, violation) in self.violations.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}{}", sep, violation)?;
        }
        Ok(())
    }
}

/// Schema validator
#[derive(Debug, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    /// Create a new schema validator
    pub fn new() -> Self {
        Self
    }

    /// Run every check and collect the results.
    pub fn report(&self, document: &Document) -> ValidationReport {
        let mut report = ValidationReport::default();
        tables::check_uniqueness(document, &mut report);
        tables::check_types(document, &mut report);
        relationships::check_references(document, &mut report);
        tables::check_applicability(document, &mut report);
        relationships::check_sub_table_cycles(document, &mut report);
        report
    }

    /// Return the document unchanged if it is valid.
    ///
    /// Warnings are logged and otherwise ignored. When the only violations are
    /// sub-table cycles the error is `CyclicReference`; any other violation
    /// yields `SchemaViolation` with the full report, cycles included.
    pub fn validate(&self, document: Document) -> Result<Document> {
        let report = self.report(&document);
        for warning in &report.warnings {
            warn!("Structure definition: {}", warning);
        }
        if report.is_valid() {
            return Ok(document);
        }
        if report.violations.iter().all(Violation::is_cycle) {
            let path = report.cycles().next().map(<[String]>::to_vec).unwrap_or_default();
            return Err(StructureError::CyclicReference { path });
        }
        Err(StructureError::SchemaViolation(report))
    }
}

pub(crate) fn table_path(tab: &str, table: &str) -> String {
    format!("{}.{}", tab, table)
}

pub(crate) fn field_path(tab: &str, table: &str, field: &str) -> String {
    format!("{}.{}.{}", tab, table, field)
}
