//! Table validation functionality
//!
//! Validates tables for naming conflicts, identifier conflicts, type legality
//! and attribute applicability.

use super::{ValidationReport, Violation, Warning, field_path, table_path};
use crate::models::{Document, FieldId};
use std::collections::{HashMap, HashSet};

/// Uniqueness of tab names, tab ids, table names per tab, table ids across the
/// document, field names per table and field ids across the document.
pub(crate) fn check_uniqueness(document: &Document, report: &mut ValidationReport) {
    let mut tab_names = HashSet::new();
    let mut tab_ids: HashMap<&str, &str> = HashMap::new();
    let mut table_ids: HashMap<&str, String> = HashMap::new();
    let mut field_ids: HashMap<FieldId, String> = HashMap::new();

    for tab in &document.tabs {
        if !tab_names.insert(tab.name.as_str()) {
            report.violation(Violation::DuplicateTabName {
                name: tab.name.clone(),
            });
        }
        if let Some(first) = tab_ids.get(tab.id.as_str()) {
            report.violation(Violation::DuplicateTabId {
                id: tab.id.clone(),
                first: first.to_string(),
                second: tab.name.clone(),
            });
        } else {
            tab_ids.insert(tab.id.as_str(), tab.name.as_str());
        }

        let mut table_names = HashSet::new();
        for table in &tab.tables {
            let location = table_path(&tab.name, &table.name);
            if !table_names.insert(table.name.as_str()) {
                report.violation(Violation::DuplicateTableName {
                    tab: tab.name.clone(),
                    name: table.name.clone(),
                });
            }
            if let Some(first) = table_ids.get(table.id.as_str()) {
                report.violation(Violation::DuplicateTableId {
                    id: table.id.clone(),
                    first: first.clone(),
                    second: location.clone(),
                });
            } else {
                table_ids.insert(table.id.as_str(), location.clone());
            }

            let mut field_names = HashSet::new();
            for field in &table.fields {
                if !field_names.insert(field.name.as_str()) {
                    report.violation(Violation::DuplicateFieldName {
                        table: location.clone(),
                        name: field.name.clone(),
                    });
                }
                let path = field_path(&tab.name, &table.name, &field.name);
                if let Some(first) = field_ids.get(&field.id) {
                    report.violation(Violation::DuplicateFieldId {
                        id: field.id,
                        first: first.clone(),
                        second: path,
                    });
                } else {
                    field_ids.insert(field.id, path);
                }
            }
        }
    }
}

pub(crate) fn check_types(document: &Document, report: &mut ValidationReport) {
    for (tab, table) in document.tables() {
        for field in &table.fields {
            if field.kind().is_none() {
                report.violation(Violation::UnknownFieldType {
                    field: field_path(&tab.name, &table.name, &field.name),
                    field_type: field.field_type.clone(),
                });
            }
        }
    }
}

/// `allow_user_add_new_options` and `options` only mean something on choice
/// fields; elsewhere they are reported as warnings.
pub(crate) fn check_applicability(document: &Document, report: &mut ValidationReport) {
    for (tab, table) in document.tables() {
        for field in &table.fields {
            let Some(kind) = field.kind() else { continue };
            if kind.is_choice() {
                continue;
            }
            let path = field_path(&tab.name, &table.name, &field.name);
            if field.allow_user_add_new_options.is_some() {
                report.warning(Warning::InertOptionFlag {
                    field: path.clone(),
                    field_type: kind.as_str().to_string(),
                });
            }
            if !field.options.is_empty() {
                report.warning(Warning::InertOptions {
                    field: path,
                    field_type: kind.as_str().to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Field, FieldType, Tab, Table};

    fn report_for(document: &Document) -> ValidationReport {
        let mut report = ValidationReport::default();
        check_uniqueness(document, &mut report);
        check_types(document, &mut report);
        check_applicability(document, &mut report);
        report
    }

    #[test]
    fn test_duplicate_field_id_across_tables() {
        let document = Document::new(vec![Tab::new(
            "Sales",
            "sales",
            vec![
                Table::new("sales", "3", vec![Field::new("product_id", 1009792, FieldType::Selection)]),
                Table::new("product", "2", vec![Field::new("product_id", 1009792, FieldType::Text)]),
            ],
        )]);
        let report = report_for(&document);
        assert_eq!(
            report.violations,
            vec![Violation::DuplicateFieldId {
                id: FieldId(1009792),
                first: "Sales.sales.product_id".to_string(),
                second: "Sales.product.product_id".to_string(),
            }]
        );
    }

    #[test]
    fn test_all_duplicates_are_reported() {
        let document = Document::new(vec![
            Tab::new(
                "A",
                "same",
                vec![
                    Table::new(
                        "t",
                        "1",
                        vec![
                            Field::new("f", 1, FieldType::Text),
                            Field::new("f", 2, FieldType::Text),
                        ],
                    ),
                    Table::new("t", "1", vec![]),
                ],
            ),
            Tab::new("A", "same", vec![]),
        ]);
        let report = report_for(&document);
        assert_eq!(report.violations.len(), 5);
        assert!(report.violations.iter().any(|v| matches!(v, Violation::DuplicateTabName { .. })));
        assert!(report.violations.iter().any(|v| matches!(v, Violation::DuplicateTabId { .. })));
        assert!(report.violations.iter().any(|v| matches!(v, Violation::DuplicateTableName { .. })));
        assert!(report.violations.iter().any(|v| matches!(v, Violation::DuplicateTableId { .. })));
        assert!(report.violations.iter().any(|v| matches!(v, Violation::DuplicateFieldName { .. })));
    }

    #[test]
    fn test_unknown_type_and_inert_flag() {
        let mut weird = Field::new("weird", 1, FieldType::Text);
        weird.field_type = "text:url".to_string();
        let mut flagged = Field::new("qty", 2, FieldType::Number);
        flagged.allow_user_add_new_options = Some(true);

        let document = Document::new(vec![Tab::new("A", "a", vec![Table::new("t", "1", vec![weird, flagged])])]);
        let report = report_for(&document);
        assert_eq!(
            report.violations,
            vec![Violation::UnknownFieldType {
                field: "A.t.weird".to_string(),
                field_type: "text:url".to_string(),
            }]
        );
        assert_eq!(
            report.warnings,
            vec![Warning::InertOptionFlag {
                field: "A.t.qty".to_string(),
                field_type: "number".to_string(),
            }]
        );
    }
}
