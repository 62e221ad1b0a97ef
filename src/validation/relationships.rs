//! Relationship validation functionality
//!
//! Validates `source_table` and `sub_tables` references: every reference must
//! name exactly one table in the document, `source_table` may only sit on
//! selection or text fields, and the sub-table graph must be acyclic.

use super::{ValidationReport, Violation, field_path, table_path};
use crate::models::Document;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet, VecDeque};

/// Outcome of looking a table up by its bare name
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TableLookup<'a> {
    Found { tab: &'a str },
    Missing,
    Ambiguous { tabs: Vec<String> },
}

/// Table name -> tabs declaring a table of that name
pub(crate) struct TableNameIndex<'a> {
    by_name: HashMap<&'a str, Vec<&'a str>>,
}

impl<'a> TableNameIndex<'a> {
    pub(crate) fn new(document: &'a Document) -> Self {
        let mut by_name: HashMap<&str, Vec<&str>> = HashMap::new();
        for (tab, table) in document.tables() {
            let tabs = by_name.entry(table.name.as_str()).or_default();
            if !tabs.contains(&tab.name.as_str()) {
                tabs.push(tab.name.as_str());
            }
        }
        Self { by_name }
    }

    pub(crate) fn lookup(&self, name: &str) -> TableLookup<'a> {
        match self.by_name.get(name).map(Vec::as_slice) {
            None | Some([]) => TableLookup::Missing,
            Some([tab]) => TableLookup::Found { tab: *tab },
            Some(tabs) => TableLookup::Ambiguous {
                tabs: tabs.iter().map(|t| t.to_string()).collect(),
            },
        }
    }
}

pub(crate) fn check_references(document: &Document, report: &mut ValidationReport) {
    let index = TableNameIndex::new(document);

    for (tab, table) in document.tables() {
        for field in &table.fields {
            let Some(source) = field.source_table.as_deref() else { continue };
            let path = field_path(&tab.name, &table.name, &field.name);

            if let Some(kind) = field.kind()
                && !kind.accepts_source_table()
            {
                report.violation(Violation::SourceTableNotAllowed {
                    field: path.clone(),
                    field_type: kind.as_str().to_string(),
                });
            }

            match index.lookup(source) {
                TableLookup::Found { .. } => {}
                TableLookup::Missing => report.violation(Violation::MissingSourceTable {
                    field: path,
                    source_table: source.to_string(),
                }),
                TableLookup::Ambiguous { tabs } => report.violation(Violation::AmbiguousSourceTable {
                    field: path,
                    source_table: source.to_string(),
                    tabs,
                }),
            }
        }

        for sub_table in &table.sub_tables {
            match index.lookup(sub_table) {
                TableLookup::Found { .. } => {}
                TableLookup::Missing => report.violation(Violation::MissingSubTable {
                    table: table_path(&tab.name, &table.name),
                    sub_table: sub_table.clone(),
                }),
                TableLookup::Ambiguous { tabs } => report.violation(Violation::AmbiguousSubTable {
                    table: table_path(&tab.name, &table.name),
                    sub_table: sub_table.clone(),
                    tabs,
                }),
            }
        }
    }
}

/// Report every strongly connected group of the sub-table graph, including
/// tables listing themselves, as a cycle.
pub(crate) fn check_sub_table_cycles(document: &Document, report: &mut ValidationReport) {
    let index = TableNameIndex::new(document);
    let mut graph = DiGraph::<String, ()>::new();
    let mut nodes: HashMap<(&str, &str), NodeIndex> = HashMap::new();

    for (tab, table) in document.tables() {
        nodes
            .entry((tab.name.as_str(), table.name.as_str()))
            .or_insert_with(|| graph.add_node(table_path(&tab.name, &table.name)));
    }

    for (tab, table) in document.tables() {
        let Some(&from) = nodes.get(&(tab.name.as_str(), table.name.as_str())) else {
            continue;
        };
        for sub_table in &table.sub_tables {
            // Unresolvable names are reported by check_references.
            if let TableLookup::Found { tab: target_tab } = index.lookup(sub_table)
                && let Some(&to) = nodes.get(&(target_tab, sub_table.as_str()))
                && graph.find_edge(from, to).is_none()
            {
                graph.add_edge(from, to, ());
            }
        }
    }

    let mut cycles: Vec<(NodeIndex, Vec<String>)> = tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.find_edge(scc[0], scc[0]).is_some())
        .filter_map(|scc| {
            let start = *scc.iter().min()?;
            let members: HashSet<NodeIndex> = scc.into_iter().collect();
            Some((start, cycle_through(&graph, start, &members)))
        })
        .collect();
    cycles.sort_by_key(|(start, _)| *start);

    for (_, cycle) in cycles {
        report.violation(Violation::CyclicSubTables { cycle });
    }
}

/// Shortest path from `start` back to itself inside one strongly connected group.
fn cycle_through(
    graph: &DiGraph<String, ()>,
    start: NodeIndex,
    members: &HashSet<NodeIndex>,
) -> Vec<String> {
    let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut visited = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);

    while let Some(node) = queue.pop_front() {
        for next in graph.neighbors(node) {
            if !members.contains(&next) {
                continue;
            }
            if next == start {
                let mut path = Vec::new();
                let mut current = node;
                while current != start {
                    path.push(graph[current].clone());
                    match parent.get(&current) {
                        Some(&p) => current = p,
                        None => break,
                    }
                }
                path.push(graph[start].clone());
                path.reverse();
                path.push(graph[start].clone());
                return path;
            }
            if visited.insert(next) {
                parent.insert(next, node);
                queue.push_back(next);
            }
        }
    }

    vec![graph[start].clone()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Field, FieldType, Tab, Table};

    fn document(tables: Vec<Table>) -> Document {
        Document::new(vec![Tab::new("T", "t", tables)])
    }

    fn cycles(document: &Document) -> Vec<Vec<String>> {
        let mut report = ValidationReport::default();
        check_sub_table_cycles(document, &mut report);
        report.cycles().map(<[String]>::to_vec).collect()
    }

    #[test]
    fn test_two_table_cycle() {
        let doc = document(vec![
            Table::new("a", "1", vec![]).with_sub_tables(["b"]),
            Table::new("b", "2", vec![]).with_sub_tables(["a"]),
        ]);
        assert_eq!(cycles(&doc), vec![vec!["T.a", "T.b", "T.a"]]);
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let doc = document(vec![Table::new("a", "1", vec![]).with_sub_tables(["a"])]);
        assert_eq!(cycles(&doc), vec![vec!["T.a", "T.a"]]);
    }

    #[test]
    fn test_long_acyclic_chain() {
        let tables = (0..6)
            .map(|i| {
                let table = Table::new(format!("t{}", i), i.to_string(), vec![]);
                if i < 5 {
                    table.with_sub_tables([format!("t{}", i + 1)])
                } else {
                    table
                }
            })
            .collect();
        assert!(cycles(&document(tables)).is_empty());
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let doc = document(vec![
            Table::new("a", "1", vec![]).with_sub_tables(["b", "c"]),
            Table::new("b", "2", vec![]).with_sub_tables(["d"]),
            Table::new("c", "3", vec![]).with_sub_tables(["d"]),
            Table::new("d", "4", vec![]),
        ]);
        assert!(cycles(&doc).is_empty());
    }

    #[test]
    fn test_reference_integrity() {
        let doc = Document::new(vec![
            Tab::new(
                "A",
                "a",
                vec![
                    Table::new(
                        "orders",
                        "1",
                        vec![
                            Field::new("customer", 1, FieldType::Selection).with_source_table("customer"),
                            Field::new("ghost", 2, FieldType::Text).with_source_table("nowhere"),
                            Field::new("qty", 3, FieldType::Number).with_source_table("orders"),
                        ],
                    )
                    .with_sub_tables(["lines", "missing"]),
                    Table::new("customer", "2", vec![]),
                ],
            ),
            Tab::new(
                "B",
                "b",
                vec![Table::new("customer", "3", vec![]), Table::new("lines", "4", vec![])],
            ),
        ]);
        let mut report = ValidationReport::default();
        check_references(&doc, &mut report);

        assert_eq!(report.violations.len(), 4);
        assert!(report.violations.contains(&Violation::AmbiguousSourceTable {
            field: "A.orders.customer".to_string(),
            source_table: "customer".to_string(),
            tabs: vec!["A".to_string(), "B".to_string()],
        }));
        assert!(report.violations.contains(&Violation::MissingSourceTable {
            field: "A.orders.ghost".to_string(),
            source_table: "nowhere".to_string(),
        }));
        assert!(report.violations.contains(&Violation::SourceTableNotAllowed {
            field: "A.orders.qty".to_string(),
            field_type: "number".to_string(),
        }));
        assert!(report.violations.contains(&Violation::MissingSubTable {
            table: "A.orders".to_string(),
            sub_table: "missing".to_string(),
        }));
    }
}
