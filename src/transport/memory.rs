//! In-memory transport
//!
//! Keeps id-keyed rows per table in process. Filtering, ordering and paging
//! follow the service: `eq` compares text, the ordering comparisons compare
//! numerically when both sides are numbers, `like` is a substring match.
//! Sub-table rows are returned only when the query asks for them.

use super::{FetchQuery, IdCondition, TableLocator, Transport, TransportError};
use crate::access::query::{Direction, Operator};
use crate::models::{FieldId, IdRecord, IdRow, RecordId};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct MemoryTable {
    next_id: u64,
    rows: BTreeMap<RecordId, IdRow>,
}

/// Transport backed by in-process tables
#[derive(Debug, Default)]
pub struct MemoryTransport {
    tables: Mutex<HashMap<TableLocator, MemoryTable>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row directly, bypassing the access layer.
    pub fn seed(&self, table: &TableLocator, values: IdRecord) -> RecordId {
        let mut tables = self.lock();
        let entry = tables.entry(table.clone()).or_default();
        insert(entry, values)
    }

    /// Attach sub-table rows to a stored record, replacing any rows already
    /// stored for `sub_table`. Sub-rows are numbered from 1.
    pub fn seed_sub_rows(
        &self,
        table: &TableLocator,
        record: RecordId,
        sub_table: &str,
        rows: Vec<IdRecord>,
    ) -> Result<(), TransportError> {
        let mut tables = self.lock();
        let stored = tables
            .get_mut(table)
            .and_then(|t| t.rows.get_mut(&record))
            .ok_or_else(|| not_found(table, record))?;
        let sub_rows = rows
            .into_iter()
            .zip(1..)
            .map(|(values, id)| IdRow::new(Some(RecordId(id)), values))
            .collect();
        stored.sub_rows.insert(sub_table.to_string(), sub_rows);
        Ok(())
    }

    /// All rows of a table in record id order, sub-table rows included.
    pub fn rows(&self, table: &TableLocator) -> Vec<IdRow> {
        self.lock()
            .get(table)
            .map(|t| t.rows.values().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TableLocator, MemoryTable>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn insert(table: &mut MemoryTable, values: IdRecord) -> RecordId {
    table.next_id += 1;
    let id = RecordId(table.next_id);
    table.rows.insert(id, IdRow::new(Some(id), values));
    id
}

fn not_found(table: &TableLocator, record: RecordId) -> TransportError {
    TransportError::NotFound(format!("{}/{}", table.table_id, record))
}

/// Copy of a stored row as the service would return it.
fn response(row: &IdRow, subtables: bool) -> IdRow {
    let mut row = row.clone();
    if !subtables {
        row.sub_rows.clear();
    }
    row
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Array(items) => items.iter().map(text).collect::<Vec<_>>().join("|"),
        other => other.to_string(),
    }
}

/// Comparison key: finite numbers sort before text, numerically among
/// themselves; everything else sorts as text.
#[derive(Debug)]
enum SortKey {
    Number(f64),
    Text(String),
}

impl SortKey {
    fn of(text: String) -> Self {
        match text.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => SortKey::Number(n),
            _ => SortKey::Text(text),
        }
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Number(_), SortKey::Text(_)) => Ordering::Less,
            (SortKey::Text(_), SortKey::Number(_)) => Ordering::Greater,
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

fn compare(actual: &Value, expected: &str) -> Ordering {
    SortKey::of(text(actual)).cmp(&SortKey::of(expected.to_string()))
}

fn matches(values: &IdRecord, condition: &IdCondition) -> bool {
    let actual = values.get(&condition.field).unwrap_or(&Value::Null);
    match condition.operator {
        Operator::Eq => match actual {
            Value::Array(items) => items.iter().any(|v| text(v) == condition.value),
            other => text(other) == condition.value,
        },
        Operator::Like => text(actual).contains(&condition.value),
        Operator::Gt => compare(actual, &condition.value) == Ordering::Greater,
        Operator::Gte => compare(actual, &condition.value) != Ordering::Less,
        Operator::Lt => compare(actual, &condition.value) == Ordering::Less,
        Operator::Lte => compare(actual, &condition.value) != Ordering::Greater,
    }
}

fn order_rows(rows: &mut [IdRow], field: FieldId, direction: Direction) {
    let key = |row: &IdRow| SortKey::of(text(row.values.get(&field).unwrap_or(&Value::Null)));
    match direction {
        Direction::Asc => rows.sort_by_cached_key(key),
        Direction::Desc => rows.sort_by_cached_key(|row| Reverse(key(row))),
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn fetch(
        &self,
        table: &TableLocator,
        record: Option<RecordId>,
        query: &FetchQuery,
    ) -> Result<Vec<IdRow>, TransportError> {
        let tables = self.lock();
        let Some(stored) = tables.get(table) else {
            return Ok(Vec::new());
        };

        if let Some(id) = record {
            return Ok(stored
                .rows
                .get(&id)
                .map(|row| vec![response(row, query.subtables)])
                .unwrap_or_default());
        }

        let mut rows: Vec<IdRow> = stored
            .rows
            .values()
            .filter(|row| query.conditions.iter().all(|c| matches(&row.values, c)))
            .map(|row| response(row, query.subtables))
            .collect();
        if let Some((field, direction)) = query.ordering {
            order_rows(&mut rows, field, direction);
        }
        Ok(rows.into_iter().skip(query.offset).take(query.limit).collect())
    }

    async fn write(
        &self,
        table: &TableLocator,
        record: Option<RecordId>,
        values: &IdRecord,
    ) -> Result<IdRow, TransportError> {
        let mut tables = self.lock();
        let stored = tables.entry(table.clone()).or_default();
        match record {
            None => {
                let id = insert(stored, values.clone());
                Ok(IdRow::new(Some(id), values.clone()))
            }
            Some(id) => {
                let existing = stored.rows.get_mut(&id).ok_or_else(|| not_found(table, id))?;
                existing
                    .values
                    .extend(values.iter().map(|(k, v)| (*k, v.clone())));
                Ok(response(existing, false))
            }
        }
    }

    async fn delete(&self, table: &TableLocator, record: RecordId) -> Result<(), TransportError> {
        self.lock()
            .get_mut(table)
            .and_then(|t| t.rows.remove(&record))
            .map(|_| ())
            .ok_or_else(|| not_found(table, record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(pairs: &[(u64, Value)]) -> IdRecord {
        pairs.iter().map(|(k, v)| (FieldId(*k), v.clone())).collect()
    }

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(future)
    }

    #[test]
    fn test_filter_order_and_page() {
        block_on(async {
            let transport = MemoryTransport::new();
            let table = TableLocator::new("sales", "3");
            for (qty, region) in [(5, "north"), (12, "south"), (9, "north"), (30, "north")] {
                transport.seed(&table, record(&[(1, json!(qty)), (2, json!(region))]));
            }

            let query = FetchQuery {
                conditions: vec![IdCondition {
                    field: FieldId(2),
                    operator: Operator::Eq,
                    value: "north".to_string(),
                }],
                ordering: Some((FieldId(1), Direction::Desc)),
                offset: 1,
                limit: 5,
                ..FetchQuery::default()
            };
            let rows = transport.fetch(&table, None, &query).await.unwrap();
            let quantities: Vec<_> = rows.iter().map(|r| r.values[&FieldId(1)].clone()).collect();
            assert_eq!(quantities, vec![json!(9), json!(5)]);
        });
    }

    #[test]
    fn test_numeric_comparison() {
        let values = record(&[(1, json!("10"))]);
        let condition = |operator, value: &str| IdCondition {
            field: FieldId(1),
            operator,
            value: value.to_string(),
        };
        assert!(matches(&values, &condition(Operator::Gt, "9")));
        assert!(matches(&values, &condition(Operator::Lte, "10")));
        assert!(!matches(&values, &condition(Operator::Lt, "10")));
        assert!(matches(&values, &condition(Operator::Like, "1")));
    }

    #[test]
    fn test_update_and_delete_missing_record() {
        block_on(async {
            let transport = MemoryTransport::new();
            let table = TableLocator::new("sales", "3");
            let missing = RecordId(99);
            assert!(matches!(
                transport.write(&table, Some(missing), &IdRecord::new()).await,
                Err(TransportError::NotFound(_))
            ));
            assert!(matches!(
                transport.delete(&table, missing).await,
                Err(TransportError::NotFound(_))
            ));
        });
    }

    #[test]
    fn test_mixed_values_sort_consistently() {
        let mut rows: Vec<IdRow> = ["9", "NaN", "10", "1a", "inf", "-2.5", "9", ""]
            .iter()
            .zip(1..)
            .map(|(v, id)| IdRow::new(Some(RecordId(id)), record(&[(1, json!(v))])))
            .collect();
        order_rows(&mut rows, FieldId(1), Direction::Asc);
        let sorted: Vec<_> = rows.iter().map(|r| r.values[&FieldId(1)].clone()).collect();
        assert_eq!(
            sorted,
            vec![
                json!("-2.5"),
                json!("9"),
                json!("9"),
                json!("10"),
                json!(""),
                json!("1a"),
                json!("NaN"),
                json!("inf")
            ]
        );

        let nan = record(&[(1, json!("NaN"))]);
        let gt = IdCondition {
            field: FieldId(1),
            operator: Operator::Gte,
            value: "5".to_string(),
        };
        let lt = IdCondition {
            operator: Operator::Lt,
            ..gt.clone()
        };
        assert!(matches(&nan, &gt));
        assert!(!matches(&nan, &lt));
    }

    #[test]
    fn test_sub_rows_only_when_requested() {
        block_on(async {
            let transport = MemoryTransport::new();
            let table = TableLocator::new("sales", "3");
            let id = transport.seed(&table, record(&[(1, json!("A-1"))]));
            transport
                .seed_sub_rows(&table, id, "4", vec![record(&[(7, json!("line 1"))])])
                .unwrap();
            assert!(transport.seed_sub_rows(&table, RecordId(99), "4", Vec::new()).is_err());

            let plain = transport.fetch(&table, Some(id), &FetchQuery::default()).await.unwrap();
            assert!(plain[0].sub_rows.is_empty());

            let query = FetchQuery {
                subtables: true,
                ..FetchQuery::default()
            };
            let rows = transport.fetch(&table, None, &query).await.unwrap();
            let lines = &rows[0].sub_rows["4"];
            assert_eq!(lines[0].record_id, Some(RecordId(1)));
            assert_eq!(lines[0].values[&FieldId(7)], json!("line 1"));
        });
    }
}
