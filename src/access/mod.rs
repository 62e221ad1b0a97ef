//! Access façade
//!
//! Name-keyed CRUD over an injected [`Transport`]. Every call resolves the
//! table, coerces outgoing values by field type, translates names to ids,
//! delegates to the transport and translates the response back. The façade
//! holds no mutable state; the schema it reads is a shared snapshot.

pub mod coercion;
pub mod query;

pub use query::{Condition, Direction, ListQuery, Operator, Ordering};

use crate::config::AccessConfig;
use crate::error::{Result, StructureError};
use crate::model::{SchemaModel, TableDescriptor, TableTranslator};
use crate::models::{IdRecord, IdRow, Record, RecordId, Row};
use crate::transport::{FetchQuery, IdCondition, TableLocator, Transport};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Name-based CRUD surface for one schema snapshot
pub struct AccessFacade<T: Transport> {
    schema: Arc<SchemaModel>,
    transport: T,
    config: AccessConfig,
}

impl<T: Transport> AccessFacade<T> {
    pub fn new(schema: Arc<SchemaModel>, transport: T) -> Self {
        Self::with_config(schema, transport, AccessConfig::default())
    }

    pub fn with_config(schema: Arc<SchemaModel>, transport: T, config: AccessConfig) -> Self {
        Self {
            schema,
            transport,
            config,
        }
    }

    pub fn schema(&self) -> &Arc<SchemaModel> {
        &self.schema
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Create a record and return it as stored.
    pub async fn create(&self, tab: &str, table: &str, record: Record) -> Result<Row> {
        let table = self.schema.require_table(tab, table)?;
        let payload = outgoing(table, &record)?;
        debug!("Creating record in {}", table.qualified_name());
        let stored = self
            .transport
            .write(&TableLocator::from(table), None, &payload)
            .await?;
        incoming(&self.schema, table, stored)
    }

    /// Fetch one record; `None` when the service has no such record.
    pub async fn read(&self, tab: &str, table: &str, record: RecordId) -> Result<Option<Row>> {
        let table = self.schema.require_table(tab, table)?;
        debug!("Reading record {} from {}", record, table.qualified_name());
        let query = FetchQuery {
            subtables: self.config.include_subtables,
            ..FetchQuery::default()
        };
        let rows = self
            .transport
            .fetch(&TableLocator::from(table), Some(record), &query)
            .await?;
        rows.into_iter().next().map(|row| incoming(&self.schema, table, row)).transpose()
    }

    /// Update the given fields of a record; fields not named are untouched.
    pub async fn update(
        &self,
        tab: &str,
        table: &str,
        record: RecordId,
        changes: Record,
    ) -> Result<Row> {
        let table = self.schema.require_table(tab, table)?;
        let payload = outgoing(table, &changes)?;
        debug!("Updating record {} in {}", record, table.qualified_name());
        let stored = self
            .transport
            .write(&TableLocator::from(table), Some(record), &payload)
            .await?;
        incoming(&self.schema, table, stored)
    }

    pub async fn delete(&self, tab: &str, table: &str, record: RecordId) -> Result<()> {
        let table = self.schema.require_table(tab, table)?;
        debug!("Deleting record {} from {}", record, table.qualified_name());
        self.transport
            .delete(&TableLocator::from(table), record)
            .await?;
        Ok(())
    }

    /// Rows matching `query`, in the order the transport returns them.
    pub async fn list(&self, tab: &str, table: &str, query: &ListQuery) -> Result<Vec<Row>> {
        let table = self.schema.require_table(tab, table)?;
        let fetch = self.fetch_query(table, query)?;
        self.fetch_rows(table, &fetch).await
    }

    /// Rows of the table a relation field points at whose join key equals
    /// `value`.
    ///
    /// Fails with `TypeMismatch` when `field` carries no `source_table`.
    pub async fn lookup_reference(
        &self,
        tab: &str,
        table: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Row>> {
        let owner = self.schema.require_table(tab, table)?;
        let field = TableTranslator::new(owner).field(field)?;
        let relation = self.schema.references().relation(field.id).ok_or_else(|| {
            StructureError::mismatch(&field.name, field.field_type, "field has no source_table")
        })?;
        let target = self
            .schema
            .table_at(relation.target)
            .ok_or_else(|| StructureError::UnknownTable(format!("{:?}", relation.target)))?;
        let Some(join_field) = relation.join_field else {
            return Ok(Vec::new());
        };

        debug!(
            "Looking up {}={} in {} for {}.{}",
            join_field,
            value,
            target.qualified_name(),
            owner.qualified_name(),
            field.name
        );
        let fetch = FetchQuery {
            conditions: vec![IdCondition {
                field: join_field,
                operator: Operator::Eq,
                value: value.to_string(),
            }],
            limit: self.config.default_limit,
            subtables: self.config.include_subtables,
            ..FetchQuery::default()
        };
        self.fetch_rows(target, &fetch).await
    }

    async fn fetch_rows(&self, table: &TableDescriptor, query: &FetchQuery) -> Result<Vec<Row>> {
        let rows = self
            .transport
            .fetch(&TableLocator::from(table), None, query)
            .await?;
        debug!("Fetched {} rows from {}", rows.len(), table.qualified_name());
        rows.into_iter().map(|row| incoming(&self.schema, table, row)).collect()
    }

    fn fetch_query(&self, table: &TableDescriptor, query: &ListQuery) -> Result<FetchQuery> {
        let translator = TableTranslator::new(table);
        let conditions = query
            .conditions
            .iter()
            .map(|c| -> Result<IdCondition> {
                Ok(IdCondition {
                    field: translator.field(&c.field)?.id,
                    operator: c.operator,
                    value: c.value.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let ordering = query
            .ordering
            .as_ref()
            .map(|o| -> Result<_> { Ok((translator.field(&o.field)?.id, o.direction)) })
            .transpose()?;

        Ok(FetchQuery {
            conditions,
            offset: query.offset,
            limit: query.limit.unwrap_or(self.config.default_limit),
            ordering,
            subtables: query.subtables.unwrap_or(self.config.include_subtables),
        })
    }
}

/// Coerce every value by its field type, then key the record by field id.
fn outgoing(table: &TableDescriptor, record: &Record) -> Result<IdRecord> {
    let translator = TableTranslator::new(table);
    let coerced = record
        .iter()
        .map(|(name, value)| -> Result<(String, Value)> {
            Ok((name.clone(), translator.field(name)?.coerce(value)?))
        })
        .collect::<Result<Record>>()?;
    translator.names_to_ids(&coerced)
}

fn incoming(schema: &SchemaModel, table: &TableDescriptor, row: IdRow) -> Result<Row> {
    let translator = TableTranslator::new(table);
    let decoded = row
        .values
        .into_iter()
        .map(|(id, value)| -> Result<_> { Ok((id, translator.field_for_id(id)?.decode(value))) })
        .collect::<Result<IdRecord>>()?;

    let mut sub_rows = BTreeMap::new();
    for (sub_id, rows) in row.sub_rows {
        let sub_table = table
            .sub_table_indices()
            .iter()
            .filter_map(|&i| schema.table_at(i))
            .find(|t| t.id == sub_id)
            .ok_or_else(|| {
                StructureError::UnknownTable(format!(
                    "sub-table {} of {}",
                    sub_id,
                    table.qualified_name()
                ))
            })?;
        let rows = rows
            .into_iter()
            .map(|r| incoming(schema, sub_table, r))
            .collect::<Result<Vec<_>>>()?;
        sub_rows.insert(sub_table.name.clone(), rows);
    }

    Ok(Row {
        record_id: row.record_id,
        values: translator.ids_to_names(&decoded)?,
        meta: row.meta,
        sub_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::load_structure;
    use crate::models::FieldId;
    use crate::transport::MemoryTransport;
    use serde_json::json;

    const STRUCTURE: &str = r#"
tabs:
  Sales:
    tab_id: sales
    tables:
      customer:
        table_id: 1
        fields:
          customer_id: { field_id: 1009788, field_type: text }
          name: { field_id: 1009789, field_type: text }
          tier:
            field_id: 1009790
            field_type: selection
            options: [Gold, Silver]
      order:
        table_id: 2
        fields:
          order_no: { field_id: 1009800, field_type: text }
          customer_id:
            field_id: 1009801
            field_type: selection
            source_table: customer
          quantity: { field_id: 1009802, field_type: number }
        sub_tables: [line]
      line:
        table_id: 4
        fields:
          item: { field_id: 1009900, field_type: text }
          amount: { field_id: 1009901, field_type: number }
"#;

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(future)
    }

    fn facade() -> AccessFacade<Arc<MemoryTransport>> {
        AccessFacade::new(
            load_structure(STRUCTURE).unwrap(),
            Arc::new(MemoryTransport::new()),
        )
    }

    fn record(value: Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_create_translates_and_coerces() {
        block_on(async {
            let facade = facade();
            let row = facade
                .create("Sales", "order", record(json!({"order_no": "A-1", "quantity": "3"})))
                .await
                .unwrap();
            assert_eq!(row.values["quantity"], json!(3));

            let stored = facade.transport().rows(&TableLocator::new("sales", "2"));
            assert_eq!(stored[0].values[&FieldId(1009802)], json!(3));
            assert_eq!(stored[0].values[&FieldId(1009800)], json!("A-1"));
        });
    }

    #[test]
    fn test_list_translates_conditions() {
        block_on(async {
            let facade = facade();
            for qty in [1, 5, 9] {
                facade
                    .create("Sales", "order", record(json!({"order_no": format!("A-{qty}"), "quantity": qty})))
                    .await
                    .unwrap();
            }
            let query = ListQuery::new()
                .filter("quantity", Operator::Gte, "5")
                .order_by("quantity", Direction::Desc);
            let rows = facade.list("Sales", "order", &query).await.unwrap();
            let numbers: Vec<_> = rows.iter().map(|r| r.values["order_no"].clone()).collect();
            assert_eq!(numbers, vec![json!("A-9"), json!("A-5")]);

            let unknown = ListQuery::new().filter("qty", Operator::Eq, "1");
            assert!(matches!(
                facade.list("Sales", "order", &unknown).await,
                Err(StructureError::UnknownField { .. })
            ));
        });
    }

    #[test]
    fn test_lookup_reference_uses_join_field() {
        block_on(async {
            let facade = facade();
            facade
                .create("Sales", "customer", record(json!({"customer_id": "C-1", "name": "Ana"})))
                .await
                .unwrap();
            facade
                .create("Sales", "customer", record(json!({"customer_id": "C-2", "name": "Bo"})))
                .await
                .unwrap();

            let rows = facade
                .lookup_reference("Sales", "order", "customer_id", "C-2")
                .await
                .unwrap();
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].values["name"], json!("Bo"));

            assert!(matches!(
                facade.lookup_reference("Sales", "order", "quantity", "1").await,
                Err(StructureError::TypeMismatch { .. })
            ));
        });
    }

    #[test]
    fn test_unknown_table_and_rejected_option() {
        block_on(async {
            let facade = facade();
            assert!(matches!(
                facade.read("Sales", "invoice", RecordId(1)).await,
                Err(StructureError::UnknownTable(_))
            ));
            assert!(matches!(
                facade
                    .create("Sales", "customer", record(json!({"tier": "Bronze"})))
                    .await,
                Err(StructureError::TypeMismatch { .. })
            ));
            assert!(facade.transport().rows(&TableLocator::new("sales", "1")).is_empty());
        });
    }

    #[test]
    fn test_sub_table_rows_are_translated() {
        block_on(async {
            let facade = facade();
            let order = facade
                .create("Sales", "order", record(json!({"order_no": "A-1"})))
                .await
                .unwrap();
            let id = order.record_id.unwrap();
            let locator = TableLocator::new("sales", "2");
            facade
                .transport()
                .seed_sub_rows(
                    &locator,
                    id,
                    "4",
                    vec![IdRecord::from([
                        (FieldId(1009900), json!("bolt")),
                        (FieldId(1009901), json!("12")),
                    ])],
                )
                .unwrap();

            let plain = facade.list("Sales", "order", &ListQuery::new()).await.unwrap();
            assert!(plain[0].sub_rows.is_empty());

            let query = ListQuery::new().with_subtables(true);
            let rows = facade.list("Sales", "order", &query).await.unwrap();
            let lines = &rows[0].sub_rows["line"];
            assert_eq!(lines.len(), 1);
            assert_eq!(lines[0].values["item"], json!("bolt"));
            assert_eq!(lines[0].values["amount"], json!(12));

            facade
                .transport()
                .seed_sub_rows(&locator, id, "99", Vec::new())
                .unwrap();
            assert!(matches!(
                facade.list("Sales", "order", &query).await,
                Err(StructureError::UnknownTable(_))
            ));
        });
    }
}
