//! Access façade tests against the in-memory transport

use ragic_structure::{
    AccessConfig, AccessFacade, Direction, FieldId, ListQuery, MemoryTransport, Operator, Record,
    RecordId, StructureError, TableLocator, Transport, TransportError, load_structure,
};
use async_trait::async_trait;
use ragic_structure::{FetchQuery, IdRecord, IdRow};
use serde_json::{Value, json};
use std::sync::Arc;

const SALES: &str = include_str!("fixtures/sales_structure.yaml");

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

fn facade() -> AccessFacade<Arc<MemoryTransport>> {
    AccessFacade::new(load_structure(SALES).unwrap(), Arc::new(MemoryTransport::new()))
}

fn record(value: Value) -> Record {
    serde_json::from_value(value).unwrap()
}

fn sales_table() -> TableLocator {
    TableLocator::new("sales-management", "3")
}

mod crud_tests {
    use super::*;

    #[test]
    fn test_create_read_update_delete() {
        block_on(async {
            let facade = facade();
            let created = facade
                .create(
                    "Sales",
                    "sales",
                    record(json!({
                        "order_no": "A-1",
                        "order_date": "2024-03-01",
                        "quantity": "2",
                        "channels": "Online"
                    })),
                )
                .await
                .unwrap();
            let id = created.record_id.unwrap();
            assert_eq!(created.values["order_date"], json!("2024/03/01"));
            assert_eq!(created.values["channels"], json!(["Online"]));

            let stored = facade.transport().rows(&sales_table());
            assert_eq!(stored[0].values[&FieldId(1009802)], json!(2));

            let updated = facade
                .update("Sales", "sales", id, record(json!({"quantity": 5})))
                .await
                .unwrap();
            assert_eq!(updated.values["quantity"], json!(5));
            assert_eq!(updated.values["order_no"], json!("A-1"));

            let read = facade.read("Sales", "sales", id).await.unwrap().unwrap();
            assert_eq!(read, updated);

            facade.delete("Sales", "sales", id).await.unwrap();
            assert!(facade.read("Sales", "sales", id).await.unwrap().is_none());
        });
    }

    #[test]
    fn test_missing_record_is_transport_failure() {
        block_on(async {
            let facade = facade();
            assert!(matches!(
                facade.delete("Sales", "sales", RecordId(404)).await,
                Err(StructureError::TransportFailure(TransportError::NotFound(_)))
            ));
        });
    }

    #[test]
    fn test_unknown_names() {
        block_on(async {
            let facade = facade();
            assert!(matches!(
                facade.create("Sales", "invoice", Record::new()).await,
                Err(StructureError::UnknownTable(_))
            ));
            assert!(matches!(
                facade
                    .create("Sales", "sales", record(json!({"discount": 1})))
                    .await,
                Err(StructureError::UnknownField { .. })
            ));
        });
    }
}

mod coercion_tests {
    use super::*;

    #[test]
    fn test_number_field_rejects_text() {
        block_on(async {
            let facade = facade();
            let result = facade
                .create("Sales", "sales", record(json!({"quantity": "a dozen"})))
                .await;
            assert!(matches!(result, Err(StructureError::TypeMismatch { .. })));
            assert!(facade.transport().rows(&sales_table()).is_empty());
        });
    }

    #[test]
    fn test_selection_with_new_options_allowed() {
        block_on(async {
            let facade = facade();
            let row = facade
                .create("Sales", "customer", record(json!({"segment": "Government"})))
                .await
                .unwrap();
            assert_eq!(row.values["segment"], json!("Government"));
        });
    }

    #[test]
    fn test_selection_without_new_options_rejects() {
        block_on(async {
            let facade = facade();
            match facade
                .create("Sales", "product", record(json!({"category": "Consulting"})))
                .await
            {
                Err(StructureError::TypeMismatch { field, .. }) => assert_eq!(field, "category"),
                other => panic!("expected TypeMismatch, got {:?}", other),
            }
            assert!(
                facade
                    .create("Sales", "product", record(json!({"category": "Service"})))
                    .await
                    .is_ok()
            );
        });
    }

    #[test]
    fn test_email_shape_checked() {
        block_on(async {
            let facade = facade();
            assert!(matches!(
                facade
                    .create("Sales", "customer", record(json!({"email": "not-an-address"})))
                    .await,
                Err(StructureError::TypeMismatch { .. })
            ));
        });
    }

    #[test]
    fn test_empty_number_reads_back_as_null() {
        block_on(async {
            let facade = facade();
            let id = facade.transport().seed(
                &TableLocator::new("sales-management", "2"),
                IdRecord::from([(FieldId(1009795), json!(""))]),
            );
            let row = facade.read("Sales", "product", id).await.unwrap().unwrap();
            assert_eq!(row.values["unit_price"], Value::Null);
        });
    }
}

mod list_tests {
    use super::*;

    async fn seeded() -> AccessFacade<Arc<MemoryTransport>> {
        let facade = facade();
        for (order, qty, customer) in [("A-1", 1, "C-1"), ("A-2", 8, "C-2"), ("A-3", 5, "C-1")] {
            facade
                .create(
                    "Sales",
                    "sales",
                    record(json!({"order_no": order, "quantity": qty, "customer_id": customer})),
                )
                .await
                .unwrap();
        }
        facade
    }

    fn order_numbers(rows: &[ragic_structure::Row]) -> Vec<Value> {
        rows.iter().map(|r| r.values["order_no"].clone()).collect()
    }

    #[test]
    fn test_filter_and_order() {
        block_on(async {
            let facade = seeded().await;
            let query = ListQuery::new()
                .filter("customer_id", Operator::Eq, "C-1")
                .order_by("quantity", Direction::Desc);
            let rows = facade.list("Sales", "sales", &query).await.unwrap();
            assert_eq!(order_numbers(&rows), vec![json!("A-3"), json!("A-1")]);
        });
    }

    #[test]
    fn test_paging_uses_config_default() {
        block_on(async {
            let schema = load_structure(SALES).unwrap();
            let transport = Arc::new(MemoryTransport::new());
            let config = AccessConfig {
                default_limit: 2,
                include_subtables: false,
            };
            let facade = AccessFacade::with_config(schema, transport, config);
            for n in 0..3 {
                facade
                    .create("Sales", "sales", record(json!({"order_no": format!("A-{n}")})))
                    .await
                    .unwrap();
            }
            let first = facade.list("Sales", "sales", &ListQuery::new()).await.unwrap();
            assert_eq!(first.len(), 2);
            let rest = facade
                .list("Sales", "sales", &ListQuery::new().offset(2))
                .await
                .unwrap();
            assert_eq!(order_numbers(&rest), vec![json!("A-2")]);
        });
    }

    #[test]
    fn test_lookup_reference() {
        block_on(async {
            let facade = seeded().await;
            facade
                .create("Sales", "customer", record(json!({"customer_id": "C-1", "name": "Ana"})))
                .await
                .unwrap();
            let rows = facade
                .lookup_reference("Sales", "sales", "customer_id", "C-1")
                .await
                .unwrap();
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].values["name"], json!("Ana"));
        });
    }
}

mod transport_failure_tests {
    use super::*;

    struct Offline;

    #[async_trait]
    impl Transport for Offline {
        async fn fetch(
            &self,
            _table: &TableLocator,
            _record: Option<RecordId>,
            _query: &FetchQuery,
        ) -> Result<Vec<IdRow>, TransportError> {
            Err(TransportError::Network("connection refused".to_string()))
        }

        async fn write(
            &self,
            _table: &TableLocator,
            _record: Option<RecordId>,
            _values: &IdRecord,
        ) -> Result<IdRow, TransportError> {
            Err(TransportError::Status {
                status: 503,
                message: "unavailable".to_string(),
            })
        }

        async fn delete(&self, _table: &TableLocator, _record: RecordId) -> Result<(), TransportError> {
            Ok(())
        }
    }

    #[test]
    fn test_failures_pass_through_and_schema_survives() {
        block_on(async {
            let schema = load_structure(SALES).unwrap();
            let facade = AccessFacade::new(schema.clone(), Offline);

            let err = facade
                .list("Sales", "sales", &ListQuery::new())
                .await
                .unwrap_err();
            assert!(!err.is_load_error());
            assert!(matches!(
                err,
                StructureError::TransportFailure(TransportError::Network(_))
            ));
            assert!(matches!(
                facade.create("Sales", "sales", Record::new()).await,
                Err(StructureError::TransportFailure(TransportError::Status { status: 503, .. }))
            ));
            assert_eq!(schema.table_count(), 3);
        });
    }
}
