//! HTTP transport for the Ragic API
//!
//! Requests are addressed as `{base}/{namespace}/{tab_id}/{table_id}[/{record}]`
//! and keyed by field id (`naming=EID`).
//!
//! ## Security
//!
//! Path segments are validated before they are placed in a URL. Only
//! alphanumeric characters, hyphens and underscores are allowed. The API key
//! is never logged.

use super::{FetchQuery, TableLocator, Transport, TransportError};
use crate::config::ClientConfig;
use crate::models::{FieldId, IdRecord, IdRow, RecordId};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, info};

/// Maximum allowed length for a path segment
const MAX_SEGMENT_LENGTH: usize = 100;

/// System keys kept as row metadata. Other `_` keys are dropped, except
/// sub-table rows.
const META_KEYS: [&str; 2] = ["_create_date", "_update_date"];

const RECORD_ID_KEY: &str = "_ragicId";

/// Prefix of the keys holding sub-table rows, followed by the sub-table id.
const SUB_TABLE_PREFIX: &str = "_subtable_";

/// Validate a namespace, tab id or table id for use as a URL path segment.
fn validate_segment(kind: &str, segment: &str) -> Result<(), TransportError> {
    if segment.is_empty() {
        return Err(TransportError::InvalidRequest(format!("{} cannot be empty", kind)));
    }

    if segment.len() > MAX_SEGMENT_LENGTH {
        return Err(TransportError::InvalidRequest(format!(
            "{} too long (max {} characters)",
            kind, MAX_SEGMENT_LENGTH
        )));
    }

    if !segment
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(TransportError::InvalidRequest(format!(
            "{} '{}' contains invalid characters",
            kind, segment
        )));
    }

    Ok(())
}

/// Transport speaking the service's HTTP API
pub struct RagicTransport {
    config: ClientConfig,
    client: reqwest::Client,
}

impl RagicTransport {
    /// Create a transport; the configuration is validated first.
    pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Use a preconfigured client, e.g. one with timeouts or a proxy.
    pub fn with_client(config: ClientConfig, client: reqwest::Client) -> Result<Self, TransportError> {
        config
            .validate()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        validate_segment("Namespace", &config.namespace)?;
        Ok(Self { config, client })
    }

    /// Read the configuration from `RAGIC_URL`, `RAGIC_NAMESPACE` and
    /// `RAGIC_API_KEY`.
    pub fn from_env() -> Result<Self, TransportError> {
        let config =
            ClientConfig::from_env().map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        Self::new(config)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Path of a table or record, relative to the base URL.
    fn resource_path(
        &self,
        table: &TableLocator,
        record: Option<RecordId>,
    ) -> Result<String, TransportError> {
        validate_segment("Tab id", &table.tab_id)?;
        validate_segment("Table id", &table.table_id)?;
        let mut path = format!(
            "/{}/{}/{}",
            urlencoding::encode(&self.config.namespace),
            urlencoding::encode(&table.tab_id),
            urlencoding::encode(&table.table_id)
        );
        if let Some(record) = record {
            path.push_str(&format!("/{}", record));
        }
        Ok(path)
    }

    fn resource_url(
        &self,
        table: &TableLocator,
        record: Option<RecordId>,
        query: &[(String, String)],
    ) -> Result<String, TransportError> {
        let mut url = format!(
            "{}{}?v={}&api&naming=EID",
            self.config.base_url.trim_end_matches('/'),
            self.resource_path(table, record)?,
            self.config.version
        );
        for (key, value) in query {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        Ok(url)
    }

    /// Build a request with authentication headers
    fn build_request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Authorization", format!("Basic {}", self.config.api_key))
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        description: &str,
    ) -> Result<Value, TransportError> {
        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Network(format!("{} failed: {}", description, e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| TransportError::Decode(format!("{}: {}", description, e)))
    }
}

/// Query parameters for a list request.
fn query_pairs(query: &FetchQuery) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = query
        .conditions
        .iter()
        .map(|c| {
            (
                "where".to_string(),
                format!("{},{},{}", c.field, c.operator.as_str(), c.value),
            )
        })
        .collect();
    pairs.push(("limit".to_string(), query.limit.to_string()));
    pairs.push(("offset".to_string(), query.offset.to_string()));
    if let Some((field, direction)) = query.ordering {
        pairs.push(("order".to_string(), format!("{},{}", field, direction.as_str())));
    }
    pairs.push((
        "subtables".to_string(),
        if query.subtables { "1" } else { "0" }.to_string(),
    ));
    pairs
}

/// Split one response object into id-keyed values, metadata and sub-table rows.
fn parse_row(key: Option<&str>, object: &Map<String, Value>) -> Result<IdRow, TransportError> {
    let record_id = object
        .get(RECORD_ID_KEY)
        .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
        .or_else(|| key.and_then(|k| k.parse().ok()))
        .map(RecordId);

    let mut row = IdRow {
        record_id,
        ..IdRow::default()
    };
    for (name, value) in object {
        if META_KEYS.contains(&name.as_str()) {
            row.meta.insert(name.clone(), value.clone());
        } else if let Some(sub_table) = name.strip_prefix(SUB_TABLE_PREFIX) {
            row.sub_rows.insert(sub_table.to_string(), parse_rows(value)?);
        } else if let Ok(id) = name.parse::<FieldId>() {
            row.values.insert(id, value.clone());
        }
    }
    Ok(row)
}

/// Listing responses map record ids to row objects.
fn parse_rows(body: &Value) -> Result<Vec<IdRow>, TransportError> {
    let listing = body
        .as_object()
        .ok_or_else(|| TransportError::Decode("expected an object of rows".to_string()))?;
    listing
        .iter()
        .map(|(key, row)| {
            row.as_object()
                .ok_or_else(|| TransportError::Decode(format!("row '{}' is not an object", key)))
                .and_then(|object| parse_row(Some(key), object))
        })
        .collect()
}

/// Write responses carry `status`, `ragicId` and the stored `data`.
fn parse_write(body: &Value, record: Option<RecordId>) -> Result<IdRow, TransportError> {
    check_status(body)?;
    let record = body
        .get("ragicId")
        .and_then(Value::as_u64)
        .map(RecordId)
        .or(record);
    let mut row = match body.get("data").and_then(Value::as_object) {
        Some(data) => parse_row(None, data)?,
        None => IdRow::default(),
    };
    row.record_id = row.record_id.or(record);
    Ok(row)
}

fn check_status(body: &Value) -> Result<(), TransportError> {
    match body.get("status").and_then(Value::as_str) {
        Some("ERROR") => Err(TransportError::Rejected(
            body.get("msg")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        )),
        _ => Ok(()),
    }
}

#[async_trait]
impl Transport for RagicTransport {
    async fn fetch(
        &self,
        table: &TableLocator,
        record: Option<RecordId>,
        query: &FetchQuery,
    ) -> Result<Vec<IdRow>, TransportError> {
        let pairs = match record {
            Some(_) => vec![(
                "subtables".to_string(),
                if query.subtables { "1" } else { "0" }.to_string(),
            )],
            None => query_pairs(query),
        };
        let url = self.resource_url(table, record, &pairs)?;
        debug!("GET {}", self.resource_path(table, record)?);
        let body = self
            .send(self.build_request(reqwest::Method::GET, &url), "Fetch")
            .await?;
        check_status(&body)?;
        parse_rows(&body)
    }

    async fn write(
        &self,
        table: &TableLocator,
        record: Option<RecordId>,
        values: &IdRecord,
    ) -> Result<IdRow, TransportError> {
        let url = self.resource_url(table, record, &[])?;
        let payload: Map<String, Value> = values
            .iter()
            .map(|(id, value)| (id.to_string(), value.clone()))
            .collect();
        info!("POST {}", self.resource_path(table, record)?);
        let body = self
            .send(
                self.build_request(reqwest::Method::POST, &url).json(&payload),
                "Write",
            )
            .await?;
        parse_write(&body, record)
    }

    async fn delete(&self, table: &TableLocator, record: RecordId) -> Result<(), TransportError> {
        let url = self.resource_url(table, Some(record), &[])?;
        info!("DELETE {}", self.resource_path(table, Some(record))?);
        let body = self
            .send(self.build_request(reqwest::Method::DELETE, &url), "Delete")
            .await?;
        check_status(&body)
    }
}
