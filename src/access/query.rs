//! List queries
//!
//! Name-keyed filters, ordering and paging for `list`. The access layer
//! translates them to a [`FetchQuery`](crate::transport::FetchQuery).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison applied by a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Eq,
    Gte,
    Lte,
    Gt,
    Lt,
    /// Substring match
    Like,
}

impl Operator {
    /// Spelling used by the service's `where` parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Gte => "gte",
            Operator::Lte => "lte",
            Operator::Gt => "gt",
            Operator::Lt => "lt",
            Operator::Like => "like",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// Filter on one field, by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ordering {
    pub field: String,
    #[serde(default)]
    pub direction: Direction,
}

/// Name-keyed list request
///
/// Unset `limit` and `subtables` fall back to the
/// [`AccessConfig`](crate::config::AccessConfig) of the access layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub offset: usize,
    pub limit: Option<usize>,
    pub ordering: Option<Ordering>,
    pub subtables: Option<bool>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        self.conditions.push(Condition {
            field: field.into(),
            operator,
            value: value.into(),
        });
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.ordering = Some(Ordering {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn with_subtables(mut self, subtables: bool) -> Self {
        self.subtables = Some(subtables);
        self
    }
}
