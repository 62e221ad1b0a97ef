//! Per-type value rules
//!
//! Outgoing values are checked and normalized against the declared field type
//! before they are translated to ids. Incoming values are decoded the other
//! way so that callers see numbers for `number` fields.

use crate::error::{Result, StructureError};
use crate::model::FieldDescriptor;
use crate::models::FieldType;
use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};
use tracing::debug;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9()\-.\s]{3,32}$").unwrap());

const DATE_FORMATS: [&str; 2] = ["%Y/%m/%d", "%Y-%m-%d"];
const DATE_TIME_FORMATS: [&str; 2] = ["%Y/%m/%d %H:%M:%S", "%Y-%m-%d %H:%M:%S"];

impl FieldType {
    /// Check `value` against this type and return the form sent to the service.
    ///
    /// `null` always passes and clears the field.
    pub fn coerce(self, field: &FieldDescriptor, value: &Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match self {
            FieldType::Text | FieldType::RichText => scalar_text(field, value).map(Value::String),
            FieldType::Date => {
                let text = scalar_text(field, value)?;
                normalize_date(&text)
                    .map(Value::String)
                    .ok_or_else(|| mismatch(field, format!("'{}' is not a date", text)))
            }
            FieldType::Email => matching(field, value, &EMAIL_PATTERN, "an e-mail address"),
            FieldType::Phone => matching(field, value, &PHONE_PATTERN, "a phone number"),
            FieldType::Number => coerce_number(field, value),
            FieldType::Selection => {
                let choice = scalar_text(field, value)?;
                check_option(field, &choice)?;
                Ok(Value::String(choice))
            }
            FieldType::MultipleSelect => {
                let choices = match value {
                    Value::Array(items) => items
                        .iter()
                        .map(|item| scalar_text(field, item))
                        .collect::<Result<Vec<_>>>()?,
                    other => vec![scalar_text(field, other)?],
                };
                for choice in &choices {
                    check_option(field, choice)?;
                }
                Ok(Value::Array(choices.into_iter().map(Value::String).collect()))
            }
        }
    }

    /// Decode a value received from the service.
    pub fn decode(self, value: Value) -> Value {
        match (self, value) {
            (FieldType::Number, Value::String(text)) => {
                if text.trim().is_empty() {
                    Value::Null
                } else {
                    parse_number(&text).map(Value::Number).unwrap_or(Value::String(text))
                }
            }
            (_, value) => value,
        }
    }
}

impl FieldDescriptor {
    /// [`FieldType::coerce`] for this field.
    pub fn coerce(&self, value: &Value) -> Result<Value> {
        self.field_type.coerce(self, value)
    }

    /// [`FieldType::decode`] for this field.
    pub fn decode(&self, value: Value) -> Value {
        self.field_type.decode(value)
    }
}

fn mismatch(field: &FieldDescriptor, reason: impl Into<String>) -> StructureError {
    StructureError::mismatch(&field.name, field.field_type, reason)
}

fn scalar_text(field: &FieldDescriptor, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        Value::Array(_) => Err(mismatch(field, "expected a single value, got a list")),
        Value::Object(_) => Err(mismatch(field, "expected a single value, got an object")),
    }
}

fn matching(field: &FieldDescriptor, value: &Value, pattern: &Regex, what: &str) -> Result<Value> {
    let text = scalar_text(field, value)?;
    let trimmed = text.trim();
    if trimmed.is_empty() || pattern.is_match(trimmed) {
        Ok(Value::String(trimmed.to_string()))
    } else {
        Err(mismatch(field, format!("'{}' is not {}", text, what)))
    }
}

/// Dates are sent as `yyyy/MM/dd`, date-times as `yyyy/MM/dd HH:mm:ss`.
fn normalize_date(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return Some(String::new());
    }
    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
    {
        return Some(date.format("%Y/%m/%d").to_string());
    }
    DATE_TIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
        .map(|dt| dt.format("%Y/%m/%d %H:%M:%S").to_string())
}

fn parse_number(text: &str) -> Option<Number> {
    let text = text.trim();
    if let Ok(n) = text.parse::<i64>() {
        return Some(Number::from(n));
    }
    text.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(Number::from_f64)
}

fn coerce_number(field: &FieldDescriptor, value: &Value) -> Result<Value> {
    match value {
        Value::Number(_) => Ok(value.clone()),
        Value::String(text) if text.trim().is_empty() => Ok(Value::Null),
        Value::String(text) => parse_number(text)
            .map(Value::Number)
            .ok_or_else(|| mismatch(field, format!("'{}' is not a number", text))),
        Value::Bool(_) => Err(mismatch(field, "expected a number, got a boolean")),
        Value::Array(_) | Value::Object(_) => Err(mismatch(field, "expected a number")),
        Value::Null => Ok(Value::Null),
    }
}

fn check_option(field: &FieldDescriptor, choice: &str) -> Result<()> {
    // Relation fields draw their options from the target table.
    if choice.is_empty()
        || field.options.is_empty()
        || field.is_relation()
        || field.options.iter().any(|o| o == choice)
    {
        return Ok(());
    }
    if field.allow_new_options {
        debug!("Adding option '{}' to field '{}'", choice, field.name);
        return Ok(());
    }
    Err(mismatch(
        field,
        format!(
            "'{}' is not one of [{}] and new options are not allowed",
            choice,
            field.options.join(", ")
        ),
    ))
}
