//! Field model for the SDK

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric identifier the remote service uses for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(pub u64);

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FieldId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(FieldId)
    }
}

/// Identifier of a single row in a remote table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed set of field types a structure definition may declare.
///
/// The type name as written in the definition (e.g. `text:date`) is the
/// canonical spelling; see [`FieldType::as_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "text:date")]
    Date,
    #[serde(rename = "text:email")]
    Email,
    #[serde(rename = "text:phone")]
    Phone,
    #[serde(rename = "rich_text")]
    RichText,
    #[serde(rename = "number")]
    Number,
    #[serde(rename = "selection")]
    Selection,
    #[serde(rename = "multiple_select")]
    MultipleSelect,
}

impl FieldType {
    pub const ALL: [FieldType; 8] = [
        FieldType::Text,
        FieldType::Date,
        FieldType::Email,
        FieldType::Phone,
        FieldType::RichText,
        FieldType::Number,
        FieldType::Selection,
        FieldType::MultipleSelect,
    ];

    /// Parse a type name as written in a structure definition.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Date => "text:date",
            FieldType::Email => "text:email",
            FieldType::Phone => "text:phone",
            FieldType::RichText => "rich_text",
            FieldType::Number => "number",
            FieldType::Selection => "selection",
            FieldType::MultipleSelect => "multiple_select",
        }
    }

    /// Whether the type carries a set of options.
    pub fn is_choice(&self) -> bool {
        matches!(self, FieldType::Selection | FieldType::MultipleSelect)
    }

    /// Whether a field of this type may carry a `source_table` reference.
    pub fn accepts_source_table(&self) -> bool {
        matches!(self, FieldType::Selection | FieldType::Text)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field as declared in a structure definition
///
/// The type is kept as written so that an unrecognised type name survives
/// parsing and can be reported by the validator together with every other
/// problem in the file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Field {
    pub name: String,
    pub id: FieldId,
    pub field_type: String,
    /// `None` when the key is absent; the effective default is `false`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_user_add_new_options: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_table: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, id: u64, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            id: FieldId(id),
            field_type: field_type.as_str().to_string(),
            allow_user_add_new_options: None,
            source_table: None,
            options: Vec::new(),
        }
    }

    pub fn with_source_table(mut self, table: impl Into<String>) -> Self {
        self.source_table = Some(table.into());
        self
    }

    pub fn with_options<I, S>(mut self, options: I, allow_new: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self.allow_user_add_new_options = Some(allow_new);
        self
    }

    /// The declared type, if it is one of the known types.
    pub fn kind(&self) -> Option<FieldType> {
        FieldType::parse(&self.field_type)
    }

    pub fn allows_new_options(&self) -> bool {
        self.allow_user_add_new_options.unwrap_or(false)
    }
}
