//! Domain types for normalized records.
//!
//! A [`Record`] is the uniform shape every service adapter produces and the
//! record store consumes. Field values are scalars or null; nested upstream
//! containers are flattened to their JSON text on conversion.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Identifier of a record, unique within one service namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Field values
// ---------------------------------------------------------------------------

/// A single scalar attribute of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl FieldValue {
    /// Convert an upstream JSON value. Arrays and objects become their
    /// compact JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Int(i),
                None => n.as_f64().map(FieldValue::Float).unwrap_or(FieldValue::Null),
            },
            Value::String(s) => FieldValue::Str(s.clone()),
            Value::Array(_) | Value::Object(_) => FieldValue::Str(value.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Str(s.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Str(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One normalized upstream item.
///
/// `path` holds the parent identifiers under which the record nests; an empty
/// path places the record at the service root.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: RecordId,
    path: Vec<String>,
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Build a record with no fields. Fails on an empty id.
    pub fn new(id: impl Into<String>, path: Vec<String>) -> Result<Self, CoreError> {
        let id = id.into();
        if id.is_empty() {
            return Err(CoreError::EmptyRecordId);
        }
        Ok(Self {
            id: RecordId(id),
            path,
            fields: BTreeMap::new(),
        })
    }

    /// Builder-style field insertion.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert_field(key, value);
        self
    }

    pub fn insert_field(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
