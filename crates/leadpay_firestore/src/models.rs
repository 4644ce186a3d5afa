//! Firestore REST document model.
//!
//! Firestore's JSON API wraps every value in an object naming its type, for
//! example `{"stringValue": "abc"}` or `{"integerValue": "2500"}`. Integers
//! travel as strings so 64-bit values survive JSON number parsing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field map of a document, ordered so request bodies are stable.
pub type Fields = BTreeMap<String, FieldValue>;

/// A single typed Firestore value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    #[serde(rename = "nullValue")]
    Null(()),
    #[serde(rename = "booleanValue")]
    Boolean(bool),
    #[serde(rename = "integerValue")]
    Integer(String),
    #[serde(rename = "doubleValue")]
    Double(f64),
    /// RFC 3339 timestamp.
    #[serde(rename = "timestampValue")]
    Timestamp(String),
    #[serde(rename = "stringValue")]
    String(String),
    #[serde(rename = "bytesValue")]
    Bytes(String),
    #[serde(rename = "referenceValue")]
    Reference(String),
    #[serde(rename = "geoPointValue")]
    GeoPoint(serde_json::Value),
    #[serde(rename = "arrayValue")]
    Array(ArrayValue),
    #[serde(rename = "mapValue")]
    Map(MapValue),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<FieldValue>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: Fields,
}

impl FieldValue {
    pub fn string(value: impl Into<String>) -> Self {
        FieldValue::String(value.into())
    }

    pub fn integer(value: i64) -> Self {
        FieldValue::Integer(value.to_string())
    }

    pub fn timestamp(value: impl Into<String>) -> Self {
        FieldValue::Timestamp(value.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// A Firestore document as returned by `GET` and sent in commit writes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name, `projects/{p}/databases/{d}/documents/{collection}/{id}`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub fields: Fields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl Document {
    /// Last path segment of the resource name.
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or_default()
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(FieldValue::as_str)
    }

    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.fields.get(field).and_then(FieldValue::as_i64)
    }
}

// --- Commit request (documents:commit) ---

#[derive(Debug, Serialize)]
pub(crate) struct CommitRequest {
    pub writes: Vec<Write>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Write {
    pub update: Document,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub update_transforms: Vec<FieldTransform>,
    pub current_document: Precondition,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FieldTransform {
    pub field_path: String,
    pub set_to_server_value: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct Precondition {
    pub exists: bool,
}
