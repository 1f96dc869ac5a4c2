//! Conversions between JSON values and store documents.
//!
//! JSON input is read as relaxed or canonical Extended JSON, so `{"$oid": ".."}`
//! and `{"$date": ".."}` map to their native document types. Output is rendered
//! as relaxed Extended JSON.

use mongodb::bson::{self, Bson, Document};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("json parse error :: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a JSON object, found `{0}`")]
    NotAnObject(String),
    #[error("extended json error :: {0}")]
    ExtendedJson(#[from] bson::extjson::de::Error),
}

pub fn document_from_json(value: serde_json::Value) -> Result<Document, Error> {
    match value {
        serde_json::Value::Object(map) => Ok(Document::try_from(map)?),
        other => Err(Error::NotAnObject(other.to_string())),
    }
}

pub fn document_from_json_str(s: &str) -> Result<Document, Error> {
    document_from_json(serde_json::from_str(s)?)
}

/// Parses either a single JSON object or an array of objects.
pub fn documents_from_json_str(s: &str) -> Result<Vec<Document>, Error> {
    match serde_json::from_str(s)? {
        serde_json::Value::Array(items) => items.into_iter().map(document_from_json).collect(),
        other => Ok(vec![document_from_json(other)?]),
    }
}

pub fn document_to_json(doc: Document) -> serde_json::Value {
    Bson::Document(doc).into_relaxed_extjson()
}
