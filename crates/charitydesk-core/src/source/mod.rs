//! Access to the remote document database.
//!
//! The database is a tree of key-addressed JSON documents. Collections used
//! by the dashboard live at `donors`, `finances` and `inventory`.
//!
//! - `RealtimeDbClient` talks to the hosted database over its REST API
//! - `MemorySource` keeps everything in process, for tests and offline runs

pub mod error;
pub mod firebase;
pub mod memory;

use async_trait::async_trait;
use serde_json::Value;

pub use error::SourceError;
pub use firebase::RealtimeDbClient;
pub use memory::MemorySource;

pub const DONORS_PATH: &str = "donors";
pub const FINANCES_PATH: &str = "finances";
pub const INVENTORY_PATH: &str = "inventory";

/// One child of a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub key: String,
    pub value: Value,
}

#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// All children of `path`, ordered by key. A missing path is empty.
    async fn read(&self, path: &str) -> Result<Vec<Document>, SourceError>;

    /// The child `key` of `path`, or `None` if absent.
    async fn read_one(&self, path: &str, key: &str) -> Result<Option<Value>, SourceError>;

    /// Merge the fields of `partial` into `path/key`. Fields not named in
    /// `partial` are left as they are.
    async fn update(&self, path: &str, key: &str, partial: &Value) -> Result<(), SourceError>;

    /// Delete `path/key`.
    async fn remove(&self, path: &str, key: &str) -> Result<(), SourceError>;
}

/// Turn a collection's JSON into ordered documents.
///
/// The database answers `null` for an empty path and may answer an array
/// (with `null` holes) when every key is a small integer.
pub fn documents_from_value(value: Value) -> Result<Vec<Document>, SourceError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => {
            let mut docs: Vec<Document> = map
                .into_iter()
                .filter(|(_, value)| !value.is_null())
                .map(|(key, value)| Document { key, value })
                .collect();
            docs.sort_by(|a, b| a.key.cmp(&b.key));
            Ok(docs)
        }
        Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .filter(|(_, value)| !value.is_null())
            .map(|(index, value)| Document {
                key: index.to_string(),
                value,
            })
            .collect()),
        other => Err(SourceError::InvalidResponse(format!(
            "expected a collection, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_is_empty_collection() {
        assert!(documents_from_value(Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_object_children_sorted_by_key() {
        let docs = documents_from_value(json!({
            "-Nb2": {"name": "Second"},
            "-Na1": {"name": "First"},
            "-Nc3": null
        }))
        .unwrap();
        let keys: Vec<&str> = docs.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, vec!["-Na1", "-Nb2"]);
    }

    #[test]
    fn test_array_collection_uses_indices() {
        let docs = documents_from_value(json!([null, {"name": "One"}, {"name": "Two"}])).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].key, "1");
        assert_eq!(docs[1].key, "2");
    }

    #[test]
    fn test_scalar_is_invalid() {
        let err = documents_from_value(json!(42)).unwrap_err();
        assert!(matches!(err, SourceError::InvalidResponse(msg) if msg.contains("a number")));
    }
}
