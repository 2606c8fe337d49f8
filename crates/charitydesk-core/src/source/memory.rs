//! In-process document source.
//!
//! Mirrors the database's merge semantics so services can be exercised
//! without a network: `update` merges top-level fields (a `null` field is
//! deleted) and creates the document if it is missing.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{documents_from_value, Document, DocumentSource, SourceError};

type Tree = BTreeMap<String, BTreeMap<String, Value>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Update,
    Remove,
}

#[derive(Default)]
pub struct MemorySource {
    tree: Mutex<Tree>,
    failures: Mutex<Vec<(Operation, SourceError)>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a path from a JSON object (or `null` to clear it)
    pub fn with_collection(self, path: &str, value: Value) -> Result<Self, SourceError> {
        self.replace_collection(path, value)?;
        Ok(self)
    }

    pub fn replace_collection(&self, path: &str, value: Value) -> Result<(), SourceError> {
        let docs = documents_from_value(value)?;
        let children = docs.into_iter().map(|d| (d.key, d.value)).collect();
        self.tree().insert(path.to_string(), children);
        Ok(())
    }

    pub fn insert(&self, path: &str, key: &str, value: Value) {
        self.tree()
            .entry(path.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    /// Make the next `op` fail with `error`. Failures queue up in order.
    pub fn fail_next(&self, op: Operation, error: SourceError) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((op, error));
    }

    /// Number of `read`/`read_one` calls served so far
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `update`/`remove` calls served so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn get(&self, path: &str, key: &str) -> Option<Value> {
        self.tree().get(path).and_then(|c| c.get(key)).cloned()
    }

    fn tree(&self) -> MutexGuard<'_, Tree> {
        self.tree.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn take_failure(&self, op: Operation) -> Result<(), SourceError> {
        let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        match failures.iter().position(|(o, _)| *o == op) {
            Some(index) => Err(failures.remove(index).1),
            None => Ok(()),
        }
    }
}

fn merge(target: &mut Value, partial: &Map<String, Value>) {
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(fields) = target {
        for (name, value) in partial {
            if value.is_null() {
                fields.remove(name);
            } else {
                fields.insert(name.clone(), value.clone());
            }
        }
    }
}

#[async_trait]
impl DocumentSource for MemorySource {
    async fn read(&self, path: &str) -> Result<Vec<Document>, SourceError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.take_failure(Operation::Read)?;
        Ok(self
            .tree()
            .get(path)
            .map(|children| {
                children
                    .iter()
                    .map(|(key, value)| Document {
                        key: key.clone(),
                        value: value.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn read_one(&self, path: &str, key: &str) -> Result<Option<Value>, SourceError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.take_failure(Operation::Read)?;
        Ok(self.get(path, key))
    }

    async fn update(&self, path: &str, key: &str, partial: &Value) -> Result<(), SourceError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.take_failure(Operation::Update)?;
        let fields = partial.as_object().ok_or_else(|| {
            SourceError::InvalidRequest("partial update must be a JSON object".to_string())
        })?;

        let mut tree = self.tree();
        let children = tree.entry(path.to_string()).or_default();
        let record = children.entry(key.to_string()).or_insert(Value::Null);
        merge(record, fields);
        if record.as_object().is_some_and(|m| m.is_empty()) {
            children.remove(key);
        }
        Ok(())
    }

    async fn remove(&self, path: &str, key: &str) -> Result<(), SourceError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.take_failure(Operation::Remove)?;
        if let Some(children) = self.tree().get_mut(path) {
            children.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_update_merges_fields() {
        let source = MemorySource::new();
        source.insert("inventory", "-Nx", json!({"name": "Rice", "quantity": 4, "unit": "kg"}));

        source
            .update("inventory", "-Nx", &json!({"quantity": 9, "unit": null}))
            .await
            .unwrap();

        assert_eq!(
            source.get("inventory", "-Nx"),
            Some(json!({"name": "Rice", "quantity": 9}))
        );
    }

    #[tokio::test]
    async fn test_update_creates_missing_document() {
        let source = MemorySource::new();
        source
            .update("finances", "-Nt", &json!({"amount": 10}))
            .await
            .unwrap();
        assert_eq!(source.get("finances", "-Nt"), Some(json!({"amount": 10})));
    }

    #[tokio::test]
    async fn test_remove_and_read() {
        let source = MemorySource::new()
            .with_collection("donors", json!({"-Na": {"name": "Abe"}, "-Nb": {"name": "Bea"}}))
            .unwrap();

        source.remove("donors", "-Na").await.unwrap();
        let docs = source.read("donors").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].key, "-Nb");
        assert_eq!(source.read_count(), 1);
        assert_eq!(source.write_count(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure_applies_once() {
        let source = MemorySource::new();
        source.fail_next(Operation::Read, SourceError::Network("reset".to_string()));

        assert!(source.read("donors").await.is_err());
        assert!(source.read("donors").await.is_ok());
        // Failure for a different operation is not consumed by reads
        source.fail_next(Operation::Remove, SourceError::Unauthorized);
        assert!(source.read("donors").await.is_ok());
        assert_eq!(source.remove("donors", "-Na").await, Err(SourceError::Unauthorized));
    }

    #[tokio::test]
    async fn test_missing_path_reads_empty() {
        let source = MemorySource::new();
        assert!(source.read("inventory").await.unwrap().is_empty());
        assert_eq!(source.read_one("inventory", "-Nx").await.unwrap(), None);
    }
}
