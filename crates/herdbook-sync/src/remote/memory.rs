//! In-process [`RemoteStore`] with the same merge-set semantics as the real
//! store, plus failure injection for exercising sync error paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::debug;

use super::{FieldFilter, RemoteDocument, RemoteStore, SERVER_UPDATED_AT};
use crate::error::{SyncError, SyncResult};

type Collection = BTreeMap<String, Map<String, Value>>;

#[derive(Default)]
struct State {
    collections: HashMap<String, Collection>,
    /// collection path -> HTTP status returned instead of writing
    failing: HashMap<String, u16>,
    offline: bool,
    push_calls: usize,
}

/// Document map keyed by collection path, then document id.
#[derive(Default)]
pub struct MemoryRemoteStore {
    state: Mutex<State>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // =========================================================================
    // Failure Injection
    // =========================================================================

    /// Every push to `collection_path` fails with `status` until healed.
    pub fn fail_collection(&self, collection_path: impl Into<String>, status: u16) {
        self.lock().failing.insert(collection_path.into(), status);
    }

    /// Every call fails as a connection error until healed.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Clears all injected failures.
    pub fn heal(&self) {
        let mut state = self.lock();
        state.failing.clear();
        state.offline = false;
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn document(&self, collection_path: &str, id: &str) -> Option<RemoteDocument> {
        self.lock()
            .collections
            .get(collection_path)
            .and_then(|docs| docs.get(id))
            .map(|fields| RemoteDocument::new(id, fields.clone()))
    }

    /// All documents of a collection, ordered by id.
    pub fn documents(&self, collection_path: &str) -> Vec<RemoteDocument> {
        self.lock()
            .collections
            .get(collection_path)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| RemoteDocument::new(id, fields.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self, collection_path: &str) -> usize {
        self.lock()
            .collections
            .get(collection_path)
            .map_or(0, BTreeMap::len)
    }

    /// Number of successful `push_batch` calls.
    pub fn push_count(&self) -> usize {
        self.lock().push_calls
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn push_batch(
        &self,
        collection_path: &str,
        documents: &[RemoteDocument],
    ) -> SyncResult<Vec<String>> {
        let mut state = self.lock();

        if state.offline {
            return Err(SyncError::ConnectionFailed("memory store is offline".into()));
        }
        if let Some(status) = state.failing.get(collection_path) {
            return Err(SyncError::from_status(*status, "injected failure"));
        }

        let stamp = Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true));
        let collection = state
            .collections
            .entry(collection_path.to_string())
            .or_default();

        let mut ids = Vec::with_capacity(documents.len());
        for doc in documents {
            let stored = collection.entry(doc.id.clone()).or_default();
            for (field, value) in &doc.fields {
                stored.insert(field.clone(), value.clone());
            }
            stored.insert(SERVER_UPDATED_AT.to_string(), stamp.clone());
            ids.push(doc.id.clone());
        }

        state.push_calls += 1;
        debug!(path = %collection_path, count = ids.len(), "Memory store batch written");
        Ok(ids)
    }

    async fn fetch(
        &self,
        collection_path: &str,
        filters: &[FieldFilter],
    ) -> SyncResult<Vec<RemoteDocument>> {
        if self.lock().offline {
            return Err(SyncError::ConnectionFailed("memory store is offline".into()));
        }

        Ok(self
            .documents(collection_path)
            .into_iter()
            .filter(|doc| filters.iter().all(|f| f.matches(doc)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, fields: Value) -> RemoteDocument {
        match fields {
            Value::Object(map) => RemoteDocument::new(id, map),
            _ => panic!("fields must be an object"),
        }
    }

    #[tokio::test]
    async fn test_merge_keeps_unlisted_fields() {
        let store = MemoryRemoteStore::new();
        let path = "farms/f1/animals";

        store
            .push_batch(path, &[doc("a1", json!({"code": "A1", "breed": "Holstein"}))])
            .await
            .unwrap();
        store
            .push_batch(path, &[doc("a1", json!({"breed": "Jersey"}))])
            .await
            .unwrap();

        let stored = store.document(path, "a1").unwrap();
        assert_eq!(stored.get("code"), Some(&json!("A1")));
        assert_eq!(stored.get("breed"), Some(&json!("Jersey")));
        assert!(stored.get(SERVER_UPDATED_AT).is_some());
        assert_eq!(store.len(path), 1);
        assert_eq!(store.push_count(), 2);
    }

    #[tokio::test]
    async fn test_fetch_applies_all_filters() {
        let store = MemoryRemoteStore::new();
        let path = "farms/f1/treatments";
        store
            .push_batch(
                path,
                &[
                    doc("t1", json!({"animal_id": "a1", "kind": "vaccine"})),
                    doc("t2", json!({"animal_id": "a1", "kind": "deworming"})),
                    doc("t3", json!({"animal_id": "a2", "kind": "vaccine"})),
                ],
            )
            .await
            .unwrap();

        let found = store
            .fetch(
                path,
                &[
                    FieldFilter::equals("animal_id", "a1"),
                    FieldFilter::equals("kind", "vaccine"),
                ],
            )
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "t1");
        assert_eq!(store.fetch(path, &[]).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = MemoryRemoteStore::new();
        store.fail_collection("farms/f1/expenses", 503);

        let err = store
            .push_batch("farms/f1/expenses", &[doc("e1", json!({}))])
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(store.len("farms/f1/expenses"), 0);

        store.set_offline(true);
        assert!(matches!(
            store.fetch("farms/f1/animals", &[]).await,
            Err(SyncError::ConnectionFailed(_))
        ));

        store.heal();
        store
            .push_batch("farms/f1/expenses", &[doc("e1", json!({}))])
            .await
            .unwrap();
        assert_eq!(store.len("farms/f1/expenses"), 1);
    }
}
