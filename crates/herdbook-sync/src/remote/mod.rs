//! # Remote Document Store
//!
//! The seam between the sync manager and whatever holds the farm's
//! documents remotely.
//!
//! ## Write Contract
//! ```text
//! push_batch("farms/finca-1/production", [doc_a, doc_b])
//!
//!   farms/finca-1/production/{doc_a.id}  ◄── merge-set doc_a + server_updated_at
//!   farms/finca-1/production/{doc_b.id}  ◄── merge-set doc_b + server_updated_at
//!
//!   Ok(["{doc_a.id}", "{doc_b.id}"])    all written, or Err and none confirmed
//! ```
//!
//! Merge-set overwrites the listed fields and keeps any other field already
//! on the document, so pushing the same document twice is harmless.
//!
//! ## Implementations
//! - [`FirestoreClient`] - Firestore REST API over `reqwest`
//! - [`MemoryRemoteStore`] - in-process map for tests and offline development

use async_trait::async_trait;
use serde_json::{Map, Value};

use herdbook_core::Record;

use crate::error::{SyncError, SyncResult};

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreClient;
pub use memory::MemoryRemoteStore;

/// Field stamped by the remote store with its own clock on every write.
pub const SERVER_UPDATED_AT: &str = "server_updated_at";

/// Row columns that only mean something on this device.
const LOCAL_ONLY_FIELDS: [&str; 2] = ["synced", "remote_id"];

// =============================================================================
// Documents
// =============================================================================

/// A document addressed by id within a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl RemoteDocument {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        RemoteDocument {
            id: id.into(),
            fields,
        }
    }

    /// Builds the document for a row: its JSON form keyed by the local id,
    /// without the local sync bookkeeping columns.
    ///
    /// The `deleted` flag is kept so tombstones reach the remote side.
    pub fn from_record<T: Record>(record: &T) -> SyncResult<Self> {
        let mut fields = match serde_json::to_value(record)? {
            Value::Object(map) => map,
            other => {
                return Err(SyncError::SerializationFailed(format!(
                    "{} row {} serialized to {} instead of an object",
                    T::TABLE,
                    record.id(),
                    other
                )))
            }
        };

        for field in LOCAL_ONLY_FIELDS {
            fields.remove(field);
        }

        Ok(RemoteDocument::new(record.id(), fields))
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// Equality filter for [`RemoteStore::fetch`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

impl FieldFilter {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FieldFilter {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, document: &RemoteDocument) -> bool {
        document.get(&self.field) == Some(&self.value)
    }
}

// =============================================================================
// Remote Store Trait
// =============================================================================

/// A remote document store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Merge-sets every document at `{collection_path}/{id}` and stamps
    /// [`SERVER_UPDATED_AT`]. Returns the confirmed remote ids in input order.
    ///
    /// Either every document is confirmed or the call fails; callers treat a
    /// failure as "nothing was written".
    async fn push_batch(
        &self,
        collection_path: &str,
        documents: &[RemoteDocument],
    ) -> SyncResult<Vec<String>>;

    /// Documents of a collection matching all filters.
    async fn fetch(
        &self,
        collection_path: &str,
        filters: &[FieldFilter],
    ) -> SyncResult<Vec<RemoteDocument>>;
}
