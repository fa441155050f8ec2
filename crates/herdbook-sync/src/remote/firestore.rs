//! # Firestore REST Client
//!
//! [`RemoteStore`] over the Cloud Firestore REST API.
//!
//! ## Requests
//! ```text
//! push_batch ──► POST {base}/v1/projects/{p}/databases/{db}/documents:commit
//!                {
//!                  "writes": [{
//!                    "update":           { "name": ".../farms/f1/animals/{id}", "fields": {...} },
//!                    "updateMask":       { "fieldPaths": [every field of the document] },
//!                    "updateTransforms": [{ "fieldPath": "server_updated_at",
//!                                           "setToServerValue": "REQUEST_TIME" }]
//!                  }, ...]                                   at most 500 writes per commit
//!                }
//!
//! fetch      ──► POST {base}/v1/projects/{p}/databases/{db}/documents/farms/f1:runQuery
//!                { "structuredQuery": { "from": [{"collectionId": "animals"}],
//!                                       "where": EQUAL filters, AND-combined } }
//! ```
//!
//! The update mask turns each write into a merge-set: listed fields are
//! replaced, other fields on the stored document are left alone.
//!
//! Each commit is atomic on its own. A batch larger than one commit can be
//! partially written when a later commit fails; the caller then leaves every
//! row dirty and the next pass rewrites the same documents.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Number, Value};
use tracing::{debug, warn};

use super::{FieldFilter, RemoteDocument, RemoteStore, SERVER_UPDATED_AT};
use crate::config::RemoteSettings;
use crate::error::{SyncError, SyncResult};

/// Firestore rejects commits with more writes than this.
pub const MAX_WRITES_PER_COMMIT: usize = 500;

// =============================================================================
// Client
// =============================================================================

/// Firestore REST client for one project database.
#[derive(Debug, Clone)]
pub struct FirestoreClient {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
    database: String,
    api_key: Option<String>,
    auth_token: Option<String>,
    timeout_secs: u64,
}

impl FirestoreClient {
    pub fn new(settings: &RemoteSettings) -> SyncResult<Self> {
        if settings.project_id.trim().is_empty() {
            return Err(SyncError::InvalidConfig(
                "remote.project_id is required".into(),
            ));
        }
        url::Url::parse(&settings.base_url)?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| SyncError::Internal(format!("HTTP client setup failed: {}", e)))?;

        Ok(FirestoreClient {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            project_id: settings.project_id.clone(),
            database: settings.database.clone(),
            api_key: settings.api_key.clone(),
            auth_token: settings.auth_token.clone(),
            timeout_secs: settings.timeout_secs,
        })
    }

    /// `projects/{p}/databases/{db}/documents`
    fn documents_root(&self) -> String {
        format!(
            "projects/{}/databases/{}/documents",
            self.project_id, self.database
        )
    }

    fn endpoint(&self, suffix: &str) -> String {
        format!("{}/v1/{}{}", self.base_url, self.documents_root(), suffix)
    }

    /// Sends a POST with auth applied and decodes a JSON success body.
    async fn post(&self, url: &str, body: &Value) -> SyncResult<Value> {
        let mut request = self.http.post(url).json(body);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key)]);
        }

        let response = request.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = error_message(&text);
            warn!(status = status.as_u16(), %message, "Firestore request rejected");
            return Err(SyncError::from_status(status.as_u16(), message));
        }

        response.json().await.map_err(|e| self.transport_error(e))
    }

    fn transport_error(&self, err: reqwest::Error) -> SyncError {
        if err.is_timeout() {
            SyncError::Timeout(self.timeout_secs)
        } else {
            err.into()
        }
    }

    // =========================================================================
    // Request Bodies
    // =========================================================================

    /// Body of one `documents:commit` call.
    pub fn commit_body(&self, collection_path: &str, documents: &[RemoteDocument]) -> Value {
        let root = self.documents_root();
        let writes: Vec<Value> = documents
            .iter()
            .map(|doc| {
                let fields: Map<String, Value> = doc
                    .fields
                    .iter()
                    .map(|(name, value)| (name.clone(), to_firestore_value(value)))
                    .collect();
                let mask: Vec<String> = doc.fields.keys().map(|name| field_path(name)).collect();

                json!({
                    "update": {
                        "name": format!("{}/{}/{}", root, collection_path, doc.id),
                        "fields": fields,
                    },
                    "updateMask": { "fieldPaths": mask },
                    "updateTransforms": [{
                        "fieldPath": SERVER_UPDATED_AT,
                        "setToServerValue": "REQUEST_TIME",
                    }],
                })
            })
            .collect();

        json!({ "writes": writes })
    }
}

#[async_trait]
impl RemoteStore for FirestoreClient {
    async fn push_batch(
        &self,
        collection_path: &str,
        documents: &[RemoteDocument],
    ) -> SyncResult<Vec<String>> {
        split_collection_path(collection_path)?;
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.endpoint(":commit");
        let mut ids = Vec::with_capacity(documents.len());

        for chunk in documents.chunks(MAX_WRITES_PER_COMMIT) {
            let body = self.commit_body(collection_path, chunk);
            let response = self.post(&url, &body).await?;

            let written = response
                .get("writeResults")
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            if written != chunk.len() {
                return Err(SyncError::InvalidResponse(format!(
                    "commit confirmed {} of {} writes",
                    written,
                    chunk.len()
                )));
            }

            debug!(path = %collection_path, count = chunk.len(), "Firestore commit applied");
            ids.extend(chunk.iter().map(|doc| doc.id.clone()));
        }

        Ok(ids)
    }

    async fn fetch(
        &self,
        collection_path: &str,
        filters: &[FieldFilter],
    ) -> SyncResult<Vec<RemoteDocument>> {
        let (parent, collection_id) = split_collection_path(collection_path)?;
        let url = match parent {
            Some(parent) => self.endpoint(&format!("/{}:runQuery", parent)),
            None => self.endpoint(":runQuery"),
        };

        let body = json!({ "structuredQuery": structured_query(collection_id, filters) });
        let response = self.post(&url, &body).await?;

        let rows = response.as_array().ok_or_else(|| {
            SyncError::InvalidResponse("runQuery did not return an array".into())
        })?;

        let mut documents = Vec::new();
        for row in rows {
            // Rows without a document carry only progress metadata
            if let Some(document) = row.get("document") {
                documents.push(parse_document(document)?);
            }
        }

        debug!(path = %collection_path, count = documents.len(), "Firestore query returned");
        Ok(documents)
    }
}

// =============================================================================
// Paths & Queries
// =============================================================================

/// Splits `a/b/c` into parent document path `a/b` and collection id `c`.
///
/// A collection path has an odd number of segments.
fn split_collection_path(path: &str) -> SyncResult<(Option<&str>, &str)> {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) || segments.len() % 2 == 0 {
        return Err(SyncError::InvalidConfig(format!(
            "'{}' is not a collection path",
            path
        )));
    }

    Ok(match path.rsplit_once('/') {
        Some((parent, collection)) => (Some(parent), collection),
        None => (None, path),
    })
}

/// Field path in the syntax accepted by `updateMask` and query filters.
fn field_path(name: &str) -> String {
    let simple = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if simple {
        name.to_string()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

fn structured_query(collection_id: &str, filters: &[FieldFilter]) -> Value {
    let mut query = json!({ "from": [{ "collectionId": collection_id }] });

    let mut clauses: Vec<Value> = filters
        .iter()
        .map(|filter| {
            let field = json!({ "fieldPath": field_path(&filter.field) });
            if filter.value.is_null() {
                json!({ "unaryFilter": { "op": "IS_NULL", "field": field } })
            } else {
                json!({
                    "fieldFilter": {
                        "field": field,
                        "op": "EQUAL",
                        "value": to_firestore_value(&filter.value),
                    }
                })
            }
        })
        .collect();

    let clause = match clauses.len() {
        0 => None,
        1 => clauses.pop(),
        _ => Some(json!({ "compositeFilter": { "op": "AND", "filters": clauses } })),
    };
    if let Some(clause) = clause {
        query["where"] = clause;
    }

    query
}

fn parse_document(document: &Value) -> SyncResult<RemoteDocument> {
    let name = document
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| SyncError::InvalidResponse("document without name".into()))?;
    let id = name.rsplit('/').next().unwrap_or(name);

    let mut fields = Map::new();
    if let Some(raw) = document.get("fields").and_then(Value::as_object) {
        for (field, value) in raw {
            fields.insert(field.clone(), from_firestore_value(value)?);
        }
    }

    Ok(RemoteDocument::new(id, fields))
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

// =============================================================================
// Value Conversion
// =============================================================================

/// Plain JSON → Firestore typed value.
pub fn to_firestore_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            // int64 travels as a decimal string
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or(0.0) }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(to_firestore_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => {
            let fields: Map<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), to_firestore_value(v)))
                .collect();
            json!({ "mapValue": { "fields": fields } })
        }
    }
}

/// Firestore typed value → plain JSON.
pub fn from_firestore_value(value: &Value) -> SyncResult<Value> {
    let object = value
        .as_object()
        .ok_or_else(|| SyncError::InvalidResponse(format!("not a typed value: {}", value)))?;
    let (kind, inner) = object
        .iter()
        .next()
        .ok_or_else(|| SyncError::InvalidResponse("empty typed value".into()))?;

    let plain = match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => Value::Bool(inner.as_bool().unwrap_or(false)),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                other => other.as_i64(),
            };
            parsed.map(Value::from).ok_or_else(|| {
                SyncError::InvalidResponse(format!("bad integerValue: {}", inner))
            })?
        }
        "doubleValue" => inner
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "geoPointValue" => inner.clone(),
        "arrayValue" => {
            let items = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| {
                    values
                        .iter()
                        .map(from_firestore_value)
                        .collect::<SyncResult<Vec<Value>>>()
                })
                .transpose()?
                .unwrap_or_default();
            Value::Array(items)
        }
        "mapValue" => {
            let mut map = Map::new();
            if let Some(fields) = inner.get("fields").and_then(Value::as_object) {
                for (k, v) in fields {
                    map.insert(k.clone(), from_firestore_value(v)?);
                }
            }
            Value::Object(map)
        }
        other => {
            return Err(SyncError::InvalidResponse(format!(
                "unsupported value type: {}",
                other
            )))
        }
    };

    Ok(plain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    fn settings(base_url: &str) -> RemoteSettings {
        RemoteSettings {
            project_id: "herdbook-test".into(),
            base_url: base_url.into(),
            auth_token: Some("token-1".into()),
            ..Default::default()
        }
    }

    fn doc(id: &str, fields: Value) -> RemoteDocument {
        match fields {
            Value::Object(map) => RemoteDocument::new(id, map),
            _ => panic!("fields must be an object"),
        }
    }

    /// Serves one HTTP request with a canned response and hands back the
    /// raw request (head + body).
    async fn serve_once(status: &'static str, body: String) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let length = text[..head_end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if raw.len() >= head_end + 4 + length || n == 0 {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = tx.send(String::from_utf8_lossy(&raw).to_string());
        });

        (base, rx)
    }

    #[test]
    fn test_value_conversion() {
        let plain = json!({
            "code": "A1",
            "weight_kg": 512.5,
            "amount_cents": 12500,
            "deleted": false,
            "notes": null,
            "tags": ["a", 1],
        });
        let typed = to_firestore_value(&plain);
        assert_eq!(typed["mapValue"]["fields"]["amount_cents"], json!({"integerValue": "12500"}));
        assert_eq!(typed["mapValue"]["fields"]["weight_kg"], json!({"doubleValue": 512.5}));
        assert_eq!(typed["mapValue"]["fields"]["notes"], json!({"nullValue": null}));

        assert_eq!(from_firestore_value(&typed).unwrap(), plain);
        assert_eq!(
            from_firestore_value(&json!({"timestampValue": "2024-03-01T10:00:00Z"})).unwrap(),
            json!("2024-03-01T10:00:00Z")
        );
        assert!(from_firestore_value(&json!({"integerValue": "x"})).is_err());
    }

    #[test]
    fn test_collection_paths() {
        assert_eq!(
            split_collection_path("farms/f1/animals").unwrap(),
            (Some("farms/f1"), "animals")
        );
        assert_eq!(split_collection_path("farms").unwrap(), (None, "farms"));
        assert!(split_collection_path("farms/f1").is_err());
        assert!(split_collection_path("farms//animals").is_err());
    }

    #[test]
    fn test_field_paths() {
        assert_eq!(field_path("animal_id"), "animal_id");
        assert_eq!(field_path("1st"), "`1st`");
        assert_eq!(field_path("a.b"), "`a.b`");
    }

    #[test]
    fn test_commit_body_is_merge_with_server_time() {
        let client = FirestoreClient::new(&settings("https://firestore.googleapis.com")).unwrap();
        let body = client.commit_body(
            "farms/f1/animals",
            &[doc("a1", json!({"code": "A1", "breed": "Holstein"}))],
        );

        let write = &body["writes"][0];
        assert_eq!(
            write["update"]["name"],
            "projects/herdbook-test/databases/(default)/documents/farms/f1/animals/a1"
        );
        assert_eq!(write["update"]["fields"]["code"], json!({"stringValue": "A1"}));
        let mask = write["updateMask"]["fieldPaths"].as_array().unwrap();
        assert_eq!(mask.len(), 2);
        assert_eq!(write["updateTransforms"][0]["fieldPath"], SERVER_UPDATED_AT);
        assert_eq!(write["updateTransforms"][0]["setToServerValue"], "REQUEST_TIME");
    }

    #[test]
    fn test_structured_query_filters() {
        let none = structured_query("animals", &[]);
        assert!(none.get("where").is_none());

        let one = structured_query("animals", &[FieldFilter::equals("code", "A1")]);
        assert_eq!(one["where"]["fieldFilter"]["op"], "EQUAL");

        let two = structured_query(
            "treatments",
            &[
                FieldFilter::equals("animal_id", "a1"),
                FieldFilter::equals("next_date", Value::Null),
            ],
        );
        assert_eq!(two["where"]["compositeFilter"]["op"], "AND");
        assert_eq!(
            two["where"]["compositeFilter"]["filters"][1]["unaryFilter"]["op"],
            "IS_NULL"
        );
    }

    #[test]
    fn test_missing_project_is_config_error() {
        let err = FirestoreClient::new(&RemoteSettings::default()).unwrap_err();
        assert!(err.is_config_error());
    }

    #[tokio::test]
    async fn test_push_batch_commits_and_authenticates() {
        let response = json!({
            "writeResults": [{"updateTime": "2024-03-01T10:00:00Z"}, {"updateTime": "2024-03-01T10:00:00Z"}],
            "commitTime": "2024-03-01T10:00:00Z",
        });
        let (base, request) = serve_once("200 OK", response.to_string()).await;
        let client = FirestoreClient::new(&settings(&base)).unwrap();

        let ids = client
            .push_batch(
                "farms/f1/production",
                &[doc("p1", json!({"total_liters": 18.0})), doc("p2", json!({"total_liters": 20.0}))],
            )
            .await
            .unwrap();
        assert_eq!(ids, vec!["p1".to_string(), "p2".to_string()]);

        let raw = request.await.unwrap();
        assert!(raw.starts_with(
            "POST /v1/projects/herdbook-test/databases/(default)/documents:commit"
        ));
        assert!(raw.to_lowercase().contains("authorization: bearer token-1"));
        assert!(raw.contains("REQUEST_TIME"));
    }

    #[tokio::test]
    async fn test_rejection_maps_status() {
        let body = json!({"error": {"code": 403, "message": "Missing or insufficient permissions.", "status": "PERMISSION_DENIED"}});
        let (base, _request) = serve_once("403 Forbidden", body.to_string()).await;
        let client = FirestoreClient::new(&settings(&base)).unwrap();

        let err = client
            .push_batch("farms/f1/animals", &[doc("a1", json!({"code": "A1"}))])
            .await
            .unwrap_err();
        match err {
            SyncError::Unauthorized(message) => assert!(message.contains("insufficient")),
            other => panic!("expected Unauthorized, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_parses_documents() {
        let body = json!([
            {
                "document": {
                    "name": "projects/herdbook-test/databases/(default)/documents/farms/f1/animals/a1",
                    "fields": {
                        "code": {"stringValue": "A1"},
                        "weight_kg": {"doubleValue": 480.0},
                    },
                },
                "readTime": "2024-03-01T10:00:00Z",
            },
            {"readTime": "2024-03-01T10:00:00Z"},
        ]);
        let (base, request) = serve_once("200 OK", body.to_string()).await;
        let client = FirestoreClient::new(&settings(&base)).unwrap();

        let docs = client
            .fetch("farms/f1/animals", &[FieldFilter::equals("code", "A1")])
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "a1");
        assert_eq!(docs[0].get("code"), Some(&json!("A1")));

        let raw = request.await.unwrap();
        assert!(raw.contains("/documents/farms/f1:runQuery"));
        assert!(raw.contains("\"collectionId\":\"animals\""));
    }

    #[tokio::test]
    async fn test_empty_batch_skips_request() {
        let client = FirestoreClient::new(&settings("http://127.0.0.1:9")).unwrap();
        assert!(client.push_batch("farms/f1/animals", &[]).await.unwrap().is_empty());
    }
}
