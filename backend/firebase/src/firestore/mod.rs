//! Firestore REST client for the analysis collection.

pub mod value;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};
use uuid::Uuid;

use oracare_core::{AnalysisRecord, DocumentStore, NewAnalysisRecord, OraError, OraResult, Session};

use crate::error_detail;

const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

pub const DEFAULT_COLLECTION: &str = "analyses";

pub struct Firestore {
    client: Client,
    project_id: String,
    collection: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitResponse {
    #[serde(default)]
    write_results: Vec<WriteResult>,
    commit_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WriteResult {
    #[serde(default)]
    transform_results: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RunQueryItem {
    document: Option<FsDocument>,
}

#[derive(Debug, Deserialize)]
struct FsDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl Firestore {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            project_id: project_id.into(),
            collection: DEFAULT_COLLECTION.to_string(),
            base_url: FIRESTORE_BASE_URL.to_string(),
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn database_path(&self) -> String {
        format!("projects/{}/databases/(default)", self.project_id)
    }

    fn documents_url(&self) -> String {
        format!("{}/{}/documents", self.base_url, self.database_path())
    }

    fn document_name(&self, id: &str) -> String {
        format!("{}/documents/{}/{}", self.database_path(), self.collection, id)
    }

    /// Body of a `:commit` that creates the record and stamps `timestamp`
    /// with the server's request time.
    fn create_write(&self, id: &str, record: &NewAnalysisRecord) -> OraResult<Value> {
        let plain = serde_json::to_value(record)
            .map_err(|e| OraError::Database(format!("unserializable record: {e}")))?;
        let fields = plain
            .as_object()
            .map(value::encode_fields)
            .unwrap_or_default();
        Ok(json!({
            "writes": [{
                "update": { "name": self.document_name(id), "fields": fields },
                "currentDocument": { "exists": false },
                "updateTransforms": [{
                    "fieldPath": "timestamp",
                    "setToServerValue": "REQUEST_TIME"
                }]
            }]
        }))
    }

    fn user_query(&self, user_id: &str) -> Value {
        json!({
            "structuredQuery": {
                "from": [{ "collectionId": self.collection }],
                "where": { "fieldFilter": {
                    "field": { "fieldPath": "userId" },
                    "op": "EQUAL",
                    "value": { "stringValue": user_id }
                } },
                "orderBy": [{
                    "field": { "fieldPath": "timestamp" },
                    "direction": "DESCENDING"
                }]
            }
        })
    }

    async fn send(&self, req: reqwest::RequestBuilder, session: &Session) -> OraResult<reqwest::Response> {
        let resp = req
            .bearer_auth(&session.id_token)
            .send()
            .await
            .map_err(|e| OraError::Database(e.to_string()))?;
        if resp.status().is_success() {
            return Ok(resp);
        }
        let (status, message) = error_detail(resp).await;
        Err(OraError::Database(format!("{status}: {message}")))
    }
}

/// Firestore's own auto-ids are 20 alphanumerics; a hyphenless UUID is as unique.
fn new_document_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn record_from_document(doc: FsDocument) -> Option<AnalysisRecord> {
    let id = doc.name.rsplit('/').next()?.to_string();
    let mut plain = value::decode_fields(&doc.fields);
    plain.insert("id".to_string(), Value::String(id));
    match serde_json::from_value::<AnalysisRecord>(Value::Object(plain)) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(document = %doc.name, error = %e, "Skipping malformed analysis document");
            None
        }
    }
}

#[async_trait]
impl DocumentStore for Firestore {
    async fn create(&self, session: &Session, record: NewAnalysisRecord) -> OraResult<AnalysisRecord> {
        let id = new_document_id();
        let body = self.create_write(&id, &record)?;
        let req = self
            .client
            .post(format!("{}:commit", self.documents_url()))
            .json(&body);
        let resp: CommitResponse = self
            .send(req, session)
            .await?
            .json()
            .await
            .map_err(|e| OraError::Database(format!("unreadable commit response: {e}")))?;

        let timestamp = resp
            .write_results
            .first()
            .and_then(|w| w.transform_results.first())
            .and_then(|t| t.get("timestampValue"))
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<DateTime<Utc>>().ok())
            .or(resp.commit_time)
            .unwrap_or_else(Utc::now);

        info!(id = %id, collection = %self.collection, "Stored analysis record");
        Ok(AnalysisRecord::from_new(id, record, timestamp))
    }

    async fn list_for_user(&self, session: &Session, user_id: &str) -> OraResult<Vec<AnalysisRecord>> {
        let req = self
            .client
            .post(format!("{}:runQuery", self.documents_url()))
            .json(&self.user_query(user_id));
        let items: Vec<RunQueryItem> = self
            .send(req, session)
            .await?
            .json()
            .await
            .map_err(|e| OraError::Database(format!("unreadable query response: {e}")))?;

        let records: Vec<AnalysisRecord> = items
            .into_iter()
            .filter_map(|item| item.document)
            .filter_map(record_from_document)
            .collect();
        debug!(user_id, count = records.len(), "Fetched analysis history");
        Ok(records)
    }

    async fn delete(&self, session: &Session, id: &str) -> OraResult<()> {
        let req = self
            .client
            .delete(format!("{}/{}/{}", self.documents_url(), self.collection, id));
        self.send(req, session).await?;
        info!(id, collection = %self.collection, "Deleted analysis record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oracare_core::AnalysisResult;

    fn new_record() -> NewAnalysisRecord {
        NewAnalysisRecord {
            user_id: "u1".into(),
            image_url: "https://img/1.jpg".into(),
            result: AnalysisResult {
                summary: "Mild irritation noted.".into(),
                confidence: 42,
                recommendations: "Monitor.".into(),
            },
        }
    }

    #[test]
    fn commit_body_uses_server_timestamp() {
        let fs = Firestore::new("oracare-test");
        let body = fs.create_write("doc1", &new_record()).unwrap();
        let write = &body["writes"][0];
        assert_eq!(
            write["update"]["name"],
            "projects/oracare-test/databases/(default)/documents/analyses/doc1"
        );
        assert_eq!(write["update"]["fields"]["userId"]["stringValue"], "u1");
        assert_eq!(
            write["update"]["fields"]["result"]["mapValue"]["fields"]["confidence"]["integerValue"],
            "42"
        );
        assert!(write["update"]["fields"].get("timestamp").is_none());
        assert_eq!(write["updateTransforms"][0]["setToServerValue"], "REQUEST_TIME");
        assert_eq!(write["currentDocument"]["exists"], false);
    }

    #[test]
    fn query_filters_by_user_newest_first() {
        let fs = Firestore::new("p").with_collection("scans");
        let q = fs.user_query("u1");
        let sq = &q["structuredQuery"];
        assert_eq!(sq["from"][0]["collectionId"], "scans");
        assert_eq!(sq["where"]["fieldFilter"]["op"], "EQUAL");
        assert_eq!(sq["where"]["fieldFilter"]["value"]["stringValue"], "u1");
        assert_eq!(sq["orderBy"][0]["direction"], "DESCENDING");
    }

    #[test]
    fn documents_become_records() {
        let items: Vec<RunQueryItem> = serde_json::from_value(json!([
            {
                "document": {
                    "name": "projects/p/databases/(default)/documents/analyses/abc",
                    "fields": {
                        "userId": { "stringValue": "u1" },
                        "imageUrl": { "stringValue": "https://img/1.jpg" },
                        "timestamp": { "timestampValue": "2024-05-01T12:00:00.5Z" },
                        "result": { "mapValue": { "fields": {
                            "summary": { "stringValue": "X" },
                            "confidence": { "integerValue": "73" },
                            "recommendations": { "stringValue": "Y" }
                        } } }
                    }
                },
                "readTime": "2024-05-02T00:00:00Z"
            },
            {
                "document": {
                    "name": "projects/p/databases/(default)/documents/analyses/broken",
                    "fields": { "userId": { "stringValue": "u1" } }
                }
            },
            { "readTime": "2024-05-02T00:00:00Z" }
        ]))
        .unwrap();

        let records: Vec<AnalysisRecord> = items
            .into_iter()
            .filter_map(|i| i.document)
            .filter_map(record_from_document)
            .collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "abc");
        assert_eq!(records[0].result.confidence, 73);
        assert_eq!(records[0].timestamp.to_rfc3339(), "2024-05-01T12:00:00.500+00:00");
    }

    #[test]
    fn document_ids_are_unique() {
        assert_ne!(new_document_id(), new_document_id());
        assert_eq!(new_document_id().len(), 32);
    }
}
