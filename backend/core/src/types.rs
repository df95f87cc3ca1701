use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Highest confidence score a result may carry.
pub const MAX_CONFIDENCE: u8 = 100;

/// A signed-up account as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    pub email: String,
}

/// A live, provider-issued session.
///
/// Workflows only care whether one exists and which user it belongs to;
/// the tokens are forwarded to the REST stores for authorization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: User,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn uid(&self) -> &str {
        &self.user.uid
    }

    pub fn email(&self) -> &str {
        &self.user.email
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Structured result scraped from a vision model answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: String,
    pub confidence: u8,
    pub recommendations: String,
}

/// Payload for a record that the document store has not yet assigned an id to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnalysisRecord {
    pub user_id: String,
    pub image_url: String,
    pub result: AnalysisResult,
}

/// A persisted analysis, scoped to one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: String,
    pub user_id: String,
    pub image_url: String,
    pub result: AnalysisResult,
    pub timestamp: DateTime<Utc>,
}

impl AnalysisRecord {
    /// Attach store-assigned identity and time to a new record.
    pub fn from_new(id: impl Into<String>, record: NewAnalysisRecord, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            user_id: record.user_id,
            image_url: record.image_url,
            result: record.result,
            timestamp,
        }
    }
}
