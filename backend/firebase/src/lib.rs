//! `oracare-firebase`: the backend-as-a-service side of OraCare.
//!
//! Provides:
//! - Identity Toolkit REST client (email/password accounts)
//! - Cloud Storage REST client (image uploads, download URLs)
//! - Firestore REST client (the `analyses` collection)
//! - In-memory stand-ins for all three, used by tests and offline runs

pub mod auth;
pub mod firestore;
pub mod memory;
pub mod storage;

pub use auth::FirebaseAuth;
pub use firestore::Firestore;
pub use memory::{MemoryDocumentStore, MemoryIdentity, MemoryObjectStore};
pub use storage::FirebaseStorage;

use serde::Deserialize;

/// Project settings shared by the three clients.
#[derive(Debug, Clone)]
pub struct FirebaseProject {
    pub api_key: String,
    pub project_id: String,
    pub storage_bucket: String,
}

impl FirebaseProject {
    pub fn auth(&self) -> FirebaseAuth {
        FirebaseAuth::new(&self.api_key)
    }

    pub fn storage(&self) -> FirebaseStorage {
        FirebaseStorage::new(&self.storage_bucket)
    }

    pub fn firestore(&self, collection: &str) -> Firestore {
        Firestore::new(&self.project_id).with_collection(collection)
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Status plus the most useful message a failed Google API response carries.
///
/// Google APIs answer `{"error": {"code": .., "message": ".."}}`; anything else
/// is returned verbatim.
pub(crate) async fn error_detail(resp: reqwest::Response) -> (u16, String) {
    let status = resp.status().as_u16();
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&text)
        .map(|e| e.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or(text);
    (status, message)
}
