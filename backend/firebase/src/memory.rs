//! In-process stand-ins for the Firebase services.
//!
//! Behaviour follows the real services closely enough for workflow tests and
//! for running the CLI without a Firebase project (`backend: memory`). Error
//! messages reuse the provider's codes (`EMAIL_EXISTS`, ...).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use oracare_core::{
    AnalysisRecord, DocumentStore, IdentityProvider, NewAnalysisRecord, ObjectStore, OraError,
    OraResult, Session, User,
};

const MIN_PASSWORD_LEN: usize = 6;

struct Account {
    uid: String,
    password: String,
}

/// Email/password accounts held in memory. Test double only; passwords are
/// kept as given.
pub struct MemoryIdentity {
    accounts: RwLock<HashMap<String, Account>>,
    reset_requests: RwLock<Vec<String>>,
    session_ttl: Duration,
}

impl Default for MemoryIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            reset_requests: RwLock::new(Vec::new()),
            session_ttl: Duration::hours(1),
        }
    }

    /// Emails a password reset was requested for, oldest first.
    pub async fn reset_requests(&self) -> Vec<String> {
        self.reset_requests.read().await.clone()
    }

    fn issue(&self, uid: &str, email: &str) -> Session {
        Session {
            user: User {
                uid: uid.to_string(),
                email: email.to_string(),
            },
            id_token: Uuid::new_v4().to_string(),
            refresh_token: Uuid::new_v4().to_string(),
            expires_at: Utc::now() + self.session_ttl,
        }
    }
}

fn normalize_email(email: &str) -> OraResult<String> {
    let email = email.trim().to_ascii_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(OraError::Auth("INVALID_EMAIL".into())),
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    fn name(&self) -> &str {
        "memory"
    }

    async fn sign_up(&self, email: &str, password: &str) -> OraResult<Session> {
        let email = normalize_email(email)?;
        if password.len() < MIN_PASSWORD_LEN {
            return Err(OraError::Auth(
                "WEAK_PASSWORD : Password should be at least 6 characters".into(),
            ));
        }
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&email) {
            return Err(OraError::Auth("EMAIL_EXISTS".into()));
        }
        let uid = Uuid::new_v4().simple().to_string();
        accounts.insert(
            email.clone(),
            Account {
                uid: uid.clone(),
                password: password.to_string(),
            },
        );
        info!(uid = %uid, "Created in-memory account");
        Ok(self.issue(&uid, &email))
    }

    async fn sign_in(&self, email: &str, password: &str) -> OraResult<Session> {
        let email = normalize_email(email)?;
        let accounts = self.accounts.read().await;
        let account = accounts
            .get(&email)
            .ok_or_else(|| OraError::Auth("EMAIL_NOT_FOUND".into()))?;
        if account.password != password {
            return Err(OraError::Auth("INVALID_PASSWORD".into()));
        }
        Ok(self.issue(&account.uid, &email))
    }

    async fn sign_out(&self, session: &Session) -> OraResult<()> {
        debug!(uid = %session.uid(), "Signed out in-memory session");
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> OraResult<()> {
        let email = normalize_email(email)?;
        if !self.accounts.read().await.contains_key(&email) {
            return Err(OraError::Auth("EMAIL_NOT_FOUND".into()));
        }
        self.reset_requests.write().await.push(email);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Blob store keyed by object path.
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, StoredObject>>,
    base_url: String,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            base_url: "memory://oracare".to_string(),
        }
    }

    pub async fn get(&self, path: &str) -> Option<StoredObject> {
        self.objects.read().await.get(path).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(
        &self,
        _session: &Session,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> OraResult<()> {
        self.objects.write().await.insert(
            path.to_string(),
            StoredObject {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn download_url(&self, _session: &Session, path: &str) -> OraResult<String> {
        if !self.objects.read().await.contains_key(path) {
            return Err(OraError::Storage(format!("object {path} does not exist")));
        }
        Ok(format!("{}/{}", self.base_url, path))
    }

    async fn delete(&self, _session: &Session, path: &str) -> OraResult<()> {
        match self.objects.write().await.remove(path) {
            Some(_) => Ok(()),
            None => Err(OraError::Storage(format!("object {path} does not exist"))),
        }
    }
}

struct Documents {
    records: Vec<AnalysisRecord>,
    last_timestamp: Option<DateTime<Utc>>,
}

/// Analysis records held in memory, with store-assigned ids and times.
pub struct MemoryDocumentStore {
    inner: RwLock<Documents>,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Documents {
                records: Vec::new(),
                last_timestamp: None,
            }),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.records.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create(&self, _session: &Session, record: NewAnalysisRecord) -> OraResult<AnalysisRecord> {
        let mut docs = self.inner.write().await;
        // Server time never repeats, so history order stays total.
        let now = Utc::now();
        let timestamp = match docs.last_timestamp {
            Some(last) if last >= now => last + Duration::microseconds(1),
            _ => now,
        };
        docs.last_timestamp = Some(timestamp);

        let stored = AnalysisRecord::from_new(Uuid::new_v4().simple().to_string(), record, timestamp);
        docs.records.push(stored.clone());
        Ok(stored)
    }

    async fn list_for_user(&self, _session: &Session, user_id: &str) -> OraResult<Vec<AnalysisRecord>> {
        let docs = self.inner.read().await;
        let mut records: Vec<AnalysisRecord> = docs
            .records
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    /// Deleting a missing id succeeds, as it does in Firestore.
    async fn delete(&self, _session: &Session, id: &str) -> OraResult<()> {
        self.inner.write().await.records.retain(|r| r.id != id);
        Ok(())
    }
}
