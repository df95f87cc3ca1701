//! Cloud Storage for Firebase REST client.
//!
//! Objects are addressed as one URL path segment, so `/` inside an object
//! path is percent-encoded (`analysis%2Fuid%2F...`).

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, info};

use oracare_core::{ObjectStore, OraError, OraResult, Session};

use crate::error_detail;

const STORAGE_BASE_URL: &str = "https://firebasestorage.googleapis.com/v0";

pub struct FirebaseStorage {
    client: Client,
    bucket: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMetadata {
    #[serde(default)]
    name: String,
    /// Comma-separated list; the first token is used.
    #[serde(default)]
    download_tokens: Option<String>,
}

impl FirebaseStorage {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            bucket: bucket.into(),
            base_url: STORAGE_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn bucket_url(&self) -> OraResult<Url> {
        Url::parse(&format!("{}/b/{}/o", self.base_url, self.bucket))
            .map_err(|e| OraError::Storage(format!("invalid storage URL: {e}")))
    }

    /// `{base}/b/{bucket}/o/{path as one encoded segment}`
    pub fn object_url(&self, path: &str) -> OraResult<Url> {
        let mut url = self.bucket_url()?;
        url.path_segments_mut()
            .map_err(|_| OraError::Storage("storage URL cannot be a base".into()))?
            .push(path);
        Ok(url)
    }

    fn authorized(&self, req: reqwest::RequestBuilder, session: &Session) -> reqwest::RequestBuilder {
        req.header("Authorization", format!("Firebase {}", session.id_token))
    }

    async fn check(resp: reqwest::Response) -> OraResult<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let (status, message) = error_detail(resp).await;
        Err(OraError::Storage(format!("{status}: {message}")))
    }
}

fn transport(e: reqwest::Error) -> OraError {
    OraError::Storage(e.to_string())
}

#[async_trait]
impl ObjectStore for FirebaseStorage {
    async fn upload(
        &self,
        session: &Session,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> OraResult<()> {
        info!(path, size = bytes.len(), content_type, "Uploading object");
        let url = self.bucket_url()?;
        let req = self
            .client
            .post(url)
            .query(&[("uploadType", "media"), ("name", path)])
            .header("Content-Type", content_type)
            .body(bytes.to_vec());
        let resp = self.authorized(req, session).send().await.map_err(transport)?;
        let meta: ObjectMetadata = Self::check(resp).await?.json().await.map_err(transport)?;
        debug!(name = %meta.name, "Upload complete");
        Ok(())
    }

    async fn download_url(&self, session: &Session, path: &str) -> OraResult<String> {
        let url = self.object_url(path)?;
        let req = self.client.get(url.clone());
        let resp = self.authorized(req, session).send().await.map_err(transport)?;
        let meta: ObjectMetadata = Self::check(resp).await?.json().await.map_err(transport)?;

        let token = meta
            .download_tokens
            .as_deref()
            .and_then(|t| t.split(',').next())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| OraError::Storage(format!("object {path} has no download token")))?;

        let mut public = url;
        public
            .query_pairs_mut()
            .append_pair("alt", "media")
            .append_pair("token", token);
        Ok(public.to_string())
    }

    async fn delete(&self, session: &Session, path: &str) -> OraResult<()> {
        info!(path, "Deleting object");
        let url = self.object_url(path)?;
        let req = self.client.delete(url);
        let resp = self.authorized(req, session).send().await.map_err(transport)?;
        Self::check(resp).await?;
        Ok(())
    }
}
