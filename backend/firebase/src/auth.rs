//! Identity Toolkit REST client (`accounts:*` endpoints).

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use oracare_core::{IdentityProvider, OraError, OraResult, Session, User};

use crate::error_detail;

const IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Used when the provider omits or garbles `expiresIn`.
const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

pub struct FirebaseAuth {
    client: Client,
    api_key: String,
    base_url: String,
}

impl FirebaseAuth {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: IDENTITY_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    async fn post<B: Serialize>(&self, endpoint: &str, body: &B) -> OraResult<reqwest::Response> {
        let resp = self
            .client
            .post(format!("{}/accounts:{}", self.base_url, endpoint))
            .query(&[("key", &self.api_key)])
            .json(body)
            .send()
            .await
            .map_err(|e| OraError::Auth(e.to_string()))?;

        if !resp.status().is_success() {
            let (status, message) = error_detail(resp).await;
            warn!(endpoint, status, message = %message, "Identity provider rejected request");
            return Err(OraError::Auth(message));
        }
        Ok(resp)
    }

    async fn password_exchange(&self, endpoint: &str, email: &str, password: &str) -> OraResult<Session> {
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let resp = self.post(endpoint, &body).await?;
        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| OraError::Auth(format!("unreadable token response: {e}")))?;
        Ok(token.into_session(email))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OobRequest<'a> {
    request_type: &'a str,
    email: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    id_token: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
    local_id: String,
}

impl TokenResponse {
    fn into_session(self, fallback_email: &str) -> Session {
        let ttl = self
            .expires_in
            .as_deref()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(DEFAULT_TOKEN_TTL_SECS);
        Session {
            user: User {
                uid: self.local_id,
                email: self.email.unwrap_or_else(|| fallback_email.to_string()),
            },
            id_token: self.id_token,
            refresh_token: self.refresh_token,
            expires_at: Utc::now() + Duration::seconds(ttl),
        }
    }
}

#[async_trait]
impl IdentityProvider for FirebaseAuth {
    fn name(&self) -> &str {
        "firebase"
    }

    async fn sign_up(&self, email: &str, password: &str) -> OraResult<Session> {
        info!(email, "Attempting signup");
        let session = self.password_exchange("signUp", email, password).await?;
        info!(uid = %session.uid(), "Signup successful");
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> OraResult<Session> {
        info!(email, "Attempting login");
        let session = self.password_exchange("signInWithPassword", email, password).await?;
        info!(uid = %session.uid(), "Login successful");
        Ok(session)
    }

    /// Identity Toolkit has no server-side sign-out; the caller drops the tokens.
    async fn sign_out(&self, session: &Session) -> OraResult<()> {
        debug!(uid = %session.uid(), "Discarding session tokens");
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> OraResult<()> {
        info!(email, "Attempting password reset");
        let body = OobRequest {
            request_type: "PASSWORD_RESET",
            email,
        };
        self.post("sendOobCode", &body).await?;
        info!(email, "Password reset email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_becomes_session() {
        let token: TokenResponse = serde_json::from_value(serde_json::json!({
            "kind": "identitytoolkit#SignupNewUserResponse",
            "idToken": "id-123",
            "email": "pat@example.com",
            "refreshToken": "ref-456",
            "expiresIn": "3600",
            "localId": "uid-789"
        }))
        .unwrap();
        let session = token.into_session("ignored@example.com");
        assert_eq!(session.uid(), "uid-789");
        assert_eq!(session.email(), "pat@example.com");
        assert_eq!(session.id_token, "id-123");
        assert!(!session.is_expired());
    }

    #[test]
    fn missing_email_and_ttl_fall_back() {
        let token: TokenResponse = serde_json::from_value(serde_json::json!({
            "idToken": "id",
            "localId": "uid",
            "expiresIn": "soon"
        }))
        .unwrap();
        let session = token.into_session("pat@example.com");
        assert_eq!(session.email(), "pat@example.com");
        let ttl = (session.expires_at - Utc::now()).num_seconds();
        assert!(ttl > DEFAULT_TOKEN_TTL_SECS - 60 && ttl <= DEFAULT_TOKEN_TTL_SECS);
    }

    #[test]
    fn password_request_shape() {
        let json = serde_json::to_value(PasswordRequest {
            email: "a@b.c",
            password: "secret",
            return_secure_token: true,
        })
        .unwrap();
        assert_eq!(json["returnSecureToken"], true);
        let json = serde_json::to_value(OobRequest {
            request_type: "PASSWORD_RESET",
            email: "a@b.c",
        })
        .unwrap();
        assert_eq!(json["requestType"], "PASSWORD_RESET");
    }

    #[tokio::test]
    async fn unreachable_provider_is_auth_error() {
        let auth = FirebaseAuth::new("key").with_base_url("http://127.0.0.1:9");
        let err = auth.sign_in("a@b.c", "secret").await.unwrap_err();
        assert!(matches!(err, OraError::Auth(_)));
    }
}
