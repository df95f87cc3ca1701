//! Owned session state.
//!
//! The signed-in session lives in a `watch` channel held by one
//! [`SessionContext`]. Workflows ask it for the current session; anything that
//! needs to react to sign-in/sign-out subscribes. Dropping the context via
//! [`SessionContext::shutdown`] closes every subscription.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, warn};

use oracare_core::{IdentityProvider, OraError, OraResult, Session, User};

pub struct SessionContext {
    identity: Arc<dyn IdentityProvider>,
    state: watch::Sender<Option<Session>>,
}

impl SessionContext {
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        let (state, _) = watch::channel(None);
        info!(provider = %identity.name(), "Session context ready");
        Self { identity, state }
    }

    /// Receive every change of the signed-in session.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.state.subscribe()
    }

    pub fn current(&self) -> Option<Session> {
        self.state.borrow().clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().as_ref().map(|s| s.user.clone())
    }

    pub fn is_signed_in(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// The live session, or `Unauthenticated` when there is none or it expired.
    pub fn require_session(&self) -> OraResult<Session> {
        match self.current() {
            Some(session) if !session.is_expired() => Ok(session),
            Some(session) => {
                warn!(uid = %session.uid(), "Session expired");
                self.publish(None);
                Err(OraError::Unauthenticated)
            }
            None => Err(OraError::Unauthenticated),
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> OraResult<User> {
        let session = self.identity.sign_up(email, password).await.map_err(|e| {
            error!(error = %e, "Signup error");
            e
        })?;
        let user = session.user.clone();
        self.publish(Some(session));
        Ok(user)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> OraResult<User> {
        let session = self.identity.sign_in(email, password).await.map_err(|e| {
            error!(error = %e, "Login error");
            e
        })?;
        let user = session.user.clone();
        self.publish(Some(session));
        Ok(user)
    }

    /// Sign out; the session is only cleared once the provider agrees.
    pub async fn sign_out(&self) -> OraResult<()> {
        let Some(session) = self.current() else {
            return Ok(());
        };
        self.identity.sign_out(&session).await.map_err(|e| {
            error!(error = %e, "Logout error");
            e
        })?;
        self.publish(None);
        info!("Logout successful");
        Ok(())
    }

    pub async fn reset_password(&self, email: &str) -> OraResult<()> {
        self.identity.send_password_reset(email).await.map_err(|e| {
            error!(error = %e, "Password reset error");
            e
        })
    }

    /// Tear down at application exit. Subscribers see the channel close.
    pub fn shutdown(self) {
        info!(
            signed_in = self.is_signed_in(),
            subscribers = self.state.receiver_count(),
            "Shutting down session context"
        );
    }

    fn publish(&self, session: Option<Session>) {
        match &session {
            Some(s) => info!(email = %s.email(), "Auth state changed: user authenticated"),
            None => info!("Auth state changed: no user"),
        }
        self.state.send_replace(session);
    }
}
