//! Account commands and the sign-in step shared by the other commands.

use anyhow::{Context, Result};
use tracing::info;

use oracare_config::BackendKind;
use oracare_core::{OraError, Session};
use oracare_workflow::SessionContext;

use crate::terminal_output::{note_info, note_success};

/// Email and password given on the command line or through the environment.
#[derive(Debug, Clone, clap::Args)]
pub struct Credentials {
    #[arg(long, env = "ORACARE_EMAIL")]
    pub email: String,
    #[arg(long, env = "ORACARE_PASSWORD", hide_env_values = true)]
    pub password: String,
}

pub async fn signup(ctx: &SessionContext, creds: &Credentials) -> Result<()> {
    let user = ctx
        .sign_up(&creds.email, &creds.password)
        .await
        .context("Signup failed")?;
    note_success(&format!("Account created for {} (uid {})", user.email, user.uid));
    ctx.sign_out().await?;
    Ok(())
}

pub async fn reset_password(ctx: &SessionContext, email: &str) -> Result<()> {
    ctx.reset_password(email)
        .await
        .context("Failed to send password reset email")?;
    note_success(&format!("Password reset email sent to {email}"));
    Ok(())
}

/// Sign in and return the live session.
///
/// The in-memory backend starts empty on every run, so an unknown account is
/// created on the spot there.
pub async fn login(
    ctx: &SessionContext,
    backend: BackendKind,
    creds: &Credentials,
) -> Result<Session> {
    match ctx.sign_in(&creds.email, &creds.password).await {
        Ok(_) => {}
        Err(OraError::Auth(code))
            if backend == BackendKind::Memory && code.starts_with("EMAIL_NOT_FOUND") =>
        {
            info!(email = %creds.email, "Registering account in memory backend");
            note_info("In-memory backend: created a temporary account");
            ctx.sign_up(&creds.email, &creds.password).await?;
        }
        Err(e) => return Err(e).context("Login failed"),
    }
    Ok(ctx.require_session()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oracare_firebase::MemoryIdentity;
    use std::sync::Arc;

    fn creds(password: &str) -> Credentials {
        Credentials {
            email: "pat@example.com".into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn memory_login_registers_unknown_account() {
        let ctx = SessionContext::new(Arc::new(MemoryIdentity::new()));
        let session = login(&ctx, BackendKind::Memory, &creds("secret1")).await.unwrap();
        assert_eq!(session.email(), "pat@example.com");
    }

    #[tokio::test]
    async fn firebase_login_does_not_register() {
        let ctx = SessionContext::new(Arc::new(MemoryIdentity::new()));
        let err = login(&ctx, BackendKind::Firebase, &creds("secret1")).await.unwrap_err();
        assert!(format!("{err:#}").contains("EMAIL_NOT_FOUND"));
        assert!(!ctx.is_signed_in());
    }

    #[tokio::test]
    async fn wrong_password_is_not_masked() {
        let ctx = SessionContext::new(Arc::new(MemoryIdentity::new()));
        signup(&ctx, &creds("secret1")).await.unwrap();
        let err = login(&ctx, BackendKind::Memory, &creds("nope!!!")).await.unwrap_err();
        assert!(format!("{err:#}").contains("INVALID_PASSWORD"));
    }
}
