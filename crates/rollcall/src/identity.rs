//! Local identity provider and magic-link login.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::{Error, Result};
use crate::ports::{IdentityProvider, OwnerId, Session};
use crate::validation::rules;

/// Message shown once a login link has been requested.
pub const LINK_SENT_MESSAGE: &str = "Check your email for the login link!";

/// Identity provider holding at most one fixed session.
///
/// Magic-link requests are logged instead of mailed; the session comes from
/// configuration or the command line.
#[derive(Debug, Default)]
pub struct StaticIdentity {
    session: Mutex<Option<Session>>,
    last_link: Mutex<Option<(String, String)>>,
}

impl StaticIdentity {
    /// A provider with nobody signed in.
    #[must_use]
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// A provider with `owner` signed in.
    #[must_use]
    pub fn signed_in(owner: OwnerId, email: Option<String>) -> Self {
        Self {
            session: Mutex::new(Some(Session { owner, email })),
            last_link: Mutex::new(None),
        }
    }

    /// The most recent `(email, redirect)` a link was requested for.
    pub async fn last_link(&self) -> Option<(String, String)> {
        self.last_link.lock().await.clone()
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_session(&self) -> Result<Option<Session>> {
        Ok(self.session.lock().await.clone())
    }

    async fn sign_in_with_email_link(&self, email: &str, redirect_to: &str) -> Result<()> {
        info!(%email, %redirect_to, "login link requested");
        *self.last_link.lock().await = Some((email.to_string(), redirect_to.to_string()));
        Ok(())
    }

    async fn sign_out(&self) -> Result<()> {
        if let Some(session) = self.session.lock().await.take() {
            info!(owner = %session.owner, "signed out");
        }
        Ok(())
    }
}

/// Requests email login links.
#[derive(Clone)]
pub struct MagicLinkLogin {
    identity: Arc<dyn IdentityProvider>,
    redirect_url: String,
}

impl std::fmt::Debug for MagicLinkLogin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MagicLinkLogin")
            .field("redirect_url", &self.redirect_url)
            .finish_non_exhaustive()
    }
}

impl MagicLinkLogin {
    /// Create a login helper that sends members back to `redirect_url`.
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityProvider>, redirect_url: impl Into<String>) -> Self {
        Self {
            identity,
            redirect_url: redirect_url.into(),
        }
    }

    /// Send a login link to `email`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed address, or the provider's
    /// error if the link cannot be sent.
    pub async fn request(&self, email: &str) -> Result<&'static str> {
        let email = email.trim();
        if !rules::is_email(email) {
            return Err(Error::validation("login", "Enter a valid email"));
        }
        self.identity
            .sign_in_with_email_link(email, &self.redirect_url)
            .await?;
        Ok(LINK_SENT_MESSAGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_identity_session_lifecycle() {
        let identity = StaticIdentity::signed_in(OwnerId::new("user-1"), None);
        let session = identity.current_session().await.unwrap().unwrap();
        assert_eq!(session.owner.as_str(), "user-1");

        identity.sign_out().await.unwrap();
        assert!(identity.current_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_magic_link_request() {
        let identity = Arc::new(StaticIdentity::signed_out());
        let login = MagicLinkLogin::new(identity.clone(), "https://dir.test/auth/callback");

        let message = login.request(" jane@x.edu ").await.unwrap();

        assert_eq!(message, LINK_SENT_MESSAGE);
        assert_eq!(
            identity.last_link().await,
            Some((
                "jane@x.edu".to_string(),
                "https://dir.test/auth/callback".to_string()
            ))
        );
        assert!(identity.current_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_magic_link_rejects_bad_email() {
        let identity = Arc::new(StaticIdentity::signed_out());
        let login = MagicLinkLogin::new(identity.clone(), "https://dir.test/cb");

        let err = login.request("jane").await.unwrap_err();
        assert_eq!(err.to_string(), "Enter a valid email");
        assert!(identity.last_link().await.is_none());
    }
}
