//! Collaborator interfaces.
//!
//! The wizard never reaches for a global client. Identity, profile storage,
//! picture storage and analytics are handed in as trait objects so the host
//! decides which adapters back them and tests can swap in doubles.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::profile::{Profile, ProfileRecord};

/// The authenticated identity a profile belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Wrap an identity string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Who is signed in.
    pub owner: OwnerId,
    /// The address the session was issued to.
    pub email: Option<String>,
}

/// Options for an object upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    /// MIME type of the payload.
    pub content_type: String,
    /// Replace an existing object at the same path.
    pub upsert: bool,
}

/// Identity and session provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The current session, if someone is signed in.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be reached.
    async fn current_session(&self) -> Result<Option<Session>>;

    /// Send a sign-in link to `email` that returns to `redirect_to`.
    ///
    /// This never yields a session directly; the user completes sign-in out of
    /// band.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if the link cannot be sent.
    async fn sign_in_with_email_link(&self, email: &str, redirect_to: &str) -> Result<()>;

    /// End the current session.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if sign-out fails.
    async fn sign_out(&self) -> Result<()>;
}

/// Persistent store of directory profiles, keyed by owner identity.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// The profile owned by `owner`, if any.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the query fails.
    async fn select_by_owner(&self, owner: &OwnerId) -> Result<Option<Profile>>;

    /// Insert a new profile owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the insert fails.
    async fn insert(&self, owner: &OwnerId, record: &ProfileRecord) -> Result<Profile>;

    /// Overwrite the profile owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the update fails or no row matches.
    async fn update(&self, owner: &OwnerId, record: &ProfileRecord) -> Result<Profile>;

    /// Every profile, newest first.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the query fails.
    async fn select_all(&self) -> Result<Vec<Profile>>;
}

/// Binary object storage for profile pictures.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` at `path`.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the upload fails.
    async fn upload(&self, path: &str, bytes: &[u8], options: &UploadOptions) -> Result<()>;

    /// The public URL an object at `path` is served from.
    fn public_url(&self, path: &str) -> String;

    /// Download an object by its public URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not point into this store or the read
    /// fails.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Fire-and-forget product analytics.
///
/// Implementations must not block and must swallow their own failures.
pub trait AnalyticsSink: Send + Sync {
    /// Record `event` with free-form `properties`.
    fn capture(&self, event: &str, properties: serde_json::Value);
}
