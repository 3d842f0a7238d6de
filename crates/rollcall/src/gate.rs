//! Shared-password access gate.
//!
//! The directory sits behind one password shared with members. Only its
//! BLAKE3 digest is configured. A correct entry is remembered in the session
//! slot store so the prompt appears once per session.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::session::SlotStore;

/// Slot key recording a successful unlock.
pub const ACCESS_KEY: &str = "access_granted";

/// BLAKE3 hex digest of `password`, as stored in `gate.password_hash`.
#[must_use]
pub fn hash_password(password: &str) -> String {
    blake3::hash(password.as_bytes()).to_hex().to_string()
}

/// Password gate over a slot store.
#[derive(Clone)]
pub struct AccessGate {
    expected: Option<blake3::Hash>,
    slots: Arc<dyn SlotStore>,
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGate")
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl AccessGate {
    /// Create a gate. With no digest configured the gate is open.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] if the digest is not valid hex.
    pub fn new(password_hash: Option<&str>, slots: Arc<dyn SlotStore>) -> Result<Self> {
        let expected = password_hash
            .map(|hex| {
                blake3::Hash::from_hex(hex).map_err(|e| Error::ConfigValidation {
                    message: format!("password_hash is not a BLAKE3 digest: {e}"),
                })
            })
            .transpose()?;
        Ok(Self { expected, slots })
    }

    /// Whether no password is required at all.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.expected.is_none()
    }

    /// Whether this session may see the directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot store cannot be read.
    pub fn is_granted(&self) -> Result<bool> {
        if self.is_open() {
            return Ok(true);
        }
        Ok(self.slots.read(ACCESS_KEY)?.as_deref() == Some("true"))
    }

    /// Check `password` and remember a match for the session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncorrectPassword`] on a mismatch, or an error if the
    /// slot store cannot be written.
    pub fn unlock(&self, password: &str) -> Result<()> {
        let Some(expected) = self.expected else {
            return Ok(());
        };
        // `Hash` equality is constant-time.
        if blake3::hash(password.as_bytes()) != expected {
            warn!("incorrect directory password");
            return Err(Error::IncorrectPassword);
        }
        self.slots.write(ACCESS_KEY, "true")?;
        debug!("directory unlocked for this session");
        Ok(())
    }

    /// Forget a previous unlock.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot store cannot be written.
    pub fn revoke(&self) -> Result<()> {
        self.slots.remove(ACCESS_KEY)
    }
}
