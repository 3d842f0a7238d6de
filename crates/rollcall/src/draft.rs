//! Resumable wizard drafts.
//!
//! When the wizard is hidden its whole state is written to a single session
//! slot. The next mount consumes the slot: the draft is restored once and then
//! deleted, so drafts never stack. A draft that cannot be read is dropped and
//! the wizard starts fresh.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::form::FormFields;
use crate::sequencer::LAST_INDEX;
use crate::session::SlotStore;
use crate::wizard::{CropUiState, WizardState};

/// Slot key the draft lives under.
pub const DRAFT_KEY: &str = "join_flow_state";

/// Current snapshot layout.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serialized form of a [`WizardState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftSnapshot {
    /// Layout version.
    pub version: u32,
    /// Step the member was on.
    pub step_index: usize,
    /// Everything typed so far.
    pub form: FormFields,
    /// Cropper position and visibility.
    pub crop: CropUiState,
    /// When the snapshot was taken.
    pub saved_at: DateTime<Utc>,
}

impl DraftSnapshot {
    /// Capture `state` now.
    #[must_use]
    pub fn capture(state: &WizardState) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            step_index: state.step_index,
            form: state.form.clone(),
            crop: state.crop,
            saved_at: Utc::now(),
        }
    }

    /// Rebuild a wizard state from the snapshot.
    ///
    /// The step index is clamped to the sequence, and an open cropper without
    /// its source image comes back closed.
    #[must_use]
    pub fn into_state(self) -> WizardState {
        let mut crop = self.crop;
        if self.form.raw_image.is_none() {
            crop.open = false;
        }
        WizardState {
            step_index: self.step_index.min(LAST_INDEX),
            form: self.form,
            crop,
            errors: std::collections::BTreeMap::new(),
        }
    }
}

/// Single-slot draft persistence over a [`SlotStore`].
#[derive(Clone)]
pub struct DraftStore {
    slots: Arc<dyn SlotStore>,
}

impl std::fmt::Debug for DraftStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftStore").field("key", &DRAFT_KEY).finish()
    }
}

impl DraftStore {
    /// Create a draft store over `slots`.
    #[must_use]
    pub fn new(slots: Arc<dyn SlotStore>) -> Self {
        Self { slots }
    }

    /// Overwrite the draft with `state`.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be serialized or written.
    pub fn save(&self, state: &WizardState) -> Result<()> {
        let snapshot = DraftSnapshot::capture(state);
        let json = serde_json::to_string(&snapshot)?;
        self.slots.write(DRAFT_KEY, &json)?;
        debug!(step_index = snapshot.step_index, "draft saved");
        Ok(())
    }

    /// Take the draft out of its slot.
    ///
    /// The slot is deleted whether or not the draft was usable.
    ///
    /// # Errors
    ///
    /// Returns an error only if the slot store itself fails.
    pub fn load(&self) -> Result<Option<WizardState>> {
        let Some(json) = self.slots.read(DRAFT_KEY)? else {
            return Ok(None);
        };
        self.slots.remove(DRAFT_KEY)?;

        match serde_json::from_str::<DraftSnapshot>(&json) {
            Ok(snapshot) if snapshot.version == SNAPSHOT_VERSION => {
                debug!(
                    step_index = snapshot.step_index,
                    saved_at = %snapshot.saved_at,
                    "draft restored"
                );
                Ok(Some(snapshot.into_state()))
            }
            Ok(snapshot) => {
                warn!(version = snapshot.version, "discarding draft with unknown version");
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "discarding unreadable draft");
                Ok(None)
            }
        }
    }

    /// Read the draft without consuming it.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot store fails or the draft is malformed.
    pub fn peek(&self) -> Result<Option<DraftSnapshot>> {
        self.slots
            .read(DRAFT_KEY)?
            .map(|json| serde_json::from_str(&json).map_err(Into::into))
            .transpose()
    }

    /// Delete the draft, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot store fails.
    pub fn discard(&self) -> Result<()> {
        self.slots.remove(DRAFT_KEY)
    }
}
