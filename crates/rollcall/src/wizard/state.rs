//! In-memory wizard state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::crop::CropView;
use crate::form::FormFields;
use crate::sequencer::Step;

/// Cropper position and visibility.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropUiState {
    /// Horizontal offset from the image centre, in source pixels.
    pub offset_x: f32,
    /// Vertical offset from the image centre, in source pixels.
    pub offset_y: f32,
    /// Zoom factor.
    pub zoom: f32,
    /// Whether the cropper is showing.
    pub open: bool,
}

impl Default for CropUiState {
    fn default() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            zoom: 1.0,
            open: false,
        }
    }
}

impl CropUiState {
    /// The crop window the pipeline should cut.
    #[must_use]
    pub fn view(&self) -> CropView {
        CropView {
            offset_x: self.offset_x,
            offset_y: self.offset_y,
            zoom: self.zoom,
        }
    }

    /// Back to centred, unzoomed and closed.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Everything one wizard instance holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WizardState {
    /// Index into [`STEPS`](crate::sequencer::STEPS).
    pub step_index: usize,
    /// Collected fields.
    pub form: FormFields,
    /// Transient cropper state.
    pub crop: CropUiState,
    /// Inline errors by step.
    pub errors: BTreeMap<Step, String>,
}

impl WizardState {
    /// The current step.
    #[must_use]
    pub fn step(&self) -> Step {
        Step::at(self.step_index)
    }

    /// The error shown on the current step, if any.
    #[must_use]
    pub fn current_error(&self) -> Option<&str> {
        self.errors.get(&self.step()).map(String::as_str)
    }
}
