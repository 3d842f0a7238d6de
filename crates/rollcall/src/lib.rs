//! `rollcall` - Alumni directory onboarding
//!
//! This library provides the step-by-step wizard members use to join the
//! directory or edit their profile: field validation and step gating, a
//! square picture cropper, resumable drafts, and the submission that writes
//! the profile through pluggable storage and identity collaborators.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod analytics;
pub mod cli;
pub mod config;
pub mod crop;
pub mod directory;
pub mod draft;
pub mod error;
pub mod form;
pub mod gate;
pub mod identity;
pub mod import;
pub mod logging;
pub mod objects;
pub mod ports;
pub mod profile;
pub mod sequencer;
pub mod session;
pub mod storage;
pub mod submission;
pub mod validation;
pub mod wizard;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use crop::{CropPipeline, CropSettings};
pub use directory::DirectoryFilter;
pub use draft::DraftStore;
pub use error::{Error, Result};
pub use form::{Field, FormFields, Semester};
pub use logging::init_logging;
pub use profile::{Profile, ProfileRecord};
pub use sequencer::Step;
pub use storage::SqliteProfileStore;
pub use submission::{SubmitAction, SubmitOutcome};
pub use wizard::{Mode, Services, Visibility, WizardHost, WizardShell};
