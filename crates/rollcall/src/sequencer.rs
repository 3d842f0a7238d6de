//! Step ordering and forward gating.
//!
//! The wizard walks a fixed sequence of steps. Moving forward out of a gated
//! step requires the validator to accept the current form; moving back is
//! always allowed. There is no way to jump, so review is only reachable after
//! every gated step has been passed in order.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::validation;
use crate::wizard::WizardState;

/// One page of the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Step {
    /// Greeting.
    Welcome,
    /// Name and email.
    Identity,
    /// Cohort semester and year.
    Cohort,
    /// Role and company, or the student flag.
    Professional,
    /// Industry tags.
    Sphere,
    /// Where the member lives.
    Location,
    /// Graduation year.
    GraduationYear,
    /// LinkedIn handle.
    Linkedin,
    /// Picture upload and crop.
    ProfilePicture,
    /// Major.
    Major,
    /// Short bio.
    Bio,
    /// Summary and submit.
    Review,
}

/// Every step, in order.
pub const STEPS: [Step; 12] = [
    Step::Welcome,
    Step::Identity,
    Step::Cohort,
    Step::Professional,
    Step::Sphere,
    Step::Location,
    Step::GraduationYear,
    Step::Linkedin,
    Step::ProfilePicture,
    Step::Major,
    Step::Bio,
    Step::Review,
];

/// Index of the last step.
pub const LAST_INDEX: usize = STEPS.len() - 1;

impl Step {
    /// The step at `index`, clamped to the sequence.
    #[must_use]
    pub fn at(index: usize) -> Self {
        STEPS[index.min(LAST_INDEX)]
    }

    /// Stable key used in error maps and logs.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::Identity => "identity",
            Self::Cohort => "cohort",
            Self::Professional => "professional",
            Self::Sphere => "sphere",
            Self::Location => "location",
            Self::GraduationYear => "graduationYear",
            Self::Linkedin => "linkedin",
            Self::ProfilePicture => "profilePicture",
            Self::Major => "major",
            Self::Bio => "bio",
            Self::Review => "review",
        }
    }

    /// Question shown at the top of the step.
    #[must_use]
    pub fn prompt(self) -> &'static str {
        match self {
            Self::Welcome => "Welcome! Let's get you into the directory.",
            Self::Identity => "What's your full name and email?",
            Self::Cohort => "Which cohort were you part of?",
            Self::Professional => {
                "Where do you work, and what's your role? (Or select 'Current Student')"
            }
            Self::Sphere => "What industries or spheres are you in? (Select all that apply)",
            Self::Location => "Where are you based now?",
            Self::GraduationYear => "What year did you graduate?",
            Self::Linkedin => "What's your LinkedIn handle? (or paste your profile URL)",
            Self::ProfilePicture => "Upload a profile picture (crop to fit)",
            Self::Major => "What was your major? (optional)",
            Self::Bio => "Add a short bio (optional)",
            Self::Review => "Review your info and join the directory!",
        }
    }

    /// Whether leaving this step forward requires the validator's approval.
    #[must_use]
    pub fn is_gated(self) -> bool {
        matches!(
            self,
            Self::Identity
                | Self::Cohort
                | Self::Professional
                | Self::Sphere
                | Self::Location
                | Self::GraduationYear
                | Self::Linkedin
                | Self::Bio
        )
    }

    /// Whether the member may leave this step's fields empty.
    #[must_use]
    pub fn is_optional(self) -> bool {
        matches!(
            self,
            Self::Linkedin | Self::ProfilePicture | Self::Major | Self::Bio
        )
    }

    /// Whether this is the terminal step.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == Self::Review
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Move forward one step.
///
/// A gated step whose fields fail validation stays put; the failure is
/// recorded in `state.errors` and returned. On success the error map is
/// cleared. At review the index does not move.
///
/// # Errors
///
/// Returns [`Error::Validation`] when the current step is gated and invalid.
pub fn next(state: &mut WizardState) -> Result<Step> {
    let step = state.step();
    if step.is_gated() {
        if let Some(message) = validation::validate(step, &state.form).message {
            debug!(step = %step, %message, "next refused");
            state.errors.insert(step, message.clone());
            return Err(Error::validation(step.key(), message));
        }
    }

    state.step_index = (state.step_index + 1).min(LAST_INDEX);
    state.errors.clear();
    let now = state.step();
    debug!(from = %step, to = %now, "advanced");
    Ok(now)
}

/// Move back one step. Never validates.
pub fn back(state: &mut WizardState) -> Step {
    state.step_index = state.step_index.saturating_sub(1);
    state.errors.clear();
    state.step()
}

/// Progress as `(current index, last index)`.
#[must_use]
pub fn progress(state: &WizardState) -> (usize, usize) {
    (state.step_index.min(LAST_INDEX), LAST_INDEX)
}
