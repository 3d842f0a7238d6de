//! Per-step validation of wizard form fields.
//!
//! [`validate`] is a pure function of a step and the current form. It has no
//! side effects, so the wizard can call it on every keystroke for inline hints
//! and again when the member presses next.
//!
//! # Example
//!
//! ```
//! use rollcall::form::{Field, FormFields};
//! use rollcall::sequencer::Step;
//! use rollcall::validation::validate;
//!
//! let mut form = FormFields::default();
//! assert!(!validate(Step::Identity, &form).valid);
//!
//! form.set(Field::Name, "Jane Doe");
//! form.set(Field::Email, "jane@x.edu");
//! assert!(validate(Step::Identity, &form).valid);
//! ```

pub mod rules;

use crate::form::FormFields;
use crate::profile;
use crate::sequencer::{Step, STEPS};

/// Outcome of validating one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    /// Whether the step's fields are acceptable.
    pub valid: bool,
    /// Why not, when they are not.
    pub message: Option<String>,
}

impl Validation {
    fn pass() -> Self {
        Self {
            valid: true,
            message: None,
        }
    }

    fn fail(message: &str) -> Self {
        Self {
            valid: false,
            message: Some(message.to_string()),
        }
    }
}

/// Check the fields a step is responsible for.
#[must_use]
pub fn validate(step: Step, form: &FormFields) -> Validation {
    match step {
        Step::Identity => {
            if !rules::is_present(&form.name) {
                Validation::fail("Name is required")
            } else if !rules::is_email(&form.email) {
                Validation::fail("Enter a valid email")
            } else {
                Validation::pass()
            }
        }
        Step::Cohort => {
            if form.cohort_semester.is_none() {
                Validation::fail("Cohort is required")
            } else if !rules::is_cohort_year(&form.cohort_year) {
                Validation::fail("Enter the two-digit cohort year")
            } else {
                Validation::pass()
            }
        }
        Step::Professional => {
            if form.is_student || (rules::is_present(&form.role) && rules::is_present(&form.company))
            {
                Validation::pass()
            } else {
                Validation::fail("Role and company required, or select student")
            }
        }
        Step::Sphere if form.spheres.is_empty() => Validation::fail("Select at least one sphere"),
        Step::Location if !rules::is_present(&form.location) => {
            Validation::fail("Location required")
        }
        Step::GraduationYear if !rules::is_graduation_year(&form.graduation_year) => {
            Validation::fail("Enter a valid year")
        }
        Step::Linkedin
            if !rules::is_linkedin_handle_or_empty(&profile::linkedin_handle(&form.linkedin)) =>
        {
            Validation::fail("Enter just your LinkedIn handle")
        }
        Step::Bio if !rules::is_bio_length(&form.bio) => {
            Validation::fail("Bio must be 300 characters or fewer")
        }
        _ => Validation::pass(),
    }
}

/// The first gated step, in wizard order, whose fields are invalid.
#[must_use]
pub fn first_failure(form: &FormFields) -> Option<(Step, String)> {
    STEPS
        .iter()
        .copied()
        .filter(|step| step.is_gated())
        .find_map(|step| validate(step, form).message.map(|m| (step, m)))
}
