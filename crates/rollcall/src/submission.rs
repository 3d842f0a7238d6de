//! Submission of a finished wizard.
//!
//! The coordinator turns form fields into a profile write:
//!
//! 1. Resolve the signed-in owner, failing before any side effect if there is
//!    none.
//! 2. Upload a freshly cropped picture under the owner's prefix and resolve
//!    its public URL. Hosted pictures are reused as-is.
//! 3. Probe for the owner's existing profile, then update it or insert a new
//!    one.
//!
//! The steps are not transactional. A failure stops the sequence and is
//! returned unchanged; the caller keeps its state and may retry. Two
//! concurrent submissions for the same owner can both see "no profile" and
//! insert twice.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use crate::crop::data_uri;
use crate::error::{Error, Result};
use crate::form::{FormFields, ImagePayload};
use crate::ports::{
    AnalyticsSink, IdentityProvider, ObjectStore, OwnerId, ProfileStore, UploadOptions,
};
use crate::profile::{self, Profile, ProfileRecord, STUDENT_COMPANY, STUDENT_ROLE};
use crate::sequencer::Step;

/// Whether a submission created or replaced a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitAction {
    /// A new row was inserted.
    Inserted,
    /// The owner's existing row was updated.
    Updated,
}

impl SubmitAction {
    fn event(self) -> &'static str {
        match self {
            Self::Inserted => "profile_created",
            Self::Updated => "profile_updated",
        }
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitOutcome {
    /// The stored profile.
    pub profile: Profile,
    /// What happened to it.
    pub action: SubmitAction,
}

/// Build the profile payload from form fields.
///
/// `picture_url` replaces whatever picture the form holds.
///
/// # Errors
///
/// Returns a validation error if the cohort semester is missing or the
/// graduation year is not a number.
pub fn assemble_record(form: &FormFields, picture_url: Option<String>) -> Result<ProfileRecord> {
    let semester = form
        .cohort_semester
        .ok_or_else(|| Error::validation(Step::Cohort.key(), "Cohort is required"))?;
    let graduation_year = form
        .graduation_year
        .trim()
        .parse::<i32>()
        .map_err(|_| Error::validation(Step::GraduationYear.key(), "Enter a valid year"))?;

    let (role, company) = if form.is_student {
        (STUDENT_ROLE.to_string(), STUDENT_COMPANY.to_string())
    } else {
        (form.role.trim().to_string(), form.company.trim().to_string())
    };

    Ok(ProfileRecord {
        name: form.name.trim().to_string(),
        email: form.email.trim().to_string(),
        pledge_class: profile::compose_cohort(semester, form.cohort_year.trim()),
        role,
        company,
        sphere: form.spheres.iter().cloned().collect(),
        location: form.location.trim().to_string(),
        graduation_year,
        linkedin_url: profile::linkedin_url(&form.linkedin),
        profile_picture_url: picture_url,
        major: non_empty(&form.major),
        bio: non_empty(&form.bio),
    })
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Drives upload and profile write for a finished wizard.
#[derive(Clone)]
pub struct SubmissionCoordinator {
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
    objects: Arc<dyn ObjectStore>,
    analytics: Arc<dyn AnalyticsSink>,
}

impl std::fmt::Debug for SubmissionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionCoordinator").finish_non_exhaustive()
    }
}

impl SubmissionCoordinator {
    /// Create a coordinator over the given collaborators.
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
        objects: Arc<dyn ObjectStore>,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Self {
        Self {
            identity,
            profiles,
            objects,
            analytics,
        }
    }

    /// Submit `form` for the signed-in owner.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAuthenticated`] when nobody is signed in (before any
    /// upload or store call), a validation error if the form cannot be
    /// assembled, or the first collaborator error encountered.
    pub async fn submit(&self, form: &FormFields) -> Result<SubmitOutcome> {
        let session = self
            .identity
            .current_session()
            .await?
            .ok_or(Error::NotAuthenticated)?;
        let owner = session.owner;

        // Assemble first so a bad form never leaves an orphaned upload.
        let mut record = assemble_record(form, None)?;
        record.profile_picture_url = self.resolve_picture(&owner, form).await?;

        let (action, profile) = match self.profiles.select_by_owner(&owner).await? {
            Some(existing) => {
                debug!(owner = %owner, id = %existing.id, "updating existing profile");
                (
                    SubmitAction::Updated,
                    self.profiles.update(&owner, &record).await?,
                )
            }
            None => (
                SubmitAction::Inserted,
                self.profiles.insert(&owner, &record).await?,
            ),
        };

        info!(owner = %owner, id = %profile.id, ?action, "profile submitted");
        self.analytics.capture(
            action.event(),
            json!({ "owner": owner.as_str(), "spheres": record.sphere }),
        );

        Ok(SubmitOutcome { profile, action })
    }

    async fn resolve_picture(&self, owner: &OwnerId, form: &FormFields) -> Result<Option<String>> {
        match &form.cropped_image {
            None => Ok(None),
            Some(ImagePayload::Hosted(url)) => Ok(Some(url.clone())),
            Some(ImagePayload::DataUri(uri)) => {
                let (content_type, bytes) = data_uri::decode(uri)?;
                let path = format!("{owner}/{}.jpg", Utc::now().timestamp_millis());
                let options = UploadOptions {
                    content_type,
                    upsert: true,
                };
                self.objects.upload(&path, &bytes, &options).await?;
                debug!(%path, size = bytes.len(), "picture uploaded");
                Ok(Some(self.objects.public_url(&path)))
            }
        }
    }
}
