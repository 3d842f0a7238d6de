//! Wizard form fields.
//!
//! [`FormFields`] accumulates everything the member types across the wizard.
//! It is plain data: the validator reads it, step handlers mutate it, and the
//! submission coordinator turns it into a [`ProfileRecord`](crate::profile::ProfileRecord).

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::profile::{self, Profile, STUDENT_COMPANY, STUDENT_ROLE};

/// Spheres offered by the wizard.
pub const SPHERE_OPTIONS: [&str; 4] = ["Finance", "Consulting", "Tech", "Other"];

/// Semester a cohort joined in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Semester {
    /// Fall semester.
    Fall,
    /// Spring semester.
    Spring,
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fall => write!(f, "Fall"),
            Self::Spring => write!(f, "Spring"),
        }
    }
}

impl FromStr for Semester {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fall" => Ok(Self::Fall),
            "spring" => Ok(Self::Spring),
            other => Err(Error::validation(
                "cohort",
                format!("Unknown semester '{other}'"),
            )),
        }
    }
}

/// A saved profile picture.
///
/// Serializes as the bare string so drafts and records stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ImagePayload {
    /// A freshly cropped picture that has not been uploaded yet.
    DataUri(String),
    /// A picture already served from the object store.
    Hosted(String),
}

impl ImagePayload {
    /// Whether this payload still has to be uploaded.
    #[must_use]
    pub fn needs_upload(&self) -> bool {
        matches!(self, Self::DataUri(_))
    }

    /// The payload as a string (data URI or URL).
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::DataUri(s) | Self::Hosted(s) => s,
        }
    }
}

impl From<String> for ImagePayload {
    fn from(value: String) -> Self {
        if value.starts_with("data:") {
            Self::DataUri(value)
        } else {
            Self::Hosted(value)
        }
    }
}

impl From<ImagePayload> for String {
    fn from(value: ImagePayload) -> Self {
        match value {
            ImagePayload::DataUri(s) | ImagePayload::Hosted(s) => s,
        }
    }
}

/// An image the member picked and has not cropped yet.
#[derive(Clone, PartialEq, Eq)]
pub struct RawImage {
    /// Original file name.
    pub file_name: String,
    /// Declared MIME type.
    pub mime_type: String,
    /// Encoded file contents.
    pub bytes: Vec<u8>,
}

impl fmt::Debug for RawImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawImage")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Free-text fields a step can edit directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Full name.
    Name,
    /// Email address.
    Email,
    /// Two-digit cohort year.
    CohortYear,
    /// Current role.
    Role,
    /// Current company.
    Company,
    /// City or region.
    Location,
    /// Four-digit graduation year.
    GraduationYear,
    /// LinkedIn handle.
    Linkedin,
    /// Major.
    Major,
    /// Short bio.
    Bio,
}

/// Everything the wizard has collected so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormFields {
    /// Full name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Cohort semester.
    pub cohort_semester: Option<Semester>,
    /// Two-digit cohort year.
    pub cohort_year: String,
    /// Current role.
    pub role: String,
    /// Current company.
    pub company: String,
    /// Whether the member is a current student.
    pub is_student: bool,
    /// Selected industry tags.
    pub spheres: BTreeSet<String>,
    /// City or region.
    pub location: String,
    /// Four-digit graduation year.
    pub graduation_year: String,
    /// LinkedIn handle (not the full URL).
    pub linkedin: String,
    /// Picked image awaiting a crop. Never persisted.
    #[serde(skip)]
    pub raw_image: Option<RawImage>,
    /// The saved, cropped picture.
    pub cropped_image: Option<ImagePayload>,
    /// Major.
    pub major: String,
    /// Short bio.
    pub bio: String,
}

impl FormFields {
    /// Pre-populate the form from an existing profile for editing.
    #[must_use]
    pub fn from_profile(existing: &Profile) -> Self {
        let record = &existing.record;
        let (cohort_semester, cohort_year) = profile::split_cohort(&record.pledge_class);
        Self {
            name: record.name.clone(),
            email: record.email.clone(),
            cohort_semester,
            cohort_year,
            role: record.role.clone(),
            company: record.company.clone(),
            is_student: record.role == STUDENT_ROLE,
            spheres: record.sphere.iter().cloned().collect(),
            location: record.location.clone(),
            graduation_year: record.graduation_year.to_string(),
            linkedin: record
                .linkedin_url
                .as_deref()
                .map(profile::linkedin_handle)
                .unwrap_or_default(),
            raw_image: None,
            cropped_image: record
                .profile_picture_url
                .clone()
                .map(ImagePayload::Hosted),
            major: record.major.clone().unwrap_or_default(),
            bio: record.bio.clone().unwrap_or_default(),
        }
    }

    /// Overwrite a free-text field.
    ///
    /// Role and company edits are ignored while the student flag is set.
    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::Name => self.name = value,
            Field::Email => self.email = value,
            Field::CohortYear => self.cohort_year = value,
            Field::Role if !self.is_student => self.role = value,
            Field::Company if !self.is_student => self.company = value,
            Field::Role | Field::Company => {}
            Field::Location => self.location = value,
            Field::GraduationYear => self.graduation_year = value,
            Field::Linkedin => self.linkedin = value,
            Field::Major => self.major = value,
            Field::Bio => self.bio = value,
        }
    }

    /// Read a free-text field.
    #[must_use]
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Email => &self.email,
            Field::CohortYear => &self.cohort_year,
            Field::Role => &self.role,
            Field::Company => &self.company,
            Field::Location => &self.location,
            Field::GraduationYear => &self.graduation_year,
            Field::Linkedin => &self.linkedin,
            Field::Major => &self.major,
            Field::Bio => &self.bio,
        }
    }

    /// Set or clear the student flag.
    ///
    /// Turning it on pins role and company to the student sentinels; turning it
    /// off clears both so they can be typed again.
    pub fn set_student(&mut self, is_student: bool) {
        self.is_student = is_student;
        if is_student {
            self.role = STUDENT_ROLE.to_string();
            self.company = STUDENT_COMPANY.to_string();
        } else {
            self.role.clear();
            self.company.clear();
        }
    }

    /// Add a sphere if absent, remove it if present. Returns whether it is now
    /// selected.
    pub fn toggle_sphere(&mut self, sphere: &str) -> bool {
        if self.spheres.remove(sphere) {
            false
        } else {
            self.spheres.insert(sphere.to_string());
            true
        }
    }

    /// Cohort label for display, empty until both halves are filled in.
    #[must_use]
    pub fn cohort_label(&self) -> String {
        match self.cohort_semester {
            Some(semester) if !self.cohort_year.is_empty() => {
                profile::compose_cohort(semester, &self.cohort_year)
            }
            _ => String::new(),
        }
    }
}
