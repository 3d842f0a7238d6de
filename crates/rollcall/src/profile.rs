//! Directory profile records.
//!
//! A [`Profile`] is a stored directory row, owned by exactly one identity. A
//! [`ProfileRecord`] is the write payload the submission coordinator assembles
//! from the wizard's form fields.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::form::Semester;
use crate::ports::OwnerId;

/// Role stored for current students.
pub const STUDENT_ROLE: &str = "Student";

/// Company stored for current students.
pub const STUDENT_COMPANY: &str = "Duke University";

/// Prefix of a public LinkedIn profile URL.
pub const LINKEDIN_PROFILE_PREFIX: &str = "https://www.linkedin.com/in/";

/// Separator between semester and two-digit year in a cohort label.
const COHORT_SEPARATOR: &str = " '";

static LINKEDIN_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)(https?://)?(www\.)?linkedin\.com/in/").expect("static regex")
});

/// The profile fields written by an insert or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    /// Full name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Cohort label, e.g. `Fall '24`.
    pub pledge_class: String,
    /// Current role, or the student sentinel.
    pub role: String,
    /// Current company, or the student sentinel.
    pub company: String,
    /// Industry tags.
    pub sphere: Vec<String>,
    /// Where the member is based.
    pub location: String,
    /// Four-digit graduation year.
    pub graduation_year: i32,
    /// Full LinkedIn profile URL.
    pub linkedin_url: Option<String>,
    /// Hosted picture URL.
    pub profile_picture_url: Option<String>,
    /// Major, if given.
    pub major: Option<String>,
    /// Short bio, if given.
    pub bio: Option<String>,
}

/// A stored directory profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Row identifier assigned by the store.
    pub id: String,
    /// Identity that owns this profile.
    pub user_id: OwnerId,
    /// The profile fields.
    #[serde(flatten)]
    pub record: ProfileRecord,
    /// When the row was first inserted.
    pub created_at: DateTime<Utc>,
    /// When the row was last written.
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Two-letter initials used when there is no picture.
    #[must_use]
    pub fn initials(&self) -> String {
        initials(&self.record.name)
    }

    /// One-line summary as shown on a directory card.
    #[must_use]
    pub fn headline(&self) -> String {
        let record = &self.record;
        if record.role == STUDENT_ROLE {
            record.role.clone()
        } else {
            format!("{} @ {}", record.role, record.company)
        }
    }
}

/// Join a semester and two-digit year into a cohort label.
///
/// ```
/// use rollcall::form::Semester;
/// use rollcall::profile::compose_cohort;
///
/// assert_eq!(compose_cohort(Semester::Fall, "24"), "Fall '24");
/// ```
#[must_use]
pub fn compose_cohort(semester: Semester, year: &str) -> String {
    format!("{semester}{COHORT_SEPARATOR}{year}")
}

/// Split a cohort label back into semester and year.
///
/// Unknown semesters come back as `None`; a label without a separator yields
/// an empty year.
#[must_use]
pub fn split_cohort(label: &str) -> (Option<Semester>, String) {
    let (semester, year) = label
        .split_once(COHORT_SEPARATOR)
        .unwrap_or((label, ""));
    (semester.trim().parse().ok(), year.trim().to_string())
}

/// Reduce anything a member pasted into the LinkedIn field to the bare handle.
#[must_use]
pub fn linkedin_handle(input: &str) -> String {
    LINKEDIN_PREFIX
        .replace(input.trim(), "")
        .trim_end_matches('/')
        .to_string()
}

/// Build the public LinkedIn URL for a handle, if there is one.
#[must_use]
pub fn linkedin_url(handle: &str) -> Option<String> {
    let handle = linkedin_handle(handle);
    if handle.is_empty() {
        None
    } else {
        Some(format!("{LINKEDIN_PROFILE_PREFIX}{handle}"))
    }
}

/// Up to two uppercase initials of a name.
#[must_use]
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|part| part.chars().next())
        .flat_map(char::to_uppercase)
        .take(2)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_profile(role: &str, company: &str) -> Profile {
        let now = Utc::now();
        Profile {
            id: "p1".to_string(),
            user_id: OwnerId::new("user-1"),
            record: ProfileRecord {
                name: "Jane Doe".to_string(),
                email: "jane@x.edu".to_string(),
                pledge_class: "Fall '24".to_string(),
                role: role.to_string(),
                company: company.to_string(),
                sphere: vec!["Tech".to_string()],
                location: "Durham, NC".to_string(),
                graduation_year: 2025,
                linkedin_url: None,
                profile_picture_url: None,
                major: None,
                bio: None,
            },
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_compose_cohort() {
        assert_eq!(compose_cohort(Semester::Fall, "24"), "Fall '24");
        assert_eq!(compose_cohort(Semester::Spring, "09"), "Spring '09");
    }

    #[test]
    fn test_split_cohort_reverses_compose() {
        let label = compose_cohort(Semester::Fall, "24");
        assert_eq!(split_cohort(&label), (Some(Semester::Fall), "24".to_string()));
    }

    #[test]
    fn test_split_cohort_without_separator() {
        assert_eq!(split_cohort("Spring"), (Some(Semester::Spring), String::new()));
        assert_eq!(split_cohort(""), (None, String::new()));
    }

    #[test]
    fn test_split_cohort_unknown_semester() {
        assert_eq!(split_cohort("Summer '22"), (None, "22".to_string()));
    }

    #[test]
    fn test_linkedin_handle_strips_prefixes() {
        assert_eq!(linkedin_handle("jane-doe"), "jane-doe");
        assert_eq!(
            linkedin_handle("https://www.linkedin.com/in/jane-doe/"),
            "jane-doe"
        );
        assert_eq!(linkedin_handle("linkedin.com/in/jane.doe"), "jane.doe");
        assert_eq!(linkedin_handle("  "), "");
    }

    #[test]
    fn test_linkedin_url() {
        assert_eq!(
            linkedin_url("jane-doe").as_deref(),
            Some("https://www.linkedin.com/in/jane-doe")
        );
        assert_eq!(linkedin_url(""), None);
    }

    #[test]
    fn test_initials() {
        assert_eq!(initials("Jane Doe"), "JD");
        assert_eq!(initials("jane quincy doe"), "JQ");
        assert_eq!(initials(""), "");
    }

    #[test]
    fn test_headline() {
        assert_eq!(
            sample_profile("Analyst", "Goldman Sachs").headline(),
            "Analyst @ Goldman Sachs"
        );
        assert_eq!(
            sample_profile(STUDENT_ROLE, STUDENT_COMPANY).headline(),
            "Student"
        );
    }

    #[test]
    fn test_profile_serializes_flat() {
        let profile = sample_profile("Analyst", "Goldman Sachs");
        let json = serde_json::to_value(&profile).unwrap();

        assert_eq!(json["pledgeClass"], "Fall '24");
        assert_eq!(json["graduationYear"], 2025);
        assert_eq!(json["user_id"], "user-1");
    }
}
