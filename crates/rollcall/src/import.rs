//! Bulk import of a chapter roster.
//!
//! Rosters are tab-separated spreadsheet exports with a header row. Each row
//! becomes one directory profile; rows without an email, with an unusable
//! graduation year, or whose email is already listed are skipped and reported.
//!
//! Imported rows are owned by a synthetic `import:<email>` identity, so they
//! never collide with a member's own sign-in.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::form::Semester;
use crate::ports::{OwnerId, ProfileStore};
use crate::profile::{self, ProfileRecord, STUDENT_COMPANY, STUDENT_ROLE};

const NAME: &str = "Member Name";
const EMAIL: &str = "Email Address";
const PLEDGE_CLASS: &str = "Pledge Class";
const YEAR: &str = "Year";
const MAJOR: &str = "Field of Study";
const INDUSTRY: &str = "Industry";
const ROLE: &str = "Current Role";
const COMPANY: &str = "Current Employer";

/// Owner prefix given to imported profiles.
pub const IMPORT_OWNER_PREFIX: &str = "import:";

/// One data row of a roster, keyed by header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterRow {
    /// 1-based line number in the source file.
    pub line: usize,
    values: HashMap<String, String>,
}

impl RosterRow {
    /// The trimmed value under `column`, or an empty string.
    #[must_use]
    pub fn get(&self, column: &str) -> &str {
        self.values.get(column).map_or("", String::as_str)
    }
}

/// Split a tab-separated roster into rows keyed by its header line.
///
/// Blank lines are ignored; values are trimmed. Short rows leave the missing
/// columns empty.
#[must_use]
pub fn parse_roster(text: &str) -> Vec<RosterRow> {
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let Some((_, header)) = lines.next() else {
        return Vec::new();
    };
    let headers: Vec<&str> = header.split('\t').map(str::trim).collect();

    lines
        .map(|(index, line)| RosterRow {
            line: index + 1,
            values: headers
                .iter()
                .zip(line.split('\t'))
                .map(|(column, value)| ((*column).to_string(), value.trim().to_string()))
                .collect(),
        })
        .collect()
}

/// Map a free-text industry onto one of the directory's spheres.
#[must_use]
pub fn map_industry(industry: &str) -> &'static str {
    let industry = industry.to_lowercase();
    if industry.is_empty() {
        "Other"
    } else if industry.contains("finance") || industry.contains("bank") {
        "Finance"
    } else if industry.contains("consult") {
        "Consulting"
    } else if ["tech", "software", "engineer", "product"]
        .iter()
        .any(|word| industry.contains(word))
    {
        "Tech"
    } else {
        "Other"
    }
}

/// Expand a roster pledge class such as `F24` into a cohort label.
///
/// Returns an empty label when the semester letter is not `F` or `S`.
#[must_use]
pub fn pledge_class_label(code: &str) -> String {
    let mut chars = code.trim().chars();
    let semester = match chars.next().map(|c| c.to_ascii_uppercase()) {
        Some('F') => Semester::Fall,
        Some('S') => Semester::Spring,
        _ => return String::new(),
    };
    profile::compose_cohort(semester, chars.as_str().trim())
}

/// Why a roster row was not imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The row has no email address.
    MissingEmail,
    /// The graduation year is not a number.
    InvalidYear(String),
    /// The graduation year is later than the import accepts.
    YearTooLate(i32),
    /// A profile with this email is already listed.
    Existing,
    /// The store refused the insert.
    Failed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingEmail => write!(f, "missing email"),
            Self::InvalidYear(year) => write!(f, "invalid graduation year '{year}'"),
            Self::YearTooLate(year) => write!(f, "graduation year {year} is too late"),
            Self::Existing => write!(f, "profile already exists"),
            Self::Failed(message) => write!(f, "insert failed: {message}"),
        }
    }
}

/// A row that was left out, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    /// Line number in the roster.
    pub line: usize,
    /// The row's email, possibly empty.
    pub email: String,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// What an import run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Emails of the profiles inserted, in roster order.
    pub inserted: Vec<String>,
    /// Rows left out.
    pub skipped: Vec<Skipped>,
}

/// Imports roster rows into a [`ProfileStore`].
#[derive(Clone)]
pub struct RosterImport {
    profiles: Arc<dyn ProfileStore>,
    current_year: i32,
    latest_year: i32,
}

impl fmt::Debug for RosterImport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RosterImport")
            .field("current_year", &self.current_year)
            .field("latest_year", &self.latest_year)
            .finish_non_exhaustive()
    }
}

impl RosterImport {
    /// Import into `profiles`. Members graduating in `current_year` or later
    /// are stored as students; only years up to the previous one are
    /// accepted unless [`Self::latest_year`] widens that.
    #[must_use]
    pub fn new(profiles: Arc<dyn ProfileStore>, current_year: i32) -> Self {
        Self {
            profiles,
            current_year,
            latest_year: current_year - 1,
        }
    }

    /// Accept graduation years up to and including `year`.
    #[must_use]
    pub fn latest_year(mut self, year: i32) -> Self {
        self.latest_year = year;
        self
    }

    /// Build the profile for a row.
    ///
    /// # Errors
    ///
    /// Returns the reason the row cannot be imported.
    pub fn record_for(&self, row: &RosterRow) -> std::result::Result<ProfileRecord, SkipReason> {
        let email = row.get(EMAIL);
        if email.is_empty() {
            return Err(SkipReason::MissingEmail);
        }

        let year = row.get(YEAR);
        let graduation_year: i32 = year
            .parse()
            .map_err(|_| SkipReason::InvalidYear(year.to_string()))?;
        if graduation_year > self.latest_year {
            return Err(SkipReason::YearTooLate(graduation_year));
        }

        let (role, company) = if graduation_year >= self.current_year {
            (STUDENT_ROLE.to_string(), STUDENT_COMPANY.to_string())
        } else {
            (row.get(ROLE).to_string(), row.get(COMPANY).to_string())
        };
        let major = row.get(MAJOR);

        Ok(ProfileRecord {
            name: row.get(NAME).to_string(),
            email: email.to_string(),
            pledge_class: pledge_class_label(row.get(PLEDGE_CLASS)),
            role,
            company,
            sphere: vec![map_industry(row.get(INDUSTRY)).to_string()],
            location: String::new(),
            graduation_year,
            linkedin_url: None,
            profile_picture_url: None,
            major: (!major.is_empty()).then(|| major.to_string()),
            bio: None,
        })
    }

    /// Insert every importable row of a tab-separated roster.
    ///
    /// Rows whose email (case-insensitively) is already listed, or appeared
    /// earlier in the same roster, are skipped. A failed insert skips that row
    /// and the import carries on.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the existing profiles cannot be read.
    pub async fn run(&self, roster: &str) -> Result<ImportReport> {
        let mut seen: HashSet<String> = self
            .profiles
            .select_all()
            .await?
            .into_iter()
            .map(|p| p.record.email.to_lowercase())
            .collect();
        debug!(existing = seen.len(), "loaded listed emails");

        let mut report = ImportReport::default();
        for row in parse_roster(roster) {
            let email = row.get(EMAIL).to_string();
            let skip = |reason: SkipReason| Skipped {
                line: row.line,
                email: email.clone(),
                reason,
            };

            let record = match self.record_for(&row) {
                Ok(record) => record,
                Err(reason) => {
                    debug!(line = row.line, %reason, "skipping roster row");
                    report.skipped.push(skip(reason));
                    continue;
                }
            };

            let key = email.to_lowercase();
            if seen.contains(&key) {
                debug!(line = row.line, %email, "skipping existing profile");
                report.skipped.push(skip(SkipReason::Existing));
                continue;
            }

            let owner = OwnerId::new(format!("{IMPORT_OWNER_PREFIX}{key}"));
            match self.profiles.insert(&owner, &record).await {
                Ok(_) => {
                    info!(line = row.line, %email, "imported profile");
                    seen.insert(key);
                    report.inserted.push(email);
                }
                Err(e) => {
                    warn!(line = row.line, %email, error = %e, "failed to import profile");
                    report.skipped.push(skip(SkipReason::Failed(e.to_string())));
                }
            }
        }

        Ok(report)
    }
}
