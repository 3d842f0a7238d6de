//! Field rules.
//!
//! Each rule is a predicate over one field's raw text. Patterns are compiled
//! once on first use.

use std::sync::LazyLock;

use regex::Regex;

/// Longest bio the directory card can show.
pub const BIO_MAX_CHARS: usize = 300;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("static regex"));

static COHORT_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{2}$").expect("static regex"));

static GRADUATION_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}$").expect("static regex"));

static LINKEDIN_HANDLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\-._]+$").expect("static regex"));

/// Basic `local@domain.tld` address grammar.
#[must_use]
pub fn is_email(value: &str) -> bool {
    EMAIL.is_match(value)
}

/// Exactly two ASCII digits.
#[must_use]
pub fn is_cohort_year(value: &str) -> bool {
    COHORT_YEAR.is_match(value)
}

/// Exactly four ASCII digits.
#[must_use]
pub fn is_graduation_year(value: &str) -> bool {
    GRADUATION_YEAR.is_match(value)
}

/// A bare LinkedIn handle, or nothing at all.
#[must_use]
pub fn is_linkedin_handle_or_empty(value: &str) -> bool {
    value.is_empty() || LINKEDIN_HANDLE.is_match(value)
}

/// Non-blank after trimming.
#[must_use]
pub fn is_present(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Within the bio length limit, counted in characters.
#[must_use]
pub fn is_bio_length(value: &str) -> bool {
    value.chars().count() <= BIO_MAX_CHARS
}
