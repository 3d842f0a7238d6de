//! Directory listing filters.
//!
//! The listing the wizard's host reloads after a submission: free-text
//! search, sphere and location filters, ordered by cohort.

use crate::form::Semester;
use crate::profile::{self, Profile};

/// Filters applied to the directory listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryFilter {
    /// Case-insensitive substring matched against the card text.
    pub search: String,
    /// Keep profiles sharing at least one of these spheres. Empty keeps all.
    pub spheres: Vec<String>,
    /// Keep profiles in one of these locations. Empty keeps all.
    pub locations: Vec<String>,
    /// Oldest cohort first instead of newest.
    pub oldest_first: bool,
}

impl DirectoryFilter {
    /// Whether any filter narrows the listing.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.search.is_empty() || !self.spheres.is_empty() || !self.locations.is_empty()
    }

    /// Whether `profile` passes every filter.
    #[must_use]
    pub fn matches(&self, profile: &Profile) -> bool {
        let record = &profile.record;
        let needle = self.search.to_lowercase();
        let matches_search = needle.is_empty() || {
            let spheres = record.sphere.join(" ");
            let haystack = [
                record.name.as_str(),
                record.role.as_str(),
                record.company.as_str(),
                record.pledge_class.as_str(),
                record.email.as_str(),
                record.location.as_str(),
                spheres.as_str(),
            ]
            .join(" ")
            .to_lowercase();
            haystack.contains(&needle)
        };
        let matches_spheres =
            self.spheres.is_empty() || record.sphere.iter().any(|s| self.spheres.contains(s));
        let matches_locations =
            self.locations.is_empty() || self.locations.contains(&record.location);
        matches_search && matches_spheres && matches_locations
    }

    /// Filter and order `profiles`.
    #[must_use]
    pub fn apply<'a>(&self, profiles: &'a [Profile]) -> Vec<&'a Profile> {
        let mut kept: Vec<_> = profiles.iter().filter(|p| self.matches(p)).collect();
        kept.sort_by_key(|p| cohort_rank(&p.record.pledge_class));
        if !self.oldest_first {
            kept.reverse();
        }
        kept
    }
}

/// Sort key for a cohort label: later years rank higher, and fall follows
/// spring within a year. Unparseable labels rank lowest.
#[must_use]
pub fn cohort_rank(label: &str) -> u32 {
    let (semester, year) = profile::split_cohort(label);
    let (Some(semester), Ok(year)) = (semester, year.parse::<u32>()) else {
        return 0;
    };
    if year > 99 {
        return 0;
    }
    let season = match semester {
        Semester::Spring => 1,
        Semester::Fall => 2,
    };
    (2000 + year) * 10 + season
}
