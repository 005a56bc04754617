//! Reviewer model.
//!
//! Reviewers are the people holding the reviewer role in a team. Each one
//! has a canonical sort key (surname first) that fixes their place in the
//! team rotation, and optional per-team settings that throttle or filter
//! their assignments.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{DocName, PersonId, TeamId};

/// A person holding the reviewer role in a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reviewer {
    /// Unique person identifier.
    pub id: PersonId,
    /// Full display name.
    pub name: String,
    /// Surname, the primary rotation sort key.
    pub last_name: String,
    /// Contact addresses (first one is primary).
    pub emails: Vec<String>,
    /// Acronyms of working groups this person manages (chair, secretary...).
    ///
    /// Used to derive the default disqualifying pattern.
    pub managed_groups: Vec<String>,
}

/// Canonical ordering key for rotation lists.
///
/// Ordered by surname, then full name, then id, so that the order is total
/// even for namesakes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SortKey {
    /// Surname.
    pub last_name: String,
    /// Full name.
    pub name: String,
    /// Person identifier.
    pub id: PersonId,
}

impl Reviewer {
    /// Creates a reviewer; the surname is taken from the last word of `name`.
    pub fn new(id: impl Into<PersonId>, name: impl Into<String>) -> Self {
        let name = name.into();
        let last_name = name.split_whitespace().last().unwrap_or_default().to_string();
        Self {
            id: id.into(),
            name,
            last_name,
            emails: Vec::new(),
            managed_groups: Vec::new(),
        }
    }

    /// Overrides the surname.
    pub fn with_last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = last_name.into();
        self
    }

    /// Adds a contact address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.emails.push(email.into());
        self
    }

    /// Records a group this person manages.
    pub fn with_managed_group(mut self, acronym: impl Into<String>) -> Self {
        self.managed_groups.push(acronym.into());
        self
    }

    /// The rotation sort key.
    pub fn sort_key(&self) -> SortKey {
        SortKey {
            last_name: self.last_name.clone(),
            name: self.name.clone(),
            id: self.id.clone(),
        }
    }

    /// Primary contact address, if any.
    pub fn primary_email(&self) -> Option<&str> {
        self.emails.first().map(String::as_str)
    }
}

/// Per-team reviewer settings.
///
/// A reviewer without stored settings behaves as [`ReviewerSettings::default`],
/// except that ranking substitutes [`ReviewerSettings::default_filter_re`] for
/// the missing pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerSettings {
    /// Minimum number of days between assignment starts. `None` = unthrottled.
    pub min_interval_days: Option<i64>,
    /// Document names matching this pattern should not be assigned.
    pub filter_re: Option<String>,
    /// How many more times the rotation should pass this reviewer over.
    pub skip_next: u32,
    /// Days before a deadline to send a reminder. `None` = no reminder.
    pub remind_days_before_deadline: Option<i64>,
    /// Period (days) of the open-reviews digest. `None` = no digest.
    pub remind_days_open_reviews: Option<u32>,
    /// Declared expertise in the team's area.
    pub expertise: String,
}

impl ReviewerSettings {
    /// Creates default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum interval in days.
    pub fn with_min_interval(mut self, days: i64) -> Self {
        self.min_interval_days = Some(days);
        self
    }

    /// Sets the disqualifying pattern.
    pub fn with_filter_re(mut self, pattern: impl Into<String>) -> Self {
        self.filter_re = Some(pattern.into());
        self
    }

    /// Sets the skip counter.
    pub fn with_skip_next(mut self, skip_next: u32) -> Self {
        self.skip_next = skip_next;
        self
    }

    /// Sets the deadline reminder lead time.
    pub fn with_deadline_reminder(mut self, days: i64) -> Self {
        self.remind_days_before_deadline = Some(days);
        self
    }

    /// Sets the open-reviews digest period.
    pub fn with_open_reviews_reminder(mut self, days: u32) -> Self {
        self.remind_days_open_reviews = Some(days);
        self
    }

    /// Sets the declared expertise.
    pub fn with_expertise(mut self, expertise: impl Into<String>) -> Self {
        self.expertise = expertise.into();
        self
    }

    /// Compiles the disqualifying pattern.
    ///
    /// Returns `Ok(None)` when no (or an empty) pattern is set.
    pub fn compiled_filter(&self) -> Result<Option<Regex>, regex::Error> {
        match self.filter_re.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(pattern) => Regex::new(pattern).map(Some),
        }
    }

    /// Pattern used for reviewers that never stored settings.
    ///
    /// Matches drafts named after the reviewer, plus working-group drafts of
    /// groups the reviewer manages.
    pub fn default_filter_re(reviewer: &Reviewer) -> String {
        let last_name = regex::escape(&reviewer.last_name.to_lowercase());
        if reviewer.managed_groups.is_empty() {
            return format!("^draft-{last_name}-.*$");
        }
        let groups = reviewer
            .managed_groups
            .iter()
            .map(|g| format!("ietf-{}", regex::escape(g)))
            .collect::<Vec<_>>()
            .join("|");
        format!("^draft-({last_name}|{groups})-.*$")
    }
}

/// A reviewer's standing wish to review a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewWish {
    /// Team the wish applies to.
    pub team: TeamId,
    /// Wishing reviewer.
    pub person: PersonId,
    /// Wished document.
    pub doc: DocName,
    /// When the wish was declared.
    pub time: DateTime<Utc>,
}

impl ReviewWish {
    /// Creates a wish.
    pub fn new(
        team: impl Into<TeamId>,
        person: impl Into<PersonId>,
        doc: impl Into<DocName>,
        time: DateTime<Utc>,
    ) -> Self {
        Self {
            team: team.into(),
            person: person.into(),
            doc: doc.into(),
            time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reviewer_builder() {
        let r = Reviewer::new("p1", "Ada Lovelace")
            .with_email("ada@example.org")
            .with_managed_group("quic");

        assert_eq!(r.last_name, "Lovelace");
        assert_eq!(r.primary_email(), Some("ada@example.org"));
        assert_eq!(r.managed_groups, vec!["quic".to_string()]);
    }

    #[test]
    fn test_sort_key_orders_by_surname_first() {
        let a = Reviewer::new("p1", "Zed Adams").sort_key();
        let b = Reviewer::new("p2", "Amy Brown").sort_key();
        assert!(a < b);

        let c = Reviewer::new("p3", "Amy Brown").sort_key();
        assert!(b < c); // same names, id decides
    }

    #[test]
    fn test_last_name_override() {
        let r = Reviewer::new("p1", "Guido van Rossum").with_last_name("van Rossum");
        assert_eq!(r.sort_key().last_name, "van Rossum");
    }

    #[test]
    fn test_compiled_filter() {
        let s = ReviewerSettings::new().with_filter_re("^draft-foo-");
        let re = s.compiled_filter().unwrap().unwrap();
        assert!(re.is_match("draft-foo-bar"));

        assert!(ReviewerSettings::new().compiled_filter().unwrap().is_none());
        assert!(ReviewerSettings::new()
            .with_filter_re("  ")
            .compiled_filter()
            .unwrap()
            .is_none());
        assert!(ReviewerSettings::new()
            .with_filter_re("draft-(")
            .compiled_filter()
            .is_err());
    }

    #[test]
    fn test_default_filter_re_without_groups() {
        let r = Reviewer::new("p1", "Ada Lovelace");
        let pattern = ReviewerSettings::default_filter_re(&r);
        assert_eq!(pattern, "^draft-lovelace-.*$");

        let re = Regex::new(&pattern).unwrap();
        assert!(re.is_match("draft-lovelace-engines"));
        assert!(!re.is_match("draft-ietf-quic-transport"));
    }

    #[test]
    fn test_default_filter_re_with_groups() {
        let r = Reviewer::new("p1", "Ada Lovelace")
            .with_managed_group("quic")
            .with_managed_group("tls");
        let pattern = ReviewerSettings::default_filter_re(&r);
        assert_eq!(pattern, "^draft-(lovelace|ietf-quic|ietf-tls)-.*$");

        let re = Regex::new(&pattern).unwrap();
        assert!(re.is_match("draft-ietf-tls-esni"));
        assert!(!re.is_match("draft-ietf-httpbis-cache"));
    }
}
