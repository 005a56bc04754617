//! Review team settings and rotation pointer.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{PersonId, SortKey, TeamId};

/// Kind of review a team performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReviewType {
    /// Early review, requested explicitly.
    #[serde(rename = "early")]
    Early,
    /// Review during IETF last call.
    #[serde(rename = "lc")]
    LastCall,
    /// Review ahead of a decision (telechat) agenda.
    #[serde(rename = "telechat")]
    Telechat,
}

impl ReviewType {
    /// Machine name.
    pub fn slug(self) -> &'static str {
        match self {
            Self::Early => "early",
            Self::LastCall => "lc",
            Self::Telechat => "telechat",
        }
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Early => "Early",
            Self::LastCall => "Last Call",
            Self::Telechat => "Telechat",
        }
    }
}

impl fmt::Display for ReviewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Configuration of a review team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSettings {
    /// Team identifier (acronym).
    pub team: TeamId,
    /// Whether review requests are suggested from document milestones.
    pub autosuggest: bool,
    /// Review types the team handles.
    pub review_types: Vec<ReviewType>,
    /// Review result slugs the team uses.
    pub review_results: Vec<String>,
    /// Secretaries and their reminder preferences.
    pub secretaries: Vec<SecretarySettings>,
}

/// A team secretary's reminder preference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretarySettings {
    /// Secretary.
    pub person: PersonId,
    /// Days before a deadline to be reminded of unfinished assignments.
    pub remind_days_before_deadline: Option<i64>,
}

impl SecretarySettings {
    /// A secretary without reminders.
    pub fn new(person: impl Into<PersonId>) -> Self {
        Self {
            person: person.into(),
            remind_days_before_deadline: None,
        }
    }

    /// Sets the deadline reminder.
    pub fn with_deadline_reminder(mut self, days: i64) -> Self {
        self.remind_days_before_deadline = Some(days);
        self
    }
}

impl TeamSettings {
    /// Creates settings with the usual defaults: autosuggest on, all review types.
    pub fn new(team: impl Into<TeamId>) -> Self {
        Self {
            team: team.into(),
            autosuggest: true,
            review_types: vec![ReviewType::Early, ReviewType::LastCall, ReviewType::Telechat],
            review_results: [
                "not-ready",
                "right-track",
                "almost-ready",
                "ready-issues",
                "ready-nits",
                "ready",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            secretaries: Vec::new(),
        }
    }

    /// Enables or disables autosuggestion.
    pub fn with_autosuggest(mut self, autosuggest: bool) -> Self {
        self.autosuggest = autosuggest;
        self
    }

    /// Replaces the handled review types.
    pub fn with_review_types(mut self, types: Vec<ReviewType>) -> Self {
        self.review_types = types;
        self
    }

    /// Adds a secretary.
    pub fn with_secretary(mut self, secretary: SecretarySettings) -> Self {
        self.secretaries.push(secretary);
        self
    }

    /// Whether `result` is one of the team's review results.
    pub fn uses_result(&self, result: &str) -> bool {
        self.review_results.iter().any(|r| r == result)
    }

    /// Whether the team handles `review_type`.
    pub fn handles(&self, review_type: ReviewType) -> bool {
        self.review_types.contains(&review_type)
    }

    /// Upper-case acronym for event descriptions.
    pub fn display_acronym(&self) -> String {
        self.team.to_uppercase()
    }
}

/// The reviewer considered first the next time a team's rotation is built.
///
/// Keeps the full sort key so the pointer still has a position after the
/// person leaves the team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationPointer {
    /// Team.
    pub team: TeamId,
    /// Next reviewer.
    pub next_reviewer: SortKey,
    /// Incremented on every committed advancement.
    pub version: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_settings_defaults() {
        let s = TeamSettings::new("secdir");
        assert!(s.autosuggest);
        assert!(s.handles(ReviewType::LastCall));
        assert!(s.handles(ReviewType::Telechat));
        assert_eq!(s.review_results.len(), 6);
        assert!(s.uses_result("ready-nits"));
        assert!(!s.uses_result("lgtm"));
        assert!(s.secretaries.is_empty());
        assert_eq!(s.display_acronym(), "SECDIR");
    }

    #[test]
    fn test_review_type_names() {
        assert_eq!(ReviewType::LastCall.slug(), "lc");
        assert_eq!(ReviewType::Telechat.to_string(), "Telechat");

        let json = serde_json::to_string(&ReviewType::LastCall).unwrap();
        assert_eq!(json, "\"lc\"");
    }
}
