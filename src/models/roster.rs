//! Team roster: reviewers plus their per-team settings and periods.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{active_periods_for, PersonId, Reviewer, ReviewerSettings, TeamId, UnavailablePeriod};

/// Everything known about a team's reviewers at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRoster {
    /// Team.
    pub team: TeamId,
    /// Current members holding the reviewer role.
    pub reviewers: Vec<Reviewer>,
    /// Stored settings by reviewer. Missing = defaults.
    pub settings: HashMap<PersonId, ReviewerSettings>,
    /// Unavailability periods of the team's reviewers.
    pub unavailable_periods: Vec<UnavailablePeriod>,
}

impl TeamRoster {
    /// Creates an empty roster.
    pub fn new(team: impl Into<TeamId>) -> Self {
        Self {
            team: team.into(),
            ..Default::default()
        }
    }

    /// Adds a reviewer.
    pub fn with_reviewer(mut self, reviewer: Reviewer) -> Self {
        self.reviewers.push(reviewer);
        self
    }

    /// Stores settings for a reviewer.
    pub fn with_settings(mut self, person: impl Into<PersonId>, settings: ReviewerSettings) -> Self {
        self.settings.insert(person.into(), settings);
        self
    }

    /// Adds an unavailability period.
    pub fn with_period(mut self, period: UnavailablePeriod) -> Self {
        self.unavailable_periods.push(period);
        self
    }

    /// Looks up a reviewer by id.
    pub fn reviewer(&self, person: &str) -> Option<&Reviewer> {
        self.reviewers.iter().find(|r| r.id == person)
    }

    /// Stored settings, if any.
    pub fn stored_settings(&self, person: &str) -> Option<&ReviewerSettings> {
        self.settings.get(person)
    }

    /// Effective settings (stored or default).
    pub fn settings_for(&self, person: &str) -> ReviewerSettings {
        self.settings.get(person).cloned().unwrap_or_default()
    }

    /// Skip counter of `person` (0 without stored settings).
    pub fn skip_next(&self, person: &str) -> u32 {
        self.settings.get(person).map_or(0, |s| s.skip_next)
    }

    /// All periods of `person`.
    pub fn periods_for<'a>(&'a self, person: &'a str) -> impl Iterator<Item = &'a UnavailablePeriod> {
        self.unavailable_periods.iter().filter(move |p| p.person == person)
    }

    /// Periods of `person` active on `today`.
    pub fn active_periods_for(
        &self,
        person: &str,
        today: chrono::NaiveDate,
    ) -> Vec<&UnavailablePeriod> {
        active_periods_for(&self.unavailable_periods, person, today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Availability;
    use chrono::NaiveDate;

    #[test]
    fn test_settings_fallback() {
        let roster = TeamRoster::new("secdir")
            .with_reviewer(Reviewer::new("p1", "Ada Lovelace"))
            .with_settings("p1", ReviewerSettings::new().with_skip_next(2));

        assert_eq!(roster.skip_next("p1"), 2);
        assert_eq!(roster.skip_next("p2"), 0);
        assert_eq!(roster.settings_for("p2"), ReviewerSettings::default());
        assert!(roster.stored_settings("p2").is_none());
        assert_eq!(roster.reviewer("p1").map(|r| r.name.as_str()), Some("Ada Lovelace"));
    }

    #[test]
    fn test_periods_for() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let roster = TeamRoster::new("secdir")
            .with_period(UnavailablePeriod::new("p1", "secdir", Availability::Unavailable))
            .with_period(
                UnavailablePeriod::new("p1", "secdir", Availability::CanFinish)
                    .ending(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
            )
            .with_period(UnavailablePeriod::new("p2", "secdir", Availability::Unavailable));

        assert_eq!(roster.periods_for("p1").count(), 2);
        assert_eq!(roster.active_periods_for("p1", today).len(), 1);
    }
}
