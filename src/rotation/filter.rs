//! Availability and throttling filter.
//!
//! Drops reviewers that should not be handed new work right now:
//!
//! | Reason | Rule |
//! |--------|------|
//! | Unavailable | active `unavailable` period |
//! | Idle but finishing | active `canfinish` period and no open assignment |
//! | Too frequent | fewer than `min_interval` days since the last assignment |
//!
//! All checks are evaluated at a single instant so that one pass over the
//! rotation sees a consistent picture.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use crate::models::{AssignmentRecord, Availability, PersonId, TeamRoster};

/// Availability view of a team at one instant.
#[derive(Debug, Clone, Copy)]
pub struct AvailabilityFilter<'a> {
    roster: &'a TeamRoster,
    history: &'a [AssignmentRecord],
    now: DateTime<Utc>,
}

impl<'a> AvailabilityFilter<'a> {
    /// Creates a filter over `roster` and the team's assignment `history`.
    pub fn new(roster: &'a TeamRoster, history: &'a [AssignmentRecord], now: DateTime<Utc>) -> Self {
        Self {
            roster,
            history,
            now,
        }
    }

    /// The evaluation day.
    #[inline]
    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }

    /// Whether `person` holds an `assigned` or `accepted` assignment in the team.
    pub fn has_open_work(&self, person: &str) -> bool {
        let team = self.roster.team.as_str();
        self.history
            .iter()
            .any(|r| r.team == team && r.reviewer() == Some(person) && r.state().is_active())
    }

    /// Whether an active period keeps `person` from new work.
    pub fn is_unavailable(&self, person: &str) -> bool {
        let periods = self.roster.active_periods_for(person, self.today());
        if periods.is_empty() {
            return false;
        }
        let fully = periods
            .iter()
            .any(|p| p.availability == Availability::Unavailable);
        fully || !self.has_open_work(person)
    }

    /// Days `person` must still wait to satisfy their minimum interval.
    ///
    /// Zero when no interval is set or the reviewer was never assigned.
    pub fn days_needed(&self, person: &str) -> i64 {
        let Some(min_interval) = self
            .roster
            .stored_settings(person)
            .and_then(|s| s.min_interval_days)
        else {
            return 0;
        };

        let team = self.roster.team.as_str();
        self.history
            .iter()
            .filter(|r| r.team == team && r.reviewer() == Some(person))
            .filter_map(|r| r.assignment.assigned_on)
            .max()
            .map_or(0, |latest| (min_interval - (self.now - latest).num_days()).max(0))
    }

    /// Whether `person` should be passed over for new work.
    pub fn is_blocked(&self, person: &str) -> bool {
        self.is_unavailable(person) || self.days_needed(person) > 0
    }

    /// Keeps the reviewers of `rotation` that can take new work, in order.
    ///
    /// Reviewers in `exempt` are always kept.
    pub fn filter(&self, rotation: &[PersonId], exempt: &[&str]) -> Vec<PersonId> {
        rotation
            .iter()
            .filter(|person| {
                if exempt.contains(&person.as_str()) {
                    return true;
                }
                let blocked = self.is_blocked(person);
                if blocked {
                    debug!(team = %self.roster.team, reviewer = %person, "reviewer skipped in rotation");
                }
                !blocked
            })
            .cloned()
            .collect()
    }
}
