//! Reviewer unavailability periods.
//!
//! A period blocks a reviewer from new assignments for a range of dates.
//!
//! # Date Model
//! Periods are closed date ranges `[start, end]`. A missing start means the
//! period has already started; a missing end means it continues
//! indefinitely.
//!
//! # Modes
//! - [`Availability::Unavailable`]: no new work, outstanding work should be
//!   reassigned.
//! - [`Availability::CanFinish`]: no new work, but follow-ups and outstanding
//!   reviews can still be done.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{PersonId, TeamId};

/// How unavailable a reviewer is during a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Availability {
    /// Can do follow-ups and finish outstanding reviews.
    #[serde(rename = "canfinish")]
    CanFinish,
    /// Completely unavailable.
    #[serde(rename = "unavailable")]
    Unavailable,
}

impl Availability {
    /// Short label.
    pub fn label(self) -> &'static str {
        match self {
            Self::CanFinish => "Can do follow-ups",
            Self::Unavailable => "Completely unavailable",
        }
    }
}

/// Position of a period relative to a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodState {
    /// Starts after the day.
    Future,
    /// Covers the day.
    Active,
    /// Ended before the day.
    Past,
}

impl fmt::Display for PeriodState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Future => write!(f, "future"),
            Self::Active => write!(f, "active"),
            Self::Past => write!(f, "past"),
        }
    }
}

/// A dated window during which a reviewer takes no new assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailablePeriod {
    /// Reviewer.
    pub person: PersonId,
    /// Team.
    pub team: TeamId,
    /// First day (inclusive). `None` = already started.
    pub start_date: Option<NaiveDate>,
    /// Last day (inclusive). `None` = open-ended.
    pub end_date: Option<NaiveDate>,
    /// Availability mode.
    pub availability: Availability,
    /// Free-text reason.
    pub reason: String,
}

impl UnavailablePeriod {
    /// Creates an open-ended period that has already started.
    pub fn new(
        person: impl Into<PersonId>,
        team: impl Into<TeamId>,
        availability: Availability,
    ) -> Self {
        Self {
            person: person.into(),
            team: team.into(),
            start_date: None,
            end_date: None,
            availability,
            reason: String::new(),
        }
    }

    /// Sets the first day.
    pub fn starting(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    /// Sets the last day.
    pub fn ending(mut self, date: NaiveDate) -> Self {
        self.end_date = Some(date);
        self
    }

    /// Sets the reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Classifies the period relative to `today`.
    pub fn state(&self, today: NaiveDate) -> PeriodState {
        if self.start_date.is_some_and(|start| start > today) {
            return PeriodState::Future;
        }
        match self.end_date {
            Some(end) if end < today => PeriodState::Past,
            _ => PeriodState::Active,
        }
    }

    /// Whether the period covers `today`.
    #[inline]
    pub fn is_active(&self, today: NaiveDate) -> bool {
        self.state(today) == PeriodState::Active
    }

    /// Human-readable summary, e.g. `unavailable until 2024-03-01 (Can do follow-ups)`.
    pub fn describe(&self) -> String {
        let until = match self.end_date {
            Some(end) => format!("unavailable until {}", end.format("%Y-%m-%d")),
            None => "unavailable indefinitely".to_string(),
        };
        format!("{} ({})", until, self.availability.label())
    }
}

/// Periods of `person` active on `today`, ordered by end date (open-ended last).
pub fn active_periods_for<'a>(
    periods: &'a [UnavailablePeriod],
    person: &str,
    today: NaiveDate,
) -> Vec<&'a UnavailablePeriod> {
    let mut active: Vec<&UnavailablePeriod> = periods
        .iter()
        .filter(|p| p.person == person && p.is_active(today))
        .collect();
    active.sort_by_key(|p| (p.end_date.is_none(), p.end_date));
    active
}

/// Periods worth listing on an overview: open-ended, or ended no more than
/// `past_days` ago. Ordered by start date, already-started periods first.
pub fn periods_to_list(
    periods: &[UnavailablePeriod],
    today: NaiveDate,
    past_days: i64,
) -> Vec<&UnavailablePeriod> {
    let cutoff = today - chrono::Duration::days(past_days);
    let mut listed: Vec<&UnavailablePeriod> = periods
        .iter()
        .filter(|p| p.end_date.map_or(true, |end| end >= cutoff))
        .collect();
    listed.sort_by_key(|p| p.start_date);
    listed
}
