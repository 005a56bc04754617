//! Roster and settings validation.
//!
//! Checks a team roster before it drives rotation and ranking. Detects:
//! - Empty rosters
//! - Duplicate reviewers
//! - Filter patterns that do not compile
//! - Non-positive minimum intervals and negative reminder offsets
//! - Unavailability periods ending before they start
//! - Periods or settings of people outside the roster
//!
//! None of these stop the engine: rotation and ranking degrade gracefully.
//! Validation exists so that operators see the problems.

use std::collections::HashSet;

use crate::models::TeamRoster;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// The team has no reviewers.
    EmptyRoster,
    /// The same person is listed twice.
    DuplicateReviewer,
    /// A filter pattern does not compile.
    InvalidFilterPattern,
    /// A minimum interval is zero or negative.
    InvalidMinInterval,
    /// A reminder offset is negative.
    InvalidReminder,
    /// A period ends before it starts.
    InvertedPeriod,
    /// Settings or a period belong to someone not on the roster.
    UnknownReviewer,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a team roster.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_roster(roster: &TeamRoster) -> ValidationResult {
    let mut errors = Vec::new();

    if roster.reviewers.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::EmptyRoster,
            format!("Team '{}' has no reviewers", roster.team),
        ));
    }

    let mut ids = HashSet::new();
    for r in &roster.reviewers {
        if !ids.insert(r.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateReviewer,
                format!("Duplicate reviewer: {}", r.id),
            ));
        }
    }

    let mut people: Vec<&String> = roster.settings.keys().collect();
    people.sort();
    for person in people {
        let settings = &roster.settings[person];
        if !ids.contains(person.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownReviewer,
                format!("Settings for '{person}' who is not a reviewer"),
            ));
        }
        if let Err(e) = settings.compiled_filter() {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidFilterPattern,
                format!("Filter pattern of '{person}' does not compile: {e}"),
            ));
        }
        if settings.min_interval_days.is_some_and(|d| d <= 0) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidMinInterval,
                format!("Minimum interval of '{person}' must be positive"),
            ));
        }
        if settings.remind_days_before_deadline.is_some_and(|d| d < 0) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidReminder,
                format!("Deadline reminder of '{person}' must not be negative"),
            ));
        }
    }

    for period in &roster.unavailable_periods {
        if let (Some(start), Some(end)) = (period.start_date, period.end_date) {
            if end < start {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvertedPeriod,
                    format!(
                        "Period of '{}' ends ({end}) before it starts ({start})",
                        period.person
                    ),
                ));
            }
        }
        if !ids.contains(period.person.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownReviewer,
                format!("Period for '{}' who is not a reviewer", period.person),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Availability, Reviewer, ReviewerSettings, UnavailablePeriod};
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn sample_roster() -> TeamRoster {
        TeamRoster::new("secdir")
            .with_reviewer(Reviewer::new("p1", "Ann Abbot"))
            .with_reviewer(Reviewer::new("p2", "Bea Brown"))
            .with_settings("p1", ReviewerSettings::new().with_min_interval(14))
            .with_period(
                UnavailablePeriod::new("p2", "secdir", Availability::CanFinish)
                    .starting(day(1))
                    .ending(day(5)),
            )
    }

    fn kinds(roster: &TeamRoster) -> Vec<ValidationErrorKind> {
        validate_roster(roster)
            .unwrap_err()
            .into_iter()
            .map(|e| e.kind)
            .collect()
    }

    #[test]
    fn test_valid_roster() {
        assert!(validate_roster(&sample_roster()).is_ok());
    }

    #[test]
    fn test_empty_roster() {
        assert_eq!(
            kinds(&TeamRoster::new("secdir")),
            vec![ValidationErrorKind::EmptyRoster]
        );
    }

    #[test]
    fn test_duplicate_reviewer() {
        let roster = sample_roster().with_reviewer(Reviewer::new("p1", "Ann Abbot"));
        assert_eq!(kinds(&roster), vec![ValidationErrorKind::DuplicateReviewer]);
    }

    #[test]
    fn test_bad_settings() {
        let roster = sample_roster().with_settings(
            "p2",
            ReviewerSettings::new()
                .with_filter_re("draft-(")
                .with_min_interval(0)
                .with_deadline_reminder(-1),
        );
        assert_eq!(
            kinds(&roster),
            vec![
                ValidationErrorKind::InvalidFilterPattern,
                ValidationErrorKind::InvalidMinInterval,
                ValidationErrorKind::InvalidReminder,
            ]
        );
    }

    #[test]
    fn test_inverted_period() {
        let roster = sample_roster().with_period(
            UnavailablePeriod::new("p1", "secdir", Availability::Unavailable)
                .starting(day(10))
                .ending(day(3)),
        );
        let errors = validate_roster(&roster).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::InvertedPeriod);
        assert!(errors[0].message.contains("2024-03-03"));
    }

    #[test]
    fn test_multiple_errors() {
        let roster = TeamRoster::new("secdir")
            .with_settings("ghost", ReviewerSettings::new())
            .with_period(UnavailablePeriod::new("ghost", "secdir", Availability::Unavailable));

        let errors = validate_roster(&roster).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors
            .iter()
            .filter(|e| e.kind == ValidationErrorKind::UnknownReviewer)
            .count()
            == 2);
    }
}
