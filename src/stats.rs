//! Review workload statistics.
//!
//! Computes per-assignment timings, per-reviewer workload summaries and
//! period aggregates from assignment history.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Open | `assigned` + `accepted` |
//! | Completed | `completed` + `part-completed` |
//! | Not completed | `rejected` + `withdrawn` + `overtaken` + `no-response` |
//! | Late | closed (or still open at `now`) after the end of the deadline day |
//! | Avg closure | mean days from assignment to completion |
//!
//! Counts are either one per assignment or weighted by document pages
//! ([`CountMode`]).

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AssignmentRecord, AssignmentState, PersonId};

const SECONDS_PER_DAY: f64 = 24.0 * 60.0 * 60.0;

/// Elapsed days between two instants, clamped at zero.
///
/// `None` when either end is unknown.
fn positive_days(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Option<f64> {
    let (from, to) = (from?, to?);
    let seconds = (to - from).num_seconds() as f64;
    Some(if seconds > 0.0 { seconds / SECONDS_PER_DAY } else { 0.0 })
}

/// Last instant of a deadline day.
fn end_of_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(23, 59, 59).map(|dt| dt.and_utc())
}

/// Durations derived from one assignment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssignmentTimings {
    /// Days past the deadline (0 when on time).
    pub late_days: Option<f64>,
    /// Days from request to assignment.
    pub request_to_assignment_days: Option<f64>,
    /// Days from assignment to completion.
    pub assignment_to_closure_days: Option<f64>,
    /// Days from request to completion.
    pub request_to_closure_days: Option<f64>,
}

impl AssignmentTimings {
    /// Computes the timings of `record`.
    ///
    /// Open assignments are measured against `now`, so an open assignment
    /// past its deadline counts as late.
    pub fn of(record: &AssignmentRecord, now: DateTime<Utc>) -> Self {
        let a = &record.assignment;
        let closed = if a.state.is_active() {
            Some(now)
        } else {
            a.completed_on
        };
        Self {
            late_days: positive_days(end_of_day(record.deadline), closed),
            request_to_assignment_days: positive_days(Some(record.request_time), a.assigned_on),
            assignment_to_closure_days: positive_days(a.assigned_on, a.completed_on),
            request_to_closure_days: positive_days(Some(record.request_time), a.completed_on),
        }
    }

    /// Whether the assignment ran past its deadline.
    pub fn is_late(&self) -> bool {
        self.late_days.is_some_and(|d| d > 0.0)
    }
}

/// A reviewer's recent workload, as shown next to ranking suggestions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerWorkload {
    /// Open assignments.
    pub open: u32,
    /// Pages of the open assignments.
    pub open_pages: u32,
    /// Assignments that got no response.
    pub no_response: u32,
    /// Partially completed assignments.
    pub part_completed: u32,
    /// Fully completed assignments.
    pub completed: u32,
}

impl ReviewerWorkload {
    /// Adds one assignment.
    pub fn record(&mut self, record: &AssignmentRecord) {
        match record.state() {
            AssignmentState::Assigned | AssignmentState::Accepted => {
                self.open += 1;
                self.open_pages += record.doc_pages;
            }
            AssignmentState::NoResponse => self.no_response += 1,
            AssignmentState::PartCompleted => self.part_completed += 1,
            AssignmentState::Completed => self.completed += 1,
            _ => {}
        }
    }

    /// Explanation clauses, e.g. `currently 2 open, 40 pages, 1 fully completed`.
    ///
    /// Outcome counts are only listed once the reviewer has finished (or
    /// failed to respond to) at least one assignment.
    pub fn describe(&self) -> Option<String> {
        let mut parts = Vec::new();
        if self.open > 0 {
            parts.push(format!("currently {} open, {} pages", self.open, self.open_pages));
        }
        if self.no_response + self.part_completed + self.completed > 0 {
            if self.no_response > 0 {
                parts.push(format!("{} no response", self.no_response));
            }
            if self.part_completed > 0 {
                parts.push(format!("{} partially complete", self.part_completed));
            }
            if self.completed > 0 {
                parts.push(format!("{} fully completed", self.completed));
            }
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// Workload of every reviewer of `team` over requests made on or after `since`.
pub fn workload_by_reviewer(
    history: &[AssignmentRecord],
    team: &str,
    since: NaiveDate,
) -> HashMap<PersonId, ReviewerWorkload> {
    let mut out: HashMap<PersonId, ReviewerWorkload> = HashMap::new();
    for record in history {
        if record.team != team || record.request_time.date_naive() < since {
            continue;
        }
        if let Some(reviewer) = record.reviewer() {
            out.entry(reviewer.to_string()).or_default().record(record);
        }
    }
    out
}

/// How assignments are counted in [`PeriodStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CountMode {
    /// One per assignment.
    #[default]
    Assignments,
    /// Weighted by document pages.
    Pages,
}

/// Selection of history records for a statistics period.
#[derive(Debug, Clone, Default)]
pub struct StatsQuery {
    /// Restrict to these teams (empty = all).
    pub teams: Vec<String>,
    /// Restrict to these reviewers (empty = all).
    pub reviewers: Vec<PersonId>,
    /// Requests made at or after this instant.
    pub from: Option<DateTime<Utc>>,
    /// Requests made at or before this instant.
    pub to: Option<DateTime<Utc>>,
}

impl StatsQuery {
    /// Matches all records.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to a team.
    pub fn with_team(mut self, team: impl Into<String>) -> Self {
        self.teams.push(team.into());
        self
    }

    /// Restricts to a reviewer.
    pub fn with_reviewer(mut self, reviewer: impl Into<PersonId>) -> Self {
        self.reviewers.push(reviewer.into());
        self
    }

    /// Restricts the request time window.
    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    /// Whether `record` falls within the query.
    pub fn matches(&self, record: &AssignmentRecord) -> bool {
        (self.teams.is_empty() || self.teams.contains(&record.team))
            && (self.reviewers.is_empty()
                || record
                    .reviewer()
                    .is_some_and(|r| self.reviewers.iter().any(|q| q == r)))
            && self.from.map_or(true, |from| record.request_time >= from)
            && self.to.map_or(true, |to| record.request_time <= to)
    }
}

/// Aggregated assignment outcomes over a period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodStats {
    /// Count per state.
    pub by_state: BTreeMap<AssignmentState, u64>,
    /// Late count per state.
    pub late_by_state: BTreeMap<AssignmentState, u64>,
    /// Count per review result (completed assignments only).
    pub by_result: BTreeMap<String, u64>,
    /// Open assignments.
    pub open: u64,
    /// Open assignments past their deadline.
    pub open_late: u64,
    /// Open assignments still within their deadline.
    pub open_in_time: u64,
    /// Completed assignments.
    pub completed: u64,
    /// Completed after the deadline.
    pub completed_late: u64,
    /// Completed within the deadline.
    pub completed_in_time: u64,
    /// Rejected, withdrawn, overtaken or unanswered assignments.
    pub not_completed: u64,
    /// Mean days from assignment to completion, if anything was completed.
    pub average_assignment_to_closure_days: Option<f64>,
}

impl PeriodStats {
    /// Aggregates the records selected by `query`.
    pub fn calculate(
        records: &[AssignmentRecord],
        query: &StatsQuery,
        mode: CountMode,
        now: DateTime<Utc>,
    ) -> Self {
        let mut stats = Self::default();
        let mut closure_days_weighted = 0.0;
        let mut closure_weight: u64 = 0;

        for record in records.iter().filter(|r| query.matches(r)) {
            let c = match mode {
                CountMode::Assignments => 1,
                CountMode::Pages => u64::from(record.doc_pages),
            };
            let state = record.state();
            let timings = AssignmentTimings::of(record, now);

            *stats.by_state.entry(state).or_default() += c;
            if timings.is_late() {
                *stats.late_by_state.entry(state).or_default() += c;
            }

            if state.is_done() {
                let result = record.assignment.result.clone().unwrap_or_default();
                *stats.by_result.entry(result).or_default() += c;
                if let Some(days) = timings.assignment_to_closure_days {
                    closure_days_weighted += days * c as f64;
                    closure_weight += c;
                }
            }
        }

        let sum = |map: &BTreeMap<AssignmentState, u64>, states: &[AssignmentState]| -> u64 {
            states.iter().filter_map(|s| map.get(s)).sum()
        };

        use AssignmentState::*;
        stats.open = sum(&stats.by_state, &[Assigned, Accepted]);
        stats.completed = sum(&stats.by_state, &[Completed, PartCompleted]);
        stats.not_completed = sum(&stats.by_state, &[Rejected, Withdrawn, Overtaken, NoResponse]);
        stats.open_late = sum(&stats.late_by_state, &[Assigned, Accepted]);
        stats.open_in_time = stats.open - stats.open_late;
        stats.completed_late = sum(&stats.late_by_state, &[Completed, PartCompleted]);
        stats.completed_in_time = stats.completed - stats.completed_late;
        stats.average_assignment_to_closure_days = if closure_weight == 0 {
            None
        } else {
            Some(closure_days_weighted / closure_weight as f64)
        };

        stats
    }

    /// Fraction of completed assignments delivered on time (1.0 when none).
    pub fn on_time_rate(&self) -> f64 {
        if self.completed == 0 {
            1.0
        } else {
            self.completed_in_time as f64 / self.completed as f64
        }
    }
}
