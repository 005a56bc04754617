//! Ranking context: per-request facts shared by all candidates.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};

use crate::models::{
    AssignmentRecord, AssignmentState, DocumentSignals, PersonId, ReviewRequest, ReviewWish,
    TeamRoster,
};
use crate::rotation::AvailabilityFilter;
use crate::stats::{workload_by_reviewer, ReviewerWorkload};

/// Everything the ranking signals need besides the roster.
///
/// Built once per request, read by every signal. The as-of instant is
/// carried here so that one ranking pass sees a single `now`.
#[derive(Debug, Clone)]
pub struct RankingContext {
    /// As-of instant.
    pub now: DateTime<Utc>,
    /// The document under review.
    pub doc: DocumentSignals,
    /// Team rotation order, unfiltered (next reviewer first).
    pub rotation: Vec<PersonId>,
    /// Reviewers that completed a review of this document for another request.
    pub reviewed_before: HashSet<PersonId>,
    /// Reviewers wishing to review the document.
    pub wishes: HashSet<PersonId>,
    /// Reviewers holding an active assignment on the document.
    pub active_on_doc: HashSet<PersonId>,
    /// Days left before each reviewer's minimum interval is satisfied.
    pub days_needed: HashMap<PersonId, i64>,
    /// Recent workload by reviewer.
    pub workload: HashMap<PersonId, ReviewerWorkload>,
}

impl RankingContext {
    /// Creates an empty context at `now` for `doc`.
    pub fn at_time(now: DateTime<Utc>, doc: DocumentSignals) -> Self {
        Self {
            now,
            doc,
            rotation: Vec::new(),
            reviewed_before: HashSet::new(),
            wishes: HashSet::new(),
            active_on_doc: HashSet::new(),
            days_needed: HashMap::new(),
            workload: HashMap::new(),
        }
    }

    /// Collects the context for ranking `request` from team data.
    ///
    /// `history` is the team's assignment history; `stats_window_days`
    /// bounds the workload statistics.
    #[allow(clippy::too_many_arguments)]
    pub fn gather(
        request: &ReviewRequest,
        doc: DocumentSignals,
        roster: &TeamRoster,
        history: &[AssignmentRecord],
        wishes: &[ReviewWish],
        rotation: Vec<PersonId>,
        now: DateTime<Utc>,
        stats_window_days: i64,
    ) -> Self {
        let doc_name = doc.name.clone();
        let mut ctx = Self::at_time(now, doc).with_rotation(rotation);

        for record in history.iter().filter(|r| r.team == request.team && r.doc == doc_name) {
            let Some(reviewer) = record.reviewer() else {
                continue;
            };
            let other_request = request.id != Some(record.assignment.request_id);
            if record.state() == AssignmentState::Completed && other_request {
                ctx.reviewed_before.insert(reviewer.to_string());
            }
            if record.state().is_active() {
                ctx.active_on_doc.insert(reviewer.to_string());
            }
        }

        ctx.wishes = wishes
            .iter()
            .filter(|w| w.team == request.team && w.doc == doc_name)
            .map(|w| w.person.clone())
            .collect();

        let filter = AvailabilityFilter::new(roster, history, now);
        for reviewer in &roster.reviewers {
            let days = filter.days_needed(&reviewer.id);
            if days > 0 {
                ctx.days_needed.insert(reviewer.id.clone(), days);
            }
        }

        let since = now.date_naive() - Duration::days(stats_window_days);
        ctx.workload = workload_by_reviewer(history, &request.team, since);
        ctx
    }

    /// Sets the rotation order.
    pub fn with_rotation(mut self, rotation: Vec<PersonId>) -> Self {
        self.rotation = rotation;
        self
    }

    /// Marks a reviewer as having reviewed the document before.
    pub fn with_reviewed_before(mut self, person: impl Into<PersonId>) -> Self {
        self.reviewed_before.insert(person.into());
        self
    }

    /// Records a review wish.
    pub fn with_wish(mut self, person: impl Into<PersonId>) -> Self {
        self.wishes.insert(person.into());
        self
    }

    /// Marks a reviewer as holding an active assignment on the document.
    pub fn with_active_assignment(mut self, person: impl Into<PersonId>) -> Self {
        self.active_on_doc.insert(person.into());
        self
    }

    /// Sets the remaining minimum-interval days of a reviewer.
    pub fn with_days_needed(mut self, person: impl Into<PersonId>, days: i64) -> Self {
        self.days_needed.insert(person.into(), days);
        self
    }

    /// Sets the workload of a reviewer.
    pub fn with_workload(mut self, person: impl Into<PersonId>, workload: ReviewerWorkload) -> Self {
        self.workload.insert(person.into(), workload);
        self
    }

    /// Position of `person` in the rotation; 0 when absent.
    pub fn rotation_index(&self, person: &str) -> usize {
        self.rotation.iter().position(|p| p == person).unwrap_or(0)
    }

    /// Remaining minimum-interval days of `person`.
    pub fn days_needed_for(&self, person: &str) -> i64 {
        self.days_needed.get(person).copied().unwrap_or(0)
    }
}
