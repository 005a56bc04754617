//! Review assignment model.
//!
//! One reviewer's attempt to fulfil a review request. A request may collect
//! several assignments; reassignment adds a new one and leaves the earlier
//! ones untouched.
//!
//! # States
//!
//! ```text
//! assigned ──► accepted ──► completed | part-completed
//!    │             │
//!    └─────────────┴──────► rejected | withdrawn | no-response
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{DocName, PersonId, TeamId};

/// Lifecycle state of a review assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssignmentState {
    /// Assigned, not yet accepted.
    Assigned,
    /// Accepted by the reviewer.
    Accepted,
    /// Review done.
    Completed,
    /// Review partially done.
    PartCompleted,
    /// Declined by the reviewer.
    Rejected,
    /// Withdrawn by the team.
    Withdrawn,
    /// Overtaken by events.
    Overtaken,
    /// Reviewer never responded.
    NoResponse,
}

impl AssignmentState {
    /// Machine name.
    pub fn slug(self) -> &'static str {
        match self {
            Self::Assigned => "assigned",
            Self::Accepted => "accepted",
            Self::Completed => "completed",
            Self::PartCompleted => "part-completed",
            Self::Rejected => "rejected",
            Self::Withdrawn => "withdrawn",
            Self::Overtaken => "overtaken",
            Self::NoResponse => "no-response",
        }
    }

    /// `assigned` or `accepted`.
    #[inline]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Assigned | Self::Accepted)
    }

    /// `completed` or `part-completed`.
    #[inline]
    pub fn is_done(self) -> bool {
        matches!(self, Self::Completed | Self::PartCompleted)
    }

    /// Whether `next` is a legal successor of this state.
    pub fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Assigned, Self::Accepted) => true,
            (Self::Accepted, Self::Completed | Self::PartCompleted) => true,
            (Self::Assigned, Self::Completed | Self::PartCompleted) => true,
            (Self::Assigned | Self::Accepted, Self::Rejected | Self::Withdrawn | Self::NoResponse) => {
                true
            }
            _ => false,
        }
    }
}

impl fmt::Display for AssignmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// A reviewer's assignment to a review request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewAssignment {
    /// Store-assigned id. `None` until saved.
    pub id: Option<u64>,
    /// Owning request.
    pub request_id: u64,
    /// Assigned reviewer. `None` while unassigned.
    pub reviewer: Option<PersonId>,
    /// Current state.
    pub state: AssignmentState,
    /// When the assignment was made.
    pub assigned_on: Option<DateTime<Utc>>,
    /// When the review was completed.
    pub completed_on: Option<DateTime<Utc>>,
    /// Revision actually reviewed.
    pub reviewed_rev: Option<String>,
    /// Review result slug (e.g. `ready-nits`).
    pub result: Option<String>,
}

impl ReviewAssignment {
    /// Creates an unsaved assignment in state `assigned`.
    pub fn new(request_id: u64, reviewer: impl Into<PersonId>, assigned_on: DateTime<Utc>) -> Self {
        Self {
            id: None,
            request_id,
            reviewer: Some(reviewer.into()),
            state: AssignmentState::Assigned,
            assigned_on: Some(assigned_on),
            completed_on: None,
            reviewed_rev: None,
            result: None,
        }
    }

    /// Sets the store id.
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the state.
    pub fn with_state(mut self, state: AssignmentState) -> Self {
        self.state = state;
        self
    }

    /// Records a completion.
    pub fn with_completion(
        mut self,
        completed_on: DateTime<Utc>,
        reviewed_rev: impl Into<String>,
        result: impl Into<String>,
    ) -> Self {
        self.completed_on = Some(completed_on);
        self.reviewed_rev = Some(reviewed_rev.into());
        self.result = Some(result.into());
        self
    }

    /// Whether `person` holds this assignment.
    pub fn is_held_by(&self, person: &str) -> bool {
        self.reviewer.as_deref() == Some(person)
    }
}

/// An assignment joined with the request and document facts that history
/// queries need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    /// The assignment.
    pub assignment: ReviewAssignment,
    /// Team of the owning request.
    pub team: TeamId,
    /// Reviewed document.
    pub doc: DocName,
    /// Page count of the document.
    pub doc_pages: u32,
    /// Request deadline.
    pub deadline: NaiveDate,
    /// When the owning request was made.
    pub request_time: DateTime<Utc>,
}

impl AssignmentRecord {
    /// Reviewer of the underlying assignment.
    pub fn reviewer(&self) -> Option<&str> {
        self.assignment.reviewer.as_deref()
    }

    /// State of the underlying assignment.
    #[inline]
    pub fn state(&self) -> AssignmentState {
        self.assignment.state
    }
}
