//! Review request model.
//!
//! A review request is the tracked need for a document to be reviewed by a
//! team. It is never deleted: it ends in one of the closed states, and a new
//! request can always be opened later.
//!
//! # States
//!
//! ```text
//! requested ──► assigned ──► completed | part-completed | rejected | withdrawn
//!                            | overtaken | no-response | no-review-document
//!                            | no-review-version
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{DocName, PersonId, ReviewType, TeamId};

/// Lifecycle state of a review request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestState {
    /// Waiting for a reviewer.
    Requested,
    /// At least one reviewer assigned.
    Assigned,
    /// Review completed.
    Completed,
    /// Review partially completed.
    PartCompleted,
    /// Reviewer declined and the request was given up.
    Rejected,
    /// Withdrawn by the requester.
    Withdrawn,
    /// Overtaken by events (e.g. a newer revision).
    Overtaken,
    /// No response from the reviewer.
    NoResponse,
    /// Team will not review this document.
    NoReviewDocument,
    /// Team will not review this version.
    NoReviewVersion,
}

impl RequestState {
    /// States that close a request.
    pub const CLOSED: [RequestState; 8] = [
        Self::Completed,
        Self::PartCompleted,
        Self::Rejected,
        Self::Withdrawn,
        Self::Overtaken,
        Self::NoResponse,
        Self::NoReviewDocument,
        Self::NoReviewVersion,
    ];

    /// Machine name.
    pub fn slug(self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Assigned => "assigned",
            Self::Completed => "completed",
            Self::PartCompleted => "part-completed",
            Self::Rejected => "rejected",
            Self::Withdrawn => "withdrawn",
            Self::Overtaken => "overtaken",
            Self::NoResponse => "no-response",
            Self::NoReviewDocument => "no-review-document",
            Self::NoReviewVersion => "no-review-version",
        }
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Requested => "Requested",
            Self::Assigned => "Assigned",
            Self::Completed => "Completed",
            Self::PartCompleted => "Partially Completed",
            Self::Rejected => "Rejected",
            Self::Withdrawn => "Withdrawn",
            Self::Overtaken => "Overtaken by Events",
            Self::NoResponse => "No Response",
            Self::NoReviewDocument => "Team Will not Review Document",
            Self::NoReviewVersion => "Team Will not Review Version",
        }
    }

    /// `requested` or `assigned`.
    #[inline]
    pub fn is_open(self) -> bool {
        matches!(self, Self::Requested | Self::Assigned)
    }

    /// Any terminal state.
    #[inline]
    pub fn is_closed(self) -> bool {
        !self.is_open()
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// A request for a team to review a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRequest {
    /// Store-assigned id. `None` for unsaved (suggested) requests.
    pub id: Option<u64>,
    /// Document to review.
    pub doc: DocName,
    /// Reviewing team.
    pub team: TeamId,
    /// Kind of review.
    pub review_type: ReviewType,
    /// Review deadline.
    pub deadline: NaiveDate,
    /// Specific revision to review, if any.
    pub requested_rev: Option<String>,
    /// Requester.
    pub requested_by: PersonId,
    /// Requester's comments and instructions.
    pub comment: String,
    /// When the request was made.
    pub time: DateTime<Utc>,
    /// Current state.
    pub state: RequestState,
}

impl ReviewRequest {
    /// Creates an unsaved request in state `requested`.
    pub fn new(
        doc: impl Into<DocName>,
        team: impl Into<TeamId>,
        review_type: ReviewType,
        deadline: NaiveDate,
        requested_by: impl Into<PersonId>,
        time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            doc: doc.into(),
            team: team.into(),
            review_type,
            deadline,
            requested_rev: None,
            requested_by: requested_by.into(),
            comment: String::new(),
            time,
            state: RequestState::Requested,
        }
    }

    /// Sets the store id.
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the requested revision.
    pub fn with_requested_rev(mut self, rev: impl Into<String>) -> Self {
        self.requested_rev = Some(rev.into());
        self
    }

    /// Sets the requester's instructions.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Sets the state.
    pub fn with_state(mut self, state: RequestState) -> Self {
        self.state = state;
        self
    }

    /// Whether the request has been persisted.
    #[inline]
    pub fn is_saved(&self) -> bool {
        self.id.is_some()
    }

    /// Whether the request targets `rev` (or no particular revision).
    pub fn targets_rev(&self, rev: &str) -> bool {
        self.requested_rev.as_deref().map_or(true, |r| r.is_empty() || r == rev)
    }

    /// Revision a completed review must match to cover this request.
    pub fn effective_rev<'a>(&'a self, current_rev: &'a str) -> &'a str {
        match self.requested_rev.as_deref() {
            Some(rev) if !rev.is_empty() => rev,
            _ => current_rev,
        }
    }
}
