//! Persistence abstraction.
//!
//! The engine reads and writes through [`ReviewStore`]; backends decide
//! how the data is kept. [`MemoryStore`] keeps everything in process and
//! is what the tests run against.
//!
//! # Rotation Commits
//!
//! The rotation pointer carries a version. [`ReviewStore::commit_rotation`]
//! writes the new pointer together with every reviewer's updated skip
//! counter, and only if the version is still the one the caller read.
//! A mismatch is reported as [`StoreError::VersionConflict`].

mod memory;

pub use memory::MemoryStore;

use chrono::NaiveDate;
use thiserror::Error;

use crate::lifecycle::LifecycleEvent;
use crate::models::{
    AssignmentRecord, DocumentSignals, PersonId, ReviewAssignment, ReviewRequest, ReviewWish,
    ReviewerSettings, RotationPointer, SortKey, TeamId, TeamRoster, TeamSettings,
};

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors reported by a store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The rotation pointer moved since it was read.
    #[error("rotation version conflict for team {team}: expected {expected}, found {actual}")]
    VersionConflict {
        team: TeamId,
        expected: u64,
        actual: u64,
    },

    /// No such record.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A writer panicked while holding the store lock.
    #[error("store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Create a not-found error.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// A rotation advancement to persist atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationCommit {
    /// Team whose rotation moves.
    pub team: TeamId,
    /// Pointer version the plan was computed from.
    pub expected_version: u64,
    /// New pointer. `None` leaves the pointer in place.
    pub next_reviewer: Option<SortKey>,
    /// Reviewer settings to write in the same step.
    pub settings: Vec<(PersonId, ReviewerSettings)>,
}

/// Storage backend of the review engine.
pub trait ReviewStore: Send + Sync {
    /// All review teams.
    fn teams(&self) -> StoreResult<Vec<TeamSettings>>;

    /// Settings of one team.
    fn team_settings(&self, team: &str) -> StoreResult<TeamSettings>;

    /// Reviewers, their settings and unavailability periods.
    fn roster(&self, team: &str) -> StoreResult<TeamRoster>;

    /// Current rotation pointer, if the team ever advanced.
    fn rotation_pointer(&self, team: &str) -> StoreResult<Option<RotationPointer>>;

    /// Persists a rotation advancement and returns the new version.
    ///
    /// # Errors
    ///
    /// [`StoreError::VersionConflict`] if the pointer version differs
    /// from `commit.expected_version`; nothing is written in that case.
    fn commit_rotation(&self, commit: RotationCommit) -> StoreResult<u64>;

    /// Stores one reviewer's settings.
    fn save_reviewer_settings(
        &self,
        team: &str,
        person: &str,
        settings: ReviewerSettings,
    ) -> StoreResult<()>;

    /// Every assignment of the team's requests, joined with request facts.
    fn assignment_history(&self, team: &str) -> StoreResult<Vec<AssignmentRecord>>;

    /// All requests of a team.
    fn requests(&self, team: &str) -> StoreResult<Vec<ReviewRequest>>;

    /// One request.
    fn request(&self, id: u64) -> StoreResult<ReviewRequest>;

    /// Inserts or updates a request; returns its id.
    fn save_request(&self, request: &ReviewRequest) -> StoreResult<u64>;

    /// One assignment.
    fn assignment(&self, id: u64) -> StoreResult<ReviewAssignment>;

    /// Assignments of a request, oldest first.
    fn assignments_for_request(&self, request_id: u64) -> StoreResult<Vec<ReviewAssignment>>;

    /// Inserts or updates an assignment; returns its id.
    fn save_assignment(&self, assignment: &ReviewAssignment) -> StoreResult<u64>;

    /// Document facts by name.
    fn document(&self, name: &str) -> StoreResult<DocumentSignals>;

    /// Documents currently in IETF last call.
    fn documents_in_last_call(&self) -> StoreResult<Vec<DocumentSignals>>;

    /// Documents with an agenda event for one of `dates`.
    fn documents_on_agenda(&self, dates: &[NaiveDate]) -> StoreResult<Vec<DocumentSignals>>;

    /// Up to `limit` agenda dates on or after `from`, ascending.
    fn upcoming_agenda_dates(&self, from: NaiveDate, limit: usize) -> StoreResult<Vec<NaiveDate>>;

    /// Review wishes registered with a team.
    fn review_wishes(&self, team: &str) -> StoreResult<Vec<ReviewWish>>;

    /// Appends history events.
    fn record_events(&self, events: &[LifecycleEvent]) -> StoreResult<()>;
}
