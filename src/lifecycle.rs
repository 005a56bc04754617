//! Review request and assignment state machine.
//!
//! Pure transition functions: each one mutates the in-memory request or
//! assignment, and reports the history events to persist. Nothing here
//! touches the store or the rotation; [`crate::engine::ReviewEngine`]
//! sequences these with persistence and rotation advancement.
//!
//! # Request
//!
//! ```text
//! requested ──► assigned ──► <closed state>
//!     ▲                            │
//!     └──────── reopened ◄─────────┘   (on reassignment)
//! ```
//!
//! # Assignment
//!
//! See [`AssignmentState::can_transition_to`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ReviewError, ReviewResult};
use crate::models::{
    AssignmentState, DocName, PersonId, RequestState, ReviewAssignment, ReviewRequest,
};

/// Kind of history event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A reviewer was assigned to the request.
    AssignedReviewRequest,
    /// A closed request was reopened for reassignment.
    ReopenedReviewRequest,
    /// The request was closed.
    ClosedReviewRequest,
    /// An assignment changed state.
    ClosedReviewAssignment,
    /// The reviewer accepted the assignment.
    AcceptedReviewAssignment,
    /// A review was (partially) completed.
    CompletedReviewAssignment,
}

/// A history entry produced by a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Event kind.
    pub kind: EventKind,
    /// Document of the request.
    pub doc: DocName,
    /// Request concerned. `None` for unsaved requests.
    pub request_id: Option<u64>,
    /// Assignment concerned, if any.
    pub assignment_id: Option<u64>,
    /// Acting person.
    pub by: PersonId,
    /// Human-readable description.
    pub description: String,
    /// State slug after the transition.
    pub state: String,
    /// When it happened.
    pub time: DateTime<Utc>,
}

impl LifecycleEvent {
    fn for_request(
        kind: EventKind,
        request: &ReviewRequest,
        actor: &Actor<'_>,
        description: String,
    ) -> Self {
        Self {
            kind,
            doc: request.doc.clone(),
            request_id: request.id,
            assignment_id: None,
            by: actor.by.to_string(),
            description,
            state: request.state.slug().to_string(),
            time: actor.now,
        }
    }

    fn for_assignment(
        kind: EventKind,
        request: &ReviewRequest,
        assignment: &ReviewAssignment,
        actor: &Actor<'_>,
        description: String,
    ) -> Self {
        Self {
            kind,
            doc: request.doc.clone(),
            request_id: request.id,
            assignment_id: assignment.id,
            by: actor.by.to_string(),
            description,
            state: assignment.state.slug().to_string(),
            time: actor.now,
        }
    }
}

/// Outcome of a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition<T> {
    /// The change was made.
    Applied {
        /// Result of the change.
        value: T,
        /// History entries to persist.
        events: Vec<LifecycleEvent>,
    },
    /// Nothing to do: the target state already holds.
    AlreadyInState,
}

impl<T> Transition<T> {
    /// Whether the change was made.
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// The result, if applied.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Applied { value, .. } => Some(value),
            Self::AlreadyInState => None,
        }
    }

    /// The history entries (empty when nothing changed).
    pub fn events(&self) -> &[LifecycleEvent] {
        match self {
            Self::Applied { events, .. } => events,
            Self::AlreadyInState => &[],
        }
    }
}

/// Who acts, when, and how the team and reviewer are named in descriptions.
#[derive(Debug, Clone, Copy)]
pub struct Actor<'a> {
    /// Acting person.
    pub by: &'a str,
    /// Team acronym, upper-cased in descriptions.
    pub team_acronym: &'a str,
    /// As-of instant.
    pub now: DateTime<Utc>,
}

impl<'a> Actor<'a> {
    /// Creates an actor.
    pub fn new(by: &'a str, team_acronym: &'a str, now: DateTime<Utc>) -> Self {
        Self {
            by,
            team_acronym,
            now,
        }
    }

    fn team(&self) -> String {
        self.team_acronym.to_uppercase()
    }
}

/// Assigns `reviewer` (display name `reviewer_name`) to `request`.
///
/// A reviewer already holding an active assignment on the request is a
/// no-op. A closed request is reopened first. Existing assignments are
/// never modified; the returned assignment is new and unsaved.
pub fn assign_reviewer(
    request: &mut ReviewRequest,
    assignments: &[ReviewAssignment],
    reviewer: &str,
    reviewer_name: &str,
    actor: &Actor<'_>,
) -> Transition<ReviewAssignment> {
    let already_active = assignments
        .iter()
        .any(|a| a.request_id_matches(request) && a.is_held_by(reviewer) && a.state.is_active());
    if already_active {
        return Transition::AlreadyInState;
    }

    let mut events = Vec::new();

    if request.state.is_closed() {
        let previous = request.state;
        request.state = RequestState::Requested;
        events.push(LifecycleEvent::for_request(
            EventKind::ReopenedReviewRequest,
            request,
            actor,
            format!(
                "Reopened request for {} review by {} (was '{}')",
                request.review_type.name(),
                actor.team(),
                previous.name()
            ),
        ));
    }

    request.state = RequestState::Assigned;

    let assignment = ReviewAssignment::new(request.id.unwrap_or_default(), reviewer, actor.now);

    events.push(LifecycleEvent::for_assignment(
        EventKind::AssignedReviewRequest,
        request,
        &assignment,
        actor,
        format!(
            "Request for {} review by {} is assigned to {}",
            request.review_type.name(),
            actor.team(),
            reviewer_name
        ),
    ));

    Transition::Applied {
        value: assignment,
        events,
    }
}

/// Closes `request` with `state`, withdrawing its active assignments.
///
/// Unsaved (suggested) requests only change state.
///
/// # Errors
///
/// [`ReviewError::InvalidTransition`] if `state` is not a closed state.
pub fn close_request(
    request: &mut ReviewRequest,
    assignments: &mut [ReviewAssignment],
    state: RequestState,
    reviewer_names: &dyn Fn(&str) -> String,
    actor: &Actor<'_>,
) -> ReviewResult<Transition<Vec<u64>>> {
    if state.is_open() {
        return Err(ReviewError::invalid_transition("request", request.state, state));
    }
    if request.state.is_closed() {
        return Ok(Transition::AlreadyInState);
    }

    request.state = state;
    if !request.is_saved() {
        return Ok(Transition::Applied {
            value: Vec::new(),
            events: Vec::new(),
        });
    }

    let mut events = vec![LifecycleEvent::for_request(
        EventKind::ClosedReviewRequest,
        request,
        actor,
        format!(
            "Closed request for {} review by {} with state '{}'",
            request.review_type.name(),
            actor.team(),
            state.name()
        ),
    )];

    let mut withdrawn = Vec::new();
    for assignment in assignments
        .iter_mut()
        .filter(|a| a.request_id_matches(request) && a.state.is_active())
    {
        assignment.state = AssignmentState::Withdrawn;
        withdrawn.extend(assignment.id);
        let name = assignment
            .reviewer
            .as_deref()
            .map(reviewer_names)
            .unwrap_or_else(|| "(None)".to_string());
        events.push(LifecycleEvent::for_assignment(
            EventKind::ClosedReviewAssignment,
            request,
            assignment,
            actor,
            format!(
                "Request closed, assignment withdrawn: {} {} {} review",
                name,
                request.review_type.name(),
                actor.team()
            ),
        ));
    }

    Ok(Transition::Applied {
        value: withdrawn,
        events,
    })
}

/// Moves `assignment` to `next` along the assignment graph.
///
/// Completion goes through [`complete_assignment`], which also records the
/// result.
///
/// # Errors
///
/// [`ReviewError::InvalidTransition`] if the graph has no such edge.
pub fn transition_assignment(
    request: &ReviewRequest,
    assignment: &mut ReviewAssignment,
    next: AssignmentState,
    reviewer_name: &str,
    actor: &Actor<'_>,
) -> ReviewResult<Transition<()>> {
    if assignment.state == next {
        return Ok(Transition::AlreadyInState);
    }
    if next.is_done() || !assignment.state.can_transition_to(next) {
        return Err(ReviewError::invalid_transition(
            "assignment",
            assignment.state,
            next,
        ));
    }

    assignment.state = next;
    let (kind, verb) = match next {
        AssignmentState::Accepted => (EventKind::AcceptedReviewAssignment, "accepted"),
        AssignmentState::Rejected => (EventKind::ClosedReviewAssignment, "rejected"),
        AssignmentState::Withdrawn => (EventKind::ClosedReviewAssignment, "withdrawn"),
        _ => (EventKind::ClosedReviewAssignment, "marked as no response"),
    };
    let event = LifecycleEvent::for_assignment(
        kind,
        request,
        assignment,
        actor,
        format!(
            "Assignment of request for {} review by {} to {} was {}",
            request.review_type.name(),
            actor.team(),
            reviewer_name,
            verb
        ),
    );

    Ok(Transition::Applied {
        value: (),
        events: vec![event],
    })
}

/// Details of a finished review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// Review result slug.
    pub result: String,
    /// Revision that was reviewed.
    pub reviewed_rev: String,
    /// Whether only part of the review was done.
    pub partial: bool,
}

impl Completion {
    /// A full completion.
    pub fn new(result: impl Into<String>, reviewed_rev: impl Into<String>) -> Self {
        Self {
            result: result.into(),
            reviewed_rev: reviewed_rev.into(),
            partial: false,
        }
    }

    /// Marks the completion as partial.
    pub fn partial(mut self) -> Self {
        self.partial = true;
        self
    }
}

/// Completes `assignment`. The request state is left unchanged.
///
/// # Errors
///
/// [`ReviewError::InvalidTransition`] unless the assignment is active.
pub fn complete_assignment(
    request: &ReviewRequest,
    assignment: &mut ReviewAssignment,
    completion: &Completion,
    reviewer_name: &str,
    actor: &Actor<'_>,
) -> ReviewResult<Transition<()>> {
    let next = if completion.partial {
        AssignmentState::PartCompleted
    } else {
        AssignmentState::Completed
    };
    if assignment.state == next {
        return Ok(Transition::AlreadyInState);
    }
    if !assignment.state.can_transition_to(next) {
        return Err(ReviewError::invalid_transition(
            "assignment",
            assignment.state,
            next,
        ));
    }

    assignment.state = next;
    assignment.completed_on = Some(actor.now);
    assignment.reviewed_rev = Some(completion.reviewed_rev.clone());
    assignment.result = Some(completion.result.clone());

    let how = if completion.partial {
        "partially completed"
    } else {
        "completed"
    };
    let event = LifecycleEvent::for_assignment(
        EventKind::CompletedReviewAssignment,
        request,
        assignment,
        actor,
        format!(
            "Request for {} review by {} is {}: {}. Reviewer: {}.",
            request.review_type.name(),
            actor.team(),
            how,
            completion.result,
            reviewer_name
        ),
    );

    Ok(Transition::Applied {
        value: (),
        events: vec![event],
    })
}

impl ReviewAssignment {
    fn request_id_matches(&self, request: &ReviewRequest) -> bool {
        request.id.map_or(true, |id| id == self.request_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReviewType;
    use chrono::{NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    fn actor() -> Actor<'static> {
        Actor::new("secretary", "secdir", now())
    }

    fn request() -> ReviewRequest {
        ReviewRequest::new(
            "draft-a",
            "secdir",
            ReviewType::LastCall,
            NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(),
            "p9",
            now(),
        )
        .with_id(1)
    }

    fn names(id: &str) -> String {
        format!("Reviewer {id}")
    }

    #[test]
    fn test_assign_requested() {
        let mut req = request();
        let t = assign_reviewer(&mut req, &[], "p1", "Ann Abbot", &actor());

        assert_eq!(req.state, RequestState::Assigned);
        let a = t.value().unwrap();
        assert_eq!(a.request_id, 1);
        assert_eq!(a.state, AssignmentState::Assigned);
        assert_eq!(a.assigned_on, Some(now()));
        assert_eq!(t.events().len(), 1);
        assert_eq!(
            t.events()[0].description,
            "Request for Last Call review by SECDIR is assigned to Ann Abbot"
        );
    }

    #[test]
    fn test_assign_same_reviewer_twice_is_noop() {
        let mut req = request().with_state(RequestState::Assigned);
        let existing = vec![ReviewAssignment::new(1, "p1", now()).with_id(10)];
        let t = assign_reviewer(&mut req, &existing, "p1", "Ann Abbot", &actor());
        assert_eq!(t, Transition::AlreadyInState);
    }

    #[test]
    fn test_assign_after_rejection_creates_new_assignment() {
        let mut req = request().with_state(RequestState::Assigned);
        let existing = vec![ReviewAssignment::new(1, "p1", now())
            .with_id(10)
            .with_state(AssignmentState::Rejected)];
        let t = assign_reviewer(&mut req, &existing, "p1", "Ann Abbot", &actor());
        assert!(t.is_applied());
        assert_eq!(existing[0].state, AssignmentState::Rejected);
    }

    #[test]
    fn test_assign_reopens_closed_request() {
        let mut req = request().with_state(RequestState::Overtaken);
        let t = assign_reviewer(&mut req, &[], "p2", "Bea Brown", &actor());

        assert_eq!(req.state, RequestState::Assigned);
        let kinds: Vec<EventKind> = t.events().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![EventKind::ReopenedReviewRequest, EventKind::AssignedReviewRequest]
        );
        assert_eq!(t.events()[0].state, "requested");
    }

    #[test]
    fn test_close_withdraws_only_open_assignments() {
        let mut req = request().with_state(RequestState::Assigned);
        let mut assignments = vec![
            ReviewAssignment::new(1, "p1", now()).with_id(10),
            ReviewAssignment::new(1, "p2", now())
                .with_id(11)
                .with_state(AssignmentState::Accepted),
            ReviewAssignment::new(1, "p3", now())
                .with_id(12)
                .with_state(AssignmentState::Completed),
            ReviewAssignment::new(1, "p4", now())
                .with_id(13)
                .with_state(AssignmentState::Rejected),
        ];

        let t = close_request(&mut req, &mut assignments, RequestState::Withdrawn, &names, &actor())
            .unwrap();

        assert_eq!(req.state, RequestState::Withdrawn);
        assert_eq!(t.value(), Some(&vec![10, 11]));
        let states: Vec<AssignmentState> = assignments.iter().map(|a| a.state).collect();
        assert_eq!(
            states,
            vec![
                AssignmentState::Withdrawn,
                AssignmentState::Withdrawn,
                AssignmentState::Completed,
                AssignmentState::Rejected,
            ]
        );
        assert_eq!(t.events().len(), 3);
        assert_eq!(
            t.events()[0].description,
            "Closed request for Last Call review by SECDIR with state 'Withdrawn'"
        );
        assert_eq!(
            t.events()[1].description,
            "Request closed, assignment withdrawn: Reviewer p1 Last Call SECDIR review"
        );
    }

    #[test]
    fn test_close_already_closed() {
        let mut req = request().with_state(RequestState::Completed);
        let t = close_request(&mut req, &mut [], RequestState::Withdrawn, &names, &actor()).unwrap();
        assert_eq!(t, Transition::AlreadyInState);
        assert_eq!(req.state, RequestState::Completed);
    }

    #[test]
    fn test_close_to_open_state_rejected() {
        let mut req = request();
        let err = close_request(&mut req, &mut [], RequestState::Assigned, &names, &actor()).unwrap_err();
        assert!(matches!(err, ReviewError::InvalidTransition { .. }));
    }

    #[test]
    fn test_close_unsaved_request_has_no_events() {
        let mut req = request();
        req.id = None;
        let t = close_request(&mut req, &mut [], RequestState::NoReviewDocument, &names, &actor())
            .unwrap();
        assert!(t.is_applied());
        assert!(t.events().is_empty());
        assert_eq!(req.state, RequestState::NoReviewDocument);
    }

    #[test]
    fn test_assignment_transitions() {
        let req = request();
        let mut a = ReviewAssignment::new(1, "p1", now()).with_id(10);

        let t = transition_assignment(&req, &mut a, AssignmentState::Accepted, "Ann Abbot", &actor())
            .unwrap();
        assert!(t.is_applied());
        assert_eq!(
            t.events()[0].description,
            "Assignment of request for Last Call review by SECDIR to Ann Abbot was accepted"
        );

        let again = transition_assignment(&req, &mut a, AssignmentState::Accepted, "Ann Abbot", &actor())
            .unwrap();
        assert_eq!(again, Transition::AlreadyInState);

        let err = transition_assignment(&req, &mut a, AssignmentState::Assigned, "Ann Abbot", &actor())
            .unwrap_err();
        assert!(matches!(err, ReviewError::InvalidTransition { .. }));
    }

    #[test]
    fn test_complete_assignment_leaves_request_state() {
        let req = request().with_state(RequestState::Assigned);
        let mut a = ReviewAssignment::new(1, "p1", now()).with_id(10);

        let t = complete_assignment(
            &req,
            &mut a,
            &Completion::new("ready-nits", "03"),
            "Ann Abbot",
            &actor(),
        )
        .unwrap();

        assert!(t.is_applied());
        assert_eq!(a.state, AssignmentState::Completed);
        assert_eq!(a.completed_on, Some(now()));
        assert_eq!(a.reviewed_rev.as_deref(), Some("03"));
        assert_eq!(req.state, RequestState::Assigned);
        assert_eq!(
            t.events()[0].description,
            "Request for Last Call review by SECDIR is completed: ready-nits. Reviewer: Ann Abbot."
        );

        let err = complete_assignment(
            &req,
            &mut a,
            &Completion::new("ready", "03").partial(),
            "Ann Abbot",
            &actor(),
        )
        .unwrap_err();
        assert!(matches!(err, ReviewError::InvalidTransition { .. }));
    }

    #[test]
    fn test_complete_is_not_a_plain_transition() {
        let req = request();
        let mut a = ReviewAssignment::new(1, "p1", now());
        let err = transition_assignment(&req, &mut a, AssignmentState::Completed, "Ann Abbot", &actor())
            .unwrap_err();
        assert!(matches!(err, ReviewError::InvalidTransition { .. }));
    }
}
