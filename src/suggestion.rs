//! Automatic review request suggestions.
//!
//! Teams with autosuggest enabled get unsaved review requests proposed for
//! documents reaching a milestone:
//!
//! | Milestone | Review type | Deadline |
//! |-----------|-------------|----------|
//! | In last call | `lc` | Last-call expiry (today if unknown) |
//! | On an upcoming agenda | `telechat` | Agenda date minus the lead days |
//!
//! A document is proposed once. When both milestones apply, the telechat
//! request wins unless its deadline is later than the last-call one.
//! Documents the team already handled, or is handling, are left out; see
//! [`blocks`].

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::models::{
    AssignmentState, DocName, DocumentSignals, RequestState, ReviewAssignment, ReviewRequest,
    ReviewType, TeamSettings,
};

/// A stored request with its assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestWithAssignments {
    /// The request.
    pub request: ReviewRequest,
    /// Its assignments, any state.
    pub assignments: Vec<ReviewAssignment>,
}

impl RequestWithAssignments {
    /// Bundles a request with its assignments.
    pub fn new(request: ReviewRequest, assignments: Vec<ReviewAssignment>) -> Self {
        Self {
            request,
            assignments,
        }
    }
}

/// Document milestones and existing requests feeding a suggestion pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuggestionSources<'a> {
    /// Documents currently in last call.
    pub last_call: &'a [DocumentSignals],
    /// Documents with an event for one of `agenda_dates`.
    pub on_agenda: &'a [DocumentSignals],
    /// Upcoming agenda dates considered.
    pub agenda_dates: &'a [NaiveDate],
    /// The team's existing requests.
    pub existing: &'a [RequestWithAssignments],
}

/// Whether an existing request rules out suggesting `candidate` again.
///
/// Closed requests always block. An assigned request blocks while someone
/// is actively on it, and a requested one until its deadline passes, both
/// only when they cover `rev` (the document's current revision). A
/// completed review of the covered revision blocks in any state.
pub fn blocks(existing: &RequestWithAssignments, candidate: &ReviewRequest, rev: &str, today: NaiveDate) -> bool {
    let request = &existing.request;
    if request.doc != candidate.doc {
        return false;
    }

    let covers_rev = request.targets_rev(rev);
    let has_active = existing.assignments.iter().any(|a| a.state.is_active());
    let reviewed_rev = request.effective_rev(rev);
    let completed = existing.assignments.iter().any(|a| {
        a.state == AssignmentState::Completed && a.reviewed_rev.as_deref() == Some(reviewed_rev)
    });

    match request.state {
        state if state.is_closed() => true,
        RequestState::Assigned if has_active && covers_rev => true,
        RequestState::Requested if covers_rev && request.deadline >= today => true,
        _ => completed,
    }
}

/// Proposes review requests for `team`, latest deadline first.
pub fn suggest_for_team(
    team: &TeamSettings,
    sources: &SuggestionSources<'_>,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Vec<ReviewRequest> {
    if !team.autosuggest {
        return Vec::new();
    }
    let today = now.date_naive();
    let reviewable = |doc: &&DocumentSignals| !doc.in_stream(&config.unreviewable_streams);

    let mut candidates: BTreeMap<DocName, (ReviewRequest, &DocumentSignals)> = BTreeMap::new();

    if team.handles(ReviewType::LastCall) {
        for doc in sources.last_call.iter().filter(reviewable) {
            let (time, expires) = match &doc.last_call {
                Some(lc) => (lc.time, lc.expires.unwrap_or(today)),
                None => (now, today),
            };
            if expires < today {
                debug!(doc = %doc.name, %expires, "last call already expired");
                continue;
            }
            let request = ReviewRequest::new(
                doc.name.clone(),
                team.team.clone(),
                ReviewType::LastCall,
                expires,
                config.system_person.clone(),
                time,
            );
            candidates.insert(doc.name.clone(), (request, doc));
        }
    }

    if team.handles(ReviewType::Telechat) {
        let lead = Duration::days(config.telechat_lead_days);
        for doc in sources.on_agenda.iter().filter(reviewable) {
            let Some(event) = doc.latest_agenda_event() else {
                continue;
            };
            let Some(date) = event
                .agenda_date
                .filter(|d| sources.agenda_dates.contains(d))
            else {
                debug!(doc = %doc.name, "latest agenda event is not for an upcoming date");
                continue;
            };
            let deadline = date - lead;
            if let Some((earlier, _)) = candidates.get(&doc.name) {
                if deadline > earlier.deadline {
                    continue;
                }
            }
            let request = ReviewRequest::new(
                doc.name.clone(),
                team.team.clone(),
                ReviewType::Telechat,
                deadline,
                config.system_person.clone(),
                event.time,
            );
            candidates.insert(doc.name.clone(), (request, doc));
        }
    }

    let mut suggested: Vec<ReviewRequest> = candidates
        .into_values()
        .filter(|(candidate, doc)| {
            let blocked = sources
                .existing
                .iter()
                .any(|e| blocks(e, candidate, &doc.rev, today));
            if blocked {
                debug!(doc = %candidate.doc, "existing request blocks suggestion");
            }
            !blocked
        })
        .map(|(candidate, _)| candidate)
        .collect();

    suggested.sort_by(|a, b| (b.deadline, &b.doc).cmp(&(a.deadline, &a.doc)));
    suggested
}
