//! Rotation advancement after an assignment.
//!
//! # Algorithm
//! Given the filtered rotation (the assigned reviewer is never filtered
//! out):
//! 1. Start at position 0, or 1 if the assigned reviewer is at 0.
//! 2. Optionally bump the assigned reviewer's skip counter.
//! 3. Walk forward with wrap-around. A reviewer with a positive skip
//!    counter is passed and the counter decremented; the first reviewer at
//!    zero becomes the new pointer.
//!
//! Every pass decrements a counter, so the walk always terminates.
//!
//! Planning is pure: the result describes the pointer and skip counters to
//! commit, and the caller decides how to persist them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{PersonId, SortKey, TeamRoster};

/// Pointer and skip-counter changes produced by one advancement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancePlan {
    /// New pointer. `None` = leave the pointer as it is.
    pub next_reviewer: Option<SortKey>,
    /// New skip counters, by reviewer.
    pub skip_updates: BTreeMap<PersonId, u32>,
    /// Reviewers passed over because of their skip counter, in walk order.
    pub passed_over: Vec<PersonId>,
}

impl AdvancePlan {
    /// Whether committing the plan would change nothing.
    pub fn is_noop(&self) -> bool {
        self.next_reviewer.is_none() && self.skip_updates.is_empty()
    }

    /// Id of the new pointer reviewer.
    pub fn next_id(&self) -> Option<&str> {
        self.next_reviewer.as_ref().map(|k| k.id.as_str())
    }
}

/// Result of advancing a team's rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdvanceOutcome {
    /// Pointer moved to `next`.
    Advanced {
        /// New pointer reviewer.
        next: PersonId,
        /// Reviewers whose skip counter was consumed.
        passed_over: Vec<PersonId>,
    },
    /// No eligible reviewer; the pointer did not move.
    NoReviewers,
}

/// Plans the advancement of a team's rotation.
///
/// `filtered` is the rotation after the availability filter with
/// `assigned` exempt; `roster` supplies the current skip counters and the
/// sort keys of the reviewers.
pub fn plan_advance(
    filtered: &[PersonId],
    roster: &TeamRoster,
    assigned: &str,
    add_skip: bool,
) -> AdvancePlan {
    let mut plan = AdvancePlan::default();

    let mut i = 0;
    if filtered.first().map(String::as_str) == Some(assigned) {
        i = 1;
    }

    if add_skip {
        plan.skip_updates
            .insert(assigned.to_string(), roster.skip_next(assigned) + 1);
    }

    if filtered.is_empty() {
        return plan;
    }

    loop {
        let current = &filtered[i % filtered.len()];
        let skip = plan
            .skip_updates
            .get(current)
            .copied()
            .unwrap_or_else(|| roster.skip_next(current));

        if skip > 0 {
            plan.skip_updates.insert(current.clone(), skip - 1);
            plan.passed_over.push(current.clone());
            i += 1;
            continue;
        }

        plan.next_reviewer = roster.reviewer(current).map(|r| r.sort_key());
        return plan;
    }
}
