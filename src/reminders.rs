//! Reviewer reminders.
//!
//! Reviewers and team secretaries each choose their own reminders:
//!
//! - **Deadline reminder**: sent for an active assignment when its deadline
//!   is exactly `remind_days_before_deadline` days after the reminder date.
//! - **Secretary reminder**: the same rule, applied with each secretary's
//!   own lead time to every active assignment that has a reviewer.
//! - **Open-reviews digest**: every `remind_days_open_reviews` days
//!   (counted from the Unix epoch), a list of all active assignments in the
//!   team. Reviewers without open work get nothing.
//!
//! Only the selection is done here; delivery is up to the caller.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AssignmentRecord, DocName, PersonId, TeamId, TeamRoster, TeamSettings};

/// An assignment whose reviewer asked to be reminded of its deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlineReminder {
    /// Reviewer to remind.
    pub reviewer: PersonId,
    /// Team of the request.
    pub team: TeamId,
    /// Document under review.
    pub doc: DocName,
    /// Assignment concerned.
    pub assignment_id: Option<u64>,
    /// Request deadline.
    pub deadline: NaiveDate,
    /// Days from the reminder date to the deadline.
    pub days_left: i64,
}

impl DeadlineReminder {
    /// Mail subject line.
    pub fn subject(&self) -> String {
        format!(
            "Reminder: deadline for review of {} in {} is {}",
            self.doc,
            self.team,
            self.deadline.format("%Y-%m-%d")
        )
    }
}

/// Active assignments due for a deadline reminder on `remind_date`.
pub fn deadline_reminders(
    roster: &TeamRoster,
    history: &[AssignmentRecord],
    remind_date: NaiveDate,
) -> Vec<DeadlineReminder> {
    history
        .iter()
        .filter(|r| r.team == roster.team && r.state().is_active())
        .filter_map(|record| {
            let reviewer = record.reviewer()?;
            let remind_days = roster.stored_settings(reviewer)?.remind_days_before_deadline?;
            let days_left = (record.deadline - remind_date).num_days();
            (days_left == remind_days).then(|| DeadlineReminder {
                reviewer: reviewer.to_string(),
                team: record.team.clone(),
                doc: record.doc.clone(),
                assignment_id: record.assignment.id,
                deadline: record.deadline,
                days_left,
            })
        })
        .collect()
}

/// An unfinished assignment brought to a secretary's attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretaryReminder {
    /// Secretary to remind.
    pub secretary: PersonId,
    /// Reviewer holding the assignment.
    pub reviewer: PersonId,
    /// Team of the request.
    pub team: TeamId,
    /// Document under review.
    pub doc: DocName,
    /// Assignment concerned.
    pub assignment_id: Option<u64>,
    /// Request deadline.
    pub deadline: NaiveDate,
}

impl SecretaryReminder {
    /// Mail subject line.
    pub fn subject(&self) -> String {
        format!(
            "Reminder: assignment of {} to {} in {} is due {}",
            self.doc,
            self.reviewer,
            self.team,
            self.deadline.format("%Y-%m-%d")
        )
    }
}

/// Active assignments each secretary of the team wants a reminder for on
/// `remind_date`.
pub fn secretary_reminders(
    team: &TeamSettings,
    history: &[AssignmentRecord],
    remind_date: NaiveDate,
) -> Vec<SecretaryReminder> {
    let mut due = Vec::new();
    for secretary in &team.secretaries {
        let Some(remind_days) = secretary.remind_days_before_deadline else {
            continue;
        };
        for record in history
            .iter()
            .filter(|r| r.team == team.team && r.state().is_active())
            .filter(|r| (r.deadline - remind_date).num_days() == remind_days)
        {
            let Some(reviewer) = record.reviewer() else {
                continue;
            };
            due.push(SecretaryReminder {
                secretary: secretary.person.clone(),
                reviewer: reviewer.to_string(),
                team: record.team.clone(),
                doc: record.doc.clone(),
                assignment_id: record.assignment.id,
                deadline: record.deadline,
            });
        }
    }
    due
}

/// Periodic list of a reviewer's open assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenReviewsDigest {
    /// Recipient.
    pub reviewer: PersonId,
    /// Team.
    pub team: TeamId,
    /// Active assignments, earliest deadline first.
    pub open: Vec<AssignmentRecord>,
}

/// Whether a digest with period `every_days` falls on `today`.
pub fn digest_due(today: NaiveDate, every_days: u32) -> bool {
    if every_days == 0 {
        return false;
    }
    let days = (today - DateTime::<Utc>::UNIX_EPOCH.date_naive()).num_days();
    days.rem_euclid(i64::from(every_days)) == 0
}

/// Digests due on `today`, one per reviewer with open work.
pub fn open_review_digests(
    roster: &TeamRoster,
    history: &[AssignmentRecord],
    today: NaiveDate,
) -> Vec<OpenReviewsDigest> {
    let mut open: BTreeMap<&str, Vec<AssignmentRecord>> = BTreeMap::new();
    for record in history
        .iter()
        .filter(|r| r.team == roster.team && r.state().is_active())
    {
        if let Some(reviewer) = record.reviewer() {
            open.entry(reviewer).or_default().push(record.clone());
        }
    }

    open.into_iter()
        .filter(|(reviewer, _)| {
            roster
                .stored_settings(reviewer)
                .and_then(|s| s.remind_days_open_reviews)
                .is_some_and(|every| digest_due(today, every))
        })
        .map(|(reviewer, mut records)| {
            records.sort_by_key(|r| (r.deadline, r.assignment.id));
            OpenReviewsDigest {
                reviewer: reviewer.to_string(),
                team: roster.team.clone(),
                open: records,
            }
        })
        .collect()
}
