//! Suggestion ranker.
//!
//! Evaluates the configured signals for every candidate, sorts on the score
//! tuple (descending) and renders the explanation label shown next to each
//! suggestion.

use std::cmp::Ordering;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{boolean_score, RankingContext, Signal, SignalScore};
use crate::models::{Availability, PersonId, Reviewer, ReviewerSettings, TeamRoster};

/// A ranked candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedReviewer {
    /// Candidate.
    pub person: PersonId,
    /// Score per signal, in signal order.
    pub scores: Vec<SignalScore>,
    /// Explanation clauses.
    pub explanations: Vec<String>,
    /// `"<name>: <clauses>"`, or just the name without clauses.
    pub label: String,
    /// Position in the unfiltered rotation (0 when absent).
    pub rotation_index: usize,
}

/// Orders candidate reviewers by a fixed sequence of signals.
#[derive(Debug, Clone)]
pub struct Ranker {
    signals: Vec<Signal>,
}

impl Ranker {
    /// Creates a ranker using [`Signal::STANDARD`].
    pub fn new() -> Self {
        Self {
            signals: Signal::STANDARD.to_vec(),
        }
    }

    /// Ranks `candidates`, most suitable first.
    ///
    /// Ties on every score keep the rotation order, then the input order.
    pub fn rank(
        &self,
        candidates: &[Reviewer],
        roster: &TeamRoster,
        ctx: &RankingContext,
    ) -> Vec<RankedReviewer> {
        let mut ranked: Vec<RankedReviewer> = candidates
            .iter()
            .map(|c| self.evaluate(c, roster, ctx))
            .collect();

        ranked.sort_by(|a, b| match b.scores.cmp(&a.scores) {
            Ordering::Equal => a.rotation_index.cmp(&b.rotation_index),
            other => other,
        });

        debug!(
            doc = %ctx.doc.name,
            team = %roster.team,
            candidates = ranked.len(),
            "ranked reviewer suggestions"
        );
        ranked
    }

    /// Evaluates one candidate.
    pub fn evaluate(
        &self,
        candidate: &Reviewer,
        roster: &TeamRoster,
        ctx: &RankingContext,
    ) -> RankedReviewer {
        let mut scores = Vec::with_capacity(self.signals.len());
        let mut explanations = Vec::new();

        for signal in &self.signals {
            let (score, explanation) = self.score(*signal, candidate, roster, ctx);
            scores.push(score);
            explanations.extend(explanation);
        }

        if let Some(stats) = ctx.workload.get(&candidate.id).and_then(|w| w.describe()) {
            explanations.push(stats);
        }

        let label = if explanations.is_empty() {
            candidate.name.clone()
        } else {
            format!("{}: {}", candidate.name, explanations.join("; "))
        };

        RankedReviewer {
            person: candidate.id.clone(),
            scores,
            explanations,
            label,
            rotation_index: ctx.rotation_index(&candidate.id),
        }
    }

    fn score(
        &self,
        signal: Signal,
        candidate: &Reviewer,
        roster: &TeamRoster,
        ctx: &RankingContext,
    ) -> (SignalScore, Option<String>) {
        let id = candidate.id.as_str();
        match signal {
            Signal::Availability => {
                let periods = roster.active_periods_for(id, ctx.now.date_naive());
                if periods.is_empty() {
                    return (boolean_score(-1, false), None);
                }
                let only_canfinish = periods
                    .iter()
                    .all(|p| p.availability == Availability::CanFinish);
                let engaged = ctx.reviewed_before.contains(id) || ctx.active_on_doc.contains(id);
                let unavailable = !(only_canfinish && engaged);
                let described = periods
                    .iter()
                    .map(|p| p.describe())
                    .collect::<Vec<_>>()
                    .join(", ");
                (boolean_score(-1, unavailable), Some(described))
            }
            Signal::ReviewedBefore => {
                let holds = ctx.reviewed_before.contains(id);
                (boolean_score(1, holds), holds.then(|| "reviewed document before".to_string()))
            }
            Signal::Wish => {
                let holds = ctx.wishes.contains(id);
                (boolean_score(1, holds), holds.then(|| "wishes to review document".to_string()))
            }
            Signal::Connection => match ctx.doc.connection_of(id) {
                Some(connection) => (boolean_score(-1, true), Some(connection.to_string())),
                None => (boolean_score(-1, false), None),
            },
            Signal::FilterMatch => {
                let holds = filter_pattern(candidate, roster)
                    .is_some_and(|re| ctx.doc.all_names().any(|n| re.is_match(n)));
                (boolean_score(-1, holds), holds.then(|| "filter regexp matches".to_string()))
            }
            Signal::FrequencyDebt => {
                let days = ctx.days_needed_for(id);
                let explanation = (days > 0).then(|| {
                    let unit = if days == 1 { "day" } else { "days" };
                    format!("max frequency exceeded, ready in {days} {unit}")
                });
                (-days, explanation)
            }
            Signal::SkipDebt => {
                let skip = roster.skip_next(id);
                (-i64::from(skip), (skip > 0).then(|| format!("skip next {skip}")))
            }
            Signal::RotationPosition => {
                let index = ctx.rotation_index(id);
                (-(index as SignalScore), Some(format!("#{}", index + 1)))
            }
        }
    }
}

impl Default for Ranker {
    fn default() -> Self {
        Self::new()
    }
}

/// The candidate's effective filter pattern, compiled.
///
/// Reviewers without stored settings get the default pattern. A malformed
/// pattern is logged and never matches.
fn filter_pattern(candidate: &Reviewer, roster: &TeamRoster) -> Option<Regex> {
    let settings = match roster.stored_settings(&candidate.id) {
        Some(stored) => stored.clone(),
        None => ReviewerSettings::new().with_filter_re(ReviewerSettings::default_filter_re(candidate)),
    };
    match settings.compiled_filter() {
        Ok(re) => re,
        Err(e) => {
            warn!(
                team = %roster.team,
                reviewer = %candidate.id,
                pattern = settings.filter_re.as_deref().unwrap_or_default(),
                error = %e,
                "ignoring malformed filter pattern"
            );
            None
        }
    }
}
