//! Review engine facade.
//!
//! [`ReviewEngine`] ties the pure building blocks to a [`ReviewStore`]:
//! it loads what an operation needs, runs the rotation, ranking,
//! suggestion or lifecycle logic, and writes the result back.
//!
//! # Concurrency
//!
//! Every write runs under the team's lock and reads the request or
//! assignment it changes only once the lock is held, so two assignments in
//! the same team advance the rotation one after the other. Teams do not block each other. The
//! store additionally checks the pointer version on commit; a writer that
//! bypassed the engine surfaces as [`ReviewError::ConcurrentUpdate`].
//!
//! Ranking, suggestion, statistics and reminders only read.
//!
//! All operations take the as-of instant explicitly.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{ReviewError, ReviewResult};
use crate::lifecycle::{self, Actor, Completion, EventKind, Transition};
use crate::models::{
    periods_to_list, AssignmentRecord, AssignmentState, PersonId, RequestState, ReviewAssignment,
    ReviewRequest, ReviewerSettings, TeamId, TeamRoster, UnavailablePeriod,
};
use crate::ranking::{RankedReviewer, Ranker, RankingContext};
use crate::reminders::{self, DeadlineReminder, OpenReviewsDigest, SecretaryReminder};
use crate::rotation::{self, plan_advance, AdvanceOutcome, AvailabilityFilter};
use crate::stats::{CountMode, PeriodStats, StatsQuery};
use crate::store::{ReviewStore, RotationCommit, StoreError};
use crate::suggestion::{self, RequestWithAssignments, SuggestionSources};
use crate::validation::{validate_roster, ValidationResult};

fn display_name(roster: &TeamRoster, person: &str) -> String {
    roster
        .reviewer(person)
        .map_or_else(|| person.to_string(), |r| r.name.clone())
}

/// Review team scheduling engine over a store.
pub struct ReviewEngine<S: ReviewStore> {
    store: S,
    config: EngineConfig,
    ranker: Ranker,
    team_locks: Mutex<HashMap<TeamId, Arc<Mutex<()>>>>,
}

impl<S: ReviewStore> ReviewEngine<S> {
    /// Creates an engine with the default configuration.
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: EngineConfig::default(),
            ranker: Ranker::new(),
            team_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn team_lock(&self, team: &str) -> ReviewResult<Arc<Mutex<()>>> {
        let mut locks = self
            .team_locks
            .lock()
            .map_err(|_| ReviewError::Store(StoreError::LockPoisoned))?;
        Ok(locks.entry(team.to_string()).or_default().clone())
    }

    /// Runs `f` while holding `team`'s rotation lock.
    fn with_team_lock<T>(&self, team: &str, f: impl FnOnce() -> ReviewResult<T>) -> ReviewResult<T> {
        let lock = self.team_lock(team)?;
        let _guard = lock
            .lock()
            .map_err(|_| ReviewError::Store(StoreError::LockPoisoned))?;
        f()
    }

    // ------------------------------------------------------------------
    // Rotation
    // ------------------------------------------------------------------

    /// The team's rotation order, next reviewer first.
    pub fn build_rotation(&self, team: &str) -> ReviewResult<Vec<PersonId>> {
        let roster = self.store.roster(team)?;
        let pointer = self.store.rotation_pointer(team)?;
        Ok(rotation::build_rotation(
            &roster.reviewers,
            pointer.as_ref().map(|p| &p.next_reviewer),
        ))
    }

    /// The rotation without reviewers that cannot take work at `now`.
    pub fn available_rotation(
        &self,
        team: &str,
        exempt: &[&str],
        now: DateTime<Utc>,
    ) -> ReviewResult<Vec<PersonId>> {
        let roster = self.store.roster(team)?;
        let history = self.store.assignment_history(team)?;
        let rotation = self.build_rotation(team)?;
        Ok(AvailabilityFilter::new(&roster, &history, now).filter(&rotation, exempt))
    }

    /// Moves the team's rotation past `assigned`.
    ///
    /// With `add_skip`, `assigned` is also passed over the next time their
    /// turn comes.
    ///
    /// # Errors
    ///
    /// [`ReviewError::ConcurrentUpdate`] if the pointer moved under us.
    pub fn advance_rotation(
        &self,
        team: &str,
        assigned: &str,
        add_skip: bool,
        now: DateTime<Utc>,
    ) -> ReviewResult<AdvanceOutcome> {
        self.with_team_lock(team, || self.advance_locked(team, assigned, add_skip, now))
    }

    fn advance_locked(
        &self,
        team: &str,
        assigned: &str,
        add_skip: bool,
        now: DateTime<Utc>,
    ) -> ReviewResult<AdvanceOutcome> {
        let roster = self.store.roster(team)?;
        let pointer = self.store.rotation_pointer(team)?;
        let history = self.store.assignment_history(team)?;

        let rotation = rotation::build_rotation(
            &roster.reviewers,
            pointer.as_ref().map(|p| &p.next_reviewer),
        );
        let filtered = AvailabilityFilter::new(&roster, &history, now).filter(&rotation, &[assigned]);
        let plan = plan_advance(&filtered, &roster, assigned, add_skip);

        if plan.is_noop() {
            warn!(team, reviewer = assigned, "no reviewers to advance the rotation to");
            return Ok(AdvanceOutcome::NoReviewers);
        }

        let settings = plan
            .skip_updates
            .iter()
            .map(|(person, skip)| {
                let mut s = roster.settings_for(person);
                s.skip_next = *skip;
                (person.clone(), s)
            })
            .collect();
        let version = self.store.commit_rotation(RotationCommit {
            team: team.to_string(),
            expected_version: pointer.as_ref().map_or(0, |p| p.version),
            next_reviewer: plan.next_reviewer.clone(),
            settings,
        })?;

        match plan.next_id() {
            Some(next) => {
                info!(
                    team,
                    reviewer = assigned,
                    next,
                    passed_over = plan.passed_over.len(),
                    version,
                    "advanced rotation"
                );
                Ok(AdvanceOutcome::Advanced {
                    next: next.to_string(),
                    passed_over: plan.passed_over,
                })
            }
            None => {
                warn!(team, reviewer = assigned, "no reviewers to advance the rotation to");
                Ok(AdvanceOutcome::NoReviewers)
            }
        }
    }

    // ------------------------------------------------------------------
    // Ranking and suggestion
    // ------------------------------------------------------------------

    /// Ranks the team's reviewers for `request`, most suitable first.
    pub fn rank(&self, request: &ReviewRequest, now: DateTime<Utc>) -> ReviewResult<Vec<RankedReviewer>> {
        let roster = self.store.roster(&request.team)?;
        let doc = self.store.document(&request.doc)?;
        let history = self.store.assignment_history(&request.team)?;
        let wishes = self.store.review_wishes(&request.team)?;
        let rotation = self.build_rotation(&request.team)?;

        let ctx = RankingContext::gather(
            request,
            doc,
            &roster,
            &history,
            &wishes,
            rotation,
            now,
            self.config.stats_window_days,
        );
        Ok(self.ranker.rank(&roster.reviewers, &roster, &ctx))
    }

    /// Review requests the team should consider opening.
    pub fn suggest_for_team(&self, team: &str, now: DateTime<Utc>) -> ReviewResult<Vec<ReviewRequest>> {
        let settings = self.store.team_settings(team)?;
        if !settings.autosuggest {
            return Ok(Vec::new());
        }

        let last_call = self.store.documents_in_last_call()?;
        let agenda_dates = self
            .store
            .upcoming_agenda_dates(now.date_naive(), self.config.upcoming_agenda_dates)?;
        let on_agenda = self.store.documents_on_agenda(&agenda_dates)?;
        let existing = self
            .store
            .requests(team)?
            .into_iter()
            .map(|request| {
                let id = request.id.unwrap_or_default();
                let assignments = self.store.assignments_for_request(id)?;
                Ok(RequestWithAssignments::new(request, assignments))
            })
            .collect::<ReviewResult<Vec<_>>>()?;

        let sources = SuggestionSources {
            last_call: &last_call,
            on_agenda: &on_agenda,
            agenda_dates: &agenda_dates,
            existing: &existing,
        };
        let suggested = suggestion::suggest_for_team(&settings, &sources, &self.config, now);
        debug!(team, suggested = suggested.len(), "computed review suggestions");
        Ok(suggested)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Assigns `reviewer` to a stored request and advances the rotation.
    ///
    /// The rotation is committed before the request and assignment are
    /// written, so a [`ReviewError::ConcurrentUpdate`] leaves nothing
    /// behind and the call can be repeated as is.
    ///
    /// # Errors
    ///
    /// [`ReviewError::NotFound`] for an unknown request, or a reviewer not
    /// on the team's roster.
    pub fn assign_reviewer(
        &self,
        request_id: u64,
        reviewer: &str,
        add_skip: bool,
        by: &str,
        now: DateTime<Utc>,
    ) -> ReviewResult<Transition<ReviewAssignment>> {
        let team = self.store.request(request_id)?.team;

        self.with_team_lock(&team, || {
            let mut request = self.store.request(request_id)?;
            let roster = self.store.roster(&team)?;
            let name = roster
                .reviewer(reviewer)
                .map(|r| r.name.clone())
                .ok_or_else(|| ReviewError::not_found("reviewer", reviewer))?;
            let assignments = self.store.assignments_for_request(request_id)?;

            let actor = Actor::new(by, &team, now);
            let transition = lifecycle::assign_reviewer(&mut request, &assignments, reviewer, &name, &actor);
            let Transition::Applied {
                value: mut assignment,
                mut events,
            } = transition
            else {
                debug!(request_id, reviewer, "reviewer already assigned");
                return Ok(Transition::AlreadyInState);
            };

            self.advance_locked(&team, reviewer, add_skip, now)?;

            self.store.save_request(&request)?;
            let assignment_id = self.store.save_assignment(&assignment)?;
            assignment.id = Some(assignment_id);
            for event in events
                .iter_mut()
                .filter(|e| e.kind == EventKind::AssignedReviewRequest)
            {
                event.assignment_id = Some(assignment_id);
            }
            self.store.record_events(&events)?;
            info!(team = %team, request_id, reviewer, assignment_id, "assigned reviewer");

            Ok(Transition::Applied {
                value: assignment,
                events,
            })
        })
    }

    /// Closes a stored request, withdrawing its open assignments.
    ///
    /// Returns the ids of the withdrawn assignments.
    pub fn close_request(
        &self,
        request_id: u64,
        state: RequestState,
        by: &str,
        now: DateTime<Utc>,
    ) -> ReviewResult<Transition<Vec<u64>>> {
        let team = self.store.request(request_id)?.team;

        self.with_team_lock(&team, || {
            let mut request = self.store.request(request_id)?;
            let mut assignments = self.store.assignments_for_request(request_id)?;
            let roster = self.store.roster(&team)?;

            let actor = Actor::new(by, &team, now);
            let names = |person: &str| display_name(&roster, person);
            let transition = lifecycle::close_request(&mut request, &mut assignments, state, &names, &actor)?;

            if let Transition::Applied { value: withdrawn, events } = &transition {
                self.store.save_request(&request)?;
                for assignment in assignments.iter().filter(|a| a.id.is_some_and(|id| withdrawn.contains(&id))) {
                    self.store.save_assignment(assignment)?;
                }
                self.store.record_events(events)?;
                info!(team = %team, request_id, state = %state, withdrawn = withdrawn.len(), "closed request");
            }
            Ok(transition)
        })
    }

    /// The reviewer accepts an assignment.
    pub fn accept_assignment(&self, assignment_id: u64, by: &str, now: DateTime<Utc>) -> ReviewResult<Transition<()>> {
        self.transition_assignment(assignment_id, AssignmentState::Accepted, by, now)
    }

    /// The reviewer declines an assignment.
    pub fn reject_assignment(&self, assignment_id: u64, by: &str, now: DateTime<Utc>) -> ReviewResult<Transition<()>> {
        self.transition_assignment(assignment_id, AssignmentState::Rejected, by, now)
    }

    /// Marks an assignment as never answered.
    pub fn mark_no_response(&self, assignment_id: u64, by: &str, now: DateTime<Utc>) -> ReviewResult<Transition<()>> {
        self.transition_assignment(assignment_id, AssignmentState::NoResponse, by, now)
    }

    /// Withdraws an assignment.
    pub fn withdraw_assignment(&self, assignment_id: u64, by: &str, now: DateTime<Utc>) -> ReviewResult<Transition<()>> {
        self.transition_assignment(assignment_id, AssignmentState::Withdrawn, by, now)
    }

    fn transition_assignment(
        &self,
        assignment_id: u64,
        next: AssignmentState,
        by: &str,
        now: DateTime<Utc>,
    ) -> ReviewResult<Transition<()>> {
        let team = self.assignment_team(assignment_id)?;

        self.with_team_lock(&team, || {
            let (request, mut assignment, roster) = self.load_assignment(assignment_id)?;
            let name = assignment
                .reviewer
                .as_deref()
                .map(|p| display_name(&roster, p))
                .unwrap_or_default();
            let actor = Actor::new(by, &request.team, now);

            let transition = lifecycle::transition_assignment(&request, &mut assignment, next, &name, &actor)?;
            if transition.is_applied() {
                self.store.save_assignment(&assignment)?;
                self.store.record_events(transition.events())?;
                info!(team = %request.team, assignment_id, state = %next, "assignment changed state");
            }
            Ok(transition)
        })
    }

    /// Records a finished review. The request stays open until closed.
    ///
    /// # Errors
    ///
    /// [`ReviewError::UnknownResult`] if the team does not use
    /// `completion.result`.
    pub fn complete_assignment(
        &self,
        assignment_id: u64,
        completion: &Completion,
        by: &str,
        now: DateTime<Utc>,
    ) -> ReviewResult<Transition<()>> {
        let team = self.assignment_team(assignment_id)?;
        let settings = self.store.team_settings(&team)?;
        if !settings.uses_result(&completion.result) {
            return Err(ReviewError::UnknownResult {
                team,
                result: completion.result.clone(),
            });
        }

        self.with_team_lock(&team, || {
            let (request, mut assignment, roster) = self.load_assignment(assignment_id)?;
            let name = assignment
                .reviewer
                .as_deref()
                .map(|p| display_name(&roster, p))
                .unwrap_or_default();
            let actor = Actor::new(by, &request.team, now);

            let transition = lifecycle::complete_assignment(&request, &mut assignment, completion, &name, &actor)?;
            if transition.is_applied() {
                self.store.save_assignment(&assignment)?;
                self.store.record_events(transition.events())?;
                info!(
                    team = %request.team,
                    assignment_id,
                    result = %completion.result,
                    partial = completion.partial,
                    "review completed"
                );
            }
            Ok(transition)
        })
    }

    fn assignment_team(&self, assignment_id: u64) -> ReviewResult<TeamId> {
        let assignment = self.store.assignment(assignment_id)?;
        Ok(self.store.request(assignment.request_id)?.team)
    }

    fn load_assignment(&self, assignment_id: u64) -> ReviewResult<(ReviewRequest, ReviewAssignment, TeamRoster)> {
        let assignment = self.store.assignment(assignment_id)?;
        let request = self.store.request(assignment.request_id)?;
        let roster = self.store.roster(&request.team)?;
        Ok((request, assignment, roster))
    }

    // ------------------------------------------------------------------
    // Settings, periods and reporting
    // ------------------------------------------------------------------

    /// Stores a reviewer's settings.
    ///
    /// # Errors
    ///
    /// [`ReviewError::InvalidPattern`] if the filter pattern does not compile.
    pub fn set_reviewer_settings(&self, team: &str, person: &str, settings: ReviewerSettings) -> ReviewResult<()> {
        if let Err(e) = settings.compiled_filter() {
            return Err(ReviewError::InvalidPattern {
                pattern: settings.filter_re.clone().unwrap_or_default(),
                message: e.to_string(),
            });
        }
        self.with_team_lock(team, || {
            self.store.save_reviewer_settings(team, person, settings)?;
            Ok(())
        })
    }

    /// Checks the team's roster, logging every problem found.
    pub fn validate_team(&self, team: &str) -> ReviewResult<ValidationResult> {
        let roster = self.store.roster(team)?;
        let result = validate_roster(&roster);
        if let Err(errors) = &result {
            for e in errors {
                warn!(team, kind = ?e.kind, "{}", e.message);
            }
        }
        Ok(result)
    }

    /// Periods worth listing for the team on `today`.
    pub fn unavailable_periods(&self, team: &str, today: NaiveDate) -> ReviewResult<Vec<UnavailablePeriod>> {
        let roster = self.store.roster(team)?;
        Ok(
            periods_to_list(&roster.unavailable_periods, today, self.config.unavailable_list_past_days)
                .into_iter()
                .cloned()
                .collect(),
        )
    }

    /// Aggregates assignment outcomes over the teams of `query` (all when empty).
    pub fn period_stats(&self, query: &StatsQuery, mode: CountMode, now: DateTime<Utc>) -> ReviewResult<PeriodStats> {
        let records = self.history_for(&query.teams)?;
        Ok(PeriodStats::calculate(&records, query, mode, now))
    }

    /// Deadline reminders due on `remind_date`, across all teams.
    pub fn deadline_reminders(&self, remind_date: NaiveDate) -> ReviewResult<Vec<DeadlineReminder>> {
        let mut due = Vec::new();
        for team in self.store.teams()? {
            let roster = self.store.roster(&team.team)?;
            let history = self.store.assignment_history(&team.team)?;
            due.extend(reminders::deadline_reminders(&roster, &history, remind_date));
        }
        Ok(due)
    }

    /// Secretary reminders due on `remind_date`, across all teams.
    pub fn secretary_reminders(&self, remind_date: NaiveDate) -> ReviewResult<Vec<SecretaryReminder>> {
        let mut due = Vec::new();
        for team in self.store.teams()? {
            let history = self.store.assignment_history(&team.team)?;
            due.extend(reminders::secretary_reminders(&team, &history, remind_date));
        }
        Ok(due)
    }

    /// Open-review digests due on `today`, across all teams.
    pub fn open_review_digests(&self, today: NaiveDate) -> ReviewResult<Vec<OpenReviewsDigest>> {
        let mut due = Vec::new();
        for team in self.store.teams()? {
            let roster = self.store.roster(&team.team)?;
            let history = self.store.assignment_history(&team.team)?;
            due.extend(reminders::open_review_digests(&roster, &history, today));
        }
        Ok(due)
    }

    fn history_for(&self, teams: &[String]) -> ReviewResult<Vec<AssignmentRecord>> {
        let teams: Vec<TeamId> = if teams.is_empty() {
            self.store.teams()?.into_iter().map(|t| t.team).collect()
        } else {
            teams.to_vec()
        };
        let mut records = Vec::new();
        for team in &teams {
            records.extend(self.store.assignment_history(team)?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Availability, DocumentSignals, ReviewType, ReviewWish, Reviewer, RotationPointer,
        SecretarySettings, SortKey, TeamSettings,
    };
    use crate::store::{MemoryStore, StoreResult};
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn roster() -> TeamRoster {
        TeamRoster::new("secdir")
            .with_reviewer(Reviewer::new("r0", "Ann Abbot"))
            .with_reviewer(Reviewer::new("r1", "Bea Brown"))
            .with_reviewer(Reviewer::new("r2", "Cal Cook"))
            .with_reviewer(Reviewer::new("r3", "Dan Dunn"))
            .with_reviewer(Reviewer::new("r4", "Eve Ewing"))
    }

    fn engine_with(roster: TeamRoster) -> ReviewEngine<MemoryStore> {
        let store = MemoryStore::new()
            .with_team(TeamSettings::new("secdir"), roster)
            .with_document(DocumentSignals::new("draft-a", "03").with_pages(12));
        ReviewEngine::new(store)
    }

    fn point_at(engine: &ReviewEngine<MemoryStore>, person: &str) {
        let key = engine.store().roster("secdir").unwrap().reviewer(person).unwrap().sort_key();
        engine
            .store()
            .commit_rotation(RotationCommit {
                team: "secdir".into(),
                expected_version: 0,
                next_reviewer: Some(key),
                settings: Vec::new(),
            })
            .unwrap();
    }

    fn skip(engine: &ReviewEngine<MemoryStore>, person: &str) -> u32 {
        engine.store().roster("secdir").unwrap().skip_next(person)
    }

    fn next(outcome: AdvanceOutcome) -> String {
        match outcome {
            AdvanceOutcome::Advanced { next, .. } => next,
            AdvanceOutcome::NoReviewers => panic!("rotation did not advance"),
        }
    }

    fn save_request(engine: &ReviewEngine<MemoryStore>) -> u64 {
        let request = ReviewRequest::new("draft-a", "secdir", ReviewType::LastCall, day(20), "p9", now());
        engine.store().save_request(&request).unwrap()
    }

    #[test]
    fn test_skip_scenario() {
        let engine = engine_with(roster());
        point_at(&engine, "r1");

        assert_eq!(next(engine.advance_rotation("secdir", "r1", true, now()).unwrap()), "r2");
        assert_eq!(skip(&engine, "r1"), 1);

        // Out of turn: pointer stays, the skip is queued.
        assert_eq!(next(engine.advance_rotation("secdir", "r3", true, now()).unwrap()), "r2");
        assert_eq!(skip(&engine, "r3"), 1);

        let outcome = engine.advance_rotation("secdir", "r2", false, now()).unwrap();
        assert_eq!(
            outcome,
            AdvanceOutcome::Advanced {
                next: "r4".into(),
                passed_over: vec!["r3".into()],
            }
        );
        assert_eq!(skip(&engine, "r3"), 0);
        assert_eq!(engine.build_rotation("secdir").unwrap()[0], "r4");
    }

    #[test]
    fn test_unavailable_reviewer_skipped_without_consuming_skip() {
        let roster = roster()
            .with_settings("r2", ReviewerSettings::new().with_skip_next(1))
            .with_period(UnavailablePeriod::new("r2", "secdir", Availability::Unavailable).ending(day(20)));
        let engine = engine_with(roster);
        point_at(&engine, "r1");

        assert_eq!(next(engine.advance_rotation("secdir", "r1", false, now()).unwrap()), "r3");
        assert_eq!(skip(&engine, "r2"), 1);

        // Still assignable out of turn.
        let id = save_request(&engine);
        let t = engine.assign_reviewer(id, "r2", false, "secretary", now()).unwrap();
        assert!(t.is_applied());
        assert_eq!(engine.build_rotation("secdir").unwrap()[0], "r3");
    }

    #[test]
    fn test_empty_team_does_not_advance() {
        let engine = engine_with(TeamRoster::new("secdir"));
        assert_eq!(
            engine.advance_rotation("secdir", "r1", false, now()).unwrap(),
            AdvanceOutcome::NoReviewers
        );
        assert!(engine.store().rotation_pointer("secdir").unwrap().is_none());
    }

    #[test]
    fn test_assign_and_close() {
        let engine = engine_with(roster());
        let id = save_request(&engine);

        let t = engine.assign_reviewer(id, "r0", false, "secretary", now()).unwrap();
        let first = t.value().unwrap().id.unwrap();
        assert_eq!(engine.store().request(id).unwrap().state, RequestState::Assigned);
        assert_eq!(engine.build_rotation("secdir").unwrap()[0], "r1");

        let again = engine.assign_reviewer(id, "r0", false, "secretary", now()).unwrap();
        assert_eq!(again, Transition::AlreadyInState);

        engine.accept_assignment(first, "r0", now()).unwrap();
        let second = engine
            .assign_reviewer(id, "r1", false, "secretary", now())
            .unwrap()
            .value()
            .unwrap()
            .id
            .unwrap();
        engine
            .complete_assignment(second, &Completion::new("ready", "03"), "r1", now())
            .unwrap();

        let closed = engine
            .close_request(id, RequestState::Completed, "secretary", now())
            .unwrap();
        assert_eq!(closed.value(), Some(&vec![first]));
        assert_eq!(engine.store().assignment(first).unwrap().state, AssignmentState::Withdrawn);
        assert_eq!(engine.store().assignment(second).unwrap().state, AssignmentState::Completed);

        let events = engine.store().events().unwrap();
        assert!(events
            .iter()
            .any(|e| e.kind == EventKind::AssignedReviewRequest && e.assignment_id == Some(first)));
        assert_eq!(
            events.last().unwrap().description,
            "Request closed, assignment withdrawn: Ann Abbot Last Call SECDIR review"
        );

        let err = engine.reject_assignment(second, "r1", now()).unwrap_err();
        assert!(matches!(err, ReviewError::InvalidTransition { .. }));
    }

    #[test]
    fn test_assign_unknown_reviewer() {
        let engine = engine_with(roster());
        let id = save_request(&engine);
        let err = engine.assign_reviewer(id, "nobody", false, "secretary", now()).unwrap_err();
        assert!(matches!(err, ReviewError::NotFound { entity: "reviewer", .. }));
    }

    #[test]
    fn test_rank_through_engine() {
        let store = MemoryStore::new()
            .with_team(TeamSettings::new("secdir"), roster())
            .with_document(DocumentSignals::new("draft-a", "03").with_author("r0"))
            .with_wish(ReviewWish::new("secdir", "r4", "draft-a", now()));
        let engine = ReviewEngine::new(store);
        let request = ReviewRequest::new("draft-a", "secdir", ReviewType::LastCall, day(20), "p9", now());

        let ranked = engine.rank(&request, now()).unwrap();
        assert_eq!(ranked.len(), 5);
        assert_eq!(ranked[0].person, "r4");
        assert_eq!(ranked[4].person, "r0");
    }

    #[test]
    fn test_suggestions_skip_requested_documents() {
        let store = MemoryStore::new()
            .with_team(TeamSettings::new("secdir"), roster())
            .with_document(DocumentSignals::new("draft-a", "03").in_last_call(now(), Some(day(24))))
            .with_document(DocumentSignals::new("draft-b", "01").in_last_call(now(), Some(day(25))));
        let engine = ReviewEngine::new(store);

        let before = engine.suggest_for_team("secdir", now()).unwrap();
        assert_eq!(before.len(), 2);

        engine.store().save_request(&before[1]).unwrap();
        let after = engine.suggest_for_team("secdir", now()).unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].doc, "draft-b");
    }

    #[test]
    fn test_set_reviewer_settings_rejects_bad_pattern() {
        let engine = engine_with(roster());
        let err = engine
            .set_reviewer_settings("secdir", "r1", ReviewerSettings::new().with_filter_re("draft-("))
            .unwrap_err();
        assert!(matches!(err, ReviewError::InvalidPattern { .. }));

        engine
            .set_reviewer_settings("secdir", "r1", ReviewerSettings::new().with_min_interval(14))
            .unwrap();
        assert_eq!(
            engine.store().roster("secdir").unwrap().settings_for("r1").min_interval_days,
            Some(14)
        );
    }

    #[test]
    fn test_reporting() {
        let roster = roster()
            .with_settings("r0", ReviewerSettings::new().with_deadline_reminder(10))
            .with_period(
                UnavailablePeriod::new("r3", "secdir", Availability::CanFinish)
                    .starting(day(1))
                    .ending(day(2)),
            );
        let engine = engine_with(roster);
        let id = save_request(&engine);
        engine.assign_reviewer(id, "r0", false, "secretary", now()).unwrap();

        let reminders = engine.deadline_reminders(day(10)).unwrap();
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].reviewer, "r0");

        let stats = engine
            .period_stats(&StatsQuery::new(), CountMode::Pages, now() + Duration::days(1))
            .unwrap();
        assert_eq!(stats.open, 12);

        assert_eq!(engine.unavailable_periods("secdir", day(10)).unwrap().len(), 1);
        assert!(engine.validate_team("secdir").unwrap().is_ok());
    }

    #[test]
    fn test_rotation_starts_at_pointer() {
        let engine = engine_with(roster());
        assert_eq!(engine.build_rotation("secdir").unwrap(), vec!["r0", "r1", "r2", "r3", "r4"]);

        point_at(&engine, "r1");
        assert_eq!(engine.build_rotation("secdir").unwrap(), vec!["r1", "r2", "r3", "r4", "r0"]);
    }

    #[test]
    fn test_concurrent_assignments_match_sequential_run() {
        const ROUNDS: usize = 5;
        let reviewers = ["r1", "r2", "r3", "r4"];

        let setup = || {
            let engine = engine_with(roster());
            let requests: Vec<Vec<u64>> = reviewers
                .iter()
                .map(|_| (0..ROUNDS).map(|_| save_request(&engine)).collect())
                .collect();
            (engine, requests)
        };

        let (concurrent, requests) = setup();
        std::thread::scope(|scope| {
            for (person, ids) in reviewers.iter().zip(&requests) {
                let engine = &concurrent;
                scope.spawn(move || {
                    for id in ids {
                        let t = engine.assign_reviewer(*id, person, true, "secretary", now()).unwrap();
                        assert!(t.is_applied());
                    }
                });
            }
        });

        let (sequential, requests) = setup();
        for (person, ids) in reviewers.iter().zip(&requests) {
            for id in ids {
                sequential.assign_reviewer(*id, person, true, "secretary", now()).unwrap();
            }
        }

        for person in reviewers {
            assert_eq!(skip(&concurrent, person), ROUNDS as u32);
            assert_eq!(skip(&concurrent, person), skip(&sequential, person));
        }
        let pointer = concurrent.store().rotation_pointer("secdir").unwrap().unwrap();
        assert_eq!(
            Some(&pointer),
            sequential.store().rotation_pointer("secdir").unwrap().as_ref()
        );
        assert_eq!(pointer.next_reviewer.id, "r0");
        assert_eq!(pointer.version, (reviewers.len() * ROUNDS) as u64);
        assert_eq!(concurrent.store().events().unwrap().len(), reviewers.len() * ROUNDS);
        assert_eq!(
            concurrent.build_rotation("secdir").unwrap(),
            sequential.build_rotation("secdir").unwrap()
        );
    }

    #[test]
    fn test_close_and_assign_race_stays_consistent() {
        for _ in 0..20 {
            let engine = engine_with(roster());
            let id = save_request(&engine);
            engine.assign_reviewer(id, "r0", false, "secretary", now()).unwrap();

            std::thread::scope(|scope| {
                scope.spawn(|| {
                    engine
                        .close_request(id, RequestState::Withdrawn, "secretary", now())
                        .unwrap();
                });
                scope.spawn(|| {
                    engine.assign_reviewer(id, "r1", false, "secretary", now()).unwrap();
                });
            });

            let request = engine.store().request(id).unwrap();
            let active = engine
                .store()
                .assignments_for_request(id)
                .unwrap()
                .iter()
                .filter(|a| a.state.is_active())
                .count();
            match request.state {
                RequestState::Withdrawn => assert_eq!(active, 0),
                RequestState::Assigned => assert_eq!(active, 1),
                other => panic!("unexpected request state {other}"),
            }
        }
    }

    #[test]
    fn test_complete_with_unknown_result() {
        let engine = engine_with(roster());
        let id = save_request(&engine);
        let assignment = engine
            .assign_reviewer(id, "r0", false, "secretary", now())
            .unwrap()
            .value()
            .unwrap()
            .id
            .unwrap();

        let err = engine
            .complete_assignment(assignment, &Completion::new("lgtm", "03"), "r0", now())
            .unwrap_err();
        assert!(matches!(err, ReviewError::UnknownResult { .. }));
        assert_eq!(engine.store().assignment(assignment).unwrap().state, AssignmentState::Assigned);
    }

    #[test]
    fn test_secretary_reminders_through_engine() {
        let team = TeamSettings::new("secdir")
            .with_secretary(SecretarySettings::new("s1").with_deadline_reminder(10));
        let engine = ReviewEngine::new(MemoryStore::new().with_team(team, roster()));
        let id = save_request(&engine);
        engine.assign_reviewer(id, "r2", false, "secretary", now()).unwrap();

        let due = engine.secretary_reminders(day(10)).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].secretary, "s1");
        assert_eq!(due[0].reviewer, "r2");
        assert!(engine.secretary_reminders(day(11)).unwrap().is_empty());
    }

    /// Delegates to a [`MemoryStore`], imitating another writer that
    /// commits between our read and our commit.
    struct FaultyStore {
        inner: MemoryStore,
        /// Report the pointer one version behind.
        stale_pointer: bool,
        /// Rotation commits still to reject.
        failing_commits: AtomicUsize,
    }

    impl FaultyStore {
        fn stale(inner: MemoryStore) -> Self {
            Self {
                inner,
                stale_pointer: true,
                failing_commits: AtomicUsize::new(0),
            }
        }

        fn failing(inner: MemoryStore, commits: usize) -> Self {
            Self {
                inner,
                stale_pointer: false,
                failing_commits: AtomicUsize::new(commits),
            }
        }
    }

    impl ReviewStore for FaultyStore {
        fn teams(&self) -> StoreResult<Vec<TeamSettings>> {
            self.inner.teams()
        }
        fn team_settings(&self, team: &str) -> StoreResult<TeamSettings> {
            self.inner.team_settings(team)
        }
        fn roster(&self, team: &str) -> StoreResult<TeamRoster> {
            self.inner.roster(team)
        }
        fn rotation_pointer(&self, team: &str) -> StoreResult<Option<RotationPointer>> {
            let stale = self.stale_pointer;
            Ok(self.inner.rotation_pointer(team)?.map(|mut p| {
                if stale {
                    p.version -= 1;
                }
                p
            }))
        }
        fn commit_rotation(&self, commit: RotationCommit) -> StoreResult<u64> {
            let failing = self
                .failing_commits
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(StoreError::VersionConflict {
                    team: commit.team,
                    expected: commit.expected_version,
                    actual: commit.expected_version + 1,
                });
            }
            self.inner.commit_rotation(commit)
        }
        fn save_reviewer_settings(&self, team: &str, person: &str, settings: ReviewerSettings) -> StoreResult<()> {
            self.inner.save_reviewer_settings(team, person, settings)
        }
        fn assignment_history(&self, team: &str) -> StoreResult<Vec<AssignmentRecord>> {
            self.inner.assignment_history(team)
        }
        fn requests(&self, team: &str) -> StoreResult<Vec<ReviewRequest>> {
            self.inner.requests(team)
        }
        fn request(&self, id: u64) -> StoreResult<ReviewRequest> {
            self.inner.request(id)
        }
        fn save_request(&self, request: &ReviewRequest) -> StoreResult<u64> {
            self.inner.save_request(request)
        }
        fn assignment(&self, id: u64) -> StoreResult<ReviewAssignment> {
            self.inner.assignment(id)
        }
        fn assignments_for_request(&self, request_id: u64) -> StoreResult<Vec<ReviewAssignment>> {
            self.inner.assignments_for_request(request_id)
        }
        fn save_assignment(&self, assignment: &ReviewAssignment) -> StoreResult<u64> {
            self.inner.save_assignment(assignment)
        }
        fn document(&self, name: &str) -> StoreResult<DocumentSignals> {
            self.inner.document(name)
        }
        fn documents_in_last_call(&self) -> StoreResult<Vec<DocumentSignals>> {
            self.inner.documents_in_last_call()
        }
        fn documents_on_agenda(&self, dates: &[NaiveDate]) -> StoreResult<Vec<DocumentSignals>> {
            self.inner.documents_on_agenda(dates)
        }
        fn upcoming_agenda_dates(&self, from: NaiveDate, limit: usize) -> StoreResult<Vec<NaiveDate>> {
            self.inner.upcoming_agenda_dates(from, limit)
        }
        fn review_wishes(&self, team: &str) -> StoreResult<Vec<ReviewWish>> {
            self.inner.review_wishes(team)
        }
        fn record_events(&self, events: &[lifecycle::LifecycleEvent]) -> StoreResult<()> {
            self.inner.record_events(events)
        }
    }

    #[test]
    fn test_concurrent_update_is_retryable() {
        let store = MemoryStore::new().with_team(TeamSettings::new("secdir"), roster());
        let key: SortKey = Reviewer::new("r1", "Bea Brown").sort_key();
        store
            .commit_rotation(RotationCommit {
                team: "secdir".into(),
                expected_version: 0,
                next_reviewer: Some(key),
                settings: Vec::new(),
            })
            .unwrap();
        let engine = ReviewEngine::new(FaultyStore::stale(store));

        let err = engine.advance_rotation("secdir", "r1", true, now()).unwrap_err();
        assert!(matches!(err, ReviewError::ConcurrentUpdate { expected: 0, actual: 1, .. }));
        assert!(err.is_retryable());
        // Nothing was written.
        assert_eq!(engine.store().inner.roster("secdir").unwrap().skip_next("r1"), 0);
    }

    #[test]
    fn test_assignment_after_rotation_conflict_can_be_retried() {
        let store = MemoryStore::new().with_team(TeamSettings::new("secdir"), roster());
        let request = ReviewRequest::new("draft-a", "secdir", ReviewType::LastCall, day(20), "p9", now());
        let id = store.save_request(&request).unwrap();
        let engine = ReviewEngine::new(FaultyStore::failing(store, 1));

        let err = engine.assign_reviewer(id, "r0", false, "secretary", now()).unwrap_err();
        assert!(matches!(err, ReviewError::ConcurrentUpdate { .. }));
        assert!(err.is_retryable());

        let stored = &engine.store().inner;
        assert!(stored.assignments_for_request(id).unwrap().is_empty());
        assert_eq!(stored.request(id).unwrap().state, RequestState::Requested);
        assert!(stored.events().unwrap().is_empty());

        let retry = engine.assign_reviewer(id, "r0", false, "secretary", now()).unwrap();
        assert!(retry.is_applied());
        assert_eq!(stored.assignments_for_request(id).unwrap().len(), 1);
        assert_eq!(engine.build_rotation("secdir").unwrap(), vec!["r1", "r2", "r3", "r4", "r0"]);
    }
}
