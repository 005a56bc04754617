//! In-memory implementation of [`ReviewStore`].
//!
//! All data lives behind one `RwLock` and is lost when the store is dropped.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDate;

use super::{ReviewStore, RotationCommit, StoreError, StoreResult};
use crate::lifecycle::LifecycleEvent;
use crate::models::{
    AssignmentRecord, DocName, DocumentSignals, ReviewAssignment, ReviewRequest, ReviewWish,
    ReviewerSettings, RotationPointer, TeamId, TeamRoster, TeamSettings,
};

#[derive(Debug, Default)]
struct Inner {
    teams: BTreeMap<TeamId, TeamSettings>,
    rosters: HashMap<TeamId, TeamRoster>,
    pointers: HashMap<TeamId, RotationPointer>,
    requests: BTreeMap<u64, ReviewRequest>,
    assignments: BTreeMap<u64, ReviewAssignment>,
    documents: BTreeMap<DocName, DocumentSignals>,
    agenda_dates: BTreeSet<NaiveDate>,
    wishes: Vec<ReviewWish>,
    events: Vec<LifecycleEvent>,
    last_id: u64,
}

impl Inner {
    fn allocate_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }
}

/// In-memory review store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a team with its roster.
    pub fn with_team(mut self, settings: TeamSettings, roster: TeamRoster) -> Self {
        let inner = self.inner_mut();
        inner.rosters.insert(settings.team.clone(), roster);
        inner.teams.insert(settings.team.clone(), settings);
        self
    }

    /// Adds a document. Its agenda events do not register agenda dates;
    /// use [`MemoryStore::with_agenda_date`] for those.
    pub fn with_document(mut self, doc: DocumentSignals) -> Self {
        self.inner_mut().documents.insert(doc.name.clone(), doc);
        self
    }

    /// Adds a scheduled agenda date.
    pub fn with_agenda_date(mut self, date: NaiveDate) -> Self {
        self.inner_mut().agenda_dates.insert(date);
        self
    }

    /// Adds a review wish.
    pub fn with_wish(mut self, wish: ReviewWish) -> Self {
        self.inner_mut().wishes.push(wish);
        self
    }

    /// Recorded history events, oldest first.
    pub fn events(&self) -> StoreResult<Vec<LifecycleEvent>> {
        Ok(self.read()?.events.clone())
    }

    fn inner_mut(&mut self) -> &mut Inner {
        self.inner.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Inner>> {
        self.inner.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Inner>> {
        self.inner.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl ReviewStore for MemoryStore {
    fn teams(&self) -> StoreResult<Vec<TeamSettings>> {
        Ok(self.read()?.teams.values().cloned().collect())
    }

    fn team_settings(&self, team: &str) -> StoreResult<TeamSettings> {
        self.read()?
            .teams
            .get(team)
            .cloned()
            .ok_or_else(|| StoreError::not_found("team", team))
    }

    fn roster(&self, team: &str) -> StoreResult<TeamRoster> {
        self.read()?
            .rosters
            .get(team)
            .cloned()
            .ok_or_else(|| StoreError::not_found("team", team))
    }

    fn rotation_pointer(&self, team: &str) -> StoreResult<Option<RotationPointer>> {
        Ok(self.read()?.pointers.get(team).cloned())
    }

    fn commit_rotation(&self, commit: RotationCommit) -> StoreResult<u64> {
        let mut inner = self.write()?;

        let actual = inner.pointers.get(&commit.team).map_or(0, |p| p.version);
        if actual != commit.expected_version {
            return Err(StoreError::VersionConflict {
                team: commit.team,
                expected: commit.expected_version,
                actual,
            });
        }

        let roster = inner
            .rosters
            .get_mut(&commit.team)
            .ok_or_else(|| StoreError::not_found("team", &commit.team))?;
        for (person, settings) in commit.settings {
            roster.settings.insert(person, settings);
        }

        let Some(next_reviewer) = commit.next_reviewer else {
            return Ok(actual);
        };
        let version = actual + 1;
        inner.pointers.insert(
            commit.team.clone(),
            RotationPointer {
                team: commit.team,
                next_reviewer,
                version,
            },
        );
        Ok(version)
    }

    fn save_reviewer_settings(
        &self,
        team: &str,
        person: &str,
        settings: ReviewerSettings,
    ) -> StoreResult<()> {
        let mut inner = self.write()?;
        let roster = inner
            .rosters
            .get_mut(team)
            .ok_or_else(|| StoreError::not_found("team", team))?;
        roster.settings.insert(person.to_string(), settings);
        Ok(())
    }

    fn assignment_history(&self, team: &str) -> StoreResult<Vec<AssignmentRecord>> {
        let inner = self.read()?;
        let records = inner
            .assignments
            .values()
            .filter_map(|assignment| {
                let request = inner.requests.get(&assignment.request_id)?;
                if request.team != team {
                    return None;
                }
                let doc_pages = inner.documents.get(&request.doc).map_or(0, |d| d.pages);
                Some(AssignmentRecord {
                    assignment: assignment.clone(),
                    team: request.team.clone(),
                    doc: request.doc.clone(),
                    doc_pages,
                    deadline: request.deadline,
                    request_time: request.time,
                })
            })
            .collect();
        Ok(records)
    }

    fn requests(&self, team: &str) -> StoreResult<Vec<ReviewRequest>> {
        Ok(self
            .read()?
            .requests
            .values()
            .filter(|r| r.team == team)
            .cloned()
            .collect())
    }

    fn request(&self, id: u64) -> StoreResult<ReviewRequest> {
        self.read()?
            .requests
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("request", id))
    }

    fn save_request(&self, request: &ReviewRequest) -> StoreResult<u64> {
        let mut inner = self.write()?;
        let id = match request.id {
            Some(id) => id,
            None => inner.allocate_id(),
        };
        let mut stored = request.clone();
        stored.id = Some(id);
        inner.requests.insert(id, stored);
        Ok(id)
    }

    fn assignment(&self, id: u64) -> StoreResult<ReviewAssignment> {
        self.read()?
            .assignments
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("assignment", id))
    }

    fn assignments_for_request(&self, request_id: u64) -> StoreResult<Vec<ReviewAssignment>> {
        Ok(self
            .read()?
            .assignments
            .values()
            .filter(|a| a.request_id == request_id)
            .cloned()
            .collect())
    }

    fn save_assignment(&self, assignment: &ReviewAssignment) -> StoreResult<u64> {
        let mut inner = self.write()?;
        if !inner.requests.contains_key(&assignment.request_id) {
            return Err(StoreError::not_found("request", assignment.request_id));
        }
        let id = match assignment.id {
            Some(id) => id,
            None => inner.allocate_id(),
        };
        let mut stored = assignment.clone();
        stored.id = Some(id);
        inner.assignments.insert(id, stored);
        Ok(id)
    }

    fn document(&self, name: &str) -> StoreResult<DocumentSignals> {
        let inner = self.read()?;
        if let Some(doc) = inner.documents.get(name) {
            return Ok(doc.clone());
        }
        inner
            .documents
            .values()
            .find(|d| d.aliases.iter().any(|a| a == name))
            .cloned()
            .ok_or_else(|| StoreError::not_found("document", name))
    }

    fn documents_in_last_call(&self) -> StoreResult<Vec<DocumentSignals>> {
        Ok(self
            .read()?
            .documents
            .values()
            .filter(|d| d.in_last_call)
            .cloned()
            .collect())
    }

    fn documents_on_agenda(&self, dates: &[NaiveDate]) -> StoreResult<Vec<DocumentSignals>> {
        Ok(self
            .read()?
            .documents
            .values()
            .filter(|d| {
                d.agenda_events
                    .iter()
                    .any(|e| e.agenda_date.is_some_and(|date| dates.contains(&date)))
            })
            .cloned()
            .collect())
    }

    fn upcoming_agenda_dates(&self, from: NaiveDate, limit: usize) -> StoreResult<Vec<NaiveDate>> {
        Ok(self
            .read()?
            .agenda_dates
            .range(from..)
            .take(limit)
            .copied()
            .collect())
    }

    fn review_wishes(&self, team: &str) -> StoreResult<Vec<ReviewWish>> {
        Ok(self
            .read()?
            .wishes
            .iter()
            .filter(|w| w.team == team)
            .cloned()
            .collect())
    }

    fn record_events(&self, events: &[LifecycleEvent]) -> StoreResult<()> {
        self.write()?.events.extend_from_slice(events);
        Ok(())
    }
}
