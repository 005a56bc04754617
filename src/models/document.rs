//! Document facts consumed by ranking and auto-suggestion.
//!
//! The engine never stores documents. A [`DocumentSignals`] value is a
//! read-only snapshot handed over by the document store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{DocName, PersonId};

/// A person holding a role in the document's group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRole {
    /// Role holder.
    pub person: PersonId,
    /// Role name (e.g. `chair`, `secr`).
    pub role: String,
}

/// The last-call announcement of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastCallEvent {
    /// When last call was issued.
    pub time: DateTime<Utc>,
    /// Last-call expiry date.
    pub expires: Option<NaiveDate>,
}

/// A decision-agenda scheduling event.
///
/// A document may be scheduled and rescheduled; only its most recent event
/// counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgendaEvent {
    /// Event id, breaks ties between events with the same time.
    pub id: u64,
    /// When the scheduling decision was made.
    pub time: DateTime<Utc>,
    /// Agenda date. `None` = removed from the agenda.
    pub agenda_date: Option<NaiveDate>,
}

/// Snapshot of everything the engine needs to know about a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSignals {
    /// Canonical name.
    pub name: DocName,
    /// Additional names the document is known by.
    pub aliases: Vec<String>,
    /// Current revision.
    pub rev: String,
    /// Page count.
    pub pages: u32,
    /// Publication stream (e.g. `ietf`, `ise`).
    pub stream: Option<String>,
    /// Owning group acronym.
    pub group: Option<String>,
    /// Role holders of the owning group.
    pub group_roles: Vec<GroupRole>,
    /// Document shepherd.
    pub shepherd: Option<PersonId>,
    /// Authors.
    pub authors: Vec<PersonId>,
    /// Responsible Area Director.
    pub ad: Option<PersonId>,
    /// Whether the document is currently in last call.
    pub in_last_call: bool,
    /// Most recent last-call announcement.
    pub last_call: Option<LastCallEvent>,
    /// Agenda scheduling history.
    pub agenda_events: Vec<AgendaEvent>,
}

impl DocumentSignals {
    /// Creates a snapshot with no connections or milestones.
    pub fn new(name: impl Into<DocName>, rev: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            rev: rev.into(),
            pages: 0,
            stream: None,
            group: None,
            group_roles: Vec::new(),
            shepherd: None,
            authors: Vec::new(),
            ad: None,
            in_last_call: false,
            last_call: None,
            agenda_events: Vec::new(),
        }
    }

    /// Adds an alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Sets the page count.
    pub fn with_pages(mut self, pages: u32) -> Self {
        self.pages = pages;
        self
    }

    /// Sets the stream.
    pub fn with_stream(mut self, stream: impl Into<String>) -> Self {
        self.stream = Some(stream.into());
        self
    }

    /// Sets the owning group.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Adds a group role holder.
    pub fn with_group_role(mut self, person: impl Into<PersonId>, role: impl Into<String>) -> Self {
        self.group_roles.push(GroupRole {
            person: person.into(),
            role: role.into(),
        });
        self
    }

    /// Sets the shepherd.
    pub fn with_shepherd(mut self, person: impl Into<PersonId>) -> Self {
        self.shepherd = Some(person.into());
        self
    }

    /// Adds an author.
    pub fn with_author(mut self, person: impl Into<PersonId>) -> Self {
        self.authors.push(person.into());
        self
    }

    /// Sets the responsible AD.
    pub fn with_ad(mut self, person: impl Into<PersonId>) -> Self {
        self.ad = Some(person.into());
        self
    }

    /// Puts the document in last call.
    pub fn in_last_call(mut self, time: DateTime<Utc>, expires: Option<NaiveDate>) -> Self {
        self.in_last_call = true;
        self.last_call = Some(LastCallEvent { time, expires });
        self
    }

    /// Records an agenda scheduling event.
    pub fn with_agenda_event(
        mut self,
        id: u64,
        time: DateTime<Utc>,
        agenda_date: Option<NaiveDate>,
    ) -> Self {
        self.agenda_events.push(AgendaEvent {
            id,
            time,
            agenda_date,
        });
        self
    }

    /// Name plus aliases, as matched by filter patterns.
    pub fn all_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Most recent agenda event (by time, then id).
    pub fn latest_agenda_event(&self) -> Option<&AgendaEvent> {
        self.agenda_events.iter().max_by_key(|e| (e.time, e.id))
    }

    /// Whether the document belongs to one of `streams`.
    pub fn in_stream(&self, streams: &[String]) -> bool {
        self.stream
            .as_deref()
            .is_some_and(|s| streams.iter().any(|u| u == s))
    }

    /// The closest connection `person` has to this document, if any.
    ///
    /// Authorship beats shepherding, which beats a group role, which beats
    /// being the responsible AD.
    pub fn connection_of(&self, person: &str) -> Option<Connection> {
        if self.authors.iter().any(|a| a == person) {
            return Some(Connection::Author);
        }
        if self.shepherd.as_deref() == Some(person) {
            return Some(Connection::Shepherd);
        }
        if let Some(r) = self.group_roles.iter().find(|r| r.person == person) {
            return Some(Connection::GroupRole(r.role.clone()));
        }
        if self.ad.as_deref() == Some(person) {
            return Some(Connection::AreaDirector);
        }
        None
    }
}

/// A conflict-of-interest relationship between a person and a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Connection {
    /// Document author.
    Author,
    /// Document shepherd.
    Shepherd,
    /// Role holder in the document's group.
    GroupRole(String),
    /// Responsible Area Director.
    AreaDirector,
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Author => write!(f, "is author of document"),
            Self::Shepherd => write!(f, "is shepherd of document"),
            Self::GroupRole(role) => write!(f, "is group {role}"),
            Self::AreaDirector => write!(f, "is associated Area Director"),
        }
    }
}
