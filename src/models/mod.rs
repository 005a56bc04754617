//! Review domain models.
//!
//! Plain data types shared by every other module. They carry no storage
//! logic; the [`crate::store`] layer persists them.
//!
//! # Domain Mappings
//!
//! | u-review | Meaning |
//! |----------|---------|
//! | Reviewer | Person holding the reviewer role in a team |
//! | ReviewRequest | A team's pending or closed review of a document |
//! | ReviewAssignment | One reviewer's attempt at a request |
//! | RotationPointer | Who the team's round-robin considers first |
//! | UnavailablePeriod | Dated window without new assignments |

mod assignment;
mod availability;
mod document;
mod request;
mod reviewer;
mod roster;
mod team;

pub use assignment::{AssignmentRecord, AssignmentState, ReviewAssignment};
pub use availability::{
    active_periods_for, periods_to_list, Availability, PeriodState, UnavailablePeriod,
};
pub use document::{AgendaEvent, Connection, DocumentSignals, GroupRole, LastCallEvent};
pub use request::{RequestState, ReviewRequest};
pub use reviewer::{ReviewWish, Reviewer, ReviewerSettings, SortKey};
pub use roster::TeamRoster;
pub use team::{ReviewType, RotationPointer, SecretarySettings, TeamSettings};

/// Person identifier.
pub type PersonId = String;

/// Team identifier (acronym).
pub type TeamId = String;

/// Document name.
pub type DocName = String;
