//! Review team scheduling engine.
//!
//! Decides who reviews what in a review team: keeps a fair round-robin
//! rotation of reviewers, filters out people who are unavailable or were
//! assigned too recently, ranks candidates for a specific document, proposes
//! review requests for documents reaching last call or a decision agenda,
//! and drives requests and assignments through their lifecycle.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Reviewer`, `ReviewerSettings`,
//!   `UnavailablePeriod`, `ReviewRequest`, `ReviewAssignment`,
//!   `RotationPointer`, `DocumentSignals`
//! - **`rotation`**: Rotation order, availability filter, advancement
//! - **`ranking`**: Signal-based ordering of candidate reviewers
//! - **`suggestion`**: Review requests proposed from document milestones
//! - **`lifecycle`**: Request and assignment state machine
//! - **`stats`**: Workload and period statistics
//! - **`reminders`**: Deadline reminders and open-review digests
//! - **`validation`**: Roster and settings checks
//! - **`store`**: Persistence trait and in-memory backend
//! - **`engine`**: Facade combining the above over a store
//!
//! # Usage
//!
//! ```
//! use chrono::{NaiveDate, TimeZone, Utc};
//! use u_review::models::{DocumentSignals, ReviewRequest, ReviewType, Reviewer, TeamRoster, TeamSettings};
//! use u_review::store::{MemoryStore, ReviewStore};
//! use u_review::ReviewEngine;
//!
//! let roster = TeamRoster::new("secdir")
//!     .with_reviewer(Reviewer::new("a", "Alice Adams"))
//!     .with_reviewer(Reviewer::new("b", "Bob Baker"));
//! let store = MemoryStore::new()
//!     .with_team(TeamSettings::new("secdir"), roster)
//!     .with_document(DocumentSignals::new("draft-ietf-quic-transport", "03"));
//! let engine = ReviewEngine::new(store);
//! let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
//!
//! let request = ReviewRequest::new(
//!     "draft-ietf-quic-transport",
//!     "secdir",
//!     ReviewType::LastCall,
//!     NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
//!     "secretary",
//!     now,
//! );
//! let id = engine.store().save_request(&request).unwrap();
//!
//! let ranked = engine.rank(&request, now).unwrap();
//! engine.assign_reviewer(id, &ranked[0].person, false, "secretary", now).unwrap();
//!
//! assert_eq!(engine.build_rotation("secdir").unwrap(), vec!["b", "a"]);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod ranking;
pub mod reminders;
pub mod rotation;
pub mod stats;
pub mod store;
pub mod suggestion;
pub mod validation;

pub use config::EngineConfig;
pub use engine::ReviewEngine;
pub use error::{ReviewError, ReviewResult};
pub use lifecycle::{Completion, LifecycleEvent, Transition};
