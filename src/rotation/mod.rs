//! Team rotation: ordering, availability filtering and advancement.
//!
//! # Usage
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use u_review::models::{Reviewer, TeamRoster};
//! use u_review::rotation::{build_rotation, plan_advance, AvailabilityFilter};
//!
//! let roster = TeamRoster::new("secdir")
//!     .with_reviewer(Reviewer::new("a", "Alice Adams"))
//!     .with_reviewer(Reviewer::new("b", "Bob Baker"));
//! let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
//!
//! let rotation = build_rotation(&roster.reviewers, None);
//! let filtered = AvailabilityFilter::new(&roster, &[], now).filter(&rotation, &["a"]);
//! let plan = plan_advance(&filtered, &roster, "a", false);
//!
//! assert_eq!(plan.next_id(), Some("b"));
//! ```

mod advancer;
mod builder;
mod filter;

pub use advancer::{plan_advance, AdvanceOutcome, AdvancePlan};
pub use builder::build_rotation;
pub use filter::AvailabilityFilter;
