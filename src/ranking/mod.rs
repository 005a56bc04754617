//! Reviewer suggestion ranking.
//!
//! Orders candidate reviewers for a review request. Each [`Signal`]
//! contributes one integer score; candidates are compared on the score
//! tuple lexicographically, most significant signal first, higher first.
//!
//! # Usage
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use u_review::models::{DocumentSignals, Reviewer, TeamRoster};
//! use u_review::ranking::{Ranker, RankingContext};
//!
//! let roster = TeamRoster::new("secdir")
//!     .with_reviewer(Reviewer::new("a", "Alice Adams"))
//!     .with_reviewer(Reviewer::new("b", "Bob Baker"));
//! let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
//! let doc = DocumentSignals::new("draft-ietf-quic-transport", "03").with_author("a");
//!
//! let ctx = RankingContext::at_time(now, doc).with_rotation(vec!["a".into(), "b".into()]);
//! let ranked = Ranker::new().rank(&roster.reviewers, &roster, &ctx);
//!
//! assert_eq!(ranked[0].person, "b");
//! assert!(ranked[1].label.contains("is author of document"));
//! ```

mod context;
mod ranker;

pub use context::RankingContext;
pub use ranker::{RankedReviewer, Ranker};

use serde::{Deserialize, Serialize};

/// Score contributed by one signal. Higher = more suitable.
pub type SignalScore = i64;

/// A ranking criterion.
///
/// Listed in the order of [`Signal::STANDARD`], which is also the order of
/// significance used by [`Ranker::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    /// −1 while unavailable for this document, +1 otherwise.
    Availability,
    /// +1 if the reviewer completed a review of this document before.
    ReviewedBefore,
    /// +1 if the reviewer wishes to review this document.
    Wish,
    /// −1 if the reviewer is connected to the document (author, shepherd...).
    Connection,
    /// −1 if the reviewer's filter pattern matches a document name.
    FilterMatch,
    /// Minus the days left before the minimum interval is satisfied.
    FrequencyDebt,
    /// Minus the skip counter.
    SkipDebt,
    /// Minus the position in the rotation.
    RotationPosition,
}

impl Signal {
    /// All signals, most significant first.
    pub const STANDARD: [Signal; 8] = [
        Self::Availability,
        Self::ReviewedBefore,
        Self::Wish,
        Self::Connection,
        Self::FilterMatch,
        Self::FrequencyDebt,
        Self::SkipDebt,
        Self::RotationPosition,
    ];

    /// Short name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Availability => "availability",
            Self::ReviewedBefore => "reviewed-before",
            Self::Wish => "wish",
            Self::Connection => "connection",
            Self::FilterMatch => "filter-match",
            Self::FrequencyDebt => "frequency-debt",
            Self::SkipDebt => "skip-debt",
            Self::RotationPosition => "rotation-position",
        }
    }
}

/// Score of a yes/no signal: `direction` when `holds`, `-direction` otherwise.
#[inline]
fn boolean_score(direction: SignalScore, holds: bool) -> SignalScore {
    if holds {
        direction
    } else {
        -direction
    }
}
