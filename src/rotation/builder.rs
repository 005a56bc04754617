//! Rotation list construction.
//!
//! # Algorithm
//! 1. Sort the roster by [`SortKey`] (surname, full name, id).
//! 2. Find the pointer's position: its index if present, otherwise the
//!    index its key would take in the sorted list (after equal keys).
//! 3. Rotate so that position comes first; a position past the end wraps
//!    to the start.

use crate::models::{PersonId, Reviewer, SortKey};

/// Builds a team's rotation order, next reviewer first.
///
/// The pointer need not be a current roster member: a departed reviewer
/// still marks the place in the alphabet where the rotation resumes.
///
/// # Example
/// ```
/// use u_review::models::Reviewer;
/// use u_review::rotation::build_rotation;
///
/// let roster = vec![
///     Reviewer::new("c", "Carol Crane"),
///     Reviewer::new("a", "Alice Adams"),
///     Reviewer::new("b", "Bob Baker"),
/// ];
/// let pointer = Reviewer::new("x", "Xavier Bell").sort_key();
///
/// assert_eq!(build_rotation(&roster, Some(&pointer)), vec!["c", "a", "b"]);
/// ```
pub fn build_rotation(roster: &[Reviewer], pointer: Option<&SortKey>) -> Vec<PersonId> {
    let mut keyed: Vec<SortKey> = roster.iter().map(Reviewer::sort_key).collect();
    keyed.sort();
    keyed.dedup_by(|a, b| a.id == b.id);

    if keyed.is_empty() {
        return Vec::new();
    }

    let start = match pointer {
        None => 0,
        Some(p) => match keyed.iter().position(|k| k.id == p.id) {
            Some(index) => index,
            None => keyed.partition_point(|k| k <= p) % keyed.len(),
        },
    };

    keyed.rotate_left(start);
    keyed.into_iter().map(|k| k.id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<Reviewer> {
        vec![
            Reviewer::new("r3", "Dan Dunn"),
            Reviewer::new("r0", "Ann Abbot"),
            Reviewer::new("r2", "Cal Cook"),
            Reviewer::new("r1", "Bea Brown"),
            Reviewer::new("r4", "Eve Ellis"),
        ]
    }

    #[test]
    fn test_no_pointer_is_canonical_order() {
        assert_eq!(build_rotation(&roster(), None), vec!["r0", "r1", "r2", "r3", "r4"]);
    }

    #[test]
    fn test_present_pointer_comes_first() {
        let pointer = Reviewer::new("r2", "Cal Cook").sort_key();
        assert_eq!(
            build_rotation(&roster(), Some(&pointer)),
            vec!["r2", "r3", "r4", "r0", "r1"]
        );
    }

    #[test]
    fn test_absent_pointer_reinserted_by_key() {
        // "Cox" sorts between Cook and Dunn.
        let gone = Reviewer::new("gone", "Cid Cox").sort_key();
        assert_eq!(
            build_rotation(&roster(), Some(&gone)),
            vec!["r3", "r4", "r0", "r1", "r2"]
        );
    }

    #[test]
    fn test_absent_pointer_past_end_wraps() {
        let gone = Reviewer::new("gone", "Zoe Zimmer").sort_key();
        assert_eq!(build_rotation(&roster(), Some(&gone))[0], "r0");
    }

    #[test]
    fn test_idempotent() {
        let pointer = Reviewer::new("r4", "Eve Ellis").sort_key();
        let first = build_rotation(&roster(), Some(&pointer));
        let second = build_rotation(&roster(), Some(&pointer));
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_roster() {
        let pointer = Reviewer::new("r1", "Bea Brown").sort_key();
        assert!(build_rotation(&[], Some(&pointer)).is_empty());
    }
}
