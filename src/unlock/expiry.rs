//! Time-limited challenges
//!
//! A timed challenge opens when the last of its predecessors is solved and
//! stays solvable for `max_lifetime` minutes. Roots never expire, neither do
//! solved challenges.

use crate::graph::GraphSnapshot;
use crate::models::{Challenge, ChallengeId};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, BTreeSet};

/// Solve timestamps of one player
pub type SolveTimes = BTreeMap<ChallengeId, DateTime<Utc>>;

/// When the challenge unlocked for this player, if it has
pub fn unlocked_at(challenge: &Challenge, solves: &SolveTimes) -> Option<DateTime<Utc>> {
    challenge
        .predecessors
        .iter()
        .map(|p| solves.get(p).copied())
        .collect::<Option<Vec<_>>>()?
        .into_iter()
        .max()
}

/// End of the solve window (None for untimed challenges or roots).
///
/// A window ending past the representable range never closes.
pub fn expires_at(challenge: &Challenge, solves: &SolveTimes) -> Option<DateTime<Utc>> {
    let minutes = challenge.max_lifetime?;
    let opened = unlocked_at(challenge, solves)?;
    opened.checked_add_signed(Duration::minutes(i64::from(minutes)))
}

pub fn is_expired(challenge: &Challenge, solves: &SolveTimes, now: DateTime<Utc>) -> bool {
    if solves.contains_key(&challenge.id) {
        return false;
    }
    expires_at(challenge, solves).is_some_and(|end| now > end)
}

/// Whole minutes left in the window, clamped at zero
pub fn minutes_remaining(
    challenge: &Challenge,
    solves: &SolveTimes,
    now: DateTime<Utc>,
) -> Option<i64> {
    expires_at(challenge, solves).map(|end| (end - now).num_minutes().max(0))
}

/// Unlocked, unsolved timed challenges whose window has closed
pub fn expired_set(
    solves: &SolveTimes,
    graph: &GraphSnapshot,
    now: DateTime<Utc>,
) -> BTreeSet<ChallengeId> {
    graph
        .challenges()
        .filter(|c| c.is_timed() && is_expired(c, solves, now))
        .map(|c| c.id)
        .collect()
}
