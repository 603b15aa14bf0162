//! Core data models shared by every storyline component

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Challenge identifier (matches the platform's integer challenge ids)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChallengeId(pub u64);

impl fmt::Display for ChallengeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChallengeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Player identifier (user or team, as the platform decides)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PlayerId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A challenge node in the storyline graph
///
/// `name` and `category` belong to the presentation layer and are carried
/// opaquely. Only `predecessors` and `max_lifetime` influence unlocking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: ChallengeId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    /// Challenges that must all be solved before this one unlocks
    #[serde(default)]
    pub predecessors: BTreeSet<ChallengeId>,
    /// Minutes the challenge stays solvable after it unlocks (None = forever)
    #[serde(default)]
    pub max_lifetime: Option<u32>,
}

impl Challenge {
    pub fn new(id: impl Into<ChallengeId>, name: &str) -> Self {
        Self {
            id: id.into(),
            name: name.to_string(),
            category: None,
            predecessors: BTreeSet::new(),
            max_lifetime: None,
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn with_predecessor(mut self, id: impl Into<ChallengeId>) -> Self {
        self.predecessors.insert(id.into());
        self
    }

    pub fn with_predecessors<I, T>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ChallengeId>,
    {
        self.predecessors.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_max_lifetime(mut self, minutes: u32) -> Self {
        self.max_lifetime = Some(minutes);
        self
    }

    /// Root challenges have no predecessors and are always unlocked
    pub fn is_root(&self) -> bool {
        self.predecessors.is_empty()
    }

    pub fn is_timed(&self) -> bool {
        self.max_lifetime.is_some()
    }
}

/// A validated solve. Created once per (player, challenge), never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSolveRecord {
    pub player: PlayerId,
    pub challenge: ChallengeId,
    pub solved_at: DateTime<Utc>,
}

/// A player's free-text reflection on a solved challenge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionDescription {
    pub player: PlayerId,
    pub challenge: ChallengeId,
    pub text: String,
    pub submitted_at: DateTime<Utc>,
    /// Set once a collaborator closes the submission window
    #[serde(default)]
    pub finalized: bool,
}

/// Per-(player, challenge) status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
    Locked,
    Unlocked,
    Solved,
    /// Timed challenge whose window closed before it was solved
    Expired,
}

impl ChallengeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeStatus::Locked => "locked",
            ChallengeStatus::Unlocked => "unlocked",
            ChallengeStatus::Solved => "solved",
            ChallengeStatus::Expired => "expired",
        }
    }

    /// Whether descriptive metadata may be shown to the player
    pub fn is_visible(&self) -> bool {
        !matches!(self, ChallengeStatus::Locked)
    }
}

impl fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
