//! Read-only view types returned by the query facade

use crate::models::{Challenge, ChallengeId, ChallengeStatus, PlayerId};
use serde::{Deserialize, Serialize};

/// One challenge as administrators see it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminChallenge {
    pub id: ChallengeId,
    pub name: String,
    pub category: Option<String>,
    pub predecessor_ids: Vec<ChallengeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_lifetime: Option<u32>,
}

impl From<&Challenge> for AdminChallenge {
    fn from(c: &Challenge) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            category: c.category.clone(),
            predecessor_ids: c.predecessors.iter().copied().collect(),
            max_lifetime: c.max_lifetime,
        }
    }
}

/// Admin listing plus the predecessors that may be offered in an editor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminView {
    pub version: u64,
    pub challenges: Vec<AdminChallenge>,
    pub candidate_predecessors: Vec<ChallengeId>,
}

/// Edge pointing from a predecessor to the challenge it gates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: ChallengeId,
    pub to: ChallengeId,
}

impl From<(ChallengeId, ChallengeId)> for GraphEdge {
    fn from((from, to): (ChallengeId, ChallengeId)) -> Self {
        Self { from, to }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminGraph {
    pub version: u64,
    pub nodes: Vec<AdminChallenge>,
    pub edges: Vec<GraphEdge>,
    pub roots: Vec<ChallengeId>,
}

/// One challenge as a player sees it. Name and category are withheld while
/// the challenge is locked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerChallenge {
    pub challenge_id: ChallengeId,
    pub status: ChallengeStatus,
    pub predecessor_ids: Vec<ChallengeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Only for unlocked timed challenges
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes_remaining: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub player: PlayerId,
    pub version: u64,
    pub challenges: Vec<PlayerChallenge>,
    pub edges: Vec<GraphEdge>,
}

impl PlayerView {
    pub fn status_of(&self, id: ChallengeId) -> Option<ChallengeStatus> {
        self.challenges
            .iter()
            .find(|c| c.challenge_id == id)
            .map(|c| c.status)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProgress {
    pub player: PlayerId,
    pub unlocked_count: usize,
    pub solved_count: usize,
    pub expired_count: usize,
    pub total_challenges: usize,
    /// Solved share of the graph, rounded to two decimals
    pub progress_percentage: f64,
    pub unlocked: Vec<ChallengeId>,
    pub solved: Vec<ChallengeId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorylineStats {
    pub version: u64,
    pub total_challenges: usize,
    pub root_challenges: usize,
    pub timed_challenges: usize,
    pub edges: usize,
    /// Challenges on the longest predecessor chain
    pub max_depth: usize,
    pub players: usize,
    pub solves: usize,
    pub descriptions: usize,
}
