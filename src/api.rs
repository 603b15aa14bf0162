//! Transport-agnostic boundary
//!
//! JSON shapes (camelCase) for the admin challenge listing, the player graph
//! query and solution description submission. Any HTTP layer only needs to
//! authenticate the player and move these values across the wire; all
//! validation happens in the core.

use crate::engine::Storyline;
use crate::error::StorylineError;
use crate::models::{ChallengeId, ChallengeStatus, PlayerId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeListing {
    pub id: ChallengeId,
    pub name: String,
    pub category: Option<String>,
    pub predecessor_ids: Vec<ChallengeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerGraphEntry {
    pub challenge_id: ChallengeId,
    pub status: ChallengeStatus,
    pub predecessor_ids: Vec<ChallengeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionSubmission {
    pub challenge_id: ChallengeId,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub success: bool,
    /// Stable error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Human-readable explanation of `error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SubmissionResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            message: None,
        }
    }

    fn failed(code: &str, message: String) -> Self {
        Self {
            success: false,
            error: Some(code.to_string()),
            message: Some(message),
        }
    }
}

impl From<StorylineError> for SubmissionResponse {
    fn from(e: StorylineError) -> Self {
        Self::failed(e.code(), e.to_string())
    }
}

/// Admin challenge listing
pub fn list_challenges(storyline: &Storyline) -> Vec<ChallengeListing> {
    storyline
        .snapshot()
        .challenges()
        .map(|c| ChallengeListing {
            id: c.id,
            name: c.name.clone(),
            category: c.category.clone(),
            predecessor_ids: c.predecessors.iter().copied().collect(),
        })
        .collect()
}

/// Player graph query
pub fn player_graph(storyline: &Storyline, player: PlayerId) -> Vec<PlayerGraphEntry> {
    storyline
        .queries()
        .player_view(player)
        .challenges
        .into_iter()
        .map(|c| PlayerGraphEntry {
            challenge_id: c.challenge_id,
            status: c.status,
            predecessor_ids: c.predecessor_ids,
        })
        .collect()
}

/// Solution description submission for the authenticated `player`
pub fn submit_description(
    storyline: &Storyline,
    player: PlayerId,
    submission: DescriptionSubmission,
) -> SubmissionResponse {
    match storyline.submit_description(player, submission.challenge_id, &submission.description) {
        Ok(()) => SubmissionResponse::ok(),
        Err(e) => e.into(),
    }
}

/// [`submit_description`] taking the raw JSON request body
pub fn submit_description_json(
    storyline: &Storyline,
    player: PlayerId,
    body: &str,
) -> SubmissionResponse {
    match serde_json::from_str::<DescriptionSubmission>(body) {
        Ok(submission) => submit_description(storyline, player, submission),
        Err(e) => SubmissionResponse::failed("invalid_request", e.to_string()),
    }
}
