//! Errors raised by the storyline core
//!
//! Every variant is recoverable: the operation that produced it left the
//! prior state untouched. Infrastructure code (persistence, config, CLI)
//! uses `anyhow` instead.

use crate::models::{ChallengeId, PlayerId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorylineError {
    #[error("challenge {challenge} lists unknown predecessor {predecessor}")]
    UnknownPredecessor {
        challenge: ChallengeId,
        predecessor: ChallengeId,
    },

    #[error("predecessors of challenge {challenge} would create a cycle through {via}")]
    CycleDetected {
        challenge: ChallengeId,
        via: ChallengeId,
    },

    #[error("challenge {0} not found")]
    NotFound(ChallengeId),

    #[error("challenge {0} already exists")]
    DuplicateChallenge(ChallengeId),

    #[error("challenge {challenge} has invalid max lifetime {minutes} (must be > 0)")]
    InvalidLifetime { challenge: ChallengeId, minutes: u32 },

    #[error("challenge {challenge} is locked for player {player}")]
    ChallengeLocked {
        player: PlayerId,
        challenge: ChallengeId,
    },

    #[error("challenge {challenge} has expired for player {player}")]
    ChallengeExpired {
        player: PlayerId,
        challenge: ChallengeId,
    },

    #[error("player {player} has not solved challenge {challenge}")]
    NotSolved {
        player: PlayerId,
        challenge: ChallengeId,
    },

    #[error("solution description must not be empty")]
    EmptyDescription,

    #[error("solution description is {len} characters, limit is {max}")]
    DescriptionTooLong { len: usize, max: usize },

    #[error("solution description for challenge {challenge} is finalized")]
    DescriptionFinalized {
        player: PlayerId,
        challenge: ChallengeId,
    },

    #[error("player {player} has no description for challenge {challenge}")]
    DescriptionMissing {
        player: PlayerId,
        challenge: ChallengeId,
    },
}

impl StorylineError {
    /// Stable machine-readable code for transport layers
    pub fn code(&self) -> &'static str {
        match self {
            StorylineError::UnknownPredecessor { .. } => "unknown_predecessor",
            StorylineError::CycleDetected { .. } => "cycle_detected",
            StorylineError::NotFound(_) => "not_found",
            StorylineError::DuplicateChallenge(_) => "duplicate_challenge",
            StorylineError::InvalidLifetime { .. } => "invalid_lifetime",
            StorylineError::ChallengeLocked { .. } => "challenge_locked",
            StorylineError::ChallengeExpired { .. } => "challenge_expired",
            StorylineError::NotSolved { .. } => "not_solved",
            StorylineError::EmptyDescription => "empty_description",
            StorylineError::DescriptionTooLong { .. } => "description_too_long",
            StorylineError::DescriptionFinalized { .. } => "description_finalized",
            StorylineError::DescriptionMissing { .. } => "description_missing",
        }
    }
}

pub type StorylineResult<T> = Result<T, StorylineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_snake_case() {
        let err = StorylineError::ChallengeLocked {
            player: PlayerId(1),
            challenge: ChallengeId(3),
        };
        assert_eq!(err.code(), "challenge_locked");
        assert_eq!(err.to_string(), "challenge 3 is locked for player 1");
    }
}
