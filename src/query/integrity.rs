//! Storyline integrity scan
//!
//! A graph that went through `GraphStore` is always clean. The scan exists
//! for raw definition files (before import) and as an admin sanity check.

use crate::graph::GraphSnapshot;
use crate::models::ChallengeId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityIssue {
    Cycle {
        members: Vec<ChallengeId>,
    },
    DanglingPredecessor {
        challenge: ChallengeId,
        predecessor: ChallengeId,
    },
    InvalidLifetime {
        challenge: ChallengeId,
        minutes: u32,
    },
    /// Non-empty graph with nothing unlocked at the start
    NoRoots,
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityIssue::Cycle { members } => {
                let ids: Vec<String> = members.iter().map(|m| m.to_string()).collect();
                write!(f, "cycle through challenges {}", ids.join(", "))
            }
            IntegrityIssue::DanglingPredecessor {
                challenge,
                predecessor,
            } => write!(
                f,
                "challenge {} references non-existent predecessor {}",
                challenge, predecessor
            ),
            IntegrityIssue::InvalidLifetime { challenge, minutes } => write!(
                f,
                "challenge {} has invalid max lifetime: {}",
                challenge, minutes
            ),
            IntegrityIssue::NoRoots => write!(f, "no root challenges: nothing is ever unlocked"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityReport {
    pub valid: bool,
    pub challenge_count: usize,
    pub root_count: usize,
    pub issues: Vec<IntegrityIssue>,
}

impl IntegrityReport {
    pub fn scan(graph: &GraphSnapshot) -> Self {
        let mut issues = Vec::new();

        for challenge in graph.challenges() {
            for pred in &challenge.predecessors {
                if !graph.contains(*pred) {
                    issues.push(IntegrityIssue::DanglingPredecessor {
                        challenge: challenge.id,
                        predecessor: *pred,
                    });
                }
            }
            if challenge.max_lifetime == Some(0) {
                issues.push(IntegrityIssue::InvalidLifetime {
                    challenge: challenge.id,
                    minutes: 0,
                });
            }
        }

        issues.extend(
            graph
                .find_cycles()
                .into_iter()
                .map(|members| IntegrityIssue::Cycle { members }),
        );

        let root_count = graph.roots().len();
        if root_count == 0 && !graph.is_empty() {
            issues.push(IntegrityIssue::NoRoots);
        }

        Self {
            valid: issues.is_empty(),
            challenge_count: graph.len(),
            root_count,
            issues,
        }
    }
}
