//! Storyline - prerequisite graphs for CTF challenge platforms
//!
//! Challenges form a directed acyclic graph: each one lists the challenges
//! that must be solved before it unlocks. The engine keeps that graph
//! acyclic under concurrent admin edits, gates player solves on it, and
//! collects solution descriptions once a challenge is solved.

pub mod api;
pub mod cache;
pub mod config;
pub mod descriptions;
pub mod engine;
pub mod error;
pub mod graph;
pub mod models;
pub mod query;
pub mod solves;
pub mod storage;
pub mod unlock;

pub use engine::Storyline;
pub use error::{StorylineError, StorylineResult};
pub use models::{Challenge, ChallengeId, ChallengeStatus, PlayerId};
