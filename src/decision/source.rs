//! Decision source abstraction
//!
//! The scheduler presents a resident's profile, memories, and perception and
//! awaits a turn outcome; periodically it presents a settlement summary and
//! awaits a deliberation. The trait abstracts the mechanism - an LLM backend,
//! a scripted policy, or a test stub. Failure is an explicit outcome, never
//! an escaping panic; the caller recovers with its deterministic fallback.

use crate::actions::Intent;
use crate::core::types::{Cycle, Direction, ResidentId};
use crate::decision::context::DeliberationContext;
use crate::world::{MemoryEntry, Perception};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use thiserror::Error;

/// Why a decision could not be obtained
///
/// A malformed payload is treated identically to an unavailable service at
/// the call site: both engage the fallback.
#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("decision service unavailable: {0}")]
    Unavailable(String),

    #[error("malformed decision payload: {0}")]
    Malformed(String),
}

/// A movement component of a turn outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub direction: Direction,
    pub distance: f32,
}

/// Everything a turn decision may carry; all fields optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnDecision {
    #[serde(default)]
    pub thought: Option<String>,
    #[serde(default)]
    pub speech: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub movement: Option<Movement>,
}

/// The material handed to a turn request
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub resident: ResidentId,
    pub name: String,
    /// Opaque profile document, passed through verbatim
    pub profile: Value,
    pub memories: Vec<MemoryEntry>,
    pub perception: Perception,
    pub cycle: Cycle,
}

/// A directive for one resident proposed by a deliberation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidentInstruction {
    pub target: String,
    pub directive: String,
}

/// The merged result of a deliberation cycle; all fields optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Deliberation {
    #[serde(default)]
    pub observation: Option<String>,
    #[serde(default)]
    pub new_goal: Option<String>,
    #[serde(default)]
    pub resident_instruction: Option<ResidentInstruction>,
    #[serde(default)]
    pub actions: Vec<Intent>,
}

/// External capability supplying turn and deliberation outcomes
///
/// Calls may suspend for non-trivial wall-clock time; the scheduler wraps
/// every call in a bounded timeout.
pub trait DecisionSource: Send + Sync {
    fn request_turn(
        &self,
        request: TurnRequest,
    ) -> impl Future<Output = Result<TurnDecision, DecisionError>> + Send;

    fn request_deliberation(
        &self,
        context: DeliberationContext,
    ) -> impl Future<Output = Result<Deliberation, DecisionError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_decision_defaults_empty() {
        let decision: TurnDecision = serde_json::from_str("{}").unwrap();
        assert!(decision.thought.is_none());
        assert!(decision.movement.is_none());
    }

    #[test]
    fn test_turn_decision_full() {
        let json = r#"{
            "thought": "the well is low",
            "speech": "we should dig deeper",
            "movement": {"direction": "east", "distance": 2.5}
        }"#;
        let decision: TurnDecision = serde_json::from_str(json).unwrap();
        assert_eq!(decision.thought.as_deref(), Some("the well is low"));
        let movement = decision.movement.unwrap();
        assert_eq!(movement.direction, Direction::East);
        assert_eq!(movement.distance, 2.5);
    }

    #[test]
    fn test_deliberation_defaults_empty() {
        let d: Deliberation = serde_json::from_str("{}").unwrap();
        assert!(d.observation.is_none());
        assert!(d.actions.is_empty());
    }
}
