//! Deterministic scripted policy
//!
//! The local stand-in for the decision service: always produces a well-formed
//! turn derived only from the resident id and cycle counter, so a resident is
//! never left without a turn outcome when the service times out, fails, or
//! returns garbage. Doubles as the test stub.

use crate::core::types::{Cycle, Direction, ResidentId};
use crate::decision::context::DeliberationContext;
use crate::decision::source::{
    DecisionError, DecisionSource, Deliberation, Movement, TurnDecision, TurnRequest,
};
use std::future::Future;

const THOUGHTS: &[&str] = &[
    "the settlement feels steady today",
    "the paths could use tending",
    "someone should check the stores",
    "quiet morning, good for work",
    "the others seem busy",
];

const SPEECHES: &[&str] = &[
    "Fine weather for it.",
    "I'll be nearby if anyone needs a hand.",
    "Has anyone seen to the well?",
];

const DIRECTIONS: &[Direction] = &[
    Direction::North,
    Direction::East,
    Direction::South,
    Direction::West,
];

#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptedPolicy;

impl ScriptedPolicy {
    pub fn new() -> Self {
        Self
    }

    /// A well-formed turn, a pure function of (resident, cycle)
    pub fn turn(&self, resident: ResidentId, cycle: Cycle) -> TurnDecision {
        let salt = (resident.0.as_u128() as u64).wrapping_add(cycle);

        let movement = if salt % 2 == 0 {
            Some(Movement {
                direction: DIRECTIONS[(salt / 2 % DIRECTIONS.len() as u64) as usize],
                distance: 1.0,
            })
        } else {
            None
        };
        let speech = if salt % 3 == 0 {
            Some(SPEECHES[(salt / 3 % SPEECHES.len() as u64) as usize].to_string())
        } else {
            None
        };

        TurnDecision {
            thought: Some(THOUGHTS[(salt % THOUGHTS.len() as u64) as usize].to_string()),
            speech,
            action: None,
            movement,
        }
    }

    /// Deliberations have no scripted substance; the cycle is a no-op
    pub fn deliberation(&self) -> Deliberation {
        Deliberation::default()
    }
}

impl DecisionSource for ScriptedPolicy {
    fn request_turn(
        &self,
        request: TurnRequest,
    ) -> impl Future<Output = Result<TurnDecision, DecisionError>> + Send {
        let decision = self.turn(request.resident, request.cycle);
        async move { Ok(decision) }
    }

    fn request_deliberation(
        &self,
        _context: DeliberationContext,
    ) -> impl Future<Output = Result<Deliberation, DecisionError>> + Send {
        let deliberation = self.deliberation();
        async move { Ok(deliberation) }
    }
}
