//! Parse free-form decision-service completions into structured outcomes
//!
//! Completions arrive as text with a JSON object somewhere inside. Missing
//! or unrecognized fields degrade rather than fail: a bad movement document
//! becomes no movement, an unparseable queued action is dropped with a
//! warning. Only a payload with no usable JSON at all is malformed, which
//! the scheduler treats the same as an unavailable service.

use crate::actions::Intent;
use crate::decision::source::{
    DecisionError, Deliberation, Movement, ResidentInstruction, TurnDecision,
};
use serde::Deserialize;
use serde_json::Value;

/// Extract the JSON object from a completion (handles surrounding text)
pub fn extract_json(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&response[start..=end])
}

#[derive(Deserialize)]
struct RawTurn {
    #[serde(default)]
    thought: Option<String>,
    #[serde(default)]
    speech: Option<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    movement: Value,
}

/// Parse a turn completion
pub fn parse_turn(response: &str) -> Result<TurnDecision, DecisionError> {
    let json = extract_json(response)
        .ok_or_else(|| DecisionError::Malformed("no JSON object in response".into()))?;
    let raw: RawTurn =
        serde_json::from_str(json).map_err(|e| DecisionError::Malformed(e.to_string()))?;

    // A malformed movement document degrades to standing still.
    let movement = match raw.movement {
        Value::Null => None,
        other => match serde_json::from_value::<Movement>(other) {
            Ok(m) => Some(m),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed movement in turn payload");
                None
            }
        },
    };

    Ok(TurnDecision {
        thought: raw.thought,
        speech: raw.speech,
        action: raw.action,
        movement,
    })
}

#[derive(Deserialize)]
struct RawDeliberation {
    #[serde(default)]
    observation: Option<String>,
    #[serde(default)]
    new_goal: Option<String>,
    #[serde(default)]
    resident_instruction: Option<ResidentInstruction>,
    #[serde(default)]
    actions: Vec<Value>,
}

/// Parse a deliberation completion, dropping unparseable queued actions
pub fn parse_deliberation(response: &str) -> Result<Deliberation, DecisionError> {
    let json = extract_json(response)
        .ok_or_else(|| DecisionError::Malformed("no JSON object in response".into()))?;
    let raw: RawDeliberation =
        serde_json::from_str(json).map_err(|e| DecisionError::Malformed(e.to_string()))?;

    let actions = raw
        .actions
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<Intent>(value) {
            Ok(intent) => Some(intent),
            Err(e) => {
                tracing::warn!(error = %e, "dropping unparseable deliberation action");
                None
            }
        })
        .collect();

    Ok(Deliberation {
        observation: raw.observation,
        new_goal: raw.new_goal,
        resident_instruction: raw.resident_instruction,
        actions,
    })
}

/// System prompt for turn requests
pub const TURN_SYSTEM_PROMPT: &str = r#"You are deciding one turn for a resident of a small simulated settlement.
You receive the resident's profile, recent memories, and current perception.
Decide what they think, say, and do this turn.

OUTPUT FORMAT (JSON only, no explanation):
{
  "thought": "a short private thought",
  "speech": "something said aloud, or null",
  "action": "a short activity description, or null",
  "movement": {"direction": "north|south|east|west", "distance": 1.0} or null
}

Keep thoughts and speech brief and grounded in the perception. Movement
distance is in world units; stay under 5.
"#;

/// System prompt for deliberation requests
pub const DELIBERATION_SYSTEM_PROMPT: &str = r#"You are the settlement's steward, reflecting on the whole settlement between turns.
You receive a summary: population, resident positions, a map, active goals,
recent observations, and recent conversation.

OUTPUT FORMAT (JSON only, no explanation):
{
  "observation": "one new observation about the settlement, or null",
  "new_goal": "one new goal worth pursuing, or null",
  "resident_instruction": {"target": "resident name", "directive": "what to focus on"} or null,
  "actions": [
    {"kind": "build", "structure": "beacon|shelter|garden|well|hall", "site": {"near": {"name": "..."}}},
    {"kind": "announce", "message": "..."},
    {"kind": "gather", "site": {"at": {"x": 0.0, "z": 0.0}}}
  ]
}

Propose at most two actions. Omit fields you have nothing for (use null or []).
"#;
