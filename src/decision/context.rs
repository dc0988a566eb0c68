//! Build decision-service prompts from world state
//!
//! Summaries stay bounded: a handful of memories, the most recent events,
//! and a clipped map keep prompt size predictable regardless of how long the
//! settlement has been running.

use crate::decision::source::TurnRequest;
use serde::Serialize;

/// Settlement summary handed to a deliberation request
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeliberationContext {
    pub population: usize,
    /// (name, grid reference) per resident
    pub resident_refs: Vec<(String, String)>,
    /// Rendered text map around the origin
    pub map: String,
    pub goals: Vec<String>,
    pub observations: Vec<String>,
    /// Recent speech, oldest first
    pub conversation: Vec<String>,
}

impl DeliberationContext {
    /// Human-readable summary for the deliberation user prompt
    pub fn summary(&self) -> String {
        let mut s = String::new();

        s.push_str(&format!("Population: {}\n", self.population));

        if !self.resident_refs.is_empty() {
            s.push_str("\nResidents:\n");
            for (name, grid_ref) in &self.resident_refs {
                s.push_str(&format!("- {} at {}\n", name, grid_ref));
            }
        }

        if !self.map.is_empty() {
            s.push_str("\nMap (R resident, S structure, + center):\n");
            s.push_str(&self.map);
        }

        if !self.goals.is_empty() {
            s.push_str("\nActive goals:\n");
            for goal in &self.goals {
                s.push_str(&format!("- {}\n", goal));
            }
        }

        if !self.observations.is_empty() {
            s.push_str("\nRecent observations:\n");
            for observation in &self.observations {
                s.push_str(&format!("- {}\n", observation));
            }
        }

        if !self.conversation.is_empty() {
            s.push_str("\nRecent conversation:\n");
            for line in &self.conversation {
                s.push_str(&format!("- {}\n", line));
            }
        }

        s
    }
}

/// Render the user prompt for a turn request
pub fn turn_prompt(request: &TurnRequest) -> String {
    let mut s = String::new();

    s.push_str(&format!("RESIDENT: {}\n", request.name));
    if !request.profile.is_null() {
        s.push_str(&format!("PROFILE: {}\n", request.profile));
    }

    if !request.memories.is_empty() {
        s.push_str("\nRECENT MEMORIES:\n");
        for memory in &request.memories {
            s.push_str(&format!("- {}\n", memory.text));
        }
    }

    let p = &request.perception;
    s.push_str(&format!(
        "\nPOSITION: ({:.1}, {:.1})\n",
        p.position.x, p.position.z
    ));

    if p.nearby.is_empty() {
        s.push_str("NEARBY: nobody\n");
    } else {
        s.push_str("NEARBY:\n");
        for neighbor in &p.nearby {
            s.push_str(&format!(
                "- {} ({:.1} away, {})\n",
                neighbor.name,
                neighbor.distance,
                match neighbor.state {
                    crate::world::ResidentState::Idle => "idle",
                    crate::world::ResidentState::Acting => "busy",
                }
            ));
        }
    }

    if !p.ambient.is_empty() {
        s.push_str("\nRECENT EVENTS:\n");
        for event in &p.ambient {
            s.push_str(&format!("- {}\n", event.describe()));
        }
    }

    if let Some(directive) = &p.directive {
        s.push_str(&format!("\nDIRECTIVE FROM THE STEWARD: {}\n", directive));
    }

    s.push_str("\nDecide this turn as JSON:");
    s
}

/// Render the user prompt for a deliberation request
pub fn deliberation_prompt(context: &DeliberationContext) -> String {
    format!(
        "SETTLEMENT SUMMARY:\n{}\nDeliberate and answer as JSON:",
        context.summary()
    )
}
