//! Resident records - the simulated inhabitants of the settlement

use crate::core::types::{now_ms, Position, ResidentId, TimestampMs};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle state of a resident within the turn state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResidentState {
    /// Between turns, available for selection
    Idle,
    /// Mid-turn: perceiving, deciding, or applying
    Acting,
}

/// A resident's profile document
///
/// The display name is the only field the core reads; traits, values, and
/// appearance are owned by an external generator and passed through opaque.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidentProfile {
    pub name: String,
    /// Opaque trait/value/appearance document, never interpreted by the core
    #[serde(default)]
    pub document: Value,
}

impl ResidentProfile {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            document: Value::Null,
        }
    }

    pub fn with_document(name: impl Into<String>, document: Value) -> Self {
        Self {
            name: name.into(),
            document,
        }
    }
}

/// A simulated inhabitant with position, profile, and turn-taking behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resident {
    pub id: ResidentId,
    pub profile: ResidentProfile,
    pub position: Position,
    pub state: ResidentState,
    pub created_at: TimestampMs,
    pub last_active_at: TimestampMs,
}

impl Resident {
    pub fn new(profile: ResidentProfile, position: Position) -> Self {
        let now = now_ms();
        Self {
            id: ResidentId::new(),
            profile,
            position,
            state: ResidentState::Idle,
            created_at: now,
            last_active_at: now,
        }
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }

    pub fn touch(&mut self) {
        self.last_active_at = now_ms();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_resident_starts_idle() {
        let resident = Resident::new(ResidentProfile::named("Maren"), Position::ORIGIN);
        assert_eq!(resident.state, ResidentState::Idle);
        assert_eq!(resident.name(), "Maren");
        assert_eq!(resident.position, Position::ORIGIN);
    }

    #[test]
    fn test_profile_document_round_trips() {
        let doc = serde_json::json!({"temperament": "stoic", "craft": "mason"});
        let profile = ResidentProfile::with_document("Edwin", doc.clone());
        let json = serde_json::to_string(&profile).unwrap();
        let back: ResidentProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "Edwin");
        assert_eq!(back.document, doc);
    }
}
