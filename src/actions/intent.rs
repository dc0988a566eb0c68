//! Tagged intent records accepted by the action executor
//!
//! Intents arrive from two places: the deliberation cycle (parsed out of a
//! decision payload) and the administrative console. Both produce the same
//! tagged records, validated entirely at execution time.

use crate::core::types::Direction;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where an action should take place
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteSpec {
    /// The world origin, the default rally point
    #[default]
    Origin,
    /// An explicit ground coordinate
    At { x: f32, z: f32 },
    /// A cell label like `C47`
    GridRef { label: String },
    /// Near a named resident or structure kind; falls back to the origin
    /// when nothing matches
    Near { name: String },
}

/// Where a resident move should end up
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// An explicit axis step
    Step { direction: Direction, distance: f32 },
    /// Toward a target point via the path estimate, capped per call
    Toward { x: f32, z: f32, max_step: f32 },
}

/// An executable intent awaiting dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Intent {
    /// Raise a structure of a cataloged kind
    Build {
        structure: String,
        #[serde(default)]
        site: SiteSpec,
        #[serde(default)]
        params: Value,
    },
    /// Issue a directive to one resident
    Instruct { target: String, directive: String },
    /// Rally every resident toward a point, one bounded step each
    Gather {
        #[serde(default)]
        site: SiteSpec,
    },
    /// Broadcast a message verbatim
    Announce { message: String },
    /// Request a new resident; fulfilled by the entity-generation
    /// collaborator, not the executor
    Spawn {
        #[serde(default)]
        name: Option<String>,
    },
    /// Move one resident
    MoveResident {
        target: String,
        destination: Destination,
    },
}

impl Intent {
    /// Short label for dispatch logging
    pub fn label(&self) -> &'static str {
        match self {
            Intent::Build { .. } => "build",
            Intent::Instruct { .. } => "instruct",
            Intent::Gather { .. } => "gather",
            Intent::Announce { .. } => "announce",
            Intent::Spawn { .. } => "spawn",
            Intent::MoveResident { .. } => "move_resident",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_tagged_deserialization() {
        let json = r#"{"kind": "build", "structure": "beacon", "site": {"near": {"name": "Maren"}}}"#;
        let intent: Intent = serde_json::from_str(json).unwrap();
        match intent {
            Intent::Build {
                structure, site, ..
            } => {
                assert_eq!(structure, "beacon");
                assert!(matches!(site, SiteSpec::Near { .. }));
            }
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_site_defaults_to_origin() {
        let intent: Intent = serde_json::from_str(r#"{"kind": "gather"}"#).unwrap();
        match intent {
            Intent::Gather { site } => assert!(matches!(site, SiteSpec::Origin)),
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_move_resident_step_round_trip() {
        let intent = Intent::MoveResident {
            target: "Edwin".into(),
            destination: Destination::Step {
                direction: Direction::East,
                distance: 4.0,
            },
        };
        let json = serde_json::to_string(&intent).unwrap();
        let back: Intent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.label(), "move_resident");
    }

    #[test]
    fn test_labels() {
        let announce = Intent::Announce {
            message: "hello".into(),
        };
        assert_eq!(announce.label(), "announce");
    }
}
