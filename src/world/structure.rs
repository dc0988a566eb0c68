//! Placed structures and the fixed template catalog

use crate::core::types::{now_ms, Position, ResidentId, StructureId, TimestampMs};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A buildable structure template: footprint in cells plus an effect tag
/// observers can interpret.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StructureTemplate {
    pub kind: &'static str,
    /// Footprint radius in grid cells; placement keeps other occupants
    /// farther than `footprint * cell_size` away.
    pub footprint: f32,
    pub effect: &'static str,
}

/// The fixed set of structure kinds residents can raise
pub const TEMPLATES: &[StructureTemplate] = &[
    StructureTemplate {
        kind: "beacon",
        footprint: 1.0,
        effect: "signal",
    },
    StructureTemplate {
        kind: "shelter",
        footprint: 2.0,
        effect: "rest",
    },
    StructureTemplate {
        kind: "garden",
        footprint: 2.0,
        effect: "food",
    },
    StructureTemplate {
        kind: "well",
        footprint: 1.0,
        effect: "water",
    },
    StructureTemplate {
        kind: "hall",
        footprint: 3.0,
        effect: "gathering",
    },
];

/// Look up a template by kind name (case-insensitive)
pub fn template(kind: &str) -> Option<&'static StructureTemplate> {
    let kind = kind.trim().to_lowercase();
    TEMPLATES.iter().find(|t| t.kind == kind)
}

/// An immutable built object occupying world space
///
/// Created only through a validated placement; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Structure {
    pub id: StructureId,
    pub kind: String,
    pub position: Position,
    /// Opaque parameter document supplied by the builder
    #[serde(default)]
    pub params: Value,
    pub builder: Option<ResidentId>,
    pub built_at: TimestampMs,
}

impl Structure {
    pub fn new(
        kind: impl Into<String>,
        position: Position,
        params: Value,
        builder: Option<ResidentId>,
    ) -> Self {
        Self {
            id: StructureId::new(),
            kind: kind.into(),
            position,
            params,
            builder,
            built_at: now_ms(),
        }
    }

    /// Footprint in cells, falling back to a single cell for kinds that are
    /// no longer in the catalog (e.g. loaded from an older snapshot).
    pub fn footprint(&self) -> f32 {
        template(&self.kind).map(|t| t.footprint).unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_lookup() {
        assert!(template("beacon").is_some());
        assert!(template("Beacon").is_some());
        assert!(template(" hall ").is_some());
        assert!(template("ziggurat").is_none());
    }

    #[test]
    fn test_template_footprints_positive() {
        for t in TEMPLATES {
            assert!(t.footprint > 0.0, "{} has a degenerate footprint", t.kind);
        }
    }

    #[test]
    fn test_unknown_kind_defaults_to_one_cell() {
        let s = Structure::new(
            "ziggurat",
            Position::ORIGIN,
            Value::Null,
            None,
        );
        assert_eq!(s.footprint(), 1.0);
    }
}
