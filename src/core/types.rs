//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for residents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResidentId(pub Uuid);

impl ResidentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ResidentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ResidentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for placed structures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructureId(pub Uuid);

impl StructureId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StructureId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StructureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic event log identifier
pub type EventId = u64;

/// Scheduler cycle counter
pub type Cycle = u64;

/// World position. Radius queries and distances operate on the x/z ground
/// plane; y is elevation and stays zero for ground-level residents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Ground-level position at (x, z)
    pub fn ground(x: f32, z: f32) -> Self {
        Self { x, y: 0.0, z }
    }

    pub const ORIGIN: Position = Position {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Euclidean distance on the ground plane
    pub fn ground_distance(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }

    /// Ground distance to a raw (x, z) point
    pub fn ground_distance_to(&self, x: f32, z: f32) -> f32 {
        let dx = self.x - x;
        let dz = self.z - z;
        (dx * dx + dz * dz).sqrt()
    }
}

/// Cardinal movement direction. Diagonal motion is not supported; a move is
/// a unit axis step scaled by distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// Axis offset for a step of `distance` units. North is -z, east is +x.
    pub fn offset(&self, distance: f32) -> (f32, f32) {
        match self {
            Direction::North => (0.0, -distance),
            Direction::South => (0.0, distance),
            Direction::East => (distance, 0.0),
            Direction::West => (-distance, 0.0),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "north" | "n" => Some(Direction::North),
            "south" | "s" => Some(Direction::South),
            "east" | "e" => Some(Direction::East),
            "west" | "w" => Some(Direction::West),
            _ => None,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
        };
        write!(f, "{}", name)
    }
}

/// Milliseconds since the Unix epoch
pub type TimestampMs = u64;

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_ms() -> TimestampMs {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ground_distance() {
        let a = Position::ground(0.0, 0.0);
        let b = Position::ground(3.0, 4.0);
        assert!((a.ground_distance(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_elevation_ignored_by_ground_distance() {
        let a = Position::new(0.0, 10.0, 0.0);
        let b = Position::new(3.0, -2.0, 4.0);
        assert!((a.ground_distance(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_direction_offsets() {
        assert_eq!(Direction::North.offset(2.0), (0.0, -2.0));
        assert_eq!(Direction::South.offset(2.0), (0.0, 2.0));
        assert_eq!(Direction::East.offset(2.0), (2.0, 0.0));
        assert_eq!(Direction::West.offset(2.0), (-2.0, 0.0));
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!(Direction::parse("North"), Some(Direction::North));
        assert_eq!(Direction::parse("e"), Some(Direction::East));
        assert_eq!(Direction::parse("up"), None);
    }

    #[test]
    fn test_resident_id_unique() {
        let a = ResidentId::new();
        let b = ResidentId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_direction_serde_lowercase() {
        let json = serde_json::to_string(&Direction::North).unwrap();
        assert_eq!(json, "\"north\"");
        let back: Direction = serde_json::from_str("\"west\"").unwrap();
        assert_eq!(back, Direction::West);
    }
}
