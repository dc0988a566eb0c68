//! Stateless geometry over the world store
//!
//! Coordinate mapping, spiral empty-space search, straight-line path
//! estimation, and text-map rendering. The resolver owns no state beyond the
//! cell size; occupancy comes from store queries.

use crate::core::types::{Direction, Position};
use crate::spatial::gridref;
use crate::world::store::WorldStore;

/// Angle increment of the spiral search, in degrees
const ANGLE_STEP_DEG: u32 = 30;

/// Parameters for an empty-space search around a point
#[derive(Debug, Clone, Copy)]
pub struct SpaceRequest {
    pub near: (f32, f32),
    /// Required clearance in cells
    pub size: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

/// A straight-line movement estimate, not an obstacle-aware path
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathEstimate {
    /// Dominant axis direction toward the target (ties break toward z)
    pub direction: Direction,
    /// Euclidean ground distance, rounded to whole units
    pub distance: f32,
    /// Cell steps to cover the distance
    pub steps: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct SpatialResolver {
    cell_size: f32,
}

impl SpatialResolver {
    pub fn new(cell_size: f32) -> Self {
        Self { cell_size }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Encode a world point as a short lossy cell label
    pub fn world_to_grid_ref(&self, x: f32, z: f32) -> String {
        gridref::encode(self.cell_size, x, z)
    }

    /// Decode a cell label back to the cell's center point
    pub fn grid_ref_to_world(&self, label: &str) -> Option<(f32, f32)> {
        gridref::decode(self.cell_size, label)
    }

    /// A candidate is clear iff every occupant within `2 * size * cell_size`
    /// sits strictly farther than `size * cell_size` away.
    pub fn is_space_clear(&self, store: &WorldStore, x: f32, z: f32, size: f32) -> bool {
        let clearance = size * self.cell_size;
        let range = 2.0 * clearance;

        store
            .residents_in_radius(x, z, range)
            .iter()
            .all(|r| r.position.ground_distance_to(x, z) > clearance)
            && store
                .structures_in_radius(x, z, range)
                .iter()
                .all(|s| s.position.ground_distance_to(x, z) > clearance)
    }

    /// Placement-time clearance check against all residents and structures
    /// in range. Non-overlap is enforced only here, not continuously.
    pub fn validate_placement(&self, store: &WorldStore, x: f32, z: f32, size: f32) -> bool {
        self.is_space_clear(store, x, z, size)
    }

    /// Spiral outward from `near` until a clear point turns up
    ///
    /// Distance steps from `min_distance` to `max_distance` in cell-size
    /// increments; each ring is probed at fixed angle increments around the
    /// full circle. Returns the first clear point with its grid reference,
    /// or `None` when the whole spiral is exhausted.
    pub fn find_empty_space(
        &self,
        store: &WorldStore,
        request: SpaceRequest,
    ) -> Option<(Position, String)> {
        let (nx, nz) = request.near;
        let mut dist = request.min_distance.max(0.0);

        while dist <= request.max_distance {
            let mut deg = 0u32;
            while deg < 360 {
                let rad = (deg as f32).to_radians();
                let x = nx + dist * rad.cos();
                let z = nz + dist * rad.sin();
                if self.is_space_clear(store, x, z, request.size) {
                    return Some((Position::ground(x, z), self.world_to_grid_ref(x, z)));
                }
                // The innermost ring is a single point.
                if dist == 0.0 {
                    break;
                }
                deg += ANGLE_STEP_DEG;
            }
            dist += self.cell_size;
        }
        None
    }

    /// Dominant-axis direction and rounded distance from one point to another
    pub fn estimate_path(&self, from: &Position, to: &Position) -> PathEstimate {
        let dx = to.x - from.x;
        let dz = to.z - from.z;

        let direction = if dx.abs() > dz.abs() {
            if dx >= 0.0 {
                Direction::East
            } else {
                Direction::West
            }
        } else if dz >= 0.0 {
            Direction::South
        } else {
            Direction::North
        };

        let distance = (dx * dx + dz * dz).sqrt();
        PathEstimate {
            direction,
            distance: distance.round(),
            steps: (distance / self.cell_size).ceil() as u32,
        }
    }

    /// Render a square of side `2 * radius + 1` cells around `center`
    ///
    /// Row-major, north at the top. Markers: `R` resident, `S` structure,
    /// `+` center, `.` empty. Each cell is resolved independently from store
    /// queries, so cost is O(radius^2) lookups per call.
    pub fn render_text_map(&self, store: &WorldStore, center: &Position, radius: i32) -> String {
        let half = self.cell_size * 0.5;
        let mut out = String::new();

        for row in -radius..=radius {
            for col in -radius..=radius {
                let cx = center.x + col as f32 * self.cell_size;
                let cz = center.z + row as f32 * self.cell_size;

                let marker = if row == 0 && col == 0 {
                    '+'
                } else if !store.residents_in_radius(cx, cz, half).is_empty() {
                    'R'
                } else if !store.structures_in_radius(cx, cz, half).is_empty() {
                    'S'
                } else {
                    '.'
                };
                out.push(marker);
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;
    use crate::world::resident::ResidentProfile;
    use serde_json::Value;

    fn store() -> WorldStore {
        WorldStore::new(EngineConfig::default())
    }

    fn resolver() -> SpatialResolver {
        SpatialResolver::new(2.0)
    }

    #[test]
    fn test_empty_world_is_clear_at_origin() {
        let w = store();
        let r = resolver();
        assert!(r.is_space_clear(&w, 0.0, 0.0, 1.0));

        let found = r.find_empty_space(
            &w,
            SpaceRequest {
                near: (0.0, 0.0),
                size: 1.0,
                min_distance: 0.0,
                max_distance: 10.0,
            },
        );
        let (pos, _) = found.unwrap();
        assert_eq!(pos.ground_distance(&Position::ORIGIN), 0.0);
    }

    #[test]
    fn test_spiral_steps_past_occupant() {
        let mut w = store();
        w.add_structure("beacon", 0.0, 0.0, 0.0, Value::Null, None);
        let r = resolver();

        let (pos, _) = r
            .find_empty_space(
                &w,
                SpaceRequest {
                    near: (0.0, 0.0),
                    size: 1.0,
                    min_distance: 0.0,
                    max_distance: 20.0,
                },
            )
            .unwrap();
        // Clearance is strict, so the first clear ring is beyond one cell.
        assert!(pos.ground_distance(&Position::ORIGIN) > 2.0);
    }

    #[test]
    fn test_spiral_exhaustion_returns_none() {
        let mut w = store();
        w.add_structure("beacon", 0.0, 0.0, 0.0, Value::Null, None);
        let r = resolver();

        // Max range never escapes the occupant's clearance disc.
        let found = r.find_empty_space(
            &w,
            SpaceRequest {
                near: (0.0, 0.0),
                size: 1.0,
                min_distance: 0.0,
                max_distance: 2.0,
            },
        );
        assert!(found.is_none());
    }

    #[test]
    fn test_placement_blocked_by_resident() {
        let mut w = store();
        let id = w.add_resident(ResidentProfile::named("Blocker")).id;
        w.set_position(id, 1.0, 0.0, 0.0);
        let r = resolver();
        assert!(!r.validate_placement(&w, 0.0, 0.0, 1.0));
        assert!(r.validate_placement(&w, 10.0, 0.0, 1.0));
    }

    #[test]
    fn test_estimate_dominant_x_axis() {
        let r = resolver();
        let est = r.estimate_path(&Position::ground(0.0, 0.0), &Position::ground(10.0, 3.0));
        assert_eq!(est.direction, Direction::East);
        assert_eq!(est.distance, 10.0);
        assert_eq!(est.steps, 6);
    }

    #[test]
    fn test_estimate_tie_breaks_toward_z() {
        let r = resolver();
        let est = r.estimate_path(&Position::ground(20.0, 20.0), &Position::ground(0.0, 0.0));
        // |dx| == |dz|, so z wins; target is north of the start.
        assert_eq!(est.direction, Direction::North);
        assert_eq!(est.distance, 28.0);
    }

    #[test]
    fn test_estimate_zero_distance() {
        let r = resolver();
        let est = r.estimate_path(&Position::ground(5.0, 5.0), &Position::ground(5.0, 5.0));
        assert_eq!(est.distance, 0.0);
        assert_eq!(est.steps, 0);
    }

    #[test]
    fn test_text_map_markers() {
        let mut w = store();
        let id = w.add_resident(ResidentProfile::named("Dot")).id;
        // One cell east of center.
        w.set_position(id, 2.0, 0.0, 0.0);
        w.add_structure("well", -2.0, 0.0, 0.0, Value::Null, None);
        let r = resolver();

        let map = r.render_text_map(&w, &Position::ORIGIN, 1);
        let rows: Vec<&str> = map.lines().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], "S+R");
    }

    #[test]
    fn test_grid_ref_round_trip_through_resolver() {
        let r = resolver();
        let label = r.world_to_grid_ref(5.0, 9.0);
        let (x, z) = r.grid_ref_to_world(&label).unwrap();
        assert!((x - 5.0).abs() <= 1.0);
        assert!((z - 9.0).abs() <= 1.0);
    }
}
