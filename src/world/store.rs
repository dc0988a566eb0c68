//! Authoritative world state: residents, structures, event log, memory
//!
//! All mutation funnels through [`SharedWorld`], the single exclusive-access
//! path shared by the scheduler loops and the action executor. Operations
//! referencing an unknown id return `None`/empty rather than failing; callers
//! null-check.

use crate::core::config::EngineConfig;
use crate::core::types::{now_ms, Direction, EventId, Position, ResidentId, StructureId, TimestampMs};
use crate::world::events::WorldEvent;
use crate::world::memory::{MemoryEntry, MemoryRing};
use crate::world::resident::{Resident, ResidentProfile, ResidentState};
use crate::world::structure::Structure;
use ahash::AHashMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// What a resident notices about one neighbor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearbyResident {
    pub id: ResidentId,
    pub name: String,
    pub distance: f32,
    pub state: ResidentState,
}

/// The bounded view supplied to a turn decision request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Perception {
    pub position: Position,
    /// Neighbors within the perception radius, excluding the observer
    pub nearby: Vec<NearbyResident>,
    /// Most recent settlement-wide events, newest first
    pub ambient: Vec<WorldEvent>,
    /// A queued directive merged in by the scheduler, if one is pending
    pub directive: Option<String>,
}

/// A point-in-time view of the whole world
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub population: usize,
    pub world_time_secs: u64,
    pub residents: Vec<Resident>,
    pub recent_events: Vec<WorldEvent>,
}

/// Owns all entity state, the event log, and per-resident memory
pub struct WorldStore {
    config: EngineConfig,
    residents: AHashMap<ResidentId, Resident>,
    /// Insertion order, the round-robin roster
    roster: Vec<ResidentId>,
    structures: AHashMap<StructureId, Structure>,
    build_order: Vec<StructureId>,
    events: Vec<WorldEvent>,
    next_event_id: EventId,
    last_event_ts: TimestampMs,
    memories: AHashMap<ResidentId, MemoryRing>,
    spawn_rng: ChaCha8Rng,
    started_at: Instant,
}

impl WorldStore {
    pub fn new(config: EngineConfig) -> Self {
        let spawn_rng = ChaCha8Rng::seed_from_u64(config.world_seed);
        Self {
            config,
            residents: AHashMap::new(),
            roster: Vec::new(),
            structures: AHashMap::new(),
            build_order: Vec::new(),
            events: Vec::new(),
            next_event_id: 0,
            last_event_ts: 0,
            memories: AHashMap::new(),
            spawn_rng,
            started_at: Instant::now(),
        }
    }

    // === RESIDENTS ===

    /// Add a resident at a random position within the spawn radius,
    /// zero elevation.
    pub fn add_resident(&mut self, profile: ResidentProfile) -> Resident {
        let angle = self.spawn_rng.gen_range(0.0..std::f32::consts::TAU);
        let dist = self.spawn_rng.gen_range(0.0..=self.config.spawn_radius);
        let position = Position::ground(angle.cos() * dist, angle.sin() * dist);

        let resident = Resident::new(profile, position);
        let id = resident.id;
        self.residents.insert(id, resident.clone());
        self.roster.push(id);
        self.memories.insert(id, MemoryRing::new());
        resident
    }

    pub fn resident(&self, id: ResidentId) -> Option<&Resident> {
        self.residents.get(&id)
    }

    /// All residents in insertion order (stable round-robin ordering)
    pub fn residents(&self) -> Vec<&Resident> {
        self.roster
            .iter()
            .filter_map(|id| self.residents.get(id))
            .collect()
    }

    pub fn resident_ids(&self) -> Vec<ResidentId> {
        self.roster.clone()
    }

    pub fn population(&self) -> usize {
        self.roster.len()
    }

    /// Residents within `r` of (x, z), inclusive
    pub fn residents_in_radius(&self, x: f32, z: f32, r: f32) -> Vec<&Resident> {
        self.roster
            .iter()
            .filter_map(|id| self.residents.get(id))
            .filter(|res| res.position.ground_distance_to(x, z) <= r)
            .collect()
    }

    pub fn set_position(&mut self, id: ResidentId, x: f32, y: f32, z: f32) -> bool {
        match self.residents.get_mut(&id) {
            Some(res) => {
                res.position = Position::new(x, y, z);
                true
            }
            None => false,
        }
    }

    /// Step a resident along one axis. Returns the new position, or `None`
    /// for an unknown id.
    pub fn move_resident(
        &mut self,
        id: ResidentId,
        direction: Direction,
        distance: f32,
    ) -> Option<Position> {
        let resident = self.residents.get_mut(&id)?;
        let (dx, dz) = direction.offset(distance);
        resident.position.x += dx;
        resident.position.z += dz;
        resident.touch();
        Some(resident.position)
    }

    pub fn set_state(&mut self, id: ResidentId, state: ResidentState) -> bool {
        match self.residents.get_mut(&id) {
            Some(res) => {
                res.state = state;
                res.touch();
                true
            }
            None => false,
        }
    }

    /// Remove a resident and its memory. Explicit command only; residents are
    /// never garbage-collected.
    pub fn remove_resident(&mut self, id: ResidentId) -> Option<Resident> {
        let removed = self.residents.remove(&id);
        if removed.is_some() {
            self.roster.retain(|r| *r != id);
            self.memories.remove(&id);
        }
        removed
    }

    /// Fuzzy lookup: exact name, then prefix, then substring, case-insensitive
    pub fn resident_by_name(&self, name: &str) -> Option<&Resident> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        let all = self.residents();
        all.iter()
            .find(|r| r.name().to_lowercase() == needle)
            .or_else(|| {
                all.iter()
                    .find(|r| r.name().to_lowercase().starts_with(&needle))
            })
            .or_else(|| {
                all.iter()
                    .find(|r| r.name().to_lowercase().contains(&needle))
            })
            .copied()
    }

    // === STRUCTURES ===

    pub fn add_structure(
        &mut self,
        kind: &str,
        x: f32,
        y: f32,
        z: f32,
        params: Value,
        builder: Option<ResidentId>,
    ) -> StructureId {
        let structure = Structure::new(kind, Position::new(x, y, z), params, builder);
        let id = structure.id;
        self.structures.insert(id, structure);
        self.build_order.push(id);
        id
    }

    pub fn structure(&self, id: StructureId) -> Option<&Structure> {
        self.structures.get(&id)
    }

    pub fn structures(&self) -> Vec<&Structure> {
        self.build_order
            .iter()
            .filter_map(|id| self.structures.get(id))
            .collect()
    }

    /// Structures within `r` of (x, z), inclusive
    pub fn structures_in_radius(&self, x: f32, z: f32, r: f32) -> Vec<&Structure> {
        self.build_order
            .iter()
            .filter_map(|id| self.structures.get(id))
            .filter(|s| s.position.ground_distance_to(x, z) <= r)
            .collect()
    }

    /// First structure of the given kind, in build order
    pub fn structure_by_kind(&self, kind: &str) -> Option<&Structure> {
        let needle = kind.trim().to_lowercase();
        self.build_order
            .iter()
            .filter_map(|id| self.structures.get(id))
            .find(|s| s.kind.to_lowercase() == needle)
    }

    // === EVENT LOG ===

    /// Append an event. Ids increment monotonically; timestamps are clamped
    /// so they never decrease even if the wall clock steps backwards.
    pub fn log_event(&mut self, kind: &str, payload: Value) -> EventId {
        let timestamp = now_ms().max(self.last_event_ts);
        self.last_event_ts = timestamp;
        let id = self.next_event_id;
        self.next_event_id += 1;
        self.events.push(WorldEvent {
            id,
            kind: kind.to_string(),
            payload,
            timestamp,
        });
        id
    }

    /// The `n` most recent events, newest first
    pub fn recent_events(&self, n: usize) -> Vec<WorldEvent> {
        self.events.iter().rev().take(n).cloned().collect()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    // === MEMORY ===

    /// Record a memory for a resident. Returns false for an unknown id.
    /// Pruning keeps at most the configured cap, most recent by timestamp.
    pub fn add_memory(&mut self, id: ResidentId, text: String, importance: f32) -> bool {
        if !self.residents.contains_key(&id) {
            return false;
        }
        let cap = self.config.memory_cap;
        self.memories
            .entry(id)
            .or_default()
            .record(text, importance, now_ms(), cap);
        true
    }

    /// The `n` most recent memories for a resident, newest first
    pub fn recent_memories(&self, id: ResidentId, n: usize) -> Vec<MemoryEntry> {
        self.memories
            .get(&id)
            .map(|ring| ring.recent(n))
            .unwrap_or_default()
    }

    pub fn memory_count(&self, id: ResidentId) -> usize {
        self.memories.get(&id).map(|r| r.len()).unwrap_or(0)
    }

    // === VIEWS ===

    /// The bounded view handed to a decision request. `None` for unknown ids.
    pub fn perception(&self, id: ResidentId, radius: f32) -> Option<Perception> {
        let observer = self.residents.get(&id)?;
        let nearby = self
            .residents_in_radius(observer.position.x, observer.position.z, radius)
            .into_iter()
            .filter(|r| r.id != id)
            .map(|r| NearbyResident {
                id: r.id,
                name: r.name().to_string(),
                distance: observer.position.ground_distance(&r.position),
                state: r.state,
            })
            .collect();

        Some(Perception {
            position: observer.position,
            nearby,
            ambient: self.recent_events(self.config.ambient_event_count),
            directive: None,
        })
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            population: self.population(),
            world_time_secs: self.started_at.elapsed().as_secs(),
            residents: self.residents().into_iter().cloned().collect(),
            recent_events: self.recent_events(self.config.ambient_event_count),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // === PERSISTENCE ===

    /// Export the full world state as a versioned snapshot document
    pub fn export(&self) -> crate::persist::PersistedWorld {
        crate::persist::PersistedWorld {
            version: crate::persist::SNAPSHOT_VERSION,
            saved_at: now_ms(),
            residents: self.residents().into_iter().cloned().collect(),
            structures: self.structures().into_iter().cloned().collect(),
            events: self.events.clone(),
            memories: self
                .roster
                .iter()
                .filter_map(|id| self.memories.get(id).map(|ring| (*id, ring.clone())))
                .collect(),
        }
    }

    /// Rebuild a store from a snapshot document
    pub fn from_persisted(config: EngineConfig, snapshot: crate::persist::PersistedWorld) -> Self {
        let mut store = Self::new(config);
        store.next_event_id = snapshot.events.iter().map(|e| e.id + 1).max().unwrap_or(0);
        store.last_event_ts = snapshot.events.iter().map(|e| e.timestamp).max().unwrap_or(0);
        store.events = snapshot.events;

        for resident in snapshot.residents {
            store.roster.push(resident.id);
            store.memories.insert(resident.id, MemoryRing::new());
            store.residents.insert(resident.id, resident);
        }
        for (id, ring) in snapshot.memories {
            store.memories.insert(id, ring);
        }
        for structure in snapshot.structures {
            store.build_order.push(structure.id);
            store.structures.insert(structure.id, structure);
        }
        store
    }
}

/// Cloneable handle enforcing the single-mutation-path discipline
///
/// The lock is only ever taken for synchronous sections; callers must not
/// hold it across an await point, which the closure-only API makes
/// structurally impossible.
#[derive(Clone)]
pub struct SharedWorld {
    inner: Arc<Mutex<WorldStore>>,
}

impl SharedWorld {
    pub fn new(store: WorldStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// Run a closure with exclusive access to the store
    pub fn with<R>(&self, f: impl FnOnce(&mut WorldStore) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> WorldStore {
        WorldStore::new(EngineConfig::default())
    }

    #[test]
    fn test_spawn_within_radius_at_ground_level() {
        let mut w = store();
        for i in 0..20 {
            let r = w.add_resident(ResidentProfile::named(format!("R{}", i)));
            assert!(r.position.ground_distance(&Position::ORIGIN) <= w.config.spawn_radius);
            assert_eq!(r.position.y, 0.0);
        }
    }

    #[test]
    fn test_roster_preserves_insertion_order() {
        let mut w = store();
        let a = w.add_resident(ResidentProfile::named("Alda")).id;
        let b = w.add_resident(ResidentProfile::named("Bren")).id;
        let c = w.add_resident(ResidentProfile::named("Cato")).id;
        assert_eq!(w.resident_ids(), vec![a, b, c]);
    }

    #[test]
    fn test_radius_query_is_inclusive() {
        let mut w = store();
        let id = w.add_resident(ResidentProfile::named("Edge")).id;
        w.set_position(id, 5.0, 0.0, 0.0);
        assert_eq!(w.residents_in_radius(0.0, 0.0, 5.0).len(), 1);
        assert_eq!(w.residents_in_radius(0.0, 0.0, 4.99).len(), 0);
    }

    #[test]
    fn test_move_unknown_resident_returns_none() {
        let mut w = store();
        assert!(w
            .move_resident(ResidentId::new(), Direction::North, 1.0)
            .is_none());
    }

    #[test]
    fn test_move_steps_along_axis() {
        let mut w = store();
        let id = w.add_resident(ResidentProfile::named("Walker")).id;
        w.set_position(id, 0.0, 0.0, 0.0);
        let pos = w.move_resident(id, Direction::East, 3.0).unwrap();
        assert_eq!(pos.x, 3.0);
        assert_eq!(pos.z, 0.0);
        let pos = w.move_resident(id, Direction::North, 2.0).unwrap();
        assert_eq!(pos.z, -2.0);
    }

    #[test]
    fn test_event_ids_and_timestamps_monotonic() {
        let mut w = store();
        for i in 0..50 {
            w.log_event("tick", json!({ "i": i }));
        }
        let events = w.recent_events(50);
        for pair in events.windows(2) {
            // recent_events is newest-first
            assert!(pair[0].id > pair[1].id);
            assert!(pair[0].timestamp >= pair[1].timestamp);
        }
    }

    #[test]
    fn test_memory_cap_via_store() {
        let mut w = store();
        let id = w.add_resident(ResidentProfile::named("Keeper")).id;
        for i in 0..150 {
            assert!(w.add_memory(id, format!("memory {}", i), 0.5));
        }
        assert_eq!(w.memory_count(id), 100);
        assert_eq!(w.recent_memories(id, 200).len(), 100);
    }

    #[test]
    fn test_memory_unknown_resident_rejected() {
        let mut w = store();
        assert!(!w.add_memory(ResidentId::new(), "ghost".into(), 0.5));
        assert!(w.recent_memories(ResidentId::new(), 5).is_empty());
    }

    #[test]
    fn test_perception_excludes_self_with_distance() {
        let mut w = store();
        let a = w.add_resident(ResidentProfile::named("Ana")).id;
        let b = w.add_resident(ResidentProfile::named("Bo")).id;
        w.set_position(a, 0.0, 0.0, 0.0);
        w.set_position(b, 0.0, 0.0, 3.0);

        let view = w.perception(a, 10.0).unwrap();
        assert_eq!(view.nearby.len(), 1);
        assert_eq!(view.nearby[0].id, b);
        assert!((view.nearby[0].distance - 3.0).abs() < 1e-3);
        assert!(view.directive.is_none());
    }

    #[test]
    fn test_perception_unknown_resident_is_none() {
        let w = store();
        assert!(w.perception(ResidentId::new(), 10.0).is_none());
    }

    #[test]
    fn test_remove_resident_clears_memory() {
        let mut w = store();
        let id = w.add_resident(ResidentProfile::named("Brief")).id;
        w.add_memory(id, "fleeting".into(), 0.5);
        assert!(w.remove_resident(id).is_some());
        assert_eq!(w.population(), 0);
        assert_eq!(w.memory_count(id), 0);
        assert!(w.remove_resident(id).is_none());
    }

    #[test]
    fn test_resident_by_name_fuzzy() {
        let mut w = store();
        w.add_resident(ResidentProfile::named("Marenna"));
        let exact = w.add_resident(ResidentProfile::named("Maren")).id;

        assert_eq!(w.resident_by_name("maren").unwrap().id, exact);
        assert!(w.resident_by_name("mare").is_some());
        assert!(w.resident_by_name("enn").is_some());
        assert!(w.resident_by_name("zzz").is_none());
    }

    #[test]
    fn test_snapshot_counts() {
        let mut w = store();
        w.add_resident(ResidentProfile::named("One"));
        w.add_resident(ResidentProfile::named("Two"));
        w.log_event("founded", json!({}));
        let snap = w.snapshot();
        assert_eq!(snap.population, 2);
        assert_eq!(snap.residents.len(), 2);
        assert_eq!(snap.recent_events.len(), 1);
    }

    #[test]
    fn test_shared_world_serializes_mutation() {
        let shared = SharedWorld::new(store());
        let id = shared.with(|w| w.add_resident(ResidentProfile::named("Shared")).id);
        let found = shared.with(|w| w.resident(id).map(|r| r.name().to_string()));
        assert_eq!(found.as_deref(), Some("Shared"));
    }
}
