//! Versioned JSON world snapshots
//!
//! The persistence contract is deliberately thin: the store supports point
//! lookup, radius queries, and most-recent-N queries in memory, and the whole
//! world can be saved and restored as one versioned document. No multi-table
//! transaction guarantee exists beyond per-call atomicity.

use crate::core::config::EngineConfig;
use crate::core::error::{HearthError, Result};
use crate::core::types::{ResidentId, TimestampMs};
use crate::world::memory::MemoryRing;
use crate::world::store::{SharedWorld, WorldStore};
use crate::world::{Resident, Structure, WorldEvent};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current snapshot schema version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Root document of a world snapshot file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedWorld {
    pub version: u32,
    pub saved_at: TimestampMs,
    pub residents: Vec<Resident>,
    pub structures: Vec<Structure>,
    pub events: Vec<WorldEvent>,
    pub memories: Vec<(ResidentId, MemoryRing)>,
}

/// Save the world to a snapshot file
pub fn save_world(path: &Path, world: &SharedWorld) -> Result<()> {
    let snapshot = world.with(|w| w.export());
    let json = serde_json::to_string_pretty(&snapshot)?;
    std::fs::write(path, json)?;
    tracing::info!(
        path = %path.display(),
        residents = snapshot.residents.len(),
        events = snapshot.events.len(),
        "world snapshot saved"
    );
    Ok(())
}

/// Load a world from a snapshot file
pub fn load_world(path: &Path, config: EngineConfig) -> Result<WorldStore> {
    let text = std::fs::read_to_string(path)?;
    let snapshot: PersistedWorld = serde_json::from_str(&text)?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(HearthError::Persistence(format!(
            "unsupported snapshot version {} in {} (expected {})",
            snapshot.version,
            path.display(),
            SNAPSHOT_VERSION
        )));
    }
    Ok(WorldStore::from_persisted(config, snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::resident::ResidentProfile;
    use serde_json::json;

    fn temp_path(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("hearthvale-{}-{}.json", tag, std::process::id()))
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let config = EngineConfig::default();
        let world = SharedWorld::new(WorldStore::new(config.clone()));
        let id = world.with(|w| {
            let id = w.add_resident(ResidentProfile::named("Keeper")).id;
            w.add_structure("well", 4.0, 0.0, 2.0, serde_json::Value::Null, None);
            w.log_event("founded", json!({"by": "Keeper"}));
            w.add_memory(id, "dug the well".into(), 0.8);
            id
        });

        let path = temp_path("roundtrip");
        save_world(&path, &world).unwrap();
        let restored = load_world(&path, config).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(restored.population(), 1);
        assert_eq!(restored.structures().len(), 1);
        assert_eq!(restored.event_count(), 1);
        assert_eq!(restored.recent_memories(id, 5).len(), 1);
        assert_eq!(restored.resident(id).map(|r| r.name().to_string()), Some("Keeper".into()));
    }

    #[test]
    fn test_event_ids_continue_after_load() {
        let config = EngineConfig::default();
        let world = SharedWorld::new(WorldStore::new(config.clone()));
        world.with(|w| {
            w.log_event("first", json!({}));
            w.log_event("second", json!({}));
        });

        let path = temp_path("eventids");
        save_world(&path, &world).unwrap();
        let mut restored = load_world(&path, config).unwrap();
        std::fs::remove_file(&path).ok();

        let next = restored.log_event("third", json!({}));
        assert_eq!(next, 2);
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let path = temp_path("badversion");
        std::fs::write(
            &path,
            r#"{"version": 99, "saved_at": 0, "residents": [], "structures": [], "events": [], "memories": []}"#,
        )
        .unwrap();
        let result = load_world(&path, EngineConfig::default());
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(HearthError::Persistence(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_world(Path::new("/nonexistent/world.json"), EngineConfig::default());
        assert!(matches!(result, Err(HearthError::Io(_))));
    }
}
