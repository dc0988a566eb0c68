pub mod events;
pub mod memory;
pub mod resident;
pub mod store;
pub mod structure;

pub use events::WorldEvent;
pub use memory::MemoryEntry;
pub use resident::{Resident, ResidentProfile, ResidentState};
pub use store::{NearbyResident, Perception, SharedWorld, WorldSnapshot, WorldStore};
pub use structure::{Structure, StructureTemplate};
