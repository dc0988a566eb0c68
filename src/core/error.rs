use thiserror::Error;

#[derive(Error, Debug)]
pub enum HearthError {
    #[error("Resident not found: {0}")]
    ResidentNotFound(String),

    #[error("Unknown structure kind: {0}")]
    UnknownStructureKind(String),

    #[error("No clear space found within search range")]
    NoSpaceFound,

    #[error("Placement site is occupied")]
    PlacementOccupied,

    #[error("Announcement message is empty")]
    EmptyMessage,

    #[error("Move failed for resident {0}")]
    MoveFailed(crate::core::types::ResidentId),

    #[error("Invalid grid reference: {0}")]
    InvalidGridRef(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HearthError>;
