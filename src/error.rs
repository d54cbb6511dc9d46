use thiserror::Error;

/// Top-level error type for the mesh synchronization engine.
#[derive(Debug, Error)]
pub enum MeshSyncError {
    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Placement(#[from] PlacementError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors raised while fetching or decoding a 3D asset.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssetError {
    #[error("asset fetch failed: {0}")]
    Fetch(String),

    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("unsupported asset: {0}")]
    Unsupported(String),
}

/// Errors related to hotspot and decal placements.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlacementError {
    #[error("malformed hotspot document: {0}")]
    MalformedImport(String),

    #[error("decal not found: {0}")]
    UnknownDecal(String),

    #[error("serialization failed: {0}")]
    Serialize(String),
}

/// Errors raised by a durable key-value store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serde(String),
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Convenience type alias for results using [`MeshSyncError`].
pub type Result<T> = std::result::Result<T, MeshSyncError>;
