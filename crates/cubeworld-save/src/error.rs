//! Save/load error types.

use std::path::PathBuf;

/// Errors that can occur when reading, writing, or interpreting a save file.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    /// Failed to read the save file from disk.
    #[error("failed to read save {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the save file to disk.
    #[error("failed to write save {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The content is not valid JSON or does not match the payload schema.
    #[error("malformed save data: {0}")]
    Json(#[from] serde_json::Error),

    /// Valid JSON that is neither a tagged save nor a legacy world map.
    #[error("not a recognised save file")]
    UnrecognizedShape,

    /// `formatVersion` names a schema this build cannot read.
    #[error("unsupported save format version {0}")]
    UnsupportedVersion(u64),
}
