//! Persistence error types.

/// Errors from reading or writing a save archive.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// The archive file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The ZIP container itself is malformed.
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    /// A chunk's JSON body failed to parse or serialize.
    #[error("JSON error in chunk `{chunk}`: {source}")]
    Json {
        /// The chunk name (without its `.json` suffix).
        chunk: String,
        /// The underlying parse/serialize error.
        #[source]
        source: serde_json::Error,
    },
    /// The manifest names a format version this crate doesn't understand.
    #[error("unsupported manifest version {0}")]
    UnsupportedVersion(i32),
}
