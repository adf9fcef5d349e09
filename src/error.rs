//! Error types for drivelog
//!
//! Only initialization and parsing can fail visibly. Emission paths never
//! return errors; sink and overlay failures are reported and swallowed.

use std::path::PathBuf;

/// Result type for drivelog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to callers
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The log directory could not be created; the manager cannot start
    #[error("failed to create log directory {}: {source}", path.display())]
    CreateLogDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown log level: {0}")]
    UnknownLevel(String),
}
