//! Error types for satis-core

/// Result type for satis-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in satis-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Repository access failed (clone, enumeration, checkout)
    #[error(transparent)]
    Git(#[from] satis_git::Error),

    /// Filesystem operation failed (archive or catalog write)
    #[error(transparent)]
    Fs(#[from] satis_fs::Error),

    /// Catalog could not be serialized
    #[error("Failed to serialize catalog: {message}")]
    CatalogSerialize { message: String },

    /// Build configuration is unusable
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Unknown checkout failure policy
    #[error("Unknown checkout policy '{value}' (expected 'abort' or 'skip')")]
    InvalidCheckoutPolicy { value: String },
}
