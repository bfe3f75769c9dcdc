//! Error types for satis-git

/// Result type for satis-git operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in satis-git operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Filesystem error: {0}")]
    Fs(#[from] satis_fs::Error),

    #[error("Failed to clone {uri}: {message}")]
    CloneFailed { uri: String, message: String },

    #[error("Failed to read references: {message}")]
    ReferencesUnreadable { message: String },

    #[error("Failed to check out '{reference}': {message}")]
    CheckoutFailed { reference: String, message: String },
}
