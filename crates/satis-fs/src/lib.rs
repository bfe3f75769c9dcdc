//! Filesystem primitives for git-satis
//!
//! Provides forward-slash normalized paths and atomic, locked writes used for
//! both archives and the package catalog.

pub mod error;
pub mod io;
pub mod path;

pub use error::{Error, Result};
pub use path::{NormalizedPath, validate_relative_identifier};
