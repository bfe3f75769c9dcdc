//! Git access for git-satis
//!
//! Clones a source repository once, enumerates its tags and remote branches,
//! and materializes each reference into an owned [`Snapshot`] directory.

pub mod cloned;
pub mod error;
pub mod naming;
pub mod provider;

pub use cloned::ClonedRepository;
pub use error::{Error, Result};
pub use naming::{branch_version_label, redact_uri};
pub use provider::{RefKind, RefSource, Reference, Snapshot};
