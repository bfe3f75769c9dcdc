//! Shared test utilities for the git-satis workspace.
//!
//! Provides source repository fixtures backed by real git history. It is a
//! dev-dependency only and never published.
//!
//! # Modules
//!
//! - [`git`]: [`git::SourceRepo`] builder for repositories with tags and branches

pub mod git;

pub use git::SourceRepo;
