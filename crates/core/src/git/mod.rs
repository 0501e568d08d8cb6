//! Git operations for rebasefix.
//!
//! The orchestrator talks to version control through the [`Vcs`] trait so a
//! resolution pass can be driven against a scripted repository in tests.
//! [`GitClient`] is the real implementation.

pub mod client;

use std::path::Path;

pub use client::GitClient;

use crate::errors::GitError;

/// Result of the initial rebase attempt.
///
/// Conflicts are the expected outcome, so they are a variant rather than an
/// error. `Failed` carries a genuine failure (unknown ref, dirty tree, missing
/// binary) that stopped the rebase before any conflict was produced.
#[derive(Debug)]
pub enum RebaseAttempt {
    Clean,
    Conflicted,
    Failed(GitError),
}

/// The version-control operations a resolution pass needs.
pub trait Vcs {
    /// Root of the working tree that conflicted paths are relative to.
    fn workdir(&self) -> &Path;

    fn fetch_all(&self) -> Result<(), GitError>;

    fn rebase(&self, onto: &str) -> RebaseAttempt;

    fn rebase_continue(&self) -> Result<(), GitError>;

    fn rebase_abort(&self) -> Result<(), GitError>;

    /// Paths with unmerged index entries, relative to the working tree root.
    fn list_conflicted_files(&self) -> Result<Vec<String>, GitError>;

    /// Replace the file with the mainline side (`--ours` during a rebase).
    fn checkout_ours(&self, path: &str) -> Result<(), GitError>;

    /// Replace the file with the branch side (`--theirs` during a rebase).
    fn checkout_theirs(&self, path: &str) -> Result<(), GitError>;

    fn stage_file(&self, path: &str) -> Result<(), GitError>;
}
