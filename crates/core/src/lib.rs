//! rebasefix core library.
//!
//! This crate provides the pieces behind automatic rebase conflict
//! resolution: configuration, git access, conflict gating and list merging,
//! the resolution orchestrator, and the everyday branch and package-version
//! workflows built on the same git client.

pub mod config;
pub mod conflict;
pub mod errors;
pub mod git;
pub mod orchestrator;
pub mod versions;
pub mod workflow;

// Re-exports for convenience.
pub use config::AppConfig;
pub use errors::CoreError;
pub use git::{GitClient, RebaseAttempt, Vcs};
pub use orchestrator::{Phase, ResolutionOrchestrator, ResolutionOutcome, RunOptions};
pub use versions::PackageVersions;
pub use workflow::BranchWorkflow;
