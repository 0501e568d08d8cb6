//! Error types for the rebasefix core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them for callers that want a single
//! error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

// ---------------------------------------------------------------------------
// Git errors
// ---------------------------------------------------------------------------

/// Errors from the `git` binary and from `git2` repository queries.
#[derive(Debug, Error)]
pub enum GitError {
    /// The `git` binary was not found on `$PATH`.
    #[error("git binary not found: {0}")]
    BinaryNotFound(String),

    /// A `git` command exited with a non-zero status.
    #[error("`git {command}` failed (exit {exit_code}): {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// The repository path does not exist or is not a git repo.
    #[error("git repository not found at '{0}'")]
    RepositoryNotFound(String),

    /// The repository is bare and has no working tree to resolve in.
    #[error("git repository at '{0}' has no working tree")]
    NoWorkdir(String),

    /// HEAD does not point at a named branch.
    #[error("HEAD is detached; a checked-out branch is required")]
    DetachedHead,

    /// A `git2` library error.
    #[error("git2 error: {0}")]
    Git2Error(#[from] git2::Error),

    /// Generic I/O wrapper.
    #[error("git I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Conflict errors
// ---------------------------------------------------------------------------

/// Errors raised while resolving a single conflicted file.
#[derive(Debug, Error)]
pub enum ConflictError {
    /// The file is not one of the recognized kinds and has no strategy.
    #[error("no resolution strategy for '{path}'")]
    UnsupportedFile { path: String },

    /// The merged output does not have a clean open/close pairing.
    #[error("merged output for '{path}' is structurally ambiguous: {detail}")]
    StructuralAmbiguity { path: String, detail: String },

    /// Reading or writing the conflicted file failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Checkout or staging failed.
    #[error("conflict git error: {0}")]
    Git(#[from] GitError),
}

impl ConflictError {
    /// Skippable errors leave the file unresolved without ending the run.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFile { .. } | Self::StructuralAmbiguity { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading or writing the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Manifest errors
// ---------------------------------------------------------------------------

/// Errors from reading and rewriting `package.json` manifests.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("manifest '{path}' is not valid JSON: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A key path walks through something that is not a JSON object.
    #[error("manifest '{path}': '{key}' is not an object")]
    NotAnObject { path: String, key: String },

    /// The manifest carries no string `version` field.
    #[error("manifest '{0}' has no version")]
    NoVersion(String),

    #[error("invalid version '{value}': {source}")]
    InvalidVersion {
        value: String,
        #[source]
        source: semver::Error,
    },
}

// ---------------------------------------------------------------------------
// Workflow errors
// ---------------------------------------------------------------------------

/// Errors from the branch and package-version workflows.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// `new-feature-branch` was invoked without a ticket number.
    #[error("a ticket number is required to create a feature branch")]
    MissingTicket,

    /// The operation only makes sense on a branch other than mainline.
    #[error("already on mainline branch '{0}'")]
    OnMainline(String),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}
