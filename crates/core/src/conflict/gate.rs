//! Eligibility check for automated resolution.
//!
//! Syntactic merging is only safe when the conflict surface is small and
//! confined to known-shape files. Any unrecognized file means a semantic
//! conflict this tool cannot judge, so the whole batch is rejected.

use tracing::{debug, info};

use super::strategy::{ConflictedFile, FileKind};

/// Why the gate approved or rejected a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateReason {
    Approved,
    NoConflicts,
    TooManyFiles { count: usize, max: usize },
    UnrecognizedFile { path: String },
}

impl std::fmt::Display for GateReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approved => write!(f, "all conflicted files are list, component, or manifest files"),
            Self::NoConflicts => write!(f, "no conflicted files"),
            Self::TooManyFiles { count, max } => {
                write!(f, "{} conflicted files exceeds the limit of {}", count, max)
            }
            Self::UnrecognizedFile { path } => {
                write!(f, "'{}' is not a file this tool knows how to resolve", path)
            }
        }
    }
}

/// Outcome of [`ConflictGate::evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateDecision {
    pub allowed: bool,
    pub reason: GateReason,
}

impl GateDecision {
    fn approve() -> Self {
        Self {
            allowed: true,
            reason: GateReason::Approved,
        }
    }

    fn reject(reason: GateReason) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }
}

/// Stateless gate over a conflicted-file set.
pub struct ConflictGate;

impl ConflictGate {
    /// Evaluate the rules in order; the first failing rule rejects.
    ///
    /// `max_files` of `None` or `Some(0)` disables the count cap.
    pub fn evaluate(files: &[ConflictedFile], max_files: Option<usize>) -> GateDecision {
        let count = files.len();

        if count == 0 {
            info!("gate rejected: nothing to resolve");
            return GateDecision::reject(GateReason::NoConflicts);
        }
        debug!(count, "gate check passed: at least one conflicted file");

        if let Some(max) = max_files.filter(|m| *m > 0) {
            if count > max {
                info!(count, max, "gate rejected: too many conflicted files");
                return GateDecision::reject(GateReason::TooManyFiles { count, max });
            }
            debug!(count, max, "gate check passed: within file limit");
        }

        if let Some(file) = files.iter().find(|f| f.kind == FileKind::Unknown) {
            info!(path = %file.path, "gate rejected: unrecognized file");
            return GateDecision::reject(GateReason::UnrecognizedFile {
                path: file.path.clone(),
            });
        }
        debug!("gate check passed: every file is a recognized kind");

        GateDecision::approve()
    }
}
