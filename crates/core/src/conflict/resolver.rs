//! Per-file conflict resolution.
//!
//! The [`ConflictResolver`] applies a file's [`Strategy`] in the working tree
//! and stages the result. Nothing is staged for a file that fails.

use tracing::{debug, info, warn};

use super::lines::FileLines;
use super::merger::{has_conflict_markers, BracketMerger};
use super::strategy::{ConflictedFile, Strategy};
use crate::errors::ConflictError;
use crate::git::Vcs;

/// Which side a whole-file resolution adopts.
///
/// During a rebase git's `--ours` is the branch being rebased onto (mainline)
/// and `--theirs` is the commit being replayed (the branch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Mainline,
    Branch,
}

/// A file the resolver staged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileResolution {
    pub path: String,
    pub strategy: Strategy,
}

/// Stateless conflict resolution operations.
pub struct ConflictResolver;

impl ConflictResolver {
    /// Resolve one conflicted file according to its kind, then stage it.
    pub fn resolve<V: Vcs + ?Sized>(
        vcs: &V,
        file: &ConflictedFile,
    ) -> Result<FileResolution, ConflictError> {
        let strategy = file.strategy();
        info!(path = %file.path, kind = %file.kind, %strategy, "resolving conflicted file");

        match strategy {
            Strategy::MergeBothLists => Self::merge_both(vcs, &file.path)?,
            Strategy::TakeMainline => Self::take_side(vcs, &file.path, Side::Mainline)?,
            Strategy::TakeBranch => Self::take_side(vcs, &file.path, Side::Branch)?,
            Strategy::Unsupported => {
                warn!(path = %file.path, "no strategy for file");
                return Err(ConflictError::UnsupportedFile {
                    path: file.path.clone(),
                });
            }
        }

        Ok(FileResolution {
            path: file.path.clone(),
            strategy,
        })
    }

    /// Keep both sides of the bracketed list, write the file, and stage it.
    pub fn merge_both<V: Vcs + ?Sized>(vcs: &V, path: &str) -> Result<(), ConflictError> {
        let full_path = vcs.workdir().join(path);
        let io_err = |source| ConflictError::Io {
            path: path.to_string(),
            source,
        };

        let original = FileLines::read(&full_path).map_err(io_err)?;
        if has_conflict_markers(&original.lines) {
            let merged = BracketMerger::merge_both(&original.lines);
            BracketMerger::validate(&merged).map_err(|detail| {
                warn!(path, %detail, "merged list failed validation");
                ConflictError::StructuralAmbiguity {
                    path: path.to_string(),
                    detail,
                }
            })?;
            original.with_lines(merged).write(&full_path).map_err(io_err)?;
        } else {
            debug!(path, "no conflict markers present, staging as-is");
        }

        vcs.stage_file(path)?;
        info!(path, "merged both sides and staged");
        Ok(())
    }

    /// Adopt one side wholesale and stage it.
    pub fn take_side<V: Vcs + ?Sized>(vcs: &V, path: &str, side: Side) -> Result<(), ConflictError> {
        match side {
            Side::Mainline => vcs.checkout_ours(path)?,
            Side::Branch => vcs.checkout_theirs(path)?,
        }
        vcs.stage_file(path)?;
        info!(path, ?side, "took one side and staged");
        Ok(())
    }
}
