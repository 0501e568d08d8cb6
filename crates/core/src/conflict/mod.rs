//! Conflict gating, classification, list merging, and resolution.
//!
//! The conflict subsystem is responsible for:
//! 1. **Classification** -- mapping each conflicted path to a file kind and strategy.
//! 2. **Gating** -- deciding whether a batch is safe to resolve automatically.
//! 3. **Merging** -- unioning both sides of a bracketed list.
//! 4. **Resolution** -- writing and staging the resolved file.

pub mod gate;
pub mod lines;
pub mod merger;
pub mod resolver;
pub mod strategy;

pub use gate::{ConflictGate, GateDecision, GateReason};
pub use lines::{FileLines, LineEnding};
pub use merger::BracketMerger;
pub use resolver::{ConflictResolver, FileResolution, Side};
pub use strategy::{ConflictedFile, FileKind, FileStrategySelector, Strategy};
