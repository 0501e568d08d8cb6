//! Conflicted-file classification and per-kind resolution strategy.

use serde::{Deserialize, Serialize};

use crate::config::ResolveConfig;

/// The recognized shapes of conflicted file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// Module-export list (`index.js`).
    ListFile,
    /// UI component (`App.vue`).
    ComponentFile,
    /// Package manifest (`package.json`).
    ManifestFile,
    Unknown,
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ListFile => write!(f, "list"),
            Self::ComponentFile => write!(f, "component"),
            Self::ManifestFile => write!(f, "manifest"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// How a conflicted file gets resolved.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Union both sides of the bracketed list.
    MergeBothLists,
    /// Adopt the mainline version wholesale.
    TakeMainline,
    /// Adopt the branch version wholesale.
    TakeBranch,
    Unsupported,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MergeBothLists => write!(f, "merge both"),
            Self::TakeMainline => write!(f, "take mainline"),
            Self::TakeBranch => write!(f, "take branch"),
            Self::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// A file git reported as unmerged after the rebase attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictedFile {
    /// Path relative to the working tree root, `/`-separated.
    pub path: String,
    pub base_name: String,
    pub kind: FileKind,
}

impl ConflictedFile {
    pub fn new(path: impl Into<String>, config: &ResolveConfig) -> Self {
        let path = path.into();
        let base_name = path.rsplit('/').next().unwrap_or(path.as_str()).to_string();
        let kind = FileStrategySelector::classify(&base_name, config);
        Self {
            path,
            base_name,
            kind,
        }
    }

    /// Classify every path in a conflicted-file listing.
    pub fn from_paths<I, S>(paths: I, config: &ResolveConfig) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        paths.into_iter().map(|p| Self::new(p, config)).collect()
    }

    pub fn strategy(&self) -> Strategy {
        FileStrategySelector::select(self.kind)
    }
}

/// Maps file base names to kinds and kinds to strategies.
pub struct FileStrategySelector;

impl FileStrategySelector {
    /// Exact base-name match against the configured names.
    pub fn classify(base_name: &str, config: &ResolveConfig) -> FileKind {
        let matches = |names: &[String]| names.iter().any(|n| n == base_name);
        if matches(&config.list_files) {
            FileKind::ListFile
        } else if matches(&config.component_files) {
            FileKind::ComponentFile
        } else if matches(&config.manifest_files) {
            FileKind::ManifestFile
        } else {
            FileKind::Unknown
        }
    }

    pub fn select(kind: FileKind) -> Strategy {
        match kind {
            FileKind::ListFile => Strategy::MergeBothLists,
            // Manifests should not diverge intentionally; mainline is authoritative.
            FileKind::ManifestFile => Strategy::TakeMainline,
            // The branch's component supersedes mainline's.
            FileKind::ComponentFile => Strategy::TakeBranch,
            FileKind::Unknown => Strategy::Unsupported,
        }
    }
}
