//! Subcommand implementations.

pub mod config;
pub mod git;
pub mod version;

use std::path::Path;

use anyhow::{Context, Result};

use rebasefix_core::git::GitClient;

/// Open the working tree named by `--repo`.
pub fn open_repo(path: &Path) -> Result<GitClient> {
    GitClient::new(path).with_context(|| format!("failed to open repository at {}", path.display()))
}
