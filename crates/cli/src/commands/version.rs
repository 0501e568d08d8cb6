//! `rebasefix version ...`

use std::process::ExitCode;

use anyhow::{Context, Result};

use rebasefix_core::config::AppConfig;
use rebasefix_core::git::GitClient;
use rebasefix_core::versions::PackageVersions;

use crate::report;

pub fn run_update_from_master(git: &GitClient, config: &AppConfig) -> Result<ExitCode> {
    let versions = PackageVersions::new(git, config);
    let updated = versions
        .update_from_master()
        .context("failed to copy versions from mainline")?;
    for (package, version) in &updated {
        report::log(
            "version",
            &format!("{} set to {}", versions.package_name(package), version),
        );
    }
    Ok(ExitCode::SUCCESS)
}

pub fn run_update_from_tags(git: &GitClient, config: &AppConfig) -> Result<ExitCode> {
    let versions = PackageVersions::new(git, config);
    let updated = versions
        .update_from_tags()
        .context("failed to update versions from tags")?;
    if updated.is_empty() {
        report::warn("version", "no release tags found, nothing updated");
    }
    for (package, version) in &updated {
        report::log(
            "version",
            &format!("{} set to {}", versions.package_name(package), version),
        );
    }
    Ok(ExitCode::SUCCESS)
}
