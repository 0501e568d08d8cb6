//! Package manifest versions.
//!
//! Each versioned package lives at `<components_dir>/<package>/package.json`
//! and is released under tags named `<prefix><name>@<semver>`. Manifests can
//! be brought up to date either from those tags or from mainline's copies.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use semver::Version;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::errors::{ManifestError, WorkflowError};
use crate::git::{GitClient, Vcs};
use crate::workflow::BranchWorkflow;

// ---------------------------------------------------------------------------
// Manifest file helpers
// ---------------------------------------------------------------------------

pub fn read_manifest(path: &Path) -> Result<Value, ManifestError> {
    let display = path.display().to_string();
    let contents = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: display.clone(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ManifestError::Json {
        path: display,
        source,
    })
}

/// Write `manifest` with two-space indentation, keeping key order.
pub fn write_manifest(path: &Path, manifest: &Value) -> Result<(), ManifestError> {
    let display = path.display().to_string();
    let mut rendered = serde_json::to_string_pretty(manifest).map_err(|source| {
        ManifestError::Json {
            path: display.clone(),
            source,
        }
    })?;
    rendered.push('\n');
    std::fs::write(path, rendered).map_err(|source| ManifestError::Io {
        path: display,
        source,
    })
}

/// Set a dot-separated key (`version`, `dependencies.nbcs-atoms`), creating
/// intermediate objects as needed.
pub fn set_value(manifest: &mut Value, key: &str, value: Value) -> Result<(), ManifestError> {
    let not_object = |k: &str| ManifestError::NotAnObject {
        path: String::new(),
        key: k.to_string(),
    };
    let (parents, last) = match key.rsplit_once('.') {
        Some((parents, last)) => (parents.split('.').collect::<Vec<_>>(), last),
        None => (Vec::new(), key),
    };

    let mut cursor = manifest;
    for part in parents {
        cursor = cursor
            .as_object_mut()
            .ok_or_else(|| not_object(part))?
            .entry(part)
            .or_insert_with(|| Value::Object(Map::new()));
    }
    cursor
        .as_object_mut()
        .ok_or_else(|| not_object(key))?
        .insert(last.to_string(), value);
    Ok(())
}

/// Update several keys of the manifest at `path` in one read/write.
pub fn write_manifest_values(path: &Path, values: &[(&str, Value)]) -> Result<(), ManifestError> {
    let mut manifest = read_manifest(path)?;
    for (key, value) in values {
        set_value(&mut manifest, key, value.clone()).map_err(|e| match e {
            ManifestError::NotAnObject { key, .. } => ManifestError::NotAnObject {
                path: path.display().to_string(),
                key,
            },
            other => other,
        })?;
    }
    write_manifest(path, &manifest)
}

pub fn manifest_version(path: &Path) -> Result<String, ManifestError> {
    read_manifest(path)?
        .get("version")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ManifestError::NoVersion(path.display().to_string()))
}

/// Highest semver among `tags` that start with `prefix`. Prereleases count.
pub fn latest_version<'t, I>(tags: I, prefix: &str) -> Option<Version>
where
    I: IntoIterator<Item = &'t str>,
{
    tags.into_iter()
        .filter_map(|tag| tag.strip_prefix(prefix))
        .filter_map(|v| match Version::parse(v) {
            Ok(version) => Some(version),
            Err(e) => {
                debug!(tag = v, error = %e, "ignoring non-semver tag");
                None
            }
        })
        .max()
}

/// Every value must parse as semver; checked before anything is written.
fn check_versions(versions: &BTreeMap<String, String>) -> Result<(), ManifestError> {
    for version in versions.values() {
        Version::parse(version).map_err(|source| ManifestError::InvalidVersion {
            value: version.clone(),
            source,
        })?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Package versions
// ---------------------------------------------------------------------------

/// Version bookkeeping for the configured packages.
pub struct PackageVersions<'a> {
    git: &'a GitClient,
    config: &'a AppConfig,
}

impl<'a> PackageVersions<'a> {
    pub fn new(git: &'a GitClient, config: &'a AppConfig) -> Self {
        Self { git, config }
    }

    /// Published name: `atoms` becomes `nbcs-atoms`, `lib/helpers` becomes `nbcs-helpers`.
    pub fn package_name(&self, package: &str) -> String {
        format!(
            "{}{}",
            self.config.packages.name_prefix,
            package.trim_start_matches("lib/")
        )
    }

    pub fn manifest_path(&self, package: &str) -> PathBuf {
        self.git
            .workdir()
            .join(&self.config.packages.components_dir)
            .join(package)
            .join("package.json")
    }

    pub fn latest_tag_version(&self, package: &str) -> Result<Option<Version>, WorkflowError> {
        let prefix = format!("{}@", self.package_name(package));
        let tags = self.git.list_tags(&format!("{}*", prefix))?;
        debug!(package, count = tags.len(), "listed release tags");
        Ok(latest_version(tags.iter().map(String::as_str), &prefix))
    }

    /// Set every package's manifest version to its latest release tag.
    /// Packages without a release tag are left alone.
    pub fn update_from_tags(&self) -> Result<BTreeMap<String, Version>, WorkflowError> {
        let mut updated = BTreeMap::new();
        for package in &self.config.packages.versioned {
            let Some(version) = self.latest_tag_version(package)? else {
                warn!(package = %package, "no release tag found, leaving version unchanged");
                continue;
            };
            info!(package = %package, %version, "latest tag");
            write_manifest_values(
                &self.manifest_path(package),
                &[("version", Value::String(version.to_string()))],
            )?;
            updated.insert(package.clone(), version);
        }
        Ok(updated)
    }

    /// Manifest versions as currently checked out.
    pub fn versions_by_package(&self) -> Result<BTreeMap<String, String>, WorkflowError> {
        let mut versions = BTreeMap::new();
        for package in &self.config.packages.versioned {
            let version = manifest_version(&self.manifest_path(package))?;
            debug!(package = %package, %version, "read manifest version");
            versions.insert(package.clone(), version);
        }
        Ok(versions)
    }

    /// Copy mainline's package versions onto the current branch.
    ///
    /// Switches to a fresh mainline to read them, returns to the branch
    /// (restoring any stashed edits), then rewrites the branch's manifests.
    pub fn update_from_master(&self) -> Result<BTreeMap<String, String>, WorkflowError> {
        let workflow = BranchWorkflow::new(self.git, self.config);
        let branch = workflow.current_branch()?;
        if branch == self.config.git.mainline {
            return Err(WorkflowError::OnMainline(branch));
        }

        let stashable = workflow.is_branch_stashable()?;
        workflow.switch_master(Some(stashable))?;
        let mainline_versions = self.versions_by_package();
        workflow.reset_to_branch(&branch, stashable)?;
        let mainline_versions = mainline_versions?;
        info!(versions = ?mainline_versions, "mainline versions by package");

        check_versions(&mainline_versions)?;
        for (package, version) in &mainline_versions {
            write_manifest_values(
                &self.manifest_path(package),
                &[("version", Value::String(version.clone()))],
            )?;
        }
        Ok(mainline_versions)
    }
}
