//! TOML-based configuration for rebasefix.
//!
//! Every field has a default, so running without a config file behaves like
//! the conventional setup: rebase onto `origin/master`, resolve at most four
//! files, and recognize `index.js`, `App.vue`, and `package.json`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Remote and branch naming.
    #[serde(default)]
    pub git: GitConfig,

    /// Conflict gate and recognized file names.
    #[serde(default)]
    pub resolve: ResolveConfig,

    /// Package layout used by the branch and version workflows.
    #[serde(default)]
    pub packages: PackagesConfig,
}

fn default_log_level() -> String {
    "warn".into()
}

// ---------------------------------------------------------------------------
// Git
// ---------------------------------------------------------------------------

/// Remote, mainline, and branch naming settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GitConfig {
    /// Remote that hosts the mainline branch. Default `origin`.
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Mainline branch name. Default `master`.
    #[serde(default = "default_mainline")]
    pub mainline: String,

    /// Prefix prepended to ticket numbers for new feature branches.
    #[serde(default = "default_feature_prefix")]
    pub feature_branch_prefix: String,
}

fn default_remote() -> String {
    "origin".into()
}
fn default_mainline() -> String {
    "master".into()
}
fn default_feature_prefix() -> String {
    "feature/SPAN-".into()
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            remote: default_remote(),
            mainline: default_mainline(),
            feature_branch_prefix: default_feature_prefix(),
        }
    }
}

impl GitConfig {
    /// The remote-tracking ref rebases are made onto, e.g. `origin/master`.
    pub fn upstream_ref(&self) -> String {
        format!("{}/{}", self.remote, self.mainline)
    }
}

// ---------------------------------------------------------------------------
// Resolve
// ---------------------------------------------------------------------------

/// Conflict gate settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolveConfig {
    /// Maximum number of conflicted files to resolve automatically. 0 disables the cap.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Base names of module-export list files, merged from both sides.
    #[serde(default = "default_list_files")]
    pub list_files: Vec<String>,

    /// Base names of UI component files, taken from the branch.
    #[serde(default = "default_component_files")]
    pub component_files: Vec<String>,

    /// Base names of package manifests, taken from mainline.
    #[serde(default = "default_manifest_files")]
    pub manifest_files: Vec<String>,
}

fn default_max_files() -> usize {
    4
}
fn default_list_files() -> Vec<String> {
    vec!["index.js".into()]
}
fn default_component_files() -> Vec<String> {
    vec!["App.vue".into()]
}
fn default_manifest_files() -> Vec<String> {
    vec!["package.json".into()]
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            list_files: default_list_files(),
            component_files: default_component_files(),
            manifest_files: default_manifest_files(),
        }
    }
}

impl ResolveConfig {
    /// The file cap as the gate consumes it: `None` when disabled.
    pub fn cap(&self) -> Option<usize> {
        (self.max_files > 0).then_some(self.max_files)
    }
}

// ---------------------------------------------------------------------------
// Packages
// ---------------------------------------------------------------------------

/// Multi-package layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackagesConfig {
    /// Directory (relative to the repo root) holding the packages.
    #[serde(default = "default_components_dir")]
    pub components_dir: String,

    /// Packages whose `src/App.vue` is a local playground and never committed.
    #[serde(default = "default_app_components")]
    pub app_components: Vec<String>,

    /// Packages whose manifest version tracks release tags.
    #[serde(default = "default_versioned")]
    pub versioned: Vec<String>,

    /// Published package name prefix; tags look like `<prefix><name>@<version>`.
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
}

fn default_components_dir() -> String {
    "components".into()
}
fn default_app_components() -> Vec<String> {
    vec!["atoms".into(), "molecules".into(), "store".into()]
}
fn default_versioned() -> Vec<String> {
    vec![
        "atoms".into(),
        "molecules".into(),
        "store".into(),
        "lib/helpers".into(),
    ]
}
fn default_name_prefix() -> String {
    "nbcs-".into()
}

impl Default for PackagesConfig {
    fn default() -> Self {
        Self {
            components_dir: default_components_dir(),
            app_components: default_app_components(),
            versioned: default_versioned(),
            name_prefix: default_name_prefix(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Load and validate `path` when given, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(p) => Self::load_from_file(p)?,
            None => {
                debug!("no configuration file given, using defaults");
                Self::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Render this configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.git.remote.trim().is_empty() {
            return Err(invalid("git.remote", "remote name must not be empty"));
        }
        if self.git.mainline.trim().is_empty() {
            return Err(invalid("git.mainline", "mainline branch must not be empty"));
        }

        let groups = [
            ("resolve.list_files", &self.resolve.list_files),
            ("resolve.component_files", &self.resolve.component_files),
            ("resolve.manifest_files", &self.resolve.manifest_files),
        ];
        for (field, names) in groups {
            if names.is_empty() {
                return Err(invalid(field, "at least one file name is required"));
            }
            if let Some(bad) = names.iter().find(|n| n.is_empty() || n.contains('/')) {
                return Err(invalid(
                    field,
                    &format!("'{}' must be a bare file name", bad),
                ));
            }
        }
        for (i, (field, names)) in groups.iter().enumerate() {
            for (other_field, other) in groups.iter().skip(i + 1) {
                if let Some(dup) = names.iter().find(|n| other.contains(n)) {
                    return Err(invalid(
                        field,
                        &format!("'{}' is also listed in {}", dup, other_field),
                    ));
                }
            }
        }

        if self.packages.components_dir.trim().is_empty() {
            return Err(invalid(
                "packages.components_dir",
                "components directory must not be empty",
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, detail: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.into(),
        detail: detail.into(),
    }
}
