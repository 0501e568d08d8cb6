//! End-to-end tests against real git repositories.
//!
//! Each test builds a bare `origin` plus a working clone in a temp dir, makes
//! mainline and a feature branch diverge, and drives the library exactly as
//! the CLI does. Tests skip when no `git` binary is available.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use rebasefix_core::conflict::{GateReason, Strategy};
use rebasefix_core::orchestrator::{Phase, ResolutionOrchestrator, RunOptions};
use rebasefix_core::versions::{manifest_version, PackageVersions};
use rebasefix_core::workflow::BranchWorkflow;
use rebasefix_core::{AppConfig, GitClient, Vcs};

const INDEX_JS: &str = "components/atoms/src/index.js";
const APP_VUE: &str = "components/atoms/src/App.vue";
const MANIFEST: &str = "components/atoms/package.json";

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(dir)
        .args(args)
        .env("GIT_EDITOR", "true")
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn manifest(name: &str, version: &str) -> String {
    format!(
        "{{\n  \"name\": \"{}\",\n  \"version\": \"{}\",\n  \"private\": false\n}}\n",
        name, version
    )
}

struct Fixture {
    _tmp: tempfile::TempDir,
    work: PathBuf,
}

impl Fixture {
    /// `origin` (bare) and `work` (clone) with one base commit on master.
    fn new() -> Option<Self> {
        if !git_available() {
            eprintln!("git not available, skipping");
            return None;
        }
        let tmp = tempfile::tempdir().unwrap();
        let origin = tmp.path().join("origin.git");
        let work = tmp.path().join("work");

        git(tmp.path(), &["init", "--bare", "origin.git"]);
        git(&origin, &["symbolic-ref", "HEAD", "refs/heads/master"]);
        git(tmp.path(), &["init", "work"]);
        git(&work, &["symbolic-ref", "HEAD", "refs/heads/master"]);
        for (key, value) in [
            ("user.name", "Test"),
            ("user.email", "test@test.com"),
            ("commit.gpgsign", "false"),
            ("core.autocrlf", "false"),
        ] {
            git(&work, &["config", key, value]);
        }
        git(&work, &["remote", "add", "origin", origin.to_str().unwrap()]);

        let fixture = Self { _tmp: tmp, work };
        fixture.write(INDEX_JS, "export {\n  Button,\n  Card\n};\n");
        fixture.write("components/atoms/src/util.js", "export const x = 1;\n");
        for package in ["atoms", "molecules", "store"] {
            fixture.write(
                &format!("components/{}/src/App.vue", package),
                "<template>base</template>\n",
            );
            fixture.write(
                &format!("components/{}/package.json", package),
                &manifest(&format!("nbcs-{}", package), "0.1.0"),
            );
        }
        fixture.write(
            "components/lib/helpers/package.json",
            &manifest("nbcs-helpers", "0.1.0"),
        );
        fixture.commit("base");
        git(&fixture.work, &["push", "-u", "origin", "master"]);
        Some(fixture)
    }

    fn write(&self, path: &str, content: &str) {
        let full = self.work.join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, content).unwrap();
    }

    fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.work.join(path)).unwrap()
    }

    fn commit(&self, message: &str) {
        git(&self.work, &["add", "-A"]);
        git(&self.work, &["commit", "-m", message]);
    }

    fn head(&self) -> String {
        git(&self.work, &["rev-parse", "HEAD"])
    }

    fn rebase_in_progress(&self) -> bool {
        let git_dir = self.work.join(".git");
        git_dir.join("rebase-merge").exists() || git_dir.join("rebase-apply").exists()
    }

    /// Advance origin/master with `mainline` edits, then put the feature
    /// branch edits on `feature/SPAN-1` branched from the old master.
    fn diverge(&self, mainline: &[(&str, &str)], feature: &[(&str, &str)]) {
        git(&self.work, &["checkout", "-b", "feature/SPAN-1"]);
        git(&self.work, &["checkout", "master"]);
        for (path, content) in mainline {
            self.write(path, content);
        }
        self.commit("mainline change");
        git(&self.work, &["push", "origin", "master"]);

        git(&self.work, &["checkout", "feature/SPAN-1"]);
        for (path, content) in feature {
            self.write(path, content);
        }
        self.commit("feature change");
    }

    fn standard_conflicts(&self) {
        let mainline_manifest = manifest("nbcs-atoms", "0.2.0");
        let feature_manifest = manifest("nbcs-atoms", "0.1.1");
        self.diverge(
            &[
                (INDEX_JS, "export {\n  Button,\n  Card,\n  Modal\n};\n"),
                (APP_VUE, "<template>mainline</template>\n"),
                (MANIFEST, mainline_manifest.as_str()),
            ],
            &[
                (INDEX_JS, "export {\n  Button,\n  Card,\n  Tooltip\n};\n"),
                (APP_VUE, "<template>feature</template>\n"),
                (MANIFEST, feature_manifest.as_str()),
            ],
        );
    }

    fn client(&self) -> GitClient {
        GitClient::new(&self.work).unwrap()
    }
}

#[test]
fn test_standard_conflicts_resolved_and_rebase_finished() {
    let Some(fx) = Fixture::new() else { return };
    fx.standard_conflicts();

    let client = fx.client();
    let config = AppConfig::default();
    let outcome = ResolutionOrchestrator::new(&client, &config)
        .run(RunOptions::default())
        .unwrap();

    assert_eq!(outcome.phase, Phase::Finalizing);
    assert!(outcome.rebase_finalized);
    assert!(!outcome.aborted);
    assert!(outcome.skipped.is_empty());
    assert_eq!(outcome.resolved.len(), 3);
    assert!(!fx.rebase_in_progress());

    assert_eq!(
        fx.read(INDEX_JS),
        "export {\n  Button,\n  Card,\n  Modal,\n  Tooltip\n};\n"
    );
    assert_eq!(fx.read(APP_VUE), "<template>feature</template>\n");
    assert_eq!(manifest_version(&fx.work.join(MANIFEST)).unwrap(), "0.2.0");

    assert_eq!(client.current_branch().unwrap(), "feature/SPAN-1");
    git(&fx.work, &["merge-base", "--is-ancestor", "origin/master", "HEAD"]);
    assert!(client.list_conflicted_files().unwrap().is_empty());
}

#[test]
fn test_index_with_named_imports_merged() {
    let Some(fx) = Fixture::new() else { return };
    let imports = "import { Button } from './Button';\nimport { Card } from './Card';\n\n";
    let mainline = format!("{}export {{\n  Button,\n  Card,\n  Modal\n}};\n", imports);
    let feature = format!("{}export {{\n  Button,\n  Card,\n  Tooltip\n}};\n", imports);
    fx.diverge(
        &[(INDEX_JS, mainline.as_str())],
        &[(INDEX_JS, feature.as_str())],
    );

    let client = fx.client();
    let config = AppConfig::default();
    let outcome = ResolutionOrchestrator::new(&client, &config)
        .run(RunOptions::default())
        .unwrap();

    assert!(outcome.rebase_finalized);
    assert!(outcome.skipped.is_empty());
    assert_eq!(
        fx.read(INDEX_JS),
        format!("{}export {{\n  Button,\n  Card,\n  Modal,\n  Tooltip\n}};\n", imports)
    );
}

#[test]
fn test_unrecognized_file_aborts_rebase() {
    let Some(fx) = Fixture::new() else { return };
    fx.diverge(
        &[
            (INDEX_JS, "export {\n  Button,\n  Card,\n  Modal\n};\n"),
            ("components/atoms/src/util.js", "export const x = 2;\n"),
        ],
        &[
            (INDEX_JS, "export {\n  Button,\n  Card,\n  Tooltip\n};\n"),
            ("components/atoms/src/util.js", "export const x = 3;\n"),
        ],
    );
    let before = fx.head();

    let client = fx.client();
    let config = AppConfig::default();
    let outcome = ResolutionOrchestrator::new(&client, &config)
        .run(RunOptions::default())
        .unwrap();

    assert!(outcome.rejected());
    assert!(outcome.aborted);
    assert!(matches!(
        outcome.gate.map(|g| g.reason),
        Some(GateReason::UnrecognizedFile { path }) if path.ends_with("util.js")
    ));
    assert!(outcome.resolved.is_empty());
    assert!(!fx.rebase_in_progress());
    assert_eq!(fx.head(), before);
    assert_eq!(fx.read(INDEX_JS), "export {\n  Button,\n  Card,\n  Tooltip\n};\n");
}

#[test]
fn test_dry_run_aborts_by_default() {
    let Some(fx) = Fixture::new() else { return };
    fx.standard_conflicts();
    let before = fx.head();

    let client = fx.client();
    let config = AppConfig::default();
    let outcome = ResolutionOrchestrator::new(&client, &config)
        .run(RunOptions {
            dry_run: true,
            ..RunOptions::default()
        })
        .unwrap();

    assert_eq!(outcome.phase, Phase::DryRunStop);
    assert!(outcome.aborted);
    assert!(!outcome.rebase_finalized);
    assert_eq!(outcome.resolved.len(), 3);
    assert!(!fx.rebase_in_progress());
    assert_eq!(fx.head(), before);
}

#[test]
fn test_dry_run_can_leave_rebase_open() {
    let Some(fx) = Fixture::new() else { return };
    fx.standard_conflicts();

    let client = fx.client();
    let config = AppConfig::default();
    let outcome = ResolutionOrchestrator::new(&client, &config)
        .run(RunOptions {
            dry_run: true,
            leave_rebase_open: true,
            ..RunOptions::default()
        })
        .unwrap();

    assert_eq!(outcome.phase, Phase::DryRunStop);
    assert!(!outcome.aborted);
    assert!(fx.rebase_in_progress());
    assert!(client.list_conflicted_files().unwrap().is_empty());
    let strategies: Vec<Strategy> = outcome.resolved.iter().map(|r| r.strategy).collect();
    assert!(strategies.contains(&Strategy::MergeBothLists));
    assert!(strategies.contains(&Strategy::TakeMainline));
    assert!(strategies.contains(&Strategy::TakeBranch));

    client.rebase_abort().unwrap();
}

#[test]
fn test_clean_rebase_needs_no_resolution() {
    let Some(fx) = Fixture::new() else { return };
    fx.diverge(
        &[(INDEX_JS, "export {\n  Button,\n  Card,\n  Modal\n};\n")],
        &[("components/atoms/src/util.js", "export const x = 5;\n")],
    );

    let client = fx.client();
    let config = AppConfig::default();
    let outcome = ResolutionOrchestrator::new(&client, &config)
        .run(RunOptions::default())
        .unwrap();

    assert_eq!(outcome.phase, Phase::Clean);
    assert!(outcome.conflicted.is_empty());
    assert_eq!(fx.read(INDEX_JS), "export {\n  Button,\n  Card,\n  Modal\n};\n");
}

#[test]
fn test_workflow_rebase_keeps_local_edits() {
    let Some(fx) = Fixture::new() else { return };
    fx.diverge(
        &[(INDEX_JS, "export {\n  Button,\n  Card,\n  Modal\n};\n")],
        &[("components/atoms/src/util.js", "export const x = 5;\n")],
    );
    fx.write(APP_VUE, "<template>local</template>\n");

    let client = fx.client();
    let config = AppConfig::default();
    let report = BranchWorkflow::new(&client, &config).rebase().unwrap();

    assert!(!report.conflicted);
    assert!(report.stashed);
    assert!(report.stash_restored);
    assert_eq!(fx.read(APP_VUE), "<template>local</template>\n");
    assert_eq!(fx.read(INDEX_JS), "export {\n  Button,\n  Card,\n  Modal\n};\n");
}

#[test]
fn test_new_feature_branch_from_fresh_mainline() {
    let Some(fx) = Fixture::new() else { return };
    fx.diverge(
        &[(INDEX_JS, "export {\n  Button,\n  Card,\n  Modal\n};\n")],
        &[("components/atoms/src/util.js", "export const x = 5;\n")],
    );
    // Local master is behind origin/master; a new branch must start from the remote.
    git(&fx.work, &["branch", "-f", "master", "HEAD~1"]);
    fx.write(APP_VUE, "<template>wip</template>\n");

    let client = fx.client();
    let config = AppConfig::default();
    let name = BranchWorkflow::new(&client, &config)
        .new_feature_branch("1234")
        .unwrap();

    assert_eq!(name, "feature/SPAN-1234");
    assert_eq!(client.current_branch().unwrap(), "feature/SPAN-1234");
    assert_eq!(fx.head(), git(&fx.work, &["rev-parse", "origin/master"]));
    assert_eq!(fx.read(APP_VUE), "<template>wip</template>\n");
}

#[test]
fn test_new_feature_branch_requires_ticket() {
    let Some(fx) = Fixture::new() else { return };
    let client = fx.client();
    let config = AppConfig::default();
    assert!(BranchWorkflow::new(&client, &config)
        .new_feature_branch("  ")
        .is_err());
}

#[test]
fn test_ignore_all_app_files() {
    let Some(fx) = Fixture::new() else { return };
    let client = fx.client();
    let config = AppConfig::default();
    let ignored = BranchWorkflow::new(&client, &config)
        .ignore_all_app_files()
        .unwrap();
    assert_eq!(ignored.len(), 3);

    fx.write(APP_VUE, "<template>playground</template>\n");
    assert_eq!(git(&fx.work, &["status", "--porcelain"]), "");
    let listing = git(&fx.work, &["ls-files", "-v", "--", APP_VUE]);
    assert!(listing.starts_with("S "), "unexpected listing: {}", listing);
}

#[test]
fn test_update_versions_from_tags() {
    let Some(fx) = Fixture::new() else { return };
    git(&fx.work, &["tag", "nbcs-atoms@0.2.0"]);
    git(&fx.work, &["tag", "nbcs-atoms@0.10.0-beta.1"]);
    git(&fx.work, &["tag", "nbcs-helpers@1.0.0"]);

    let client = fx.client();
    let config = AppConfig::default();
    let updated = PackageVersions::new(&client, &config)
        .update_from_tags()
        .unwrap();

    assert_eq!(updated.len(), 2);
    assert_eq!(manifest_version(&fx.work.join(MANIFEST)).unwrap(), "0.10.0-beta.1");
    assert_eq!(
        manifest_version(&fx.work.join("components/lib/helpers/package.json")).unwrap(),
        "1.0.0"
    );
    assert_eq!(
        manifest_version(&fx.work.join("components/store/package.json")).unwrap(),
        "0.1.0"
    );
}

#[test]
fn test_update_versions_from_master() {
    let Some(fx) = Fixture::new() else { return };
    let mainline_manifest = manifest("nbcs-atoms", "0.3.0");
    fx.diverge(
        &[(MANIFEST, mainline_manifest.as_str())],
        &[("components/atoms/src/util.js", "export const x = 5;\n")],
    );
    fx.write(APP_VUE, "<template>local</template>\n");

    let client = fx.client();
    let config = AppConfig::default();
    let versions = PackageVersions::new(&client, &config)
        .update_from_master()
        .unwrap();

    assert_eq!(versions.get("atoms").map(String::as_str), Some("0.3.0"));
    assert_eq!(client.current_branch().unwrap(), "feature/SPAN-1");
    assert_eq!(manifest_version(&fx.work.join(MANIFEST)).unwrap(), "0.3.0");
    assert_eq!(fx.read(APP_VUE), "<template>local</template>\n");
}

#[test]
fn test_update_versions_from_master_refused_on_mainline() {
    let Some(fx) = Fixture::new() else { return };
    let client = fx.client();
    let config = AppConfig::default();
    assert!(PackageVersions::new(&client, &config)
        .update_from_master()
        .is_err());
}
