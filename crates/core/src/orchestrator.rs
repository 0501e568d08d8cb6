//! End-to-end rebase conflict resolution.
//!
//! The [`ResolutionOrchestrator`] drives one pass:
//!
//! 1. Fetch and attempt a rebase onto the upstream mainline (conflicts expected).
//! 2. Collect the conflicted files and run them through the [`ConflictGate`].
//! 3. If rejected, abort the rebase. Otherwise resolve and stage every file.
//! 4. On a dry run stop there (aborting unless asked to leave the rebase
//!    open); otherwise finalize with `rebase --continue`.
//!
//! Every VCS failure after the rebase has started aborts the rebase before the
//! error propagates, so the working tree is never silently left half-rebased.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::conflict::{
    ConflictGate, ConflictResolver, ConflictedFile, FileResolution, GateDecision,
};
use crate::errors::CoreError;
use crate::git::{RebaseAttempt, Vcs};

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// States of one resolution pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Start,
    RebaseAttempted,
    /// The rebase applied without conflicts; nothing to resolve.
    Clean,
    GateEvaluated,
    Rejected,
    Resolving,
    DryRunStop,
    Finalizing,
    Aborted,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::RebaseAttempted => write!(f, "rebase_attempted"),
            Self::Clean => write!(f, "clean"),
            Self::GateEvaluated => write!(f, "gate_evaluated"),
            Self::Rejected => write!(f, "rejected"),
            Self::Resolving => write!(f, "resolving"),
            Self::DryRunStop => write!(f, "dry_run_stop"),
            Self::Finalizing => write!(f, "finalizing"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

// ---------------------------------------------------------------------------
// Options & outcome
// ---------------------------------------------------------------------------

/// Caller-supplied switches for one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Force-push the branch after finalizing. Accepted but never acted on.
    pub force_push_origin: bool,
    /// Run `rebase --continue` once every file is staged.
    pub finish_rebase: bool,
    /// Resolve and stage, then stop without finalizing.
    pub dry_run: bool,
    /// On a dry run, keep the rebase in progress instead of aborting it.
    pub leave_rebase_open: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            force_push_origin: false,
            finish_rebase: true,
            dry_run: false,
            leave_rebase_open: false,
        }
    }
}

/// A conflicted file left unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

/// What one pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionOutcome {
    /// Terminal phase.
    pub phase: Phase,
    pub aborted: bool,
    pub dry_run: bool,
    pub rebase_finalized: bool,
    pub conflicted: Vec<ConflictedFile>,
    pub gate: Option<GateDecision>,
    pub resolved: Vec<FileResolution>,
    pub skipped: Vec<SkippedFile>,
}

impl ResolutionOutcome {
    fn new(dry_run: bool) -> Self {
        Self {
            phase: Phase::Start,
            aborted: false,
            dry_run,
            rebase_finalized: false,
            conflicted: Vec::new(),
            gate: None,
            resolved: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// True when the gate turned the batch down.
    pub fn rejected(&self) -> bool {
        self.gate.as_ref().is_some_and(|g| !g.allowed)
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from = %self.phase, to = %phase, "resolution phase transition");
        self.phase = phase;
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Sequences fetch, rebase, gate, resolution, and finalize/abort.
pub struct ResolutionOrchestrator<'a, V: Vcs + ?Sized> {
    vcs: &'a V,
    config: &'a AppConfig,
}

impl<'a, V: Vcs + ?Sized> ResolutionOrchestrator<'a, V> {
    pub fn new(vcs: &'a V, config: &'a AppConfig) -> Self {
        Self { vcs, config }
    }

    /// Execute one full resolution pass.
    pub fn run(&self, options: RunOptions) -> Result<ResolutionOutcome, CoreError> {
        let mut outcome = ResolutionOutcome::new(options.dry_run);
        let onto = self.config.git.upstream_ref();
        info!(onto = %onto, ?options, "starting conflict resolution pass");

        if let Err(e) = self.vcs.fetch_all() {
            warn!(error = %e, "fetch failed, rebasing onto the last fetched state");
        }
        let attempt = self.vcs.rebase(&onto);
        outcome.enter(Phase::RebaseAttempted);

        match attempt {
            RebaseAttempt::Clean => {
                info!("rebase applied cleanly, nothing to resolve");
                outcome.gate = Some(ConflictGate::evaluate(&[], self.config.resolve.cap()));
                outcome.rebase_finalized = true;
                outcome.enter(Phase::Clean);
                return Ok(outcome);
            }
            RebaseAttempt::Failed(err) => {
                self.abort_quietly();
                return Err(err.into());
            }
            RebaseAttempt::Conflicted => {}
        }

        let paths = self.guard(self.vcs.list_conflicted_files())?;
        let files = ConflictedFile::from_paths(paths, &self.config.resolve);
        info!(
            files = ?files.iter().map(|f| f.path.as_str()).collect::<Vec<_>>(),
            "conflicted files"
        );
        let decision = ConflictGate::evaluate(&files, self.config.resolve.cap());
        outcome.conflicted = files;
        outcome.enter(Phase::GateEvaluated);

        if !decision.allowed {
            warn!(reason = %decision.reason, "unsafe to resolve automatically, aborting rebase");
            outcome.gate = Some(decision);
            outcome.enter(Phase::Rejected);
            self.vcs.rebase_abort()?;
            outcome.aborted = true;
            outcome.enter(Phase::Aborted);
            return Ok(outcome);
        }
        outcome.gate = Some(decision);

        outcome.enter(Phase::Resolving);
        for file in &outcome.conflicted {
            match ConflictResolver::resolve(self.vcs, file) {
                Ok(resolution) => outcome.resolved.push(resolution),
                Err(e) if e.is_skippable() => {
                    warn!(path = %file.path, error = %e, "skipping file");
                    outcome.skipped.push(SkippedFile {
                        path: file.path.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    self.abort_quietly();
                    return Err(e.into());
                }
            }
        }

        if options.dry_run {
            outcome.enter(Phase::DryRunStop);
            if !options.leave_rebase_open {
                self.vcs.rebase_abort()?;
                outcome.aborted = true;
            }
            info!(aborted = outcome.aborted, "dry run complete");
            return Ok(outcome);
        }

        if !outcome.skipped.is_empty() {
            warn!(
                count = outcome.skipped.len(),
                "some files could not be resolved, aborting rebase"
            );
            self.vcs.rebase_abort()?;
            outcome.aborted = true;
            outcome.enter(Phase::Aborted);
            return Ok(outcome);
        }

        if options.finish_rebase {
            outcome.enter(Phase::Finalizing);
            self.guard(self.vcs.rebase_continue())?;
            outcome.rebase_finalized = true;
            if options.force_push_origin {
                warn!("force-pushing the branch is disabled; push it manually");
            }
        } else {
            info!("resolved files staged, rebase left open");
        }

        Ok(outcome)
    }

    /// Abort the rebase before handing an error back. Not for the abort
    /// itself: a failed abort is returned as is.
    fn guard<T, E: Into<CoreError>>(&self, result: Result<T, E>) -> Result<T, CoreError> {
        result.map_err(|e| {
            self.abort_quietly();
            e.into()
        })
    }

    fn abort_quietly(&self) {
        if let Err(e) = self.vcs.rebase_abort() {
            warn!(error = %e, "rebase abort failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::{GateReason, Strategy};
    use crate::errors::GitError;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::Path;

    /// Scripted repository: conflicts, sides, and a call log.
    struct ScriptedRepo {
        root: tempfile::TempDir,
        attempt: RefCell<Option<RebaseAttempt>>,
        conflicted: Vec<String>,
        ours: HashMap<String, String>,
        theirs: HashMap<String, String>,
        fail_continue: bool,
        fail_abort: bool,
        calls: RefCell<Vec<String>>,
    }

    impl ScriptedRepo {
        fn conflicted(paths: &[&str]) -> Self {
            Self {
                root: tempfile::tempdir().unwrap(),
                attempt: RefCell::new(Some(RebaseAttempt::Conflicted)),
                conflicted: paths.iter().map(|p| p.to_string()).collect(),
                ours: HashMap::new(),
                theirs: HashMap::new(),
                fail_continue: false,
                fail_abort: false,
                calls: RefCell::new(Vec::new()),
            }
        }

        fn with_file(self, path: &str, content: &str) -> Self {
            let full = self.root.path().join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, content).unwrap();
            self
        }

        fn with_sides(mut self, path: &str, ours: &str, theirs: &str) -> Self {
            self.ours.insert(path.into(), ours.into());
            self.theirs.insert(path.into(), theirs.into());
            self.with_file(path, "<<<<<<< HEAD\n=======\n>>>>>>> feature\n")
        }

        fn read(&self, path: &str) -> String {
            std::fs::read_to_string(self.root.path().join(path)).unwrap()
        }

        fn log(&self, call: impl Into<String>) {
            self.calls.borrow_mut().push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        fn staged(&self) -> Vec<String> {
            self.calls()
                .iter()
                .filter_map(|c| c.strip_prefix("add ").map(str::to_string))
                .collect()
        }

        fn checkout(&self, side: &HashMap<String, String>, path: &str) -> Result<(), GitError> {
            let content = side.get(path).ok_or_else(|| GitError::CommandFailed {
                command: format!("checkout -- {}", path),
                exit_code: 1,
                stderr: "path does not have that version".into(),
            })?;
            std::fs::write(self.root.path().join(path), content)?;
            Ok(())
        }
    }

    impl Vcs for ScriptedRepo {
        fn workdir(&self) -> &Path {
            self.root.path()
        }
        fn fetch_all(&self) -> Result<(), GitError> {
            self.log("fetch");
            Ok(())
        }
        fn rebase(&self, onto: &str) -> RebaseAttempt {
            self.log(format!("rebase {}", onto));
            self.attempt.borrow_mut().take().unwrap_or(RebaseAttempt::Clean)
        }
        fn rebase_continue(&self) -> Result<(), GitError> {
            self.log("continue");
            if self.fail_continue {
                return Err(GitError::CommandFailed {
                    command: "rebase --continue".into(),
                    exit_code: 1,
                    stderr: "could not apply".into(),
                });
            }
            Ok(())
        }
        fn rebase_abort(&self) -> Result<(), GitError> {
            self.log("abort");
            if self.fail_abort {
                return Err(GitError::CommandFailed {
                    command: "rebase --abort".into(),
                    exit_code: 128,
                    stderr: "no rebase in progress?".into(),
                });
            }
            Ok(())
        }
        fn list_conflicted_files(&self) -> Result<Vec<String>, GitError> {
            self.log("list");
            Ok(self.conflicted.clone())
        }
        fn checkout_ours(&self, path: &str) -> Result<(), GitError> {
            self.log(format!("ours {}", path));
            self.checkout(&self.ours, path)
        }
        fn checkout_theirs(&self, path: &str) -> Result<(), GitError> {
            self.log(format!("theirs {}", path));
            self.checkout(&self.theirs, path)
        }
        fn stage_file(&self, path: &str) -> Result<(), GitError> {
            self.log(format!("add {}", path));
            Ok(())
        }
    }

    fn run(repo: &ScriptedRepo, options: RunOptions) -> Result<ResolutionOutcome, CoreError> {
        let config = AppConfig::default();
        ResolutionOrchestrator::new(repo, &config).run(options)
    }

    const APP: &str = "components/atoms/src/App.vue";
    const INDEX: &str = "components/atoms/src/index.js";

    #[test]
    fn test_component_conflict_takes_branch_and_finalizes() {
        let repo = ScriptedRepo::conflicted(&[APP]).with_sides(
            APP,
            "<template>mainline</template>\n",
            "<template>branch</template>\n",
        );

        let outcome = run(&repo, RunOptions::default()).unwrap();
        assert!(outcome.gate.as_ref().unwrap().allowed);
        assert_eq!(outcome.resolved[0].strategy, Strategy::TakeBranch);
        assert_eq!(repo.read(APP), "<template>branch</template>\n");
        assert_eq!(repo.staged(), vec![APP.to_string()]);
        assert!(outcome.rebase_finalized);
        assert!(!outcome.aborted);
        assert_eq!(outcome.phase, Phase::Finalizing);
        let expected: Vec<String> = vec![
            "fetch".into(),
            "rebase origin/master".into(),
            "list".into(),
            format!("theirs {}", APP),
            format!("add {}", APP),
            "continue".into(),
        ];
        assert_eq!(repo.calls(), expected);
    }

    #[test]
    fn test_unrecognized_file_aborts_without_staging() {
        let repo = ScriptedRepo::conflicted(&["src/random.js"]);
        let outcome = run(&repo, RunOptions::default()).unwrap();

        assert!(outcome.rejected());
        assert!(matches!(
            outcome.gate.as_ref().unwrap().reason,
            GateReason::UnrecognizedFile { .. }
        ));
        assert!(outcome.aborted);
        assert!(!outcome.rebase_finalized);
        assert_eq!(outcome.phase, Phase::Aborted);
        assert!(repo.staged().is_empty());
        assert_eq!(repo.calls().last().unwrap(), "abort");
    }

    #[test]
    fn test_too_many_files_rejected() {
        let paths = [
            "components/atoms/src/index.js",
            "components/molecules/src/index.js",
            "components/store/src/index.js",
            "components/atoms/src/App.vue",
            "package.json",
        ];
        let repo = ScriptedRepo::conflicted(&paths);
        let outcome = run(&repo, RunOptions::default()).unwrap();
        assert_eq!(
            outcome.gate.unwrap().reason,
            GateReason::TooManyFiles { count: 5, max: 4 }
        );
        assert!(outcome.aborted);
        assert!(repo.staged().is_empty());
    }

    #[test]
    fn test_dry_run_resolves_then_aborts() {
        let repo = ScriptedRepo::conflicted(&[INDEX]).with_file(
            INDEX,
            "export {\n<<<<<<< HEAD\n  Card,\n=======\n  Modal,\n>>>>>>> feature\n};\n",
        );
        let options = RunOptions {
            dry_run: true,
            ..RunOptions::default()
        };

        let outcome = run(&repo, options).unwrap();
        assert_eq!(repo.read(INDEX), "export {\n  Card,\n  Modal\n};\n");
        assert_eq!(repo.staged(), vec![INDEX.to_string()]);
        assert!(outcome.dry_run);
        assert!(outcome.aborted);
        assert!(!outcome.rebase_finalized);
        assert_eq!(outcome.phase, Phase::DryRunStop);
        assert!(!repo.calls().contains(&"continue".to_string()));
        assert_eq!(repo.calls().last().unwrap(), "abort");
    }

    #[test]
    fn test_dry_run_can_leave_rebase_open() {
        let repo = ScriptedRepo::conflicted(&["package.json"]).with_sides(
            "package.json",
            "{}\n",
            "{}\n",
        );
        let options = RunOptions {
            dry_run: true,
            leave_rebase_open: true,
            ..RunOptions::default()
        };

        let outcome = run(&repo, options).unwrap();
        assert!(!outcome.aborted);
        assert!(!repo.calls().contains(&"abort".to_string()));
        assert!(!repo.calls().contains(&"continue".to_string()));
    }

    #[test]
    fn test_finish_rebase_false_leaves_staged_rebase_open() {
        let repo = ScriptedRepo::conflicted(&["package.json"]).with_sides(
            "package.json",
            "{\"version\": \"2.0.0\"}\n",
            "{\"version\": \"1.0.0\"}\n",
        );
        let options = RunOptions {
            finish_rebase: false,
            force_push_origin: true,
            ..RunOptions::default()
        };

        let outcome = run(&repo, options).unwrap();
        assert_eq!(repo.read("package.json"), "{\"version\": \"2.0.0\"}\n");
        assert!(!outcome.rebase_finalized);
        assert!(!outcome.aborted);
        assert_eq!(outcome.phase, Phase::Resolving);
    }

    #[test]
    fn test_clean_rebase_has_nothing_to_do() {
        let repo = ScriptedRepo::conflicted(&[]);
        *repo.attempt.borrow_mut() = Some(RebaseAttempt::Clean);

        let outcome = run(&repo, RunOptions::default()).unwrap();
        assert_eq!(outcome.phase, Phase::Clean);
        assert!(!outcome.aborted);
        assert_eq!(outcome.gate.unwrap().reason, GateReason::NoConflicts);
        assert_eq!(repo.calls(), vec!["fetch", "rebase origin/master"]);
    }

    #[test]
    fn test_failed_rebase_propagates() {
        let repo = ScriptedRepo::conflicted(&[]);
        *repo.attempt.borrow_mut() = Some(RebaseAttempt::Failed(GitError::CommandFailed {
            command: "rebase origin/master".into(),
            exit_code: 128,
            stderr: "invalid upstream".into(),
        }));

        let err = run(&repo, RunOptions::default()).unwrap_err();
        assert!(matches!(err, CoreError::Git(GitError::CommandFailed { .. })));
        assert!(repo.staged().is_empty());
    }

    #[test]
    fn test_continue_failure_aborts_and_propagates() {
        let mut repo = ScriptedRepo::conflicted(&["package.json"]).with_sides(
            "package.json",
            "{}\n",
            "{}\n",
        );
        repo.fail_continue = true;

        let err = run(&repo, RunOptions::default()).unwrap_err();
        assert!(matches!(err, CoreError::Git(_)));
        let calls = repo.calls();
        assert_eq!(&calls[calls.len() - 2..], ["continue", "abort"]);
    }

    #[test]
    fn test_ambiguous_list_skipped_and_rebase_aborted() {
        let repo = ScriptedRepo::conflicted(&[INDEX]).with_file(
            INDEX,
            "export {\n<<<<<<< HEAD\n  Card,\n=======\n  Modal,\n>>>>>>> feature\n",
        );

        let outcome = run(&repo, RunOptions::default()).unwrap();
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].path, INDEX);
        assert!(outcome.resolved.is_empty());
        assert!(outcome.aborted);
        assert!(!outcome.rebase_finalized);
        assert!(repo.staged().is_empty());
    }

    #[test]
    fn test_missing_side_aborts_and_propagates() {
        let repo = ScriptedRepo::conflicted(&[APP]).with_file(APP, "conflicted\n");
        let err = run(&repo, RunOptions::default()).unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
        assert_eq!(repo.calls().last().unwrap(), "abort");
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::DryRunStop.to_string(), "dry_run_stop");
        assert_eq!(Phase::GateEvaluated.to_string(), "gate_evaluated");
    }

    #[test]
    fn test_failed_abort_is_not_retried() {
        let mut repo = ScriptedRepo::conflicted(&["src/random.js"]);
        repo.fail_abort = true;

        let err = run(&repo, RunOptions::default()).unwrap_err();
        assert!(matches!(err, CoreError::Git(GitError::CommandFailed { .. })));
        let aborts = repo.calls().iter().filter(|c| *c == "abort").count();
        assert_eq!(aborts, 1);
    }
}
