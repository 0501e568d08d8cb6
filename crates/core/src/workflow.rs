//! Everyday branch workflows around the mainline branch.
//!
//! These wrap the [`GitClient`] porcelain into the routines a developer runs
//! by hand: keep a feature branch rebased, cut a new feature branch from a
//! fresh mainline, and keep local playground components out of commits. Local
//! edits are stashed around any branch switch and restored afterwards.

use tracing::{info, warn};

use crate::config::AppConfig;
use crate::errors::WorkflowError;
use crate::git::{GitClient, RebaseAttempt, Vcs};

/// Manual recovery steps shown when a rebase stops on conflicts.
pub const REBASE_RECOVERY_STEPS: &str = "\
Either abort and restart with `git rebase --abort`, or fix the conflicts manually:
  1. `git status` to see conflicted files
  2. resolve the conflicts
  3. `git add` the resolved files
  4. `git rebase --continue`";

/// What [`BranchWorkflow::rebase`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebaseReport {
    /// The rebase stopped on conflicts and is still in progress.
    pub conflicted: bool,
    /// Local changes were stashed before rebasing.
    pub stashed: bool,
    /// The stash was popped again.
    pub stash_restored: bool,
}

/// Branch routines bound to one repository and configuration.
pub struct BranchWorkflow<'a> {
    git: &'a GitClient,
    config: &'a AppConfig,
}

impl<'a> BranchWorkflow<'a> {
    pub fn new(git: &'a GitClient, config: &'a AppConfig) -> Self {
        Self { git, config }
    }

    pub fn current_branch(&self) -> Result<String, WorkflowError> {
        Ok(self.git.current_branch()?)
    }

    /// Whether tracked files carry local edits worth stashing.
    pub fn is_branch_stashable(&self) -> Result<bool, WorkflowError> {
        Ok(self.git.has_tracked_changes()?)
    }

    /// Stash when `stashable` says so; `None` checks the working tree.
    /// Returns whether a stash was made.
    pub fn stash_if(&self, stashable: Option<bool>) -> Result<bool, WorkflowError> {
        let stashable = match stashable {
            Some(s) => s,
            None => self.is_branch_stashable()?,
        };
        if stashable {
            self.git.stash_push()?;
        }
        Ok(stashable)
    }

    /// Pop the stash when `stashable` says so; `None` checks the working tree.
    pub fn pop_if(&self, stashable: Option<bool>) -> Result<bool, WorkflowError> {
        let stashable = match stashable {
            Some(s) => s,
            None => self.is_branch_stashable()?,
        };
        if stashable {
            self.git.stash_pop()?;
        }
        Ok(stashable)
    }

    /// Check out mainline reset to its remote state. Returns whether local
    /// changes were stashed on the way.
    pub fn switch_master(&self, stashable: Option<bool>) -> Result<bool, WorkflowError> {
        self.git.fetch_all()?;
        let stashed = self.stash_if(stashable)?;
        let git = &self.config.git;
        self.git.checkout(&git.mainline)?;
        self.git.reset_hard(&git.upstream_ref())?;
        info!(mainline = %git.mainline, stashed, "switched to mainline");
        Ok(stashed)
    }

    /// Return to `branch` and restore the stash made when leaving it.
    pub fn reset_to_branch(&self, branch: &str, stashed: bool) -> Result<(), WorkflowError> {
        self.git.checkout(branch)?;
        self.pop_if(Some(stashed))?;
        Ok(())
    }

    /// Fetch (with tags) and rebase the current branch onto the upstream
    /// mainline, stashing local edits around it.
    ///
    /// A conflicted rebase is reported, not an error; the stash is then kept
    /// until the rebase is finished so it cannot collide with the conflict.
    pub fn rebase(&self) -> Result<RebaseReport, WorkflowError> {
        self.git.fetch_all_with_tags()?;
        let stashed = self.stash_if(None)?;
        let onto = self.config.git.upstream_ref();

        match self.git.rebase(&onto) {
            RebaseAttempt::Clean => {
                self.pop_if(Some(stashed))?;
                Ok(RebaseReport {
                    conflicted: false,
                    stashed,
                    stash_restored: stashed,
                })
            }
            RebaseAttempt::Conflicted => {
                warn!(onto = %onto, "rebase stopped on conflicts");
                if stashed {
                    warn!("local changes stay stashed; run `git stash pop` after the rebase");
                }
                Ok(RebaseReport {
                    conflicted: true,
                    stashed,
                    stash_restored: false,
                })
            }
            RebaseAttempt::Failed(err) => {
                self.pop_if(Some(stashed))?;
                Err(err.into())
            }
        }
    }

    /// Create `<prefix><ticket>` from an up-to-date mainline and check it out.
    ///
    /// Local edits follow the developer onto the new branch.
    pub fn new_feature_branch(&self, ticket: &str) -> Result<String, WorkflowError> {
        let ticket = ticket.trim();
        if ticket.is_empty() {
            return Err(WorkflowError::MissingTicket);
        }

        let branch = self.current_branch()?;
        let on_mainline = branch == self.config.git.mainline;
        let mut stashed = false;
        if !on_mainline {
            stashed = self.switch_master(None)?;
            if stashed {
                warn!("local changes were stashed and will be restored on the new branch");
            }
        }

        let name = format!("{}{}", self.config.git.feature_branch_prefix, ticket);
        self.git.checkout_new_branch(&name)?;
        // Only pop a stash made here; popping otherwise could grab an unrelated one.
        if !on_mainline {
            self.pop_if(Some(stashed))?;
        }
        info!(branch = %name, from = %branch, "created feature branch");
        Ok(name)
    }

    /// Mark every package's playground `App.vue` as skip-worktree.
    pub fn ignore_all_app_files(&self) -> Result<Vec<String>, WorkflowError> {
        let packages = &self.config.packages;
        let mut ignored = Vec::with_capacity(packages.app_components.len());
        for component in &packages.app_components {
            let path = format!("{}/{}/src/App.vue", packages.components_dir, component);
            self.git.skip_worktree(&path)?;
            ignored.push(path);
        }
        info!(count = ignored.len(), "ignoring local App.vue changes");
        Ok(ignored)
    }
}
