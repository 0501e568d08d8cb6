//! Local Git repository operations.
//!
//! Read-only queries (current branch, dirty state) go through `git2`. Anything
//! that touches rebase state, the index, or the stash shells out to the `git`
//! binary so the repository stays consistent with what a developer would see
//! running the same porcelain commands by hand.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use git2::{Repository, StatusOptions};
use tracing::{debug, info, instrument, warn};

use super::{RebaseAttempt, Vcs};
use crate::errors::GitError;

/// High-level Git client for one working tree.
pub struct GitClient {
    repo: Repository,
    workdir: PathBuf,
}

impl GitClient {
    /// Open an existing, non-bare Git repository at `repo_path`.
    pub fn new<P: AsRef<Path>>(repo_path: P) -> Result<Self, GitError> {
        let path = repo_path.as_ref();
        info!(path = %path.display(), "opening git repository");
        let repo = Repository::open(path)
            .map_err(|_| GitError::RepositoryNotFound(path.display().to_string()))?;
        let workdir = repo
            .workdir()
            .ok_or_else(|| GitError::NoWorkdir(path.display().to_string()))?
            .to_path_buf();
        Ok(Self { repo, workdir })
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    /// Name of the branch HEAD points at.
    pub fn current_branch(&self) -> Result<String, GitError> {
        let head = self.repo.head()?;
        if !head.is_branch() {
            return Err(GitError::DetachedHead);
        }
        head.shorthand()
            .map(str::to_string)
            .ok_or(GitError::DetachedHead)
    }

    /// Whether tracked files differ from HEAD (untracked files do not count).
    pub fn has_tracked_changes(&self) -> Result<bool, GitError> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(false).include_ignored(false);
        let statuses = self.repo.statuses(Some(&mut opts))?;
        let dirty = statuses
            .iter()
            .any(|entry| entry.status() != git2::Status::CURRENT);
        debug!(dirty, "checked working tree state");
        Ok(dirty)
    }

    #[instrument(skip(self))]
    pub fn fetch_all_with_tags(&self) -> Result<(), GitError> {
        self.run_git(&["fetch", "--all", "--tags"])?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn stash_push(&self) -> Result<(), GitError> {
        self.run_git(&["stash", "push"])?;
        info!("stashed local changes");
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn stash_pop(&self) -> Result<(), GitError> {
        self.run_git(&["stash", "pop"])?;
        info!("restored stashed changes");
        Ok(())
    }

    /// Check out an existing branch.
    #[instrument(skip(self))]
    pub fn checkout(&self, branch: &str) -> Result<(), GitError> {
        self.run_git(&["checkout", branch])?;
        Ok(())
    }

    /// Create or reset `branch` at the current HEAD and check it out.
    #[instrument(skip(self))]
    pub fn checkout_new_branch(&self, branch: &str) -> Result<(), GitError> {
        self.run_git(&["checkout", "-B", branch])?;
        info!(branch, "checked out branch");
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn reset_hard(&self, target: &str) -> Result<(), GitError> {
        self.run_git(&["reset", "--hard", target])?;
        Ok(())
    }

    /// Mark a tracked file so local edits are never picked up by `git add`.
    #[instrument(skip(self))]
    pub fn skip_worktree(&self, path: &str) -> Result<(), GitError> {
        self.run_git(&["update-index", "--skip-worktree", "--", path])?;
        Ok(())
    }

    /// Tag names matching a `git tag -l` glob.
    pub fn list_tags(&self, pattern: &str) -> Result<Vec<String>, GitError> {
        let output = self.run_git(&["tag", "-l", pattern])?;
        Ok(non_empty_lines(&output))
    }

    fn run_git(&self, args: &[&str]) -> Result<String, GitError> {
        let mut cmd = Command::new("git");
        cmd.current_dir(&self.workdir)
            .args(args)
            .env("GIT_EDITOR", "true")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let command = args.join(" ");
        debug!(cmd = %format!("git {}", command), "running git command");
        let output = cmd.output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GitError::BinaryNotFound("git".into())
            } else {
                GitError::IoError(e)
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let exit_code = output.status.code().unwrap_or(-1);
            warn!(exit_code, %stderr, "git command failed");
            return Err(GitError::CommandFailed {
                command,
                exit_code,
                stderr,
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl Vcs for GitClient {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    #[instrument(skip(self))]
    fn fetch_all(&self) -> Result<(), GitError> {
        self.run_git(&["fetch", "--all"])?;
        Ok(())
    }

    #[instrument(skip(self))]
    fn rebase(&self, onto: &str) -> RebaseAttempt {
        // Plain two-way markers; a diff3 base section would read as list entries.
        match self.run_git(&["-c", "merge.conflictStyle=merge", "rebase", onto]) {
            Ok(_) => {
                info!(onto, "rebase applied cleanly");
                RebaseAttempt::Clean
            }
            Err(err @ GitError::CommandFailed { .. }) => match self.list_conflicted_files() {
                Ok(files) if !files.is_empty() => {
                    info!(onto, count = files.len(), "rebase stopped on conflicts");
                    RebaseAttempt::Conflicted
                }
                _ => RebaseAttempt::Failed(err),
            },
            Err(err) => RebaseAttempt::Failed(err),
        }
    }

    #[instrument(skip(self))]
    fn rebase_continue(&self) -> Result<(), GitError> {
        self.run_git(&["rebase", "--continue"])?;
        info!("rebase finalized");
        Ok(())
    }

    #[instrument(skip(self))]
    fn rebase_abort(&self) -> Result<(), GitError> {
        self.run_git(&["rebase", "--abort"])?;
        info!("rebase aborted");
        Ok(())
    }

    fn list_conflicted_files(&self) -> Result<Vec<String>, GitError> {
        let output = self.run_git(&["diff", "--name-only", "--diff-filter=U"])?;
        let files = non_empty_lines(&output);
        debug!(count = files.len(), "listed conflicted files");
        Ok(files)
    }

    fn checkout_ours(&self, path: &str) -> Result<(), GitError> {
        self.run_git(&["checkout", "--ours", "--", path])?;
        Ok(())
    }

    fn checkout_theirs(&self, path: &str) -> Result<(), GitError> {
        self.run_git(&["checkout", "--theirs", "--", path])?;
        Ok(())
    }

    fn stage_file(&self, path: &str) -> Result<(), GitError> {
        self.run_git(&["add", "--", path])?;
        debug!(path, "staged file");
        Ok(())
    }
}

fn non_empty_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}
