//! `rebasefix git ...`

use std::process::ExitCode;

use anyhow::{Context, Result};

use rebasefix_core::config::AppConfig;
use rebasefix_core::git::GitClient;
use rebasefix_core::orchestrator::{ResolutionOrchestrator, RunOptions};
use rebasefix_core::workflow::{BranchWorkflow, REBASE_RECOVERY_STEPS};

use crate::report;

/// Rebase onto mainline and resolve the routine conflicts.
///
/// Exits non-zero when the rebase was aborted outside a dry run.
pub fn run_fix_standard_conflict(
    git: &GitClient,
    config: &AppConfig,
    options: RunOptions,
) -> Result<ExitCode> {
    report::log(
        "rebase",
        &format!("rebasing onto {}", config.git.upstream_ref()),
    );
    let outcome = ResolutionOrchestrator::new(git, config)
        .run(options)
        .context("automatic conflict resolution failed")?;
    report::outcome(&outcome);

    if outcome.aborted && !outcome.dry_run {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

pub fn run_rebase(git: &GitClient, config: &AppConfig) -> Result<ExitCode> {
    let workflow = BranchWorkflow::new(git, config);
    report::log("rebase", &format!("rebasing onto {}", config.git.upstream_ref()));
    let result = workflow.rebase().context("rebase failed")?;

    if result.conflicted {
        report::err("rebase", "rebase stopped on conflicts");
        println!("{}", REBASE_RECOVERY_STEPS);
        if result.stashed {
            report::cmd("stash", "run `git stash pop` once the rebase is finished");
        }
        return Ok(ExitCode::FAILURE);
    }
    if result.stash_restored {
        report::log("stash", "local changes restored");
    }
    report::log("rebase", "done");
    Ok(ExitCode::SUCCESS)
}

pub fn run_current_branch(git: &GitClient, config: &AppConfig) -> Result<ExitCode> {
    let branch = BranchWorkflow::new(git, config)
        .current_branch()
        .context("failed to read current branch")?;
    println!("{}", branch);
    Ok(ExitCode::SUCCESS)
}

pub fn run_switch_master(git: &GitClient, config: &AppConfig) -> Result<ExitCode> {
    let stashed = BranchWorkflow::new(git, config)
        .switch_master(None)
        .context("failed to switch to mainline")?;
    report::log(
        "switch",
        &format!("on {} at {}", config.git.mainline, config.git.upstream_ref()),
    );
    if stashed {
        report::warn("stash", "local changes were stashed; `git stash pop` restores them");
    }
    Ok(ExitCode::SUCCESS)
}

pub fn run_new_feature_branch(git: &GitClient, config: &AppConfig, ticket: &str) -> Result<ExitCode> {
    let branch = BranchWorkflow::new(git, config)
        .new_feature_branch(ticket)
        .context("failed to create feature branch")?;
    report::log("branch", &format!("created and checked out {}", branch));
    Ok(ExitCode::SUCCESS)
}

pub fn run_ignore_all_app_files(git: &GitClient, config: &AppConfig) -> Result<ExitCode> {
    let ignored = BranchWorkflow::new(git, config)
        .ignore_all_app_files()
        .context("failed to mark App.vue files skip-worktree")?;
    for path in &ignored {
        report::log("ignore", path);
    }
    Ok(ExitCode::SUCCESS)
}
