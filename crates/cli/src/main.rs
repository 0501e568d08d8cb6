//! rebasefix command-line tool.
//!
//! Rebases the current branch onto mainline and resolves the routine
//! conflicts (export lists, playground components, package manifests) on its
//! own. Also carries the everyday branch and package-version helpers.

mod commands;
mod report;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rebasefix_core::config::AppConfig;
use rebasefix_core::orchestrator::RunOptions;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// rebasefix command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "rebasefix",
    version,
    about = "Rebase onto mainline and resolve routine conflicts automatically"
)]
struct Cli {
    /// Path to the git working tree.
    #[arg(long, global = true, default_value = ".")]
    repo: PathBuf,

    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Branch and rebase operations.
    Git {
        #[command(subcommand)]
        action: GitAction,
    },

    /// Package manifest versions.
    Version {
        #[command(subcommand)]
        action: VersionAction,
    },

    /// Generate or check a configuration file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum GitAction {
    /// Rebase onto mainline and resolve list, component, and manifest conflicts.
    FixStandardConflict {
        /// Force-push the branch afterwards (disabled; a warning is shown).
        #[arg(action = ArgAction::Set, default_value_t = false)]
        force_push_origin: bool,

        /// Run `git rebase --continue` once every file is staged.
        #[arg(action = ArgAction::Set, default_value_t = true)]
        finish_rebase: bool,

        /// Resolve and stage, then stop without finishing the rebase.
        #[arg(action = ArgAction::Set, default_value_t = false)]
        dry_run: bool,

        /// With a dry run, leave the rebase in progress for inspection.
        #[arg(action = ArgAction::Set, default_value_t = false)]
        leave_rebase_open: bool,
    },

    /// Fetch, stash local edits, and rebase onto mainline.
    Rebase,

    /// Print the checked-out branch.
    CurrentBranch,

    /// Check out mainline reset to the remote.
    SwitchMaster,

    /// Create a feature branch for a ticket from a fresh mainline.
    NewFeatureBranch {
        /// Ticket number appended to the feature branch prefix.
        ticket: String,
    },

    /// Keep local edits to playground App.vue files out of commits.
    IgnoreAllAppFiles,
}

#[derive(Subcommand, Debug)]
enum VersionAction {
    /// Copy package versions from mainline onto this branch.
    UpdateFromMaster,

    /// Set package versions to their latest release tags.
    UpdateFromTags,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write a configuration file populated with the defaults.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./rebasefix.toml")]
        output: PathBuf,
    },

    /// Validate the file given with `--config`.
    Validate,
}

impl Commands {
    /// The invocation as `module.function(args)`.
    fn invocation(&self) -> String {
        match self {
            Commands::Git { action } => match action {
                GitAction::FixStandardConflict {
                    force_push_origin,
                    finish_rebase,
                    dry_run,
                    leave_rebase_open,
                } => format!(
                    "git.fix_standard_conflict({}, {}, {}, {})",
                    force_push_origin, finish_rebase, dry_run, leave_rebase_open
                ),
                GitAction::Rebase => "git.rebase()".to_string(),
                GitAction::CurrentBranch => "git.current_branch()".to_string(),
                GitAction::SwitchMaster => "git.switch_master()".to_string(),
                GitAction::NewFeatureBranch { ticket } => {
                    format!("git.new_feature_branch({})", ticket)
                }
                GitAction::IgnoreAllAppFiles => "git.ignore_all_app_files()".to_string(),
            },
            Commands::Version { action } => match action {
                VersionAction::UpdateFromMaster => "version.update_from_master()".to_string(),
                VersionAction::UpdateFromTags => "version.update_from_tags()".to_string(),
            },
            Commands::Config { action } => match action {
                ConfigAction::Init { output } => format!("config.init({})", output.display()),
                ConfigAction::Validate => "config.validate()".to_string(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();

    // A broken config file is reported by `config validate`; everything
    // else needs a usable one before logging is even configured.
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            init_tracing("warn");
            report::err("config", &format!("{:#}", e));
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.log_level);

    match run(cli, config) {
        Ok(code) => code,
        Err(e) => {
            report::err("error", &format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    if matches!(cli.command, Commands::Config { .. }) {
        return Ok(AppConfig::default());
    }
    AppConfig::load_or_default(cli.config.as_deref()).context("failed to load configuration")
}

fn run(cli: Cli, config: AppConfig) -> Result<ExitCode> {
    info!(invocation = %cli.command.invocation(), "running command");

    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Init { output } => commands::config::run_init(&output),
            ConfigAction::Validate => commands::config::run_validate(cli.config.as_deref()),
        },
        Commands::Git { action } => {
            let git = commands::open_repo(&cli.repo)?;
            match action {
                GitAction::FixStandardConflict {
                    force_push_origin,
                    finish_rebase,
                    dry_run,
                    leave_rebase_open,
                } => {
                    let options = RunOptions {
                        force_push_origin,
                        finish_rebase,
                        dry_run,
                        leave_rebase_open,
                    };
                    commands::git::run_fix_standard_conflict(&git, &config, options)
                }
                GitAction::Rebase => commands::git::run_rebase(&git, &config),
                GitAction::CurrentBranch => commands::git::run_current_branch(&git, &config),
                GitAction::SwitchMaster => commands::git::run_switch_master(&git, &config),
                GitAction::NewFeatureBranch { ticket } => {
                    commands::git::run_new_feature_branch(&git, &config, &ticket)
                }
                GitAction::IgnoreAllAppFiles => {
                    commands::git::run_ignore_all_app_files(&git, &config)
                }
            }
        }
        Commands::Version { action } => {
            let git = commands::open_repo(&cli.repo)?;
            match action {
                VersionAction::UpdateFromMaster => {
                    commands::version::run_update_from_master(&git, &config)
                }
                VersionAction::UpdateFromTags => {
                    commands::version::run_update_from_tags(&git, &config)
                }
            }
        }
    }
}
