//! `rebasefix config ...`

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};

use rebasefix_core::config::AppConfig;

use crate::report;

/// Write the default configuration to `output`. Never overwrites.
pub fn run_init(output: &Path) -> Result<ExitCode> {
    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    let rendered = AppConfig::default()
        .to_toml()
        .context("failed to render default configuration")?;
    let contents = format!("# rebasefix configuration\n\n{}", rendered);
    std::fs::write(output, contents).context("failed to write config file")?;

    report::log("config", &format!("default configuration written to {}", output.display()));
    report::cmd(
        "next",
        &format!("rebasefix config validate --config {}", output.display()),
    );
    Ok(ExitCode::SUCCESS)
}

pub fn run_validate(path: Option<&Path>) -> Result<ExitCode> {
    let Some(path) = path else {
        anyhow::bail!("no configuration file given; pass one with --config");
    };

    let config = AppConfig::load_from_file(path).context("failed to parse configuration")?;
    println!("  [OK] TOML structure is valid");

    if let Err(e) = config.validate() {
        println!("  [FAIL] Validation error: {}", e);
        anyhow::bail!("configuration validation failed");
    }
    println!("  [OK] All fields are valid");

    println!();
    println!("{}", report::header("Configuration summary:"));
    println!("  Remote           : {}", config.git.remote);
    println!("  Mainline         : {}", config.git.mainline);
    println!("  Feature prefix   : {}", config.git.feature_branch_prefix);
    println!(
        "  Max files        : {}",
        config
            .resolve
            .cap()
            .map(|n| n.to_string())
            .unwrap_or_else(|| "unlimited".to_string())
    );
    println!("  List files       : {}", config.resolve.list_files.join(", "));
    println!("  Component files  : {}", config.resolve.component_files.join(", "));
    println!("  Manifest files   : {}", config.resolve.manifest_files.join(", "));
    println!("  Versioned        : {}", config.packages.versioned.join(", "));
    Ok(ExitCode::SUCCESS)
}
