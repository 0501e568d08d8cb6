//! User-facing console output.
//!
//! Every message is a `[HEADING] message...` line, colored by severity.

use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use console::Style;

use rebasefix_core::orchestrator::{Phase, ResolutionOutcome};

fn line(style: Style, heading: &str, msg: &str) -> String {
    format!(
        "{} {}...",
        style.apply_to(format!("[{}]", heading.to_uppercase())),
        msg
    )
}

/// Progress (green).
pub fn log(heading: &str, msg: &str) {
    println!("{}", line(Style::new().green(), heading, msg));
}

/// Something the user should look at (yellow).
pub fn warn(heading: &str, msg: &str) {
    println!("{}", line(Style::new().yellow(), heading, msg));
}

/// Failure (bold red), on stderr.
pub fn err(heading: &str, msg: &str) {
    eprintln!("{}", line(Style::new().red().bold(), heading, msg));
}

/// A command the user can run next (magenta).
pub fn cmd(heading: &str, msg: &str) {
    println!("{}", line(Style::new().magenta(), heading, msg));
}

pub fn header(msg: &str) -> String {
    Style::new().bold().apply_to(msg).to_string()
}

/// Summarize a resolution pass.
pub fn outcome(outcome: &ResolutionOutcome) {
    if outcome.phase == Phase::Clean {
        log("rebase", "rebased cleanly, no conflicts to resolve");
        return;
    }

    if outcome.rejected() {
        if let Some(gate) = &outcome.gate {
            err("gate", &format!("not resolving automatically: {}", gate.reason));
        }
        warn("rebase", "rebase aborted, resolve the conflicts manually");
        return;
    }

    if !outcome.resolved.is_empty() {
        println!();
        println!("{}", header(&format!("Resolved files ({})", outcome.resolved.len())));
        println!("{}", resolution_table(outcome));
        println!();
    }

    for skipped in &outcome.skipped {
        err("skipped", &format!("{}: {}", skipped.path, skipped.reason));
    }

    match outcome.phase {
        Phase::DryRunStop if outcome.aborted => {
            log("dry run", "resolutions staged then rebase aborted")
        }
        Phase::DryRunStop => {
            log("dry run", "resolutions staged and rebase left open");
            cmd("next", "inspect with `git diff --cached`, then `git rebase --continue`");
        }
        Phase::Aborted => warn("rebase", "rebase aborted, resolve the skipped files manually"),
        Phase::Resolving => {
            log("rebase", "resolutions staged, rebase left open");
            cmd("next", "git rebase --continue");
        }
        _ if outcome.rebase_finalized => log("rebase", "conflicts resolved and rebase finished"),
        _ => {}
    }
}

fn resolution_table(outcome: &ResolutionOutcome) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["File", "Kind", "Strategy"]);

    for resolution in &outcome.resolved {
        let kind = outcome
            .conflicted
            .iter()
            .find(|f| f.path == resolution.path)
            .map(|f| f.kind.to_string())
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(&resolution.path),
            Cell::new(kind),
            Cell::new(resolution.strategy.to_string()),
        ]);
    }
    table
}
