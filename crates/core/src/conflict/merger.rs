//! Bracketed-list merge engine.
//!
//! Resolves a conflict inside a `{ ... }` list (a module-export list, an
//! object literal of registrations) by keeping the entries from both sides.
//! The scan is a single forward pass with one line of lookback:
//!
//! - conflict-marker lines are dropped;
//! - a line that leaves a `{` unclosed opens the bracketed region; braces
//!   that balance on the same line (`import { Card } from './Card';`) do not;
//! - inside the region every entry is comma-terminated and deduplicated on its
//!   content with the trailing comma and whitespace stripped;
//! - a line consisting only of the closing `}` ends the region, and the entry
//!   just before it loses its trailing comma.
//!
//! Nesting is not tracked. A conflict must sit within one list depth; the
//! post-merge [`BracketMerger::validate`] catches output where that did not
//! hold.

use std::collections::HashSet;

use tracing::debug;

/// Prefixes of the three canonical conflict-marker lines.
pub const CONFLICT_MARKERS: [&str; 3] = ["<<<<<<<", "=======", ">>>>>>>"];

const OPEN: char = '{';
const CLOSE: char = '}';

/// Whether `line` is one of the marker lines git writes around a conflict.
pub fn is_conflict_marker(line: &str) -> bool {
    CONFLICT_MARKERS.iter().any(|m| line.starts_with(m))
}

/// Whether any line in the file is a conflict marker.
pub fn has_conflict_markers<S: AsRef<str>>(lines: &[S]) -> bool {
    lines.iter().any(|l| is_conflict_marker(l.as_ref()))
}

/// Strip one trailing comma together with any whitespace after it.
///
/// A line without a trailing comma is returned untouched, trailing
/// whitespace included.
pub fn strip_trailing_comma(line: &str) -> &str {
    line.trim_end().strip_suffix(',').unwrap_or(line)
}

/// A line that only closes the region: `}` optionally followed by `,`, `;` or `)`.
fn is_closing_line(line: &str) -> bool {
    line.trim()
        .strip_prefix(CLOSE)
        .is_some_and(|rest| rest.chars().all(|c| matches!(c, ',' | ';' | ')') || c.is_whitespace()))
}

/// Net `{` minus `}` on one line, ignoring string literals and `//` comments.
fn brace_delta(line: &str) -> i32 {
    let mut depth = 0;
    let mut quote: Option<char> = None;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            if c == '\\' {
                chars.next();
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '/' if chars.peek() == Some(&'/') => break,
            OPEN => depth += 1,
            CLOSE => depth -= 1,
            _ => {}
        }
    }
    depth
}

/// Per-pass scanner state.
#[derive(Debug, Default)]
struct BracketScanState {
    inside_bracket: bool,
    seen_entries: HashSet<String>,
}

/// Stateless entry point for the list merge.
pub struct BracketMerger;

impl BracketMerger {
    /// Merge both sides of every conflicted bracketed region in `lines`.
    ///
    /// Input without conflict markers is returned unchanged.
    pub fn merge_both<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
        if !has_conflict_markers(lines) {
            debug!("no conflict markers, nothing to merge");
            return lines.iter().map(|l| l.as_ref().to_string()).collect();
        }

        let mut state = BracketScanState::default();
        let mut out: Vec<String> = Vec::with_capacity(lines.len());
        let mut dropped = 0usize;

        for raw in lines {
            let line = raw.as_ref();

            if is_conflict_marker(line) {
                continue;
            }

            if !state.inside_bracket {
                if brace_delta(line) > 0 {
                    state.inside_bracket = true;
                }
                out.push(line.to_string());
                continue;
            }

            if is_closing_line(line) {
                state.inside_bracket = false;
                // The previous line is now the last entry; drop its separator.
                if let Some(last) = out.pop() {
                    out.push(strip_trailing_comma(&last).to_string());
                }
                out.push(line.to_string());
                continue;
            }

            if line.trim().is_empty() {
                continue;
            }

            let entry = strip_trailing_comma(line).trim_end();
            if !state.seen_entries.insert(entry.to_string()) {
                dropped += 1;
                continue;
            }
            let trimmed = line.trim_end();
            if trimmed.ends_with(',') {
                out.push(trimmed.to_string());
            } else {
                out.push(format!("{},", trimmed));
            }
        }

        debug!(
            input = lines.len(),
            output = out.len(),
            duplicates = dropped,
            "merged bracketed conflict"
        );
        out
    }

    /// Check merged output for leftover markers and unbalanced braces.
    ///
    /// Depth is tracked per character, independently of the merge's line
    /// classification. A separator appended to an opening line or to a
    /// statement (`{,` or `;,`) is rejected too.
    pub fn validate<S: AsRef<str>>(lines: &[S]) -> Result<(), String> {
        let mut depth = 0i32;
        for (idx, raw) in lines.iter().enumerate() {
            let line = raw.as_ref();
            let line_no = idx + 1;
            if is_conflict_marker(line) {
                return Err(format!("conflict marker left on line {}", line_no));
            }
            let trimmed = line.trim_end();
            if trimmed.ends_with("{,") || trimmed.ends_with(";,") {
                return Err(format!("stray separator on line {}", line_no));
            }
            depth += brace_delta(line);
            if depth < 0 {
                return Err(format!("unpaired closing bracket on line {}", line_no));
            }
        }
        if depth != 0 {
            return Err("bracketed region is never closed".into());
        }
        Ok(())
    }
}
