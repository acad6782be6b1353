//! Stripping terminal and agent chrome from captured run output.
//!
//! Analyze runs write their stdout into project documents (`ideas.md`,
//! `design.md`, ...). Before that happens the launcher banners, `cd` echoes,
//! agent summaries and separator rules have to go, leaving only the document
//! body. Stripping is idempotent: already-clean text passes through unchanged.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Documents shorter than this after stripping are replaced by a placeholder.
pub const MIN_DOCUMENT_LENGTH: usize = 200;

static RULE_LINE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\s━═─]+$").unwrap());

static SUMMARY_DONE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)summary of what was done").unwrap());

static SUMMARY_IN_PLACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)summary of what'?s in place").unwrap());

static AGENT_EXITED_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)done\.\s*agent exited").unwrap());

static DOCUMENT_START_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#+\s+\w").unwrap());

/// Lines that are launcher or agent log output rather than document content.
static ARTIFACT_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)implement all\s*[–-]\s*terminal slot",
        r"(?is)^project:\s*/.*$",
        r"(?i)cd into project path",
        r"^→\s+/",
        r"(?is)^cd\s+/.*$",
        r"(?i)running:\s*agent\s+-p",
        r"(?s)^\*\*`\.cursor/.*`\*\*\s*[—–-]",
        r"(?is)^\.cursor/.*\s+[—–-]\s",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

fn is_rule_line(trimmed: &str) -> bool {
    RULE_LINE_REGEX.is_match(trimmed)
}

fn is_document_start(trimmed: &str) -> bool {
    DOCUMENT_START_REGEX.is_match(trimmed) && trimmed.chars().count() > 3
}

fn is_artifact(trimmed: &str) -> bool {
    is_rule_line(trimmed)
        || SUMMARY_DONE_REGEX.is_match(trimmed)
        || SUMMARY_IN_PLACE_REGEX.is_match(trimmed)
        || AGENT_EXITED_REGEX.is_match(trimmed)
        || ARTIFACT_REGEXES.iter().any(|re| re.is_match(trimmed))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StripState {
    Normal,
    /// Inside "Summary of what was done", until the agent-exited line or a rule.
    SummaryDone,
    /// Inside "Summary of what's in place", until a markdown heading.
    SummaryInPlace,
}

/// Remove terminal/agent log lines and summary blocks from raw output.
pub fn strip_terminal_artifacts(raw: &str) -> String {
    let mut state = StripState::Normal;
    let mut kept: Vec<&str> = Vec::new();
    let mut last_kept: Option<&str> = None;

    for line in raw.split('\n') {
        let trimmed = line.trim();

        if SUMMARY_DONE_REGEX.is_match(trimmed) {
            state = StripState::SummaryDone;
            continue;
        }
        if SUMMARY_IN_PLACE_REGEX.is_match(trimmed) {
            state = StripState::SummaryInPlace;
            continue;
        }

        match state {
            StripState::SummaryDone => {
                if AGENT_EXITED_REGEX.is_match(trimmed) || is_rule_line(trimmed) {
                    state = StripState::Normal;
                }
                continue;
            }
            StripState::SummaryInPlace => {
                if !is_document_start(trimmed) {
                    continue;
                }
                // The heading itself is content; fall through to the normal filters.
                state = StripState::Normal;
            }
            StripState::Normal => {}
        }

        if is_artifact(trimmed) || last_kept == Some(trimmed) {
            continue;
        }
        last_kept = Some(trimmed);
        kept.push(line);
    }

    let start = kept
        .iter()
        .position(|l| !l.trim().is_empty())
        .unwrap_or(kept.len());
    let end = kept
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map_or(start, |i| i + 1);

    kept[start..end].join("\n").trim().to_string()
}

/// Strip `raw` for writing to `output_path`, substituting a placeholder when
/// too little document content survives.
pub fn finalize_document(raw: &str, output_path: &str) -> String {
    let stripped = strip_terminal_artifacts(raw);
    if stripped.chars().count() >= MIN_DOCUMENT_LENGTH {
        return stripped;
    }
    let stem = Path::new(output_path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| output_path.to_string());
    format!(
        "# {}\n\n*Output was too short or only terminal output. Run Analyze again.*\n",
        stem
    )
}
