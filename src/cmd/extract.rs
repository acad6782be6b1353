//! Agent output extraction: `rundock extract ticket|idea`.

use anyhow::Result;
use std::path::Path;

use rundock::extract::{extract_idea_json_from_stdout, extract_ticket_json_from_stdout};

use super::super::ExtractKind;

/// Print the extracted record as JSON. Returns false when nothing could be parsed.
pub fn cmd_extract(kind: ExtractKind, file: Option<&Path>) -> Result<bool> {
    let stdout = super::read_input(file)?;
    let json = match kind {
        ExtractKind::Ticket => extract_ticket_json_from_stdout(&stdout)
            .map(|ticket| serde_json::to_string_pretty(&ticket))
            .transpose()?,
        ExtractKind::Idea => extract_idea_json_from_stdout(&stdout)
            .map(|idea| serde_json::to_string_pretty(&idea))
            .transpose()?,
    };

    match json {
        Some(json) => {
            println!("{}", json);
            Ok(true)
        }
        None => {
            eprintln!("could not parse agent output");
            Ok(false)
        }
    }
}
