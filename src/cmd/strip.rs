//! Artifact stripping: `rundock strip`.

use anyhow::Result;
use std::path::Path;

use rundock::artifacts::{finalize_document, strip_terminal_artifacts};

pub fn cmd_strip(file: Option<&Path>, document: Option<&str>) -> Result<()> {
    let raw = super::read_input(file)?;
    let text = match document {
        Some(output_path) => finalize_document(&raw, output_path),
        None => strip_terminal_artifacts(&raw),
    };
    if text.ends_with('\n') || text.is_empty() {
        print!("{}", text);
    } else {
        println!("{}", text);
    }
    Ok(())
}
