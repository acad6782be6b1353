//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module     | Commands handled     |
//! |------------|----------------------|
//! | `strip`    | `Strip`              |
//! | `extract`  | `Extract`            |
//! | `history`  | `History`            |
//! | `run`      | `Run`                |
//! | `config`   | `Config`             |

pub mod config;
pub mod extract;
pub mod history;
pub mod run;
pub mod strip;

pub use config::cmd_config;
pub use extract::cmd_extract;
pub use history::cmd_history;
pub use run::cmd_run;
pub use strip::cmd_strip;

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

/// Read `file`, or all of stdin when no file is given.
pub fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}
