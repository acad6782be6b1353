//! Configuration view and validation commands: `rundock config`.

use anyhow::Result;
use std::path::Path;

use rundock::config::{CONFIG_FILE, HOST_URL_ENV, RUNDOCK_DIR, RundockConfig, RundockToml};

use super::super::ConfigCommands;

fn print_toml(toml: &RundockToml) {
    println!("[host]");
    println!("  url = \"{}\"", toml.host.url);
    println!("  request_timeout_secs = {}", toml.host.request_timeout_secs);
    println!("  poll_interval_ms = {}", toml.host.poll_interval_ms);
    println!();

    println!("[timing]");
    for (name, value) in toml.timing.entries() {
        println!("  {} = {}", name, value);
    }
    println!();

    println!("[history]");
    println!("  max_entries = {}", toml.history.max_entries);
    println!();

    println!("[logging]");
    println!("  format = \"{}\"", toml.logging.format);
    if let Some(dir) = &toml.logging.dir {
        println!("  dir = \"{}\"", dir.display());
    }
    println!();
}

pub fn cmd_config(project_dir: &Path, command: Option<ConfigCommands>) -> Result<()> {
    let rundock_dir = project_dir.join(RUNDOCK_DIR);
    let config_path = rundock_dir.join(CONFIG_FILE);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Rundock Configuration");
            println!("=====================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
                println!();
                print_toml(&RundockToml::load_or_default(&rundock_dir)?);
            } else {
                println!("No rundock.toml found at {}", config_path.display());
                println!();
                println!("Using default configuration:");
                print_toml(&RundockToml::default());
                println!("Run 'rundock config init' to create a rundock.toml file.");
                println!();
            }

            println!("Effective values (with user config and env overrides):");
            let config = RundockConfig::new(project_dir.to_path_buf())?;
            println!("  host.url = \"{}\"", config.toml.host.url);
            if let Some(dir) = config.log_dir() {
                println!("  log dir = {}", dir.display());
            }
            println!("  ({} overrides host.url)", HOST_URL_ENV);
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No rundock.toml found. Using defaults (valid).");
                return Ok(());
            }

            let warnings = RundockToml::load_or_default(&rundock_dir)?.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("rundock.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            RundockToml::default().save(&config_path)?;

            println!("Created rundock.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [host] url, request_timeout_secs, poll_interval_ms");
            println!("  - [timing] per-run automation delays in seconds");
            println!("  - [history] max_entries");
            println!("  - [logging] format, dir");
            println!();
        }
    }

    Ok(())
}
