//! Live run: `rundock run`.
//!
//! Starts one run on the configured process host, prints its log lines as
//! they arrive and stops it on Ctrl-C.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::warn;

use rundock::config::RundockConfig;
use rundock::format::format_duration_ms;
use rundock::history::completion_notice;
use rundock::host::HttpHost;
use rundock::run::{Run, RunId, StartParams};
use rundock::{Orchestrator, OrchestratorConfig};

/// Print lines of `run` not yet printed.
fn print_new_lines(run: &Run, printed: &mut usize) {
    if let Some(lines) = run.log_lines.get(*printed..) {
        for line in lines {
            println!("{}", line);
        }
    }
    *printed = run.log_lines.len();
}

fn print_notice(run: &Run) {
    let notice = completion_notice(&run.label, run.exit_code);
    let styled = match run.exit_code {
        None | Some(0) => console::style(notice).green().bold(),
        Some(_) => console::style(notice).red().bold(),
    };
    let duration = format_duration_ms(run.duration_ms());
    if duration.is_empty() {
        println!("{}", styled);
    } else {
        println!("{} {}", styled, console::style(format!("({})", duration)).dim());
    }
}

/// Returns whether the run finished successfully.
pub async fn cmd_run(
    config: &RundockConfig,
    prompts: Vec<u32>,
    projects: Vec<String>,
    label: Option<String>,
) -> Result<bool> {
    for warning in config.validate() {
        warn!("config: {}", warning);
    }

    let host = Arc::new(HttpHost::from_config(&config.toml.host)?);
    let session = OrchestratorConfig::default()
        .with_timing(config.toml.timing)
        .with_active_projects(projects.clone())
        .with_history_max_entries(config.toml.history.max_entries);
    let orch = Orchestrator::new(host, session);
    let mut completions = orch.subscribe_completions();
    let mut runs = orch.subscribe_runs();

    let mut params = StartParams::new(prompts, projects).with_timing(config.toml.timing);
    if let Some(label) = label {
        params = params.with_label(label);
    }
    let run_id: RunId = orch.start(params).await?;
    println!(
        "{} {} on {}",
        console::style("Started").cyan().bold(),
        run_id,
        config.toml.host.url
    );

    let mut printed = 0;
    let mut url_shown = false;
    let finished = loop {
        tokio::select! {
            changed = runs.changed() => {
                if changed.is_err() {
                    break None;
                }
                let run = runs.borrow_and_update().iter().find(|r| r.run_id == run_id).cloned();
                if let Some(run) = run {
                    print_new_lines(&run, &mut printed);
                    if let (false, Some(url)) = (url_shown, &run.local_url) {
                        println!("{} {}", console::style("Local URL:").bold(), url);
                        url_shown = true;
                    }
                }
            }
            completed = completions.recv() => match completed {
                Ok(run) if run.run_id == run_id => break Some(run),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break None,
            },
            _ = tokio::signal::ctrl_c() => {
                println!("{}", console::style("Stopping run...").yellow());
                if let Err(e) = orch.stop(&run_id).await {
                    warn!(error = %e, "stop request failed");
                }
            }
        }
    };

    let Some(run) = finished else {
        anyhow::bail!("Lost track of run {}", run_id);
    };
    print_new_lines(&run, &mut printed);
    print_notice(&run);
    Ok(matches!(run.exit_code, None | Some(0)))
}
