//! Integration tests for the rundock CLI
//!
//! These tests drive the binary end to end against temp directories.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to create a rundock Command
fn rundock() -> Command {
    cargo_bin_cmd!("rundock")
}

/// Helper to create a temporary project directory
fn create_temp_project() -> TempDir {
    TempDir::new().unwrap()
}

const HISTORY_JSON: &str = r#"[
  {
    "id": "b",
    "runId": "run-2",
    "label": "Debug: flaky test",
    "output": "boom",
    "timestamp": "2023-11-14T22:20:00Z",
    "exitCode": 1,
    "durationMs": 5000
  },
  {
    "id": "a",
    "runId": "run-1",
    "label": "Implement All",
    "output": "line one\nline, two",
    "timestamp": "2023-11-14T22:13:20Z",
    "exitCode": 0,
    "durationMs": 65000,
    "slot": 1
  }
]"#;

fn write_history(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("history.json");
    fs::write(&path, HISTORY_JSON).unwrap();
    path
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_rundock_help() {
        rundock()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("strip"))
            .stdout(predicate::str::contains("history"));
    }

    #[test]
    fn test_rundock_version() {
        rundock().arg("--version").assert().success();
    }

    #[test]
    fn test_run_requires_prompt_and_project() {
        rundock()
            .args(["run", "--project", "/work/app"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--prompt"));
    }

    #[test]
    fn test_run_reports_unreachable_host() {
        let dir = create_temp_project();
        rundock()
            .current_dir(dir.path())
            .args([
                "run",
                "--prompt",
                "1",
                "--project",
                "/work/app",
                "--label",
                "Implement All",
                "--host-url",
                "http://127.0.0.1:9",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to start run"));
    }
}

// =============================================================================
// Output Processing Tests
// =============================================================================

mod output_processing {
    use super::*;

    #[test]
    fn test_strip_removes_terminal_lines() {
        rundock()
            .arg("strip")
            .write_stdin("cd /work/app\n# Ideas\n\nBody text\n━━━━━━━━\n")
            .assert()
            .success()
            .stdout("# Ideas\n\nBody text\n");
    }

    #[test]
    fn test_strip_reads_file() {
        let dir = create_temp_project();
        let path = dir.path().join("raw.txt");
        fs::write(&path, "Running: agent -p \"analyze\"\n## Design\nContent\n").unwrap();

        rundock()
            .arg("strip")
            .arg(&path)
            .assert()
            .success()
            .stdout("## Design\nContent\n");
    }

    #[test]
    fn test_strip_document_placeholder_for_short_output() {
        rundock()
            .args(["strip", "--document", "docs/ideas.md"])
            .write_stdin("cd /work/app\nok\n")
            .assert()
            .success()
            .stdout(predicate::str::starts_with("# ideas\n"))
            .stdout(predicate::str::contains("Run Analyze again."));
    }

    #[test]
    fn test_extract_ticket() {
        rundock()
            .args(["extract", "ticket"])
            .write_stdin("Here it is:\n{\"title\": \"Add login\", \"feature_name\": \"auth\"}\nDone.")
            .assert()
            .success()
            .stdout(predicate::str::contains("\"title\": \"Add login\""))
            .stdout(predicate::str::contains("\"featureName\": \"auth\""));
    }

    #[test]
    fn test_extract_idea() {
        rundock()
            .args(["extract", "idea"])
            .write_stdin("{\"title\": \"Dark mode\", \"category\": \"ui\"}")
            .assert()
            .success()
            .stdout(predicate::str::contains("\"category\": \"ui\""));
    }

    #[test]
    fn test_extract_unparseable_output() {
        rundock()
            .args(["extract", "idea"])
            .write_stdin("the agent printed no json")
            .assert()
            .code(1)
            .stdout(predicate::str::is_empty())
            .stderr(predicate::str::contains("could not parse agent output"));
    }
}

// =============================================================================
// History Tests
// =============================================================================

mod history {
    use super::*;

    #[test]
    fn test_history_stats_summary() {
        let dir = create_temp_project();
        let path = write_history(&dir);

        rundock()
            .args(["history", "stats"])
            .arg(&path)
            .assert()
            .success()
            .stdout(predicate::str::contains("2 runs, 1 passed, 1 failed, 1:10 total"))
            .stdout(predicate::str::contains("Older"))
            .stdout(predicate::str::contains("Implement All"));
    }

    #[test]
    fn test_history_stats_toolbar() {
        let dir = create_temp_project();
        let path = write_history(&dir);

        rundock()
            .args(["history", "stats", "--toolbar"])
            .arg(&path)
            .assert()
            .success()
            .stdout("1 passed, 1 failed · 1:10 total\n");
    }

    #[test]
    fn test_history_export_csv_oldest_first() {
        let dir = create_temp_project();
        let path = write_history(&dir);

        rundock()
            .args(["history", "export"])
            .arg(&path)
            .args(["--format", "csv"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with(
                "timestamp,label,slot,exit_code,duration,output\n\
                 2023-11-14T22:13:20.000Z,Implement All,1,0,1:05,\"line one\nline, two\"\n\
                 2023-11-14T22:20:00.000Z,Debug: flaky test,,1,5s,boom",
            ));
    }

    #[test]
    fn test_history_export_stats_csv() {
        let dir = create_temp_project();
        let path = write_history(&dir);

        rundock()
            .args(["history", "export"])
            .arg(&path)
            .args(["--format", "stats-csv"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with(
                "exportedAt,totalRuns,successCount,failCount,totalDurationMs,summary\n",
            ))
            .stdout(predicate::str::contains(
                ",2,1,1,70000,\"2 runs, 1 passed, 1 failed, 1:10 total\"",
            ));
    }

    #[test]
    fn test_history_export_json_round_trips_fields() {
        let dir = create_temp_project();
        let path = write_history(&dir);

        rundock()
            .args(["history", "export"])
            .arg(&path)
            .args(["--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"runId\": \"run-1\""))
            .stdout(predicate::str::contains("\"durationMs\": 65000"));
    }

    #[test]
    fn test_history_invalid_file() {
        let dir = create_temp_project();
        let path = dir.path().join("history.json");
        fs::write(&path, "not json").unwrap();

        rundock()
            .args(["history", "stats"])
            .arg(&path)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to parse history file"));
    }
}

// =============================================================================
// Configuration Tests
// =============================================================================

mod configuration {
    use super::*;

    #[test]
    fn test_config_show_defaults() {
        let dir = create_temp_project();

        rundock()
            .current_dir(dir.path())
            .arg("config")
            .arg("show")
            .assert()
            .success()
            .stdout(predicate::str::contains("Using default configuration"))
            .stdout(predicate::str::contains("sleep_between_rounds = 270"));
    }

    #[test]
    fn test_config_init_creates_toml() {
        let dir = create_temp_project();

        rundock()
            .current_dir(dir.path())
            .arg("config")
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("Created rundock.toml"));

        assert!(dir.path().join(".rundock/rundock.toml").exists());

        rundock()
            .current_dir(dir.path())
            .arg("config")
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }

    #[test]
    fn test_config_validate_no_config() {
        let dir = create_temp_project();

        rundock()
            .current_dir(dir.path())
            .arg("config")
            .arg("validate")
            .assert()
            .success()
            .stdout(predicate::str::contains("Using defaults (valid)"));
    }

    #[test]
    fn test_config_validate_reports_warnings() {
        let dir = create_temp_project();
        fs::create_dir_all(dir.path().join(".rundock")).unwrap();
        let config_content = r#"
[host]
url = "localhost:4000"
poll_interval_ms = 0
"#;
        fs::write(dir.path().join(".rundock/rundock.toml"), config_content).unwrap();

        rundock()
            .current_dir(dir.path())
            .arg("config")
            .arg("validate")
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration warnings"))
            .stdout(predicate::str::contains("poll_interval_ms"));
    }

    #[test]
    fn test_config_shows_toml_content() {
        let dir = create_temp_project();
        fs::create_dir_all(dir.path().join(".rundock")).unwrap();
        let config_content = r#"
[host]
url = "http://10.1.2.3:4100"

[logging]
format = "json"
"#;
        fs::write(dir.path().join(".rundock/rundock.toml"), config_content).unwrap();

        rundock()
            .current_dir(dir.path())
            .env_remove("RUNDOCK_HOST_URL")
            .arg("config")
            .arg("show")
            .assert()
            .success()
            .stdout(predicate::str::contains("url = \"http://10.1.2.3:4100\""))
            .stdout(predicate::str::contains("format = \"json\""));
    }
}
