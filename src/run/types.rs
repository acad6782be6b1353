//! Run data model shared by the registry, the router and the controller.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of visible terminal slots.
pub const SLOT_COUNT: u8 = 3;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Opaque run identifier assigned by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RunId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RunId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One of the visible terminal slots, numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Slot(u8);

impl Slot {
    /// All slots in allocation order.
    pub const ALL: [Slot; SLOT_COUNT as usize] = [Slot(1), Slot(2), Slot(3)];

    pub fn new(n: u8) -> Option<Self> {
        (1..=SLOT_COUNT).contains(&n).then_some(Self(n))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Slot {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Slot::new(n).ok_or_else(|| format!("slot must be between 1 and {}, got {}", SLOT_COUNT, n))
    }
}

impl From<Slot> for u8 {
    fn from(slot: Slot) -> u8 {
        slot.0
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Done,
}

/// One tracked agent invocation.
///
/// Runs are values: the registry replaces a whole `Run` on every change and
/// readers only ever see complete snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub run_id: RunId,
    pub label: String,
    pub log_lines: Vec<String>,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<Slot>,
    pub started_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_url: Option<String>,
}

impl Run {
    /// A freshly started run with no output yet.
    pub fn started(
        run_id: RunId,
        label: impl Into<String>,
        slot: Option<Slot>,
        started_at: i64,
    ) -> Self {
        Self {
            run_id,
            label: label.into(),
            log_lines: Vec::new(),
            status: RunStatus::Running,
            slot,
            started_at,
            done_at: None,
            exit_code: None,
            local_url: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }

    /// Elapsed milliseconds between start and completion, if finished in order.
    pub fn duration_ms(&self) -> Option<i64> {
        self.done_at
            .filter(|done| *done >= self.started_at)
            .map(|done| done - self.started_at)
    }

    /// Full captured output.
    pub fn output(&self) -> String {
        self.log_lines.join("\n")
    }
}

/// Automation timing forwarded to the host script, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub sleep_after_open_project: f64,
    pub sleep_after_window_focus: f64,
    pub sleep_between_shift_tabs: f64,
    pub sleep_after_all_shift_tabs: f64,
    pub sleep_after_cmd_n: f64,
    pub sleep_before_paste: f64,
    pub sleep_after_paste: f64,
    pub sleep_after_enter: f64,
    pub sleep_between_projects: f64,
    pub sleep_between_rounds: f64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            sleep_after_open_project: 4.0,
            sleep_after_window_focus: 1.5,
            sleep_between_shift_tabs: 0.5,
            sleep_after_all_shift_tabs: 0.8,
            sleep_after_cmd_n: 2.0,
            sleep_before_paste: 0.8,
            sleep_after_paste: 1.0,
            sleep_after_enter: 2.0,
            sleep_between_projects: 3.0,
            sleep_between_rounds: 270.0,
        }
    }
}

impl Timing {
    /// Field names paired with their values, in declaration order.
    pub fn entries(&self) -> [(&'static str, f64); 10] {
        [
            ("sleep_after_open_project", self.sleep_after_open_project),
            ("sleep_after_window_focus", self.sleep_after_window_focus),
            ("sleep_between_shift_tabs", self.sleep_between_shift_tabs),
            ("sleep_after_all_shift_tabs", self.sleep_after_all_shift_tabs),
            ("sleep_after_cmd_n", self.sleep_after_cmd_n),
            ("sleep_before_paste", self.sleep_before_paste),
            ("sleep_after_paste", self.sleep_after_paste),
            ("sleep_after_enter", self.sleep_after_enter),
            ("sleep_between_projects", self.sleep_between_projects),
            ("sleep_between_rounds", self.sleep_between_rounds),
        ]
    }
}

/// Parameters for starting a run.
#[derive(Debug, Clone, PartialEq)]
pub struct StartParams {
    pub prompt_ids: Vec<u32>,
    pub active_projects: Vec<String>,
    pub timing: Timing,
    pub run_label: Option<String>,
}

impl StartParams {
    pub fn new(prompt_ids: Vec<u32>, active_projects: Vec<String>) -> Self {
        Self {
            prompt_ids,
            active_projects,
            timing: Timing::default(),
            run_label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.run_label = Some(label.into());
        self
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }
}

/// Label the host assigns to runs started without one.
pub const DEFAULT_RUN_LABEL: &str = "Manual run";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_bounds() {
        assert_eq!(Slot::new(0), None);
        assert_eq!(Slot::new(1).map(Slot::get), Some(1));
        assert_eq!(Slot::new(3).map(Slot::get), Some(3));
        assert_eq!(Slot::new(4), None);
        assert_eq!(Slot::ALL.map(Slot::get), [1, 2, 3]);
    }

    #[test]
    fn test_slot_serde_as_number() {
        assert_eq!(serde_json::to_string(&Slot::ALL[1]).unwrap(), "2");
        assert_eq!(serde_json::from_str::<Slot>("3").unwrap(), Slot::ALL[2]);
        assert!(serde_json::from_str::<Slot>("7").is_err());
    }

    #[test]
    fn test_run_serializes_camel_case() {
        let run = Run::started(RunId::new("run-1"), "Implement All", Slot::new(1), 1_000);
        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["runId"], "run-1");
        assert_eq!(json["status"], "running");
        assert_eq!(json["slot"], 1);
        assert_eq!(json["startedAt"], 1_000);
        assert!(json.get("doneAt").is_none());
    }

    #[test]
    fn test_run_duration() {
        let mut run = Run::started(RunId::new("r"), "x", None, 1_000);
        assert_eq!(run.duration_ms(), None);
        run.done_at = Some(4_500);
        assert_eq!(run.duration_ms(), Some(3_500));
        run.done_at = Some(500);
        assert_eq!(run.duration_ms(), None);
    }

    #[test]
    fn test_timing_defaults() {
        let timing = Timing::default();
        assert_eq!(timing.sleep_after_open_project, 4.0);
        assert_eq!(timing.sleep_between_rounds, 270.0);
        assert_eq!(timing.entries().len(), 10);
    }

    #[test]
    fn test_timing_partial_deserialize_uses_defaults() {
        let timing: Timing = serde_json::from_str(r#"{"sleep_after_enter": 5}"#).unwrap();
        assert_eq!(timing.sleep_after_enter, 5.0);
        assert_eq!(timing.sleep_after_paste, 1.0);
    }
}
