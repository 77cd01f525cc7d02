//! Round records and the per-round sync flag.
//!
//! A [`RoundLog`] is created once when an inspection round finishes. After that
//! the only field that ever changes is its sync flag, which flips from
//! [`SyncFlag::Pending`] to [`SyncFlag::Synced`] during reconciliation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::Task;

/// A single checklist entry, either on a task or frozen into a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    /// Item identifier, unique within its checklist.
    pub id: String,
    /// Text shown to the operator.
    pub label: String,
    /// Whether the operator ticked the item.
    pub checked: bool,
}

impl ChecklistItem {
    /// Create an unchecked item.
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            checked: false,
        }
    }
}

/// Normalized sync state of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncFlag {
    /// The round lives in the synced log.
    Synced,
    /// The round lives in the offline queue.
    Pending,
}

impl SyncFlag {
    /// Check if the round is confirmed in the synced log.
    #[must_use]
    pub fn is_synced(self) -> bool {
        matches!(self, Self::Synced)
    }
}

impl Default for SyncFlag {
    /// Rounds persisted without a flag predate offline support.
    fn default() -> Self {
        StoredSyncFlag::LegacyAssumedSynced.normalize()
    }
}

impl std::fmt::Display for SyncFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Synced => write!(f, "synced"),
            Self::Pending => write!(f, "pending"),
        }
    }
}

/// Sync flag as found in persisted data.
///
/// The stored form is an optional boolean; all three states are meaningful.
/// This type only exists at the load boundary and is normalized immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredSyncFlag {
    /// `synced: true`
    Synced,
    /// `synced: false`
    Pending,
    /// `synced` absent or null.
    LegacyAssumedSynced,
}

impl StoredSyncFlag {
    /// Collapse to the two-state flag used everywhere else.
    #[must_use]
    pub fn normalize(self) -> SyncFlag {
        match self {
            Self::Synced | Self::LegacyAssumedSynced => SyncFlag::Synced,
            Self::Pending => SyncFlag::Pending,
        }
    }
}

impl From<Option<bool>> for StoredSyncFlag {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Self::Synced,
            Some(false) => Self::Pending,
            None => Self::LegacyAssumedSynced,
        }
    }
}

mod sync_flag_serde {
    use super::{Deserialize, Deserializer, Serializer, StoredSyncFlag, SyncFlag};

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(flag: &SyncFlag, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(flag.is_synced())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SyncFlag, D::Error> {
        Ok(load(StoredSyncFlag::from(Option::<bool>::deserialize(deserializer)?)))
    }

    /// Used when the `synced` key is missing altogether.
    pub fn absent() -> SyncFlag {
        load(StoredSyncFlag::LegacyAssumedSynced)
    }

    fn load(stored: StoredSyncFlag) -> SyncFlag {
        if stored == StoredSyncFlag::LegacyAssumedSynced {
            tracing::warn!("Round without sync flag treated as synced");
        }
        stored.normalize()
    }
}

/// One completed execution of an inspection task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundLog {
    /// Opaque unique identifier, assigned at creation.
    pub id: String,
    /// Task this round executed.
    pub task_id: String,
    /// Task title at execution time.
    pub task_title: String,
    /// External ticket reference, if the task had one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
    /// Sector at execution time.
    pub sector: String,
    /// Responsible party at execution time.
    pub responsible: String,
    /// Start of the round, milliseconds since the epoch.
    pub start_time: i64,
    /// End of the round, milliseconds since the epoch.
    pub end_time: i64,
    /// Duration recorded when the round finished.
    pub duration_seconds: u64,
    /// Snapshot of the checklist as the operator left it.
    pub checklist_state: Vec<ChecklistItem>,
    /// Free-text notes.
    #[serde(default)]
    pub observations: String,
    /// Set explicitly by the operator.
    #[serde(default)]
    pub issues_detected: bool,
    /// Photo references.
    #[serde(default)]
    pub photos: Vec<String>,
    /// Signature image reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Digital validation token, see [`RoundLog::seal`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_token: Option<String>,
    /// Which collection the round lives in.
    #[serde(rename = "synced", default = "sync_flag_serde::absent", with = "sync_flag_serde")]
    pub sync: SyncFlag,
}

impl RoundLog {
    /// Start a round record for `task`, freezing its current details.
    ///
    /// The duration is computed here and never re-derived.
    #[must_use]
    pub fn for_task(task: &Task, start_time: i64, end_time: i64) -> Self {
        let elapsed_ms = end_time.saturating_sub(start_time).max(0);
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            task_id: task.id.clone(),
            task_title: task.title.clone(),
            ticket_id: task.ticket_id.clone(),
            sector: task.sector.clone(),
            responsible: task.responsible.clone(),
            start_time,
            end_time,
            duration_seconds: elapsed_ms.unsigned_abs() / 1000,
            checklist_state: task.checklist.clone(),
            observations: String::new(),
            issues_detected: false,
            photos: Vec::new(),
            signature: None,
            validation_token: None,
            sync: SyncFlag::Pending,
        }
    }

    /// Return this round with the given sync flag; nothing else changes.
    #[must_use]
    pub fn with_sync(mut self, sync: SyncFlag) -> Self {
        self.sync = sync;
        self
    }

    /// Start time as a UTC timestamp.
    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.start_time)
    }

    /// Number of checklist items left unchecked.
    #[must_use]
    pub fn unchecked_count(&self) -> usize {
        self.checklist_state.iter().filter(|i| !i.checked).count()
    }

    /// Tick the checklist items whose ids are listed; others are unticked.
    pub fn set_checked<S: AsRef<str>>(&mut self, checked_ids: &[S]) {
        for item in &mut self.checklist_state {
            item.checked = checked_ids.iter().any(|id| id.as_ref() == item.id);
        }
    }

    /// Compute and store the validation token.
    pub fn seal(&mut self) {
        self.validation_token = Some(self.compute_token());
    }

    /// Check the stored validation token against the round's content.
    #[must_use]
    pub fn verify_token(&self) -> bool {
        self.validation_token
            .as_deref()
            .is_some_and(|token| token == self.compute_token())
    }

    /// BLAKE3 over the immutable content, truncated to 16 uppercase hex chars.
    fn compute_token(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for part in [
            self.id.as_str(),
            self.task_id.as_str(),
            self.observations.as_str(),
        ] {
            hasher.update(part.as_bytes());
            hasher.update(&[0]);
        }
        hasher.update(&self.start_time.to_le_bytes());
        hasher.update(&self.end_time.to_le_bytes());
        hasher.update(&self.duration_seconds.to_le_bytes());
        hasher.update(&[u8::from(self.issues_detected)]);
        for item in &self.checklist_state {
            hasher.update(item.id.as_bytes());
            hasher.update(&[u8::from(item.checked)]);
        }
        let hex = hasher.finalize().to_hex();
        hex.as_str()[..16].to_ascii_uppercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
        let captured = CapturedLogs::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let output = tracing::subscriber::with_default(subscriber, f);
        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        (output, logs)
    }

    fn sample_task() -> Task {
        let mut task = Task::new("Boiler room", "Pressure check", "João Técnico");
        task.ticket_id = Some("TCK-7".to_string());
        task.checklist = vec![
            ChecklistItem::new("item-1", "Gauge below 6 bar"),
            ChecklistItem::new("item-2", "No visible leaks"),
        ];
        task
    }

    #[test]
    fn test_for_task_snapshots_task() {
        let task = sample_task();
        let round = RoundLog::for_task(&task, 1_000, 61_500);

        assert_eq!(round.task_id, task.id);
        assert_eq!(round.task_title, "Pressure check");
        assert_eq!(round.sector, "Boiler room");
        assert_eq!(round.ticket_id.as_deref(), Some("TCK-7"));
        assert_eq!(round.duration_seconds, 60);
        assert_eq!(round.checklist_state, task.checklist);
        assert!(!round.id.is_empty());
    }

    #[test]
    fn test_for_task_clock_skew_yields_zero_duration() {
        let round = RoundLog::for_task(&sample_task(), 5_000, 1_000);
        assert_eq!(round.duration_seconds, 0);
    }

    #[test]
    fn test_checklist_is_a_frozen_copy() {
        let mut task = sample_task();
        let round = RoundLog::for_task(&task, 0, 1_000);
        task.checklist[0].label = "Changed".to_string();
        assert_eq!(round.checklist_state[0].label, "Gauge below 6 bar");
    }

    #[test]
    fn test_set_checked() {
        let mut round = RoundLog::for_task(&sample_task(), 0, 1_000);
        round.set_checked(&["item-2"]);
        assert!(!round.checklist_state[0].checked);
        assert!(round.checklist_state[1].checked);
        assert_eq!(round.unchecked_count(), 1);
    }

    #[test]
    fn test_stored_flag_normalization() {
        assert_eq!(StoredSyncFlag::from(Some(true)).normalize(), SyncFlag::Synced);
        assert_eq!(StoredSyncFlag::from(Some(false)).normalize(), SyncFlag::Pending);
        assert_eq!(
            StoredSyncFlag::from(None),
            StoredSyncFlag::LegacyAssumedSynced
        );
        assert_eq!(StoredSyncFlag::from(None).normalize(), SyncFlag::Synced);
    }

    #[test]
    fn test_legacy_round_without_flag_is_synced() {
        let json = r#"{
            "id": "1700000000000",
            "taskId": "t1",
            "taskTitle": "Night patrol",
            "sector": "Gate",
            "responsible": "Maria",
            "startTime": 1000,
            "endTime": 2000,
            "durationSeconds": 1,
            "checklistState": [],
            "observations": "",
            "issuesDetected": false,
            "photos": []
        }"#;
        let (round, logs) = with_captured_logs(|| serde_json::from_str::<RoundLog>(json).unwrap());
        assert_eq!(round.sync, SyncFlag::Synced);
        assert!(logs.contains("WARN"));
        assert!(logs.contains("Round without sync flag treated as synced"));
    }

    #[test]
    fn test_explicit_flag_logs_nothing() {
        let round = RoundLog::for_task(&Task::new("Gate", "Night patrol", "Maria"), 0, 1_000);
        let json = serde_json::to_string(&round).unwrap();

        let (loaded, logs) = with_captured_logs(|| serde_json::from_str::<RoundLog>(&json).unwrap());
        assert_eq!(loaded.sync, SyncFlag::Pending);
        assert!(logs.is_empty());
    }

    #[test]
    fn test_null_flag_is_synced_and_false_is_pending() {
        let base = serde_json::json!({
            "id": "r", "taskId": "t", "taskTitle": "x", "sector": "s",
            "responsible": "p", "startTime": 0, "endTime": 0,
            "durationSeconds": 0, "checklistState": []
        });

        let mut with_null = base.clone();
        with_null["synced"] = serde_json::Value::Null;
        let round: RoundLog = serde_json::from_value(with_null).unwrap();
        assert_eq!(round.sync, SyncFlag::Synced);

        let mut pending = base;
        pending["synced"] = serde_json::Value::Bool(false);
        let round: RoundLog = serde_json::from_value(pending).unwrap();
        assert_eq!(round.sync, SyncFlag::Pending);
    }

    #[test]
    fn test_flag_serializes_as_bool() {
        let round = RoundLog::for_task(&sample_task(), 0, 1_000).with_sync(SyncFlag::Synced);
        let value = serde_json::to_value(&round).unwrap();
        assert_eq!(value["synced"], serde_json::Value::Bool(true));
        assert!(value.get("startTime").is_some());
    }

    #[test]
    fn test_seal_and_verify() {
        let mut round = RoundLog::for_task(&sample_task(), 0, 1_000);
        assert!(!round.verify_token());

        round.seal();
        let token = round.validation_token.clone().unwrap();
        assert_eq!(token.len(), 16);
        assert!(round.verify_token());

        // The sync flag is not part of the sealed content.
        let round = round.with_sync(SyncFlag::Synced);
        assert!(round.verify_token());
    }

    #[test]
    fn test_tampered_round_fails_verification() {
        let mut round = RoundLog::for_task(&sample_task(), 0, 1_000);
        round.seal();
        round.issues_detected = true;
        assert!(!round.verify_token());
    }

    #[test]
    fn test_started_at() {
        let round = RoundLog::for_task(&sample_task(), 1_700_000_000_000, 1_700_000_060_000);
        let started = round.started_at().unwrap();
        assert_eq!(started.timestamp_millis(), 1_700_000_000_000);
    }
}
