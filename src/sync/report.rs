use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a run is, or where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "year", rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    EnumeratingYears,
    ProcessingYear(i32),
    ReconcilingMetadata,
    Done,
    Failed,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Idle => write!(f, "idle"),
            SyncState::EnumeratingYears => write!(f, "enumerating years"),
            SyncState::ProcessingYear(year) => write!(f, "processing {}", year),
            SyncState::ReconcilingMetadata => write!(f, "reconciling metadata"),
            SyncState::Done => write!(f, "done"),
            SyncState::Failed => write!(f, "failed"),
        }
    }
}

/// A failure confined to one station-year file, or to a year listing when
/// `station` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub year: i32,
    pub station: Option<String>,
    pub error: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySummary {
    pub stations: usize,
    pub dropped: usize,
    pub appended: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub state: SyncState,
    pub years_checked: usize,
    pub years_completed: Vec<i32>,
    pub years_stale: Vec<i32>,
    pub files_fetched: usize,
    pub files_up_to_date: usize,
    pub rows_removed: usize,
    pub datasets_removed: usize,
    pub failures: Vec<FileFailure>,
    /// `None` when metadata reconciliation was skipped
    pub registry: Option<RegistrySummary>,
}

impl SyncReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: None,
            state: SyncState::Idle,
            years_checked: 0,
            years_completed: Vec::new(),
            years_stale: Vec::new(),
            files_fetched: 0,
            files_up_to_date: 0,
            rows_removed: 0,
            datasets_removed: 0,
            failures: Vec::new(),
            registry: None,
        }
    }

    pub fn record_failure(&mut self, year: i32, station: Option<String>, error: impl fmt::Display) {
        self.failures.push(FileFailure {
            year,
            station,
            error: error.to_string(),
        });
    }

    /// Reached `Done` with every stale year brought up to date
    pub fn is_complete(&self) -> bool {
        self.state == SyncState::Done && self.failures.is_empty() && self.years_stale.is_empty()
    }

    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Sync Summary:\n\
            - State: {}\n\
            - Years checked: {}\n\
            - Years completed: {}\n\
            - Years left stale: {}\n\
            - Files fetched: {}\n\
            - Files up to date: {}\n\
            - Inventory rows removed: {}\n\
            - Datasets removed: {}\n\
            - Failures: {}",
            self.state,
            self.years_checked,
            self.years_completed.len(),
            self.years_stale.len(),
            self.files_fetched,
            self.files_up_to_date,
            self.rows_removed,
            self.datasets_removed,
            self.failures.len(),
        );

        match &self.registry {
            Some(registry) => summary.push_str(&format!(
                "\n- Registry: {} stations ({} dropped, {} appended)",
                registry.stations, registry.dropped, registry.appended
            )),
            None => summary.push_str("\n- Registry: not reconciled"),
        }

        summary
    }
}
