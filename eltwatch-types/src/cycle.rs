//! Ingestion cycles - one row per pipeline run.

use std::fmt;

use crate::Timestamp;

/// Lifecycle status of an ingestion cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CycleStatus {
    /// The run is in progress; `ended_at` is not yet set.
    Running,
    /// The run finished successfully.
    Completed,
    /// The run finished with an error.
    Failed,
}

impl CycleStatus {
    /// Store representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleStatus::Running => "running",
            CycleStatus::Completed => "completed",
            CycleStatus::Failed => "failed",
        }
    }

    /// Whether the status is final (no further mutation expected).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CycleStatus::Running)
    }
}

impl fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One run of the ingestion pipeline.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IngestionCycle {
    /// Opaque unique identifier (a UUID in the production store).
    pub cycle_id: String,

    /// When the run started.
    pub started_at: Timestamp,

    /// When the run reached a terminal status. Absent while running.
    #[cfg_attr(feature = "serde", serde(default))]
    pub ended_at: Option<Timestamp>,

    pub status: CycleStatus,

    /// Records ingested so far by this run.
    #[cfg_attr(feature = "serde", serde(default))]
    pub records_processed: u64,
}

impl IngestionCycle {
    /// A freshly started cycle: `running`, no end time, nothing processed.
    pub fn running(cycle_id: impl Into<String>, started_at: Timestamp) -> Self {
        Self {
            cycle_id: cycle_id.into(),
            started_at,
            ended_at: None,
            status: CycleStatus::Running,
            records_processed: 0,
        }
    }

    /// Move the cycle to a terminal status.
    ///
    /// Only meaningful for a running cycle; the store applies this once.
    pub fn finish(mut self, status: CycleStatus, ended_at: Timestamp) -> Self {
        self.status = status;
        self.ended_at = Some(ended_at);
        self
    }

    /// Set the processed record count.
    pub fn with_records(mut self, records_processed: u64) -> Self {
        self.records_processed = records_processed;
        self
    }

    /// `ended_at` is present iff the status is terminal.
    pub fn is_consistent(&self) -> bool {
        self.ended_at.is_some() == self.status.is_terminal()
    }
}
