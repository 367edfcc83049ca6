//! Historical health data for sparklines and rate calculations.

use std::collections::VecDeque;

use eltwatch_types::Timestamp;

use super::dashboard::SystemHealthData;

/// Maximum number of historical polls to keep.
const MAX_HISTORY_SIZE: usize = 60;

/// Tracks health readings across polls.
///
/// Records the buffer count and the latest cycle's processed records on
/// every successful health poll, so the UI can show a buffer trend and an
/// ingestion rate.
#[derive(Debug, Clone, Default)]
pub struct History {
    /// Buffer counts, oldest first.
    pub buffer_counts: VecDeque<u64>,
    /// Latest cycle id and its processed record count per poll.
    pub records: VecDeque<(Option<String>, u64)>,
    /// Poll times matching the entries above.
    pub timestamps: VecDeque<Timestamp>,
}

impl History {
    /// Create a new empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new health reading.
    pub fn record(&mut self, health: &SystemHealthData) {
        self.buffer_counts.push_back(health.buffer_count);
        self.records.push_back((
            health.latest_cycle.as_ref().map(|c| c.cycle_id.clone()),
            health.records_processed(),
        ));
        self.timestamps.push_back(health.last_updated);

        if self.timestamps.len() > MAX_HISTORY_SIZE {
            self.buffer_counts.pop_front();
            self.records.pop_front();
            self.timestamps.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Buffer levels normalized to 0-7 for 8 bar levels.
    ///
    /// Returns an empty Vec if there's not enough history.
    pub fn buffer_sparkline(&self) -> Vec<u8> {
        if self.buffer_counts.len() < 2 {
            return Vec::new();
        }

        let max = self.buffer_counts.iter().copied().max().unwrap_or(0);
        let min = self.buffer_counts.iter().copied().min().unwrap_or(0);
        let range = (max - min).max(1) as f64;

        self.buffer_counts
            .iter()
            .map(|&v| {
                let normalized = ((v - min) as f64 / range * 7.0) as u8;
                normalized.min(7)
            })
            .collect()
    }

    /// Records ingested per second by the current cycle between the last two
    /// polls.
    ///
    /// Returns None when there is not enough history, when the cycle changed
    /// between polls, or when no time elapsed.
    pub fn records_rate(&self) -> Option<f64> {
        let n = self.records.len();
        if n < 2 {
            return None;
        }

        let (current_id, current) = self.records.get(n - 1)?;
        let (previous_id, previous) = self.records.get(n - 2)?;
        if current_id.is_none() || current_id != previous_id {
            return None;
        }

        let current_time = self.timestamps.get(n - 1)?;
        let previous_time = self.timestamps.get(n - 2)?;
        let elapsed =
            current_time.signed_duration_since(*previous_time).num_milliseconds() as f64 / 1000.0;

        if elapsed > 0.0 {
            Some((*current as f64 - *previous as f64) / elapsed)
        } else {
            None
        }
    }
}
