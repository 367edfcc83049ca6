//! Dashboard models built from fetched store rows.
//!
//! This module turns raw rows into the annotated views the UI renders:
//! the system health summary and the pin inventory with freshness labels.

use chrono::TimeDelta;
use eltwatch_types::{ActivePin, IngestionCycle, Timestamp};

use super::health::{CycleState, Freshness, Thresholds};

/// System health derived from the latest cycle and buffer count.
///
/// Not persisted anywhere; rebuilt on every poll.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemHealthData {
    /// Most recent cycle, or `None` when the store has no cycles.
    pub latest_cycle: Option<IngestionCycle>,
    /// Records waiting in the raw/quarantine buffer.
    pub buffer_count: u64,
    /// Zombie flag evaluated at `last_updated`.
    pub is_zombie: bool,
    /// When this view was built.
    pub last_updated: Timestamp,
}

impl SystemHealthData {
    /// Build the health view from one poll's results.
    pub fn from_fetch(
        latest_cycle: Option<IngestionCycle>,
        buffer_count: u64,
        now: Timestamp,
        thresholds: &Thresholds,
    ) -> Self {
        let is_zombie = latest_cycle
            .as_ref()
            .is_some_and(|c| thresholds.is_zombie(c, now));

        Self {
            latest_cycle,
            buffer_count,
            is_zombie,
            last_updated: now,
        }
    }

    /// Display state at `now`.
    ///
    /// The zombie check is repeated here, so a cycle that crosses the window
    /// between polls is reported without waiting for another fetch.
    pub fn cycle_state(&self, now: Timestamp, thresholds: &Thresholds) -> CycleState {
        CycleState::evaluate(self.latest_cycle.as_ref(), now, thresholds)
    }

    /// Records processed by the latest cycle (0 without a cycle).
    pub fn records_processed(&self) -> u64 {
        self.latest_cycle.as_ref().map_or(0, |c| c.records_processed)
    }

    /// How long the latest cycle has been (or was) running at `now`.
    pub fn cycle_runtime(&self, now: Timestamp) -> Option<TimeDelta> {
        let cycle = self.latest_cycle.as_ref()?;
        let end = cycle.ended_at.unwrap_or(now);
        Some(end.signed_duration_since(cycle.started_at))
    }
}

/// Whether a pin matches a search query.
///
/// Titles match case-insensitively; pin ids match verbatim.
pub fn matches_query(pin: &ActivePin, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    pin.title.to_lowercase().contains(&query.to_lowercase()) || pin.pin_id.contains(query)
}

/// A pin annotated for display.
#[derive(Debug, Clone, PartialEq)]
pub struct PinRow<'a> {
    pub pin: &'a ActivePin,
    pub freshness: Freshness,
    /// Time since the last sync. Negative if the sync time is in the future.
    pub age: TimeDelta,
}

/// The last fetched set of tracked pins.
#[derive(Debug, Clone, PartialEq)]
pub struct PinInventory {
    pub pins: Vec<ActivePin>,
    pub fetched_at: Timestamp,
}

impl PinInventory {
    pub fn new(pins: Vec<ActivePin>, fetched_at: Timestamp) -> Self {
        Self { pins, fetched_at }
    }

    /// Annotated rows matching `query`, in store order.
    pub fn rows(&self, query: &str, now: Timestamp, thresholds: &Thresholds) -> Vec<PinRow<'_>> {
        self.pins
            .iter()
            .filter(|p| matches_query(p, query))
            .map(|pin| PinRow {
                pin,
                freshness: Freshness::evaluate(pin.last_synced_at, now, thresholds),
                age: now.signed_duration_since(pin.last_synced_at),
            })
            .collect()
    }

    /// Number of pins matching `query`.
    pub fn count_matching(&self, query: &str) -> usize {
        self.pins.iter().filter(|p| matches_query(p, query)).count()
    }

    /// Number of stale pins at `now`.
    pub fn stale_count(&self, now: Timestamp, thresholds: &Thresholds) -> usize {
        self.pins
            .iter()
            .filter(|p| thresholds.is_stale(p.last_synced_at, now))
            .count()
    }

    pub fn find(&self, pin_id: &str) -> Option<&ActivePin> {
        self.pins.iter().find(|p| p.pin_id == pin_id)
    }
}
