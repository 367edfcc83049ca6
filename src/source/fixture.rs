//! In-memory store contents.
//!
//! A [`StoreFixture`] holds everything the dashboard can read from the
//! store. It is the JSON format read by [`FileStore`](super::FileStore) and
//! the backing data of [`MockStore`](super::MockStore).

use eltwatch_types::{ActivePin, IngestionCycle, PinMetricHistory};
use serde::{Deserialize, Serialize};

use super::PinWithHistory;

/// A pin row with its embedded history rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinRecord {
    #[serde(flatten)]
    pub pin: ActivePin,

    /// History rows in any order; queries return them newest first.
    #[serde(default)]
    pub history: Vec<PinMetricHistory>,
}

/// A complete snapshot of the store's readable tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreFixture {
    /// Most recent cycle, if any.
    #[serde(default)]
    pub latest_cycle: Option<IngestionCycle>,

    /// Raw buffer row count.
    #[serde(default)]
    pub buffer_count: u64,

    #[serde(default)]
    pub pins: Vec<PinRecord>,
}

impl StoreFixture {
    /// All pin rows without their history.
    pub fn active_pins(&self) -> Vec<ActivePin> {
        self.pins.iter().map(|r| r.pin.clone()).collect()
    }

    /// One pin with its history ordered newest first.
    pub fn pin_with_history(&self, pin_id: &str) -> Option<PinWithHistory> {
        let record = self.pins.iter().find(|r| r.pin.pin_id == pin_id)?;
        let mut history = record.history.clone();
        history.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Some((record.pin.clone(), history))
    }
}
