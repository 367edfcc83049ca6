//! Mock store with canned data.
//!
//! Stands in for the real backend in demos and tests. The data is built
//! relative to a clock, so the running cycle is always 12 minutes old and
//! the pin sync times always sit on either side of the staleness window.

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use eltwatch_types::{
    ActivePin, IngestionCycle, PinMetricHistory, PinStatus, Timestamp,
};

use super::{PinRecord, PinWithHistory, StoreFixture, StoreReader};
use crate::error::FetchError;

/// Snapshots per pin in the mock history.
const HISTORY_LEN: i64 = 11;

/// Hours between mock snapshots.
const HISTORY_STEP_HOURS: i64 = 4;

const MOCK_PINS: &[(&str, &str, &str, PinStatus, bool)] = &[
    (
        "1029384756",
        "Minimalist Industrial Loft Design Inspiration",
        "https://images.unsplash.com/photo-1505691938895-1758d7eaa511?w=200&h=200&fit=crop",
        PinStatus::Active,
        false,
    ),
    (
        "9283746152",
        "Healthy Meal Prep - 15 Minute Recipes",
        "https://images.unsplash.com/photo-1547592166-23ac45744acd?w=200&h=200&fit=crop",
        PinStatus::Active,
        true,
    ),
    (
        "4756382910",
        "Digital Nomad Setup 2024 - Ultra Portable",
        "https://images.unsplash.com/photo-1496181133206-80ce9b88a853?w=200&h=200&fit=crop",
        PinStatus::Deleted,
        false,
    ),
    (
        "5566778899",
        "Scandinavian Forest Architecture Photography",
        "https://images.unsplash.com/photo-1518780664697-55e3ad937233?w=200&h=200&fit=crop",
        PinStatus::Active,
        true,
    ),
];

/// A store serving generated data.
#[derive(Debug)]
pub struct MockStore {
    /// Fixed clock; `None` follows the wall clock.
    now: Option<Timestamp>,
    description: String,
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStore {
    /// Mock store following the wall clock.
    pub fn new() -> Self {
        Self {
            now: None,
            description: "mock".to_string(),
        }
    }

    /// Mock store frozen at `now`.
    pub fn at(now: Timestamp) -> Self {
        Self {
            now: Some(now),
            description: "mock".to_string(),
        }
    }

    fn fixture(&self) -> StoreFixture {
        mock_fixture(self.now.unwrap_or_else(Utc::now))
    }
}

/// Build the mock store contents relative to `now`.
///
/// - one running cycle started 12 minutes ago (1250 records)
/// - 842 records in the raw buffer
/// - four pins, synced either 2 hours or 30 hours ago, one soft-deleted
/// - eleven history rows per pin, one every 4 hours
pub fn mock_fixture(now: Timestamp) -> StoreFixture {
    let latest_cycle = IngestionCycle::running(
        "550e8400-e29b-41d4-a716-446655440000",
        now - TimeDelta::minutes(12),
    )
    .with_records(1250);

    let fresh = now - TimeDelta::hours(2);
    let old = now - TimeDelta::hours(30);

    let pins = MOCK_PINS
        .iter()
        .map(|&(pin_id, title, image_url, status, stale)| PinRecord {
            pin: ActivePin {
                pin_id: pin_id.to_string(),
                title: title.to_string(),
                image_url: image_url.to_string(),
                current_status: status,
                last_synced_at: if stale { old } else { fresh },
                created_at: now,
            },
            history: mock_history(pin_id, now),
        })
        .collect();

    StoreFixture {
        latest_cycle: Some(latest_cycle),
        buffer_count: 842,
        pins,
    }
}

/// History rows for one pin, newest first.
///
/// Per-cycle growth is pseudo-random (seeded by the pin id) so the chart has
/// some shape. Counters are the running sum of that growth, so every delta
/// is the difference from the previous row and the first row's delta equals
/// its absolute value.
fn mock_history(pin_id: &str, now: Timestamp) -> Vec<PinMetricHistory> {
    let mut seed = pin_id.bytes().fold(17u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
    let (mut impressions, mut saves, mut outbound_clicks) = (0u64, 0u64, 0u64);

    let mut history: Vec<PinMetricHistory> = (0..HISTORY_LEN)
        .rev()
        .map(|i| {
            seed = next(seed);
            let delta_impressions = seed % 1200;
            seed = next(seed);
            let delta_saves = seed % 50;
            seed = next(seed);
            let delta_outbound_clicks = seed % 80;

            impressions += delta_impressions;
            saves += delta_saves;
            outbound_clicks += delta_outbound_clicks;

            PinMetricHistory {
                id: 1000 + i,
                pin_id: pin_id.to_string(),
                cycle_id: format!("cycle-uuid-{}", i),
                recorded_at: now - TimeDelta::hours(i * HISTORY_STEP_HOURS),
                impressions,
                saves,
                outbound_clicks,
                delta_impressions: delta_impressions as i64,
                delta_saves: delta_saves as i64,
                delta_outbound_clicks: Some(delta_outbound_clicks as i64),
            }
        })
        .collect();

    history.reverse();
    history
}

/// Linear congruential step (Knuth's MMIX constants).
fn next(seed: u64) -> u64 {
    seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407) >> 1
}

#[async_trait]
impl StoreReader for MockStore {
    async fn fetch_latest_cycle(&self) -> Result<Option<IngestionCycle>, FetchError> {
        Ok(self.fixture().latest_cycle)
    }

    async fn fetch_buffer_count(&self) -> Result<u64, FetchError> {
        Ok(self.fixture().buffer_count)
    }

    async fn fetch_pin_with_history(
        &self,
        pin_id: &str,
    ) -> Result<Option<PinWithHistory>, FetchError> {
        Ok(self.fixture().pin_with_history(pin_id))
    }

    async fn fetch_active_pins(&self) -> Result<Vec<ActivePin>, FetchError> {
        Ok(self.fixture().active_pins())
    }

    fn description(&self) -> &str {
        &self.description
    }
}
