//! Growth-velocity series for a single pin.
//!
//! The store returns metric history newest-first. Charts want it
//! oldest-first, so the view reverses it. Deltas are taken exactly as
//! stored; nothing here recomputes or checks them against the absolute
//! counters.

use chrono::{Datelike, Local, TimeZone, Timelike};
use eltwatch_types::{ActivePin, PinMetricHistory, Timestamp};

/// Reorder store history (newest-first) into chronological order.
///
/// The result is fully materialized. An empty input gives an empty output,
/// which callers show as "no history yet" rather than an error.
///
/// ```
/// use eltwatch::data::velocity::chronological;
///
/// let empty = chronological(Vec::new());
/// assert!(empty.is_empty());
/// ```
pub fn chronological(mut history: Vec<PinMetricHistory>) -> Vec<PinMetricHistory> {
    history.reverse();
    history
}

/// X-axis label for a snapshot time as seen in `tz`, e.g. "14h 3/5".
pub fn tick_label<Tz: TimeZone>(at: Timestamp, tz: &Tz) -> String {
    let at = at.with_timezone(tz);
    format!("{}h {}/{}", at.hour(), at.day(), at.month())
}

/// One bar group in the velocity chart.
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityPoint {
    pub label: String,
    pub cycle_id: String,
    pub recorded_at: Timestamp,
    pub delta_impressions: i64,
    pub delta_saves: i64,
    pub delta_outbound_clicks: Option<i64>,
}

/// Chronological velocity data for one pin.
#[derive(Debug, Clone, PartialEq)]
pub struct VelocitySeries {
    pub pin: ActivePin,
    pub points: Vec<VelocityPoint>,
}

impl VelocitySeries {
    /// Build from a pin and its history in store order (newest-first).
    ///
    /// Tick labels use the viewer's local time zone.
    pub fn from_store(pin: ActivePin, history: Vec<PinMetricHistory>) -> Self {
        Self::from_store_in(pin, history, &Local)
    }

    /// Like [`VelocitySeries::from_store`], labelling ticks in `tz`.
    pub fn from_store_in<Tz: TimeZone>(
        pin: ActivePin,
        history: Vec<PinMetricHistory>,
        tz: &Tz,
    ) -> Self {
        let points = chronological(history)
            .into_iter()
            .map(|row| VelocityPoint {
                label: tick_label(row.recorded_at, tz),
                cycle_id: row.cycle_id,
                recorded_at: row.recorded_at,
                delta_impressions: row.delta_impressions,
                delta_saves: row.delta_saves,
                delta_outbound_clicks: row.delta_outbound_clicks,
            })
            .collect();

        Self { pin, points }
    }

    /// True when the pin has no recorded snapshots yet.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Most recent snapshot, if any.
    pub fn latest(&self) -> Option<&VelocityPoint> {
        self.points.last()
    }

    /// Largest bar value, for scaling. Negative deltas count as zero height.
    pub fn max_delta(&self) -> u64 {
        self.points
            .iter()
            .flat_map(|p| [p.delta_impressions, p.delta_saves])
            .map(|v| v.max(0) as u64)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeDelta, Utc};
    use eltwatch_types::PinStatus;

    fn row(id: i64, hours_ago: i64) -> PinMetricHistory {
        let now = Utc.with_ymd_and_hms(2024, 5, 3, 14, 0, 0).unwrap();
        PinMetricHistory {
            id,
            pin_id: "p".to_string(),
            cycle_id: format!("cycle-{}", id),
            recorded_at: now - TimeDelta::hours(hours_ago),
            impressions: 1000,
            saves: 10,
            outbound_clicks: 5,
            delta_impressions: id * 100,
            delta_saves: id,
            delta_outbound_clicks: None,
        }
    }

    fn pin() -> ActivePin {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        ActivePin {
            pin_id: "1029384756".to_string(),
            title: "Loft".to_string(),
            image_url: String::new(),
            current_status: PinStatus::Active,
            last_synced_at: at,
            created_at: at,
        }
    }

    #[test]
    fn test_chronological_reverses_store_order() {
        let (a, b, c) = (row(3, 0), row(2, 4), row(1, 8));
        let out = chronological(vec![a.clone(), b.clone(), c.clone()]);
        assert_eq!(out, vec![c, b, a]);
    }

    #[test]
    fn test_chronological_is_an_involution() {
        let store = vec![row(3, 0), row(2, 4), row(1, 8)];
        assert_eq!(chronological(chronological(store.clone())), store);
    }

    #[test]
    fn test_deltas_pass_through_untouched() {
        let mut odd = row(1, 0);
        odd.delta_impressions = -40;
        odd.delta_outbound_clicks = Some(7);

        let series = VelocitySeries::from_store(pin(), vec![odd]);
        let point = &series.points[0];
        assert_eq!(point.delta_impressions, -40);
        assert_eq!(point.delta_outbound_clicks, Some(7));
        assert_eq!(series.max_delta(), 1);
    }

    #[test]
    fn test_series_labels_and_latest() {
        let series = VelocitySeries::from_store_in(pin(), vec![row(2, 0), row(1, 4)], &Utc);
        assert_eq!(series.points[0].label, "10h 3/5");
        assert_eq!(series.latest().unwrap().cycle_id, "cycle-2");
        assert_eq!(series.max_delta(), 200);
    }

    #[test]
    fn test_tick_label_follows_viewer_zone() {
        let at = Utc.with_ymd_and_hms(2024, 5, 3, 23, 0, 0).unwrap();
        let madrid = FixedOffset::east_opt(2 * 3600).unwrap();
        let lima = FixedOffset::west_opt(5 * 3600).unwrap();

        assert_eq!(tick_label(at, &Utc), "23h 3/5");
        assert_eq!(tick_label(at, &madrid), "1h 4/5");
        assert_eq!(tick_label(at, &lima), "18h 3/5");
    }

    #[test]
    fn test_empty_series() {
        let series = VelocitySeries::from_store(pin(), Vec::new());
        assert!(series.is_empty());
        assert!(series.latest().is_none());
        assert_eq!(series.max_delta(), 0);
    }
}
