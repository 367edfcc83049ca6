//! Health inference: staleness, zombie cycles and buffer saturation.
//!
//! Every evaluator here is a pure function of its arguments. The current
//! time is always passed in as `now`; nothing in this module reads the
//! clock.

use chrono::TimeDelta;
use eltwatch_types::{CycleStatus, IngestionCycle, Timestamp};

use crate::error::EvalError;

/// Pins not synced for longer than this are stale.
pub const STALE_AFTER: TimeDelta = TimeDelta::hours(24);

/// Running cycles older than this are zombies.
pub const ZOMBIE_AFTER: TimeDelta = TimeDelta::minutes(10);

/// Default raw buffer capacity used for the saturation gauge.
pub const DEFAULT_BUFFER_CAPACITY: u64 = 2000;

/// Thresholds for health status computation.
///
/// These thresholds determine when a pin is stale, when a running cycle is
/// considered stuck, and how the raw buffer gauge is scaled.
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    /// Age after which a pin's data is stale (exclusive).
    pub stale_after: TimeDelta,
    /// Age after which a running cycle is a zombie (exclusive).
    pub zombie_after: TimeDelta,
    /// Capacity the buffer count is measured against. Must be positive.
    pub buffer_capacity: u64,
    /// Buffer count above which the gauge turns critical.
    pub buffer_warning: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            stale_after: STALE_AFTER,
            zombie_after: ZOMBIE_AFTER,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            buffer_warning: 1000,
        }
    }
}

impl Thresholds {
    /// Reject configurations the evaluators cannot work with.
    pub fn validate(&self) -> Result<(), EvalError> {
        if self.buffer_capacity == 0 {
            return Err(EvalError::ZeroCapacity);
        }
        Ok(())
    }

    pub fn is_stale(&self, last_synced_at: Timestamp, now: Timestamp) -> bool {
        is_stale_after(last_synced_at, now, self.stale_after)
    }

    pub fn is_zombie(&self, cycle: &IngestionCycle, now: Timestamp) -> bool {
        is_zombie_after(cycle, now, self.zombie_after)
    }

    pub fn buffer_ratio(&self, count: u64) -> Result<f64, EvalError> {
        buffer_ratio(count, self.buffer_capacity)
    }

    /// Health of the raw buffer at the given fill level.
    pub fn buffer_status(&self, count: u64) -> HealthStatus {
        if count > self.buffer_warning {
            HealthStatus::Critical
        } else {
            HealthStatus::Healthy
        }
    }
}

/// Health status for a cycle, pin, or buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

impl HealthStatus {
    /// Returns a short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "OK",
            HealthStatus::Warning => "WARN",
            HealthStatus::Critical => "CRIT",
        }
    }
}

/// Whether a pin last synced at `last_synced_at` is stale at `now`.
///
/// Stale means strictly more than 24 hours have passed. A sync timestamp in
/// the future (clock skew) is never stale.
pub fn is_stale(last_synced_at: Timestamp, now: Timestamp) -> bool {
    is_stale_after(last_synced_at, now, STALE_AFTER)
}

/// [`is_stale`] with a configurable freshness window.
pub fn is_stale_after(last_synced_at: Timestamp, now: Timestamp, window: TimeDelta) -> bool {
    now.signed_duration_since(last_synced_at) > window
}

/// Whether `cycle` is stuck in `running` at `now`.
///
/// A zombie is a running cycle started strictly more than 10 minutes ago.
/// Terminal cycles are never zombies. This only labels the cycle; it does
/// not act on it.
pub fn is_zombie(cycle: &IngestionCycle, now: Timestamp) -> bool {
    is_zombie_after(cycle, now, ZOMBIE_AFTER)
}

/// [`is_zombie`] with a configurable run-time limit.
pub fn is_zombie_after(cycle: &IngestionCycle, now: Timestamp, window: TimeDelta) -> bool {
    cycle.status == CycleStatus::Running && now.signed_duration_since(cycle.started_at) > window
}

/// Fill ratio of the raw buffer, clamped to `[0, 1]`.
///
/// A zero capacity is a configuration error and is reported, not masked.
pub fn buffer_ratio(count: u64, capacity: u64) -> Result<f64, EvalError> {
    if capacity == 0 {
        return Err(EvalError::ZeroCapacity);
    }
    Ok((count as f64 / capacity as f64).min(1.0))
}

/// Check the `ended_at` / status invariant of a cycle row.
pub fn check_cycle(cycle: &IngestionCycle) -> Result<(), EvalError> {
    if cycle.is_consistent() {
        Ok(())
    } else {
        Err(EvalError::CycleInvariant {
            cycle_id: cycle.cycle_id.clone(),
            status: cycle.status,
        })
    }
}

/// Freshness label of a pin row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Freshness {
    Synced,
    Stale,
}

impl Freshness {
    pub fn evaluate(last_synced_at: Timestamp, now: Timestamp, thresholds: &Thresholds) -> Self {
        if thresholds.is_stale(last_synced_at, now) {
            Freshness::Stale
        } else {
            Freshness::Synced
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Freshness::Synced => "SYNCED OK",
            Freshness::Stale => "STALE DATA",
        }
    }

    pub fn status(&self) -> HealthStatus {
        match self {
            Freshness::Synced => HealthStatus::Healthy,
            Freshness::Stale => HealthStatus::Warning,
        }
    }
}

/// Display state of the most recent ingestion cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    /// The store has no cycles yet.
    NoData,
    Running,
    Completed,
    Failed,
    /// Running for longer than the zombie window. Replaces `Running`.
    Zombie,
}

impl CycleState {
    /// Classify the latest cycle. `None` means the store has no cycles.
    pub fn evaluate(cycle: Option<&IngestionCycle>, now: Timestamp, thresholds: &Thresholds) -> Self {
        let Some(cycle) = cycle else {
            return CycleState::NoData;
        };

        if thresholds.is_zombie(cycle, now) {
            return CycleState::Zombie;
        }

        match cycle.status {
            CycleStatus::Running => CycleState::Running,
            CycleStatus::Completed => CycleState::Completed,
            CycleStatus::Failed => CycleState::Failed,
        }
    }

    /// Badge text. A zombie shows its badge instead of the raw status.
    pub fn label(&self) -> &'static str {
        match self {
            CycleState::NoData => "NO DATA",
            CycleState::Running => "RUNNING",
            CycleState::Completed => "COMPLETED",
            CycleState::Failed => "FAILED",
            CycleState::Zombie => "CICLO ZOMBIE",
        }
    }

    pub fn status(&self) -> HealthStatus {
        match self {
            CycleState::NoData | CycleState::Completed => HealthStatus::Healthy,
            CycleState::Running => HealthStatus::Warning,
            CycleState::Failed | CycleState::Zombie => HealthStatus::Critical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn running_since(minutes: i64) -> IngestionCycle {
        IngestionCycle::running("c-1", t0() - TimeDelta::minutes(minutes))
    }

    #[test]
    fn test_stale_boundary_is_exclusive() {
        let t = t0();
        assert!(!is_stale(t, t));
        assert!(!is_stale(t, t + TimeDelta::hours(24)));
        assert!(is_stale(t, t + TimeDelta::hours(24) + TimeDelta::milliseconds(1)));
    }

    #[test]
    fn test_future_sync_is_never_stale() {
        let t = t0();
        assert!(!is_stale(t, t - TimeDelta::milliseconds(1)));
        assert!(!is_stale(t + TimeDelta::days(365), t));
    }

    #[test]
    fn test_terminal_cycles_are_never_zombies() {
        let now = t0();
        let completed = IngestionCycle::running("c", now - TimeDelta::hours(1))
            .finish(CycleStatus::Completed, now - TimeDelta::minutes(50));
        let failed = IngestionCycle::running("c", now - TimeDelta::days(3))
            .finish(CycleStatus::Failed, now - TimeDelta::days(2));

        assert!(!is_zombie(&completed, now));
        assert!(!is_zombie(&failed, now));
    }

    #[test]
    fn test_zombie_boundaries() {
        let now = t0();
        assert!(is_zombie(&running_since(11), now));
        assert!(!is_zombie(&running_since(9), now));
        assert!(!is_zombie(&running_since(10), now));
    }

    #[test]
    fn test_configurable_windows() {
        let thresholds = Thresholds {
            stale_after: TimeDelta::hours(1),
            zombie_after: TimeDelta::minutes(2),
            ..Thresholds::default()
        };
        let now = t0();

        assert!(thresholds.is_zombie(&running_since(3), now));
        assert!(thresholds.is_stale(now - TimeDelta::minutes(61), now));
        assert!(!thresholds.is_stale(now - TimeDelta::minutes(59), now));
    }

    #[test]
    fn test_buffer_ratio() {
        assert_eq!(buffer_ratio(500, 2000), Ok(0.25));
        assert_eq!(buffer_ratio(3000, 2000), Ok(1.0));
        assert_eq!(buffer_ratio(0, 2000), Ok(0.0));
        assert_eq!(buffer_ratio(10, 0), Err(EvalError::ZeroCapacity));
    }

    #[test]
    fn test_thresholds_validate_capacity() {
        assert!(Thresholds::default().validate().is_ok());

        let bad = Thresholds {
            buffer_capacity: 0,
            ..Thresholds::default()
        };
        assert_eq!(bad.validate(), Err(EvalError::ZeroCapacity));
    }

    #[test]
    fn test_buffer_status_above_warning() {
        let thresholds = Thresholds::default();
        assert_eq!(thresholds.buffer_status(842), HealthStatus::Healthy);
        assert_eq!(thresholds.buffer_status(1000), HealthStatus::Healthy);
        assert_eq!(thresholds.buffer_status(1001), HealthStatus::Critical);
    }

    #[test]
    fn test_cycle_state_zombie_replaces_running() {
        let thresholds = Thresholds::default();
        let now = t0();

        let state = CycleState::evaluate(Some(&running_since(12)), now, &thresholds);
        assert_eq!(state, CycleState::Zombie);
        assert_eq!(state.label(), "CICLO ZOMBIE");

        let state = CycleState::evaluate(Some(&running_since(2)), now, &thresholds);
        assert_eq!(state, CycleState::Running);
        assert_eq!(state.label(), "RUNNING");
    }

    #[test]
    fn test_cycle_state_no_data() {
        let state = CycleState::evaluate(None, t0(), &Thresholds::default());
        assert_eq!(state, CycleState::NoData);
        assert_eq!(state.status(), HealthStatus::Healthy);
    }

    #[test]
    fn test_freshness_labels() {
        let thresholds = Thresholds::default();
        let now = t0();

        let stale = Freshness::evaluate(now - TimeDelta::hours(30), now, &thresholds);
        let fresh = Freshness::evaluate(now - TimeDelta::hours(2), now, &thresholds);

        assert_eq!(stale.label(), "STALE DATA");
        assert_eq!(fresh.label(), "SYNCED OK");
    }

    #[test]
    fn test_check_cycle_invariant() {
        let mut cycle = running_since(1);
        assert!(check_cycle(&cycle).is_ok());

        cycle.status = CycleStatus::Completed;
        assert_eq!(
            check_cycle(&cycle),
            Err(EvalError::CycleInvariant {
                cycle_id: "c-1".to_string(),
                status: CycleStatus::Completed,
            })
        );
    }
}
