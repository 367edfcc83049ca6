//! Data models and health inference for store snapshots.
//!
//! This module turns raw store rows into the status labels the dashboard
//! shows. Everything here is synchronous and takes the current time as an
//! argument.
//!
//! ## Submodules
//!
//! - [`duration`]: Parsing and formatting of duration strings (e.g., "10m", "24h")
//! - [`health`]: The evaluators ([`is_stale`], [`is_zombie`], [`buffer_ratio`]) and [`Thresholds`]
//! - [`dashboard`]: Derived views ([`SystemHealthData`], [`PinInventory`])
//! - [`velocity`]: Chronological metric deltas for the velocity chart
//! - [`history`]: Health readings across polls for sparklines and rates
//!
//! ## Data Flow
//!
//! ```text
//! StoreReader fetch (cycle, buffer count, pins, history)
//!        │
//!        ├──▶ SystemHealthData::from_fetch() ──▶ History::record()
//!        │
//!        ├──▶ PinInventory::rows() (freshness per pin at render time)
//!        │
//!        └──▶ VelocitySeries::from_store() (newest-first → oldest-first)
//! ```

pub mod dashboard;
pub mod duration;
pub mod health;
pub mod history;
pub mod velocity;

pub use dashboard::{matches_query, PinInventory, PinRow, SystemHealthData};
pub use health::{
    buffer_ratio, is_stale, is_zombie, CycleState, Freshness, HealthStatus, Thresholds,
};
pub use history::History;
pub use velocity::{chronological, VelocitySeries};
