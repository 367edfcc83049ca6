//! # eltwatch-types
//!
//! Row types for the Pinterest ELT ingestion store. These are the read-only
//! views the monitoring dashboard receives from the store; the store owns
//! every row and nothing in this crate writes back.
//!
//! ## Tables
//!
//! - [`IngestionCycle`] (`ingestion_cycles`): one scheduled run of the
//!   ingestion pipeline. Created `running`, mutated once to a terminal
//!   status, immutable afterwards.
//! - [`ActivePin`] (`active_pins`): the pins being tracked. Soft-deleted via
//!   [`PinStatus::Deleted`], never removed.
//! - [`PinMetricHistory`] (`pin_metric_history`): append-only counter
//!   snapshots keyed by `(pin_id, cycle_id)`, with deltas precomputed by the
//!   pipeline.
//!
//! ## Features
//!
//! - `serde`: JSON (de)serialization with the store's column names and
//!   RFC 3339 timestamps.
//!
//! ## Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use eltwatch_types::{CycleStatus, IngestionCycle};
//!
//! let started = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
//! let cycle = IngestionCycle::running("c-1", started);
//!
//! assert_eq!(cycle.status, CycleStatus::Running);
//! assert!(cycle.ended_at.is_none());
//! ```

mod cycle;
mod history;
mod pin;

pub use cycle::*;
pub use history::*;
pub use pin::*;

/// Point-in-time value used for every store timestamp.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
