//! # eltwatch
//!
//! A terminal dashboard and library for monitoring a Pinterest ELT
//! ingestion pipeline.
//!
//! The pipeline itself lives elsewhere; this crate only reads what it leaves
//! in the store (ingestion cycles, the raw buffer, tracked pins and their
//! metric history) and turns it into operational labels: a zombie cycle, a
//! stale pin, a saturated buffer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Application                          │
//! │  ┌─────────┐    ┌──────────┐    ┌─────────┐    ┌─────────┐ │
//! │  │  app    │───▶│   data   │───▶│   ui    │───▶│ Terminal│ │
//! │  │ (state) │    │(evaluate)│    │(render) │    │         │ │
//! │  └────┬────┘    └──────────┘    └─────────┘    └─────────┘ │
//! │       │ DataSource                                          │
//! │       ▼                                                     │
//! │  ┌─────────┐  tokio task   ┌─────────────┐                  │
//! │  │ Poller  │──────────────▶│ StoreReader │◀── Mock | File  │
//! │  └─────────┘               └─────────────┘    | Supabase    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`data`]**: The evaluators ([`data::is_stale`], [`data::is_zombie`],
//!   [`data::buffer_ratio`], [`data::chronological`]) and the views built
//!   from them. Pure functions; the current time is always an argument.
//! - **[`source`]**: The [`StoreReader`] trait and its backends, and the
//!   [`Poller`] that drives a reader on a timer.
//! - **[`app`]**, **[`events`]**, **[`ui`]**: The terminal dashboard.
//! - **[`config`]**: Layered settings (defaults, TOML, environment, CLI).
//!
//! ## Usage
//!
//! ### Evaluating store rows
//!
//! ```
//! use chrono::{TimeDelta, Utc};
//! use eltwatch::data::{is_stale, is_zombie};
//! use eltwatch_types::IngestionCycle;
//!
//! let now = Utc::now();
//! let cycle = IngestionCycle::running("c-1", now - TimeDelta::minutes(12));
//!
//! assert!(is_zombie(&cycle, now));
//! assert!(!is_stale(now - TimeDelta::hours(2), now));
//! ```
//!
//! ### Polling a store into the dashboard
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use eltwatch::{App, MockStore, Poller, Thresholds};
//!
//! # tokio_test::block_on(async {
//! let handle = Poller::new(Arc::new(MockStore::new()))
//!     .interval(Duration::from_secs(30))
//!     .start();
//! let app = App::new(Box::new(handle), Thresholds::default());
//! # });
//! ```

pub mod app;
pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod source;
pub mod ui;

// Re-export main types for convenience
pub use app::App;
pub use config::{Overrides, Settings, StoreKind};
pub use data::{CycleState, Freshness, HealthStatus, SystemHealthData, Thresholds};
pub use error::{EvalError, FetchError};
pub use source::{
    DataSource, FileStore, MockStore, PollEvent, PollHandle, Poller, StoreReader, SupabaseStore,
};
