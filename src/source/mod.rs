//! Store access and background polling.
//!
//! The ingestion store is read through the async [`StoreReader`] trait,
//! which has one implementation per backend (mock data, a JSON fixture file,
//! or the Supabase REST API). A [`Poller`] drives a reader on a timer and
//! hands results to the UI through the non-blocking [`DataSource`] trait.

mod file;
mod fixture;
mod mock;
mod poller;
mod supabase;

pub use file::FileStore;
pub use fixture::{PinRecord, StoreFixture};
pub use mock::{mock_fixture, MockStore};
pub use poller::{PollHandle, Poller};
pub use supabase::{SupabaseStore, SupabaseStoreBuilder};

use std::fmt::Debug;

use async_trait::async_trait;
use eltwatch_types::{ActivePin, IngestionCycle, PinMetricHistory, Timestamp};

use crate::error::FetchError;

/// A pin together with its metric history, newest snapshot first.
pub type PinWithHistory = (ActivePin, Vec<PinMetricHistory>);

/// Read-only access to the ingestion store.
///
/// Implementations own the transport. A missing row is `Ok(None)`, never an
/// error; errors are reserved for failures to reach or understand the store.
///
/// # Example
///
/// ```
/// use eltwatch::{MockStore, StoreReader};
///
/// # tokio_test::block_on(async {
/// let store = MockStore::new();
/// let pins = store.fetch_active_pins().await.unwrap();
/// assert_eq!(pins.len(), 4);
/// # });
/// ```
#[async_trait]
pub trait StoreReader: Send + Sync + Debug {
    /// Most recently started cycle, or `None` if no cycle was ever recorded.
    async fn fetch_latest_cycle(&self) -> Result<Option<IngestionCycle>, FetchError>;

    /// Number of records waiting in the raw buffer.
    async fn fetch_buffer_count(&self) -> Result<u64, FetchError>;

    /// A pin and its history (newest first), or `None` if the pin is unknown.
    async fn fetch_pin_with_history(
        &self,
        pin_id: &str,
    ) -> Result<Option<PinWithHistory>, FetchError>;

    /// Every tracked pin, including soft-deleted ones.
    async fn fetch_active_pins(&self) -> Result<Vec<ActivePin>, FetchError>;

    /// Returns a human-readable description of the store.
    ///
    /// Used for display in the TUI status bar.
    fn description(&self) -> &str;
}

/// Which fetch a [`PollEvent::Failed`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKind {
    Health,
    Pins,
    History,
}

impl FetchKind {
    pub fn label(&self) -> &'static str {
        match self {
            FetchKind::Health => "health",
            FetchKind::Pins => "pins",
            FetchKind::History => "history",
        }
    }
}

/// A result delivered by the poller.
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    /// Latest cycle and buffer count, fetched together.
    Health {
        cycle: Option<IngestionCycle>,
        buffer_count: u64,
        fetched_at: Timestamp,
    },
    /// All tracked pins.
    Pins {
        pins: Vec<ActivePin>,
        fetched_at: Timestamp,
    },
    /// History for the selected pin. `found` is `None` when the pin is unknown.
    History {
        pin_id: String,
        found: Option<PinWithHistory>,
    },
    /// A fetch failed; the consumer should keep its previous data.
    ///
    /// `pin_id` names the pin for history failures and is `None` otherwise.
    Failed {
        kind: FetchKind,
        pin_id: Option<String>,
        error: String,
    },
}

impl PollEvent {
    /// The pin a history result or history failure belongs to.
    pub fn history_pin(&self) -> Option<&str> {
        match self {
            PollEvent::History { pin_id, .. } => Some(pin_id),
            PollEvent::Failed {
                kind: FetchKind::History,
                pin_id,
                ..
            } => pin_id.as_deref(),
            _ => None,
        }
    }
}

/// Non-blocking receiver of poll results.
///
/// The TUI calls [`DataSource::poll`] on every loop iteration and applies
/// whatever arrived. Implementations must never block.
pub trait DataSource: Send + Debug {
    /// Next pending event, or `None` if nothing new arrived.
    fn poll(&mut self) -> Option<PollEvent>;

    /// Returns a human-readable description of the source.
    fn description(&self) -> &str;

    /// Change which pin's history should be fetched. `None` clears it.
    fn select_pin(&mut self, pin_id: Option<String>);

    /// Ask for an immediate refresh instead of waiting for the next tick.
    fn refresh(&mut self);

    /// Check if the source has stopped delivering events.
    fn error(&self) -> Option<&str>;
}
