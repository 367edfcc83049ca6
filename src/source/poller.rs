//! Scheduled polling of a [`StoreReader`].
//!
//! A [`Poller`] runs as a tokio task. On every tick it fetches the latest
//! cycle, the buffer count and all pins; whenever the selected pin changes it
//! fetches that pin's history, abandoning any history fetch still in flight.
//! Results are delivered as [`PollEvent`]s through the returned
//! [`PollHandle`], which the TUI drains without blocking.
//!
//! Stopping or dropping the handle aborts the task. Fetches in flight at that
//! point are dropped and their results never delivered.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

use super::{DataSource, FetchKind, PollEvent, StoreReader};

/// Default interval between polls.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Configuration for a polling task.
#[derive(Debug, Clone)]
pub struct Poller {
    reader: Arc<dyn StoreReader>,
    interval: Duration,
}

impl Poller {
    pub fn new(reader: Arc<dyn StoreReader>) -> Self {
        Self {
            reader,
            interval: DEFAULT_INTERVAL,
        }
    }

    /// Set the interval between polls (default: 30 seconds).
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Spawn the polling task on the current tokio runtime.
    ///
    /// The first poll runs immediately.
    pub fn start(self) -> PollHandle {
        let (tx, rx) = mpsc::channel(32);
        let (selection_tx, selection_rx) = watch::channel(None);
        let refresh = Arc::new(Notify::new());
        let description = self.reader.description().to_string();

        tracing::info!(
            source = %description,
            interval_secs = self.interval.as_secs_f64(),
            "Starting poller"
        );

        let task = tokio::spawn(run(
            self.reader,
            self.interval,
            tx,
            selection_rx,
            refresh.clone(),
        ));

        PollHandle {
            receiver: rx,
            selection: selection_tx,
            refresh,
            task,
            description,
            last_error: None,
        }
    }
}

async fn run(
    reader: Arc<dyn StoreReader>,
    interval: Duration,
    tx: mpsc::Sender<PollEvent>,
    mut selection: watch::Receiver<Option<String>>,
    refresh: Arc<Notify>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // At most one history fetch; dropping the set aborts it.
    let mut history: JoinSet<PollEvent> = JoinSet::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = refresh.notified() => {
                ticker.reset();
                let selected = selection.borrow().clone();
                if let Some(pin_id) = selected {
                    spawn_history(&mut history, &reader, pin_id);
                }
            }
            changed = selection.changed() => {
                if changed.is_err() {
                    break;
                }
                let selected = selection.borrow_and_update().clone();
                history.abort_all();
                if let Some(pin_id) = selected {
                    spawn_history(&mut history, &reader, pin_id);
                }
                continue;
            }
            Some(joined) = history.join_next(), if !history.is_empty() => {
                // Aborted fetches come back as cancelled join errors. A fetch
                // that finished before the selection moved on is dropped here.
                if let Ok(event) = joined {
                    let current = selection.borrow().clone();
                    if event.history_pin() != current.as_deref() {
                        tracing::debug!("Dropping history for a deselected pin");
                        continue;
                    }
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
                continue;
            }
        }

        if !poll_once(reader.as_ref(), &tx).await {
            break;
        }
    }

    tracing::info!("Poller stopped");
}

fn spawn_history(history: &mut JoinSet<PollEvent>, reader: &Arc<dyn StoreReader>, pin_id: String) {
    history.abort_all();
    let reader = reader.clone();

    history.spawn(async move {
        tracing::debug!(pin_id = %pin_id, "Fetching pin history");
        match reader.fetch_pin_with_history(&pin_id).await {
            Ok(found) => PollEvent::History { pin_id, found },
            Err(e) => {
                tracing::warn!(pin_id = %pin_id, error = %e, "History fetch failed");
                PollEvent::Failed {
                    kind: FetchKind::History,
                    pin_id: Some(pin_id),
                    error: e.to_string(),
                }
            }
        }
    });
}

/// Run one health + pins poll. Returns false once the receiver is gone.
async fn poll_once(reader: &dyn StoreReader, tx: &mpsc::Sender<PollEvent>) -> bool {
    tracing::debug!(source = reader.description(), "Polling store");

    let health = match tokio::try_join!(reader.fetch_latest_cycle(), reader.fetch_buffer_count()) {
        Ok((cycle, buffer_count)) => {
            if let Some(Err(e)) = cycle.as_ref().map(crate::data::health::check_cycle) {
                tracing::warn!(error = %e, "Store returned an inconsistent cycle");
            }
            PollEvent::Health {
                cycle,
                buffer_count,
                fetched_at: Utc::now(),
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Health fetch failed");
            PollEvent::Failed {
                kind: FetchKind::Health,
                pin_id: None,
                error: e.to_string(),
            }
        }
    };

    if tx.send(health).await.is_err() {
        return false;
    }

    let pins = match reader.fetch_active_pins().await {
        Ok(pins) => PollEvent::Pins {
            pins,
            fetched_at: Utc::now(),
        },
        Err(e) => {
            tracing::warn!(error = %e, "Pin fetch failed");
            PollEvent::Failed {
                kind: FetchKind::Pins,
                pin_id: None,
                error: e.to_string(),
            }
        }
    };

    tx.send(pins).await.is_ok()
}

/// Handle to a running [`Poller`].
///
/// Dropping the handle stops the poller.
#[derive(Debug)]
pub struct PollHandle {
    receiver: mpsc::Receiver<PollEvent>,
    selection: watch::Sender<Option<String>>,
    refresh: Arc<Notify>,
    task: JoinHandle<()>,
    description: String,
    last_error: Option<String>,
}

impl PollHandle {
    /// Wait for the next event. Returns `None` once the poller has stopped.
    pub async fn next_event(&mut self) -> Option<PollEvent> {
        self.receiver.recv().await
    }

    /// Whether the polling task is still running.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the poller, abandoning any fetch in flight.
    pub fn stop(self) {
        // Drop does the abort.
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl DataSource for PollHandle {
    fn poll(&mut self) -> Option<PollEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                self.last_error = Some("Poller stopped".to_string());
                None
            }
        }
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn select_pin(&mut self, pin_id: Option<String>) {
        self.selection.send_if_modified(|current| {
            if *current == pin_id {
                false
            } else {
                *current = pin_id;
                true
            }
        });
    }

    fn refresh(&mut self) {
        self.refresh.notify_one();
    }

    fn error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::source::{MockStore, PinWithHistory};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use eltwatch_types::{ActivePin, IngestionCycle};

    fn mock() -> Arc<dyn StoreReader> {
        Arc::new(MockStore::at(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()))
    }

    async fn next_matching<F>(handle: &mut PollHandle, mut pred: F) -> PollEvent
    where
        F: FnMut(&PollEvent) -> bool,
    {
        loop {
            let event = handle.next_event().await.expect("poller stopped");
            if pred(&event) {
                return event;
            }
        }
    }

    #[tokio::test]
    async fn test_first_poll_is_immediate() {
        let mut handle = Poller::new(mock()).interval(Duration::from_secs(3600)).start();

        match handle.next_event().await {
            Some(PollEvent::Health { cycle, buffer_count, .. }) => {
                assert!(cycle.is_some());
                assert_eq!(buffer_count, 842);
            }
            other => panic!("expected health event, got {:?}", other),
        }

        match handle.next_event().await {
            Some(PollEvent::Pins { pins, .. }) => assert_eq!(pins.len(), 4),
            other => panic!("expected pins event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_selection_fetches_history() {
        let mut handle = Poller::new(mock()).interval(Duration::from_secs(3600)).start();
        handle.select_pin(Some("1029384756".to_string()));

        let event = next_matching(&mut handle, |e| matches!(e, PollEvent::History { .. })).await;
        match event {
            PollEvent::History { pin_id, found } => {
                assert_eq!(pin_id, "1029384756");
                let (_, history) = found.unwrap();
                assert_eq!(history.len(), 11);
            }
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_unknown_pin_is_not_found() {
        let mut handle = Poller::new(mock()).interval(Duration::from_secs(3600)).start();
        handle.select_pin(Some("missing".to_string()));

        let event = next_matching(&mut handle, |e| matches!(e, PollEvent::History { .. })).await;
        assert_eq!(
            event,
            PollEvent::History {
                pin_id: "missing".to_string(),
                found: None
            }
        );
    }

    #[derive(Debug)]
    struct FailingStore;

    #[async_trait]
    impl StoreReader for FailingStore {
        async fn fetch_latest_cycle(&self) -> Result<Option<IngestionCycle>, FetchError> {
            Err(FetchError::Timeout)
        }

        async fn fetch_buffer_count(&self) -> Result<u64, FetchError> {
            Ok(0)
        }

        async fn fetch_pin_with_history(
            &self,
            _pin_id: &str,
        ) -> Result<Option<PinWithHistory>, FetchError> {
            Err(FetchError::Connection("refused".to_string()))
        }

        async fn fetch_active_pins(&self) -> Result<Vec<ActivePin>, FetchError> {
            Err(FetchError::Auth("Invalid API key".to_string()))
        }

        fn description(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_failures_are_reported_as_events() {
        let mut handle = Poller::new(Arc::new(FailingStore))
            .interval(Duration::from_secs(3600))
            .start();

        assert_eq!(
            handle.next_event().await,
            Some(PollEvent::Failed {
                kind: FetchKind::Health,
                pin_id: None,
                error: "Request timed out".to_string()
            })
        );
        assert!(matches!(
            handle.next_event().await,
            Some(PollEvent::Failed { kind: FetchKind::Pins, .. })
        ));
        assert!(handle.is_running());
    }

    /// Store whose history fetch for "slow" never completes in practice.
    #[derive(Debug)]
    struct SlowHistoryStore(MockStore);

    #[async_trait]
    impl StoreReader for SlowHistoryStore {
        async fn fetch_latest_cycle(&self) -> Result<Option<IngestionCycle>, FetchError> {
            self.0.fetch_latest_cycle().await
        }

        async fn fetch_buffer_count(&self) -> Result<u64, FetchError> {
            self.0.fetch_buffer_count().await
        }

        async fn fetch_pin_with_history(
            &self,
            pin_id: &str,
        ) -> Result<Option<PinWithHistory>, FetchError> {
            if pin_id == "slow" {
                tokio::time::sleep(Duration::from_secs(600)).await;
            }
            self.0.fetch_pin_with_history(pin_id).await
        }

        async fn fetch_active_pins(&self) -> Result<Vec<ActivePin>, FetchError> {
            self.0.fetch_active_pins().await
        }

        fn description(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reselection_abandons_inflight_history() {
        let store = SlowHistoryStore(MockStore::at(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        ));
        let mut handle = Poller::new(Arc::new(store))
            .interval(Duration::from_secs(30))
            .start();

        handle.select_pin(Some("slow".to_string()));
        tokio::task::yield_now().await;
        handle.select_pin(Some("1029384756".to_string()));

        let event = next_matching(&mut handle, |e| matches!(e, PollEvent::History { .. })).await;
        assert!(matches!(event, PollEvent::History { ref pin_id, .. } if pin_id == "1029384756"));

        // Well past the slow fetch's completion time: nothing for "slow" arrives.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(900);
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout_at(deadline, handle.next_event()).await {
                Ok(Some(PollEvent::History { pin_id, .. })) => {
                    panic!("unexpected history for {}", pin_id)
                }
                Ok(Some(_)) => {}
                Ok(None) | Err(_) => break,
            }
        }
    }

    #[tokio::test]
    async fn test_refresh_polls_again() {
        let mut handle = Poller::new(mock()).interval(Duration::from_secs(3600)).start();

        next_matching(&mut handle, |e| matches!(e, PollEvent::Pins { .. })).await;
        handle.refresh();
        let event = next_matching(&mut handle, |e| matches!(e, PollEvent::Health { .. })).await;
        assert!(matches!(event, PollEvent::Health { .. }));
    }

    #[tokio::test]
    async fn test_poll_is_non_blocking() {
        let mut handle = Poller::new(mock()).interval(Duration::from_secs(3600)).start();
        next_matching(&mut handle, |e| matches!(e, PollEvent::Pins { .. })).await;

        assert!(handle.poll().is_none());
        assert!(handle.error().is_none());
        assert_eq!(DataSource::description(&handle), "mock");
    }
}
