//! Application state and navigation logic.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use eltwatch_types::Timestamp;

use crate::data::{
    History, PinInventory, PinRow, SystemHealthData, Thresholds, VelocitySeries,
};
use crate::error::EvalError;
use crate::source::{DataSource, FetchKind, PollEvent};
use crate::ui::pins::{sort_rows_by, SortColumn};
use crate::ui::Theme;

/// The current view/tab in the TUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Latest cycle, zombie badge and raw buffer gauge.
    Health,
    /// Searchable table of tracked pins with freshness labels.
    Pins,
    /// Delta bar chart for the selected pin.
    Velocity,
}

impl View {
    /// Cycle to the next view.
    pub fn next(self) -> Self {
        match self {
            View::Health => View::Pins,
            View::Pins => View::Velocity,
            View::Velocity => View::Health,
        }
    }

    /// Cycle to the previous view.
    pub fn prev(self) -> Self {
        match self {
            View::Health => View::Velocity,
            View::Pins => View::Health,
            View::Velocity => View::Pins,
        }
    }

    /// Returns the display label for this view.
    pub fn label(&self) -> &'static str {
        match self {
            View::Health => "Health",
            View::Pins => "Pins",
            View::Velocity => "Velocity",
        }
    }
}

/// What the velocity view currently has for the selected pin.
#[derive(Debug, Clone, PartialEq)]
pub enum VelocityState {
    /// No pin selected.
    Idle,
    /// History requested, nothing received yet.
    Loading(String),
    Loaded(VelocitySeries),
    /// The store does not know the pin.
    NotFound(String),
    /// The history fetch failed and there is no earlier series to keep.
    Failed(String),
}

/// Main application state.
pub struct App {
    pub running: bool,
    pub current_view: View,
    pub show_help: bool,

    // Data source
    source: Box<dyn DataSource>,
    pub health: Option<SystemHealthData>,
    pub inventory: Option<PinInventory>,
    pub velocity: VelocityState,
    pub history: History,
    /// Last error per fetch kind; cleared by the next success of that kind.
    pub fetch_errors: HashMap<FetchKind, String>,
    /// Set once the source stops delivering events.
    pub load_error: Option<String>,
    pub thresholds: Thresholds,

    // Navigation state
    pub selected_pin_index: usize,
    pub selected_pin_id: Option<String>,

    // Sorting (Pins view)
    pub sort_column: SortColumn,
    pub sort_ascending: bool,

    // Search/filter
    pub filter_text: String,
    pub filter_active: bool,

    // UI
    pub theme: Theme,

    // Status message (temporary feedback)
    pub status_message: Option<(String, std::time::Instant)>,
}

impl App {
    /// Create a new App with the given data source and thresholds.
    pub fn new(source: Box<dyn DataSource>, thresholds: Thresholds) -> Self {
        Self::with_theme(source, thresholds, Theme::auto_detect())
    }

    /// Create a new App with an explicit theme (skips terminal detection).
    pub fn with_theme(source: Box<dyn DataSource>, thresholds: Thresholds, theme: Theme) -> Self {
        Self {
            running: true,
            current_view: View::Health,
            show_help: false,
            source,
            health: None,
            inventory: None,
            velocity: VelocityState::Idle,
            history: History::new(),
            fetch_errors: HashMap::new(),
            load_error: None,
            thresholds,
            selected_pin_index: 0,
            selected_pin_id: None,
            sort_column: SortColumn::default(),
            sort_ascending: true,
            filter_text: String::new(),
            filter_active: false,
            theme,
            status_message: None,
        }
    }

    /// Returns a description of the current data source.
    pub fn source_description(&self) -> &str {
        self.source.description()
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, std::time::Instant::now()));
    }

    /// Get the current status message if it hasn't expired (3 seconds).
    pub fn get_status_message(&self) -> Option<&str> {
        if let Some((msg, time)) = &self.status_message {
            if time.elapsed() < std::time::Duration::from_secs(3) {
                return Some(msg);
            }
        }
        None
    }

    /// The error to show in the status bar, most important first.
    pub fn current_error(&self) -> Option<(&'static str, &str)> {
        if let Some(err) = &self.load_error {
            return Some(("source", err));
        }
        [FetchKind::Health, FetchKind::Pins, FetchKind::History]
            .into_iter()
            .find_map(|kind| self.fetch_errors.get(&kind).map(|e| (kind.label(), e.as_str())))
    }

    /// Drain every pending event from the data source.
    ///
    /// Returns true if anything new was applied.
    pub fn reload_data(&mut self) -> bool {
        let mut changed = false;

        while let Some(event) = self.source.poll() {
            self.apply_event(event);
            changed = true;
        }

        if let Some(err) = self.source.error() {
            self.load_error = Some(err.to_string());
        }

        changed
    }

    /// Apply one poll result. Failures keep the previous data.
    pub fn apply_event(&mut self, event: PollEvent) {
        match event {
            PollEvent::Health {
                cycle,
                buffer_count,
                fetched_at,
            } => {
                let health =
                    SystemHealthData::from_fetch(cycle, buffer_count, fetched_at, &self.thresholds);
                self.history.record(&health);
                self.health = Some(health);
                self.fetch_errors.remove(&FetchKind::Health);
            }
            PollEvent::Pins { pins, fetched_at } => {
                self.inventory = Some(PinInventory::new(pins, fetched_at));
                self.fetch_errors.remove(&FetchKind::Pins);
                self.clamp_selection();
            }
            PollEvent::History { pin_id, found } => {
                // A response for a pin that is no longer selected is dropped.
                if self.selected_pin_id.as_deref() != Some(pin_id.as_str()) {
                    return;
                }
                self.velocity = match found {
                    Some((pin, history)) => {
                        VelocityState::Loaded(VelocitySeries::from_store(pin, history))
                    }
                    None => VelocityState::NotFound(pin_id),
                };
                self.fetch_errors.remove(&FetchKind::History);
            }
            PollEvent::Failed {
                kind,
                pin_id,
                error,
            } => {
                if kind == FetchKind::History
                    && pin_id.is_some()
                    && self.selected_pin_id != pin_id
                {
                    return;
                }
                if kind == FetchKind::History {
                    if let VelocityState::Loading(_) = self.velocity {
                        self.velocity = VelocityState::Failed(error.clone());
                    }
                }
                self.fetch_errors.insert(kind, error);
            }
        }
    }

    /// Ask the source for an immediate refresh.
    pub fn request_refresh(&mut self) {
        self.source.refresh();
        self.set_status_message("Refreshing...".to_string());
    }

    /// Switch to the next view.
    pub fn next_view(&mut self) {
        self.current_view = self.current_view.next();
    }

    /// Switch to the previous view.
    pub fn prev_view(&mut self) {
        self.current_view = self.current_view.prev();
    }

    /// Switch to a specific view.
    pub fn set_view(&mut self, view: View) {
        self.current_view = view;
    }

    /// Pins matching the filter, annotated at `now` and sorted for display.
    pub fn visible_pins(&self, now: Timestamp) -> Vec<PinRow<'_>> {
        let Some(ref inventory) = self.inventory else {
            return Vec::new();
        };
        let mut rows = inventory.rows(&self.filter_text, now, &self.thresholds);
        sort_rows_by(&mut rows, self.sort_column, self.sort_ascending);
        rows
    }

    fn filtered_pin_count(&self) -> usize {
        self.inventory
            .as_ref()
            .map_or(0, |inv| inv.count_matching(&self.filter_text))
    }

    fn clamp_selection(&mut self) {
        let count = self.filtered_pin_count();
        if self.selected_pin_index >= count {
            self.selected_pin_index = count.saturating_sub(1);
        }
    }

    /// Move selection down by one item.
    pub fn select_next(&mut self) {
        self.select_next_n(1);
    }

    /// Move selection up by one item.
    pub fn select_prev(&mut self) {
        self.select_prev_n(1);
    }

    /// Move selection down by n items.
    pub fn select_next_n(&mut self, n: usize) {
        if self.current_view == View::Pins {
            let max = self.filtered_pin_count().saturating_sub(1);
            self.selected_pin_index = (self.selected_pin_index + n).min(max);
        }
    }

    /// Move selection up by n items.
    pub fn select_prev_n(&mut self, n: usize) {
        if self.current_view == View::Pins {
            self.selected_pin_index = self.selected_pin_index.saturating_sub(n);
        }
    }

    /// Jump to the first item in the list.
    pub fn select_first(&mut self) {
        self.selected_pin_index = 0;
    }

    /// Jump to the last item in the list.
    pub fn select_last(&mut self) {
        if self.current_view == View::Pins {
            self.selected_pin_index = self.filtered_pin_count().saturating_sub(1);
        }
    }

    /// Open the velocity chart for the highlighted pin.
    ///
    /// The visual row depends on sorting, which depends on `now` when
    /// sorting by freshness.
    pub fn select_current_pin(&mut self, now: Timestamp) {
        let pin_id = self
            .visible_pins(now)
            .get(self.selected_pin_index)
            .map(|row| row.pin.pin_id.clone());

        let Some(pin_id) = pin_id else {
            return;
        };

        self.select_pin(pin_id);
        self.current_view = View::Velocity;
    }

    /// Select a pin by id and request its history.
    pub fn select_pin(&mut self, pin_id: String) {
        let unchanged = self.selected_pin_id.as_deref() == Some(pin_id.as_str());
        if unchanged && !matches!(self.velocity, VelocityState::Failed(_)) {
            return;
        }

        if unchanged {
            // Same pin after a failure: clear it first so the source refetches.
            self.source.select_pin(None);
        }

        self.velocity = VelocityState::Loading(pin_id.clone());
        self.selected_pin_id = Some(pin_id.clone());
        self.source.select_pin(Some(pin_id));
    }

    /// Drop the pin selection.
    pub fn clear_selection(&mut self) {
        self.selected_pin_id = None;
        self.velocity = VelocityState::Idle;
        self.source.select_pin(None);
    }

    /// Navigate back: close the velocity chart, then return to Health.
    pub fn go_back(&mut self) {
        match self.current_view {
            View::Velocity => self.current_view = View::Pins,
            View::Pins => self.current_view = View::Health,
            View::Health => {}
        }
    }

    /// Toggle the help overlay.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Cycle to the next sort column.
    pub fn cycle_sort(&mut self) {
        if self.current_view == View::Pins {
            self.sort_column = self.sort_column.next();
        }
    }

    /// Toggle sort direction between ascending and descending.
    pub fn toggle_sort_direction(&mut self) {
        if self.current_view == View::Pins {
            self.sort_ascending = !self.sort_ascending;
        }
    }

    /// Enter filter input mode (starts capturing keystrokes for search).
    pub fn start_filter(&mut self) {
        self.filter_active = true;
        self.current_view = View::Pins;
    }

    /// Exit filter input mode without clearing the filter text.
    pub fn cancel_filter(&mut self) {
        self.filter_active = false;
    }

    /// Clear the filter text and exit filter mode.
    pub fn clear_filter(&mut self) {
        self.filter_text.clear();
        self.filter_active = false;
    }

    /// Append a character to the filter text.
    pub fn filter_push(&mut self, c: char) {
        self.filter_text.push(c);
        self.selected_pin_index = 0;
    }

    /// Remove the last character from the filter text.
    pub fn filter_pop(&mut self) {
        self.filter_text.pop();
        self.selected_pin_index = 0;
    }

    /// Signal the application to quit.
    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Export the current state, evaluated at `now`, to a JSON file.
    pub fn export_state(&self, path: &Path, now: Timestamp) -> Result<()> {
        if self.health.is_none() && self.inventory.is_none() {
            anyhow::bail!("No data to export");
        }

        let report = build_report(
            self.health.as_ref(),
            self.inventory.as_ref(),
            &self.thresholds,
            now,
        )?;

        write_report(path, &report)
    }
}

/// Build the JSON report of the health view and every pin's freshness.
///
/// Every label in the report is evaluated at the same `now`.
pub fn build_report(
    health: Option<&SystemHealthData>,
    inventory: Option<&PinInventory>,
    thresholds: &Thresholds,
    now: Timestamp,
) -> Result<serde_json::Value, EvalError> {
    let mut export = serde_json::Map::new();
    export.insert("generated_at".to_string(), serde_json::json!(now.to_rfc3339()));

    if let Some(health) = health {
        let cycle = health.latest_cycle.as_ref().map(|c| {
            serde_json::json!({
                "cycle_id": c.cycle_id,
                "status": c.status.as_str(),
                "started_at": c.started_at.to_rfc3339(),
                "ended_at": c.ended_at.map(|t| t.to_rfc3339()),
                "records_processed": c.records_processed,
            })
        });

        let is_zombie = health
            .latest_cycle
            .as_ref()
            .is_some_and(|c| thresholds.is_zombie(c, now));
        let state = health.cycle_state(now, thresholds);

        export.insert(
            "health".to_string(),
            serde_json::json!({
                "state": state.label(),
                "is_zombie": is_zombie,
                "latest_cycle": cycle,
                "buffer_count": health.buffer_count,
                "buffer_ratio": thresholds.buffer_ratio(health.buffer_count)?,
                "last_updated": health.last_updated.to_rfc3339(),
            }),
        );
    }

    if let Some(inventory) = inventory {
        let pins: Vec<serde_json::Value> = inventory
            .rows("", now, thresholds)
            .iter()
            .map(|row| {
                serde_json::json!({
                    "pin_id": row.pin.pin_id,
                    "title": row.pin.title,
                    "status": row.pin.current_status.as_str(),
                    "last_synced_at": row.pin.last_synced_at.to_rfc3339(),
                    "freshness": row.freshness.label(),
                })
            })
            .collect();

        export.insert(
            "summary".to_string(),
            serde_json::json!({
                "total_pins": inventory.pins.len(),
                "stale_pins": inventory.stale_count(now, thresholds),
            }),
        );
        export.insert("pins".to_string(), serde_json::Value::Array(pins));
    }

    Ok(serde_json::Value::Object(export))
}

/// Write a report as pretty-printed JSON.
pub fn write_report(path: &Path, report: &serde_json::Value) -> Result<()> {
    use std::io::Write;

    let json = serde_json::to_string_pretty(report)?;
    let mut file = std::fs::File::create(path)?;
    file.write_all(json.as_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone, Utc};
    use eltwatch_types::{ActivePin, IngestionCycle, PinStatus};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Source that replays queued events and records pin selections.
    #[derive(Debug, Default)]
    struct ScriptedSource {
        events: VecDeque<PollEvent>,
        selections: Arc<Mutex<Vec<Option<String>>>>,
    }

    impl DataSource for ScriptedSource {
        fn poll(&mut self) -> Option<PollEvent> {
            self.events.pop_front()
        }

        fn description(&self) -> &str {
            "scripted"
        }

        fn select_pin(&mut self, pin_id: Option<String>) {
            self.selections.lock().unwrap().push(pin_id);
        }

        fn refresh(&mut self) {}

        fn error(&self) -> Option<&str> {
            None
        }
    }

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn pin(id: &str, title: &str, synced_hours_ago: i64) -> ActivePin {
        ActivePin {
            pin_id: id.to_string(),
            title: title.to_string(),
            image_url: String::new(),
            current_status: PinStatus::Active,
            last_synced_at: now() - TimeDelta::hours(synced_hours_ago),
            created_at: now() - TimeDelta::days(30),
        }
    }

    fn app_with(events: Vec<PollEvent>) -> (App, Arc<Mutex<Vec<Option<String>>>>) {
        let source = ScriptedSource {
            events: events.into(),
            ..Default::default()
        };
        let selections = source.selections.clone();
        let app = App::with_theme(Box::new(source), Thresholds::default(), Theme::dark());
        (app, selections)
    }

    fn pins_event() -> PollEvent {
        PollEvent::Pins {
            pins: vec![
                pin("1029384756", "Minimalist Loft", 2),
                pin("9283746152", "Meal Prep", 30),
                pin("5566778899", "Forest Architecture", 1),
            ],
            fetched_at: now(),
        }
    }

    #[test]
    fn test_view_cycle() {
        assert_eq!(View::Health.next(), View::Pins);
        assert_eq!(View::Velocity.next(), View::Health);
        assert_eq!(View::Health.prev(), View::Velocity);
        assert_eq!(View::Pins.label(), "Pins");
    }

    #[test]
    fn test_reload_applies_health_and_pins() {
        let cycle = IngestionCycle::running("c-1", now() - TimeDelta::minutes(12));
        let (mut app, _) = app_with(vec![
            PollEvent::Health {
                cycle: Some(cycle),
                buffer_count: 842,
                fetched_at: now(),
            },
            pins_event(),
        ]);

        assert!(app.reload_data());
        let health = app.health.as_ref().unwrap();
        assert!(health.is_zombie);
        assert_eq!(health.cycle_state(now(), &app.thresholds).label(), "CICLO ZOMBIE");
        assert_eq!(app.inventory.as_ref().unwrap().pins.len(), 3);
        assert_eq!(app.history.len(), 1);

        assert!(!app.reload_data());
    }

    #[test]
    fn test_failure_keeps_last_good_data() {
        let (mut app, _) = app_with(vec![
            pins_event(),
            PollEvent::Failed {
                kind: FetchKind::Pins,
                pin_id: None,
                error: "Request timed out".to_string(),
            },
        ]);

        app.reload_data();
        assert_eq!(app.inventory.as_ref().unwrap().pins.len(), 3);
        assert_eq!(app.current_error(), Some(("pins", "Request timed out")));

        app.apply_event(pins_event());
        assert_eq!(app.current_error(), None);
    }

    #[test]
    fn test_selecting_pin_requests_history() {
        let (mut app, selections) = app_with(vec![pins_event()]);
        app.reload_data();
        app.set_view(View::Pins);

        // Default sort is by title: Forest, Meal, Minimalist.
        app.select_next();
        app.select_current_pin(now());

        assert_eq!(app.current_view, View::Velocity);
        assert_eq!(app.selected_pin_id.as_deref(), Some("9283746152"));
        assert_eq!(app.velocity, VelocityState::Loading("9283746152".to_string()));
        assert_eq!(
            selections.lock().unwrap().as_slice(),
            &[Some("9283746152".to_string())]
        );
    }

    #[test]
    fn test_history_for_other_pin_is_ignored() {
        let (mut app, _) = app_with(vec![]);
        app.select_pin("1029384756".to_string());

        app.apply_event(PollEvent::History {
            pin_id: "5566778899".to_string(),
            found: Some((pin("5566778899", "Forest", 1), Vec::new())),
        });
        assert_eq!(app.velocity, VelocityState::Loading("1029384756".to_string()));

        app.apply_event(PollEvent::History {
            pin_id: "1029384756".to_string(),
            found: None,
        });
        assert_eq!(app.velocity, VelocityState::NotFound("1029384756".to_string()));
    }

    #[test]
    fn test_history_failure_for_other_pin_is_ignored() {
        let (mut app, _) = app_with(vec![]);
        app.select_pin("1029384756".to_string());
        app.select_pin("5566778899".to_string());

        // The first pin's fetch failed before the selection moved on.
        app.apply_event(PollEvent::Failed {
            kind: FetchKind::History,
            pin_id: Some("1029384756".to_string()),
            error: "Connection failed: refused".to_string(),
        });

        assert_eq!(app.velocity, VelocityState::Loading("5566778899".to_string()));
        assert_eq!(app.current_error(), None);
    }

    #[test]
    fn test_history_failure_then_retry() {
        let (mut app, selections) = app_with(vec![]);
        app.select_pin("1029384756".to_string());
        app.apply_event(PollEvent::Failed {
            kind: FetchKind::History,
            pin_id: Some("1029384756".to_string()),
            error: "Connection failed: refused".to_string(),
        });
        assert!(matches!(app.velocity, VelocityState::Failed(_)));

        app.select_pin("1029384756".to_string());
        assert_eq!(app.velocity, VelocityState::Loading("1029384756".to_string()));
        assert_eq!(
            selections.lock().unwrap().as_slice(),
            &[
                Some("1029384756".to_string()),
                None,
                Some("1029384756".to_string())
            ]
        );
    }

    #[test]
    fn test_loaded_history_is_chronological() {
        let (mut app, _) = app_with(vec![]);
        let (pin, history) = crate::source::mock_fixture(now())
            .pin_with_history("1029384756")
            .unwrap();

        app.select_pin(pin.pin_id.clone());
        app.apply_event(PollEvent::History {
            pin_id: pin.pin_id.clone(),
            found: Some((pin, history)),
        });

        let VelocityState::Loaded(series) = &app.velocity else {
            panic!("expected loaded series");
        };
        assert_eq!(series.points.len(), 11);
        assert!(series.points[0].recorded_at < series.points[10].recorded_at);
    }

    #[test]
    fn test_filter_and_selection_clamp() {
        let (mut app, _) = app_with(vec![pins_event()]);
        app.reload_data();
        app.set_view(View::Pins);
        app.select_last();
        assert_eq!(app.selected_pin_index, 2);

        app.start_filter();
        for c in "meal".chars() {
            app.filter_push(c);
        }
        assert_eq!(app.selected_pin_index, 0);
        assert_eq!(app.visible_pins(now()).len(), 1);

        app.select_next();
        assert_eq!(app.selected_pin_index, 0);

        app.clear_filter();
        assert_eq!(app.visible_pins(now()).len(), 3);
    }

    #[test]
    fn test_filter_matching_nothing() {
        let (mut app, _) = app_with(vec![pins_event()]);
        app.reload_data();
        app.set_view(View::Pins);
        for c in "zzz".chars() {
            app.filter_push(c);
        }

        assert!(app.visible_pins(now()).is_empty());
        app.select_current_pin(now());
        assert_eq!(app.current_view, View::Pins);
        assert!(app.selected_pin_id.is_none());
    }

    #[test]
    fn test_go_back() {
        let (mut app, _) = app_with(vec![]);
        app.set_view(View::Velocity);
        app.go_back();
        assert_eq!(app.current_view, View::Pins);
        app.go_back();
        assert_eq!(app.current_view, View::Health);
        app.go_back();
        assert_eq!(app.current_view, View::Health);
    }

    #[test]
    fn test_export_without_data_fails() {
        let (app, _) = app_with(vec![]);
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(app.export_state(file.path(), now()).is_err());
    }

    #[test]
    fn test_export_state() {
        let cycle = IngestionCycle::running("c-1", now() - TimeDelta::minutes(5));
        let (mut app, _) = app_with(vec![
            PollEvent::Health {
                cycle: Some(cycle),
                buffer_count: 500,
                fetched_at: now(),
            },
            pins_event(),
        ]);
        app.reload_data();

        let file = tempfile::NamedTempFile::new().unwrap();
        app.export_state(file.path(), now()).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let report: serde_json::Value = serde_json::from_str(&content).unwrap();

        assert_eq!(report["health"]["state"], "RUNNING");
        assert_eq!(report["health"]["is_zombie"], false);
        assert_eq!(report["health"]["buffer_ratio"], 0.25);
        assert_eq!(report["summary"]["stale_pins"], 1);
        assert_eq!(report["pins"][1]["freshness"], "STALE DATA");
    }

    #[test]
    fn test_report_reevaluates_at_now() {
        let cycle = IngestionCycle::running("c-1", now() - TimeDelta::minutes(5));
        let health = SystemHealthData::from_fetch(Some(cycle), 0, now(), &Thresholds::default());

        let later = now() + TimeDelta::minutes(10);
        let report = build_report(Some(&health), None, &Thresholds::default(), later).unwrap();

        assert_eq!(report["health"]["state"], "CICLO ZOMBIE");
        assert_eq!(report["health"]["is_zombie"], true);
        assert!(report.get("pins").is_none());
    }
}
