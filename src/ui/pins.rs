//! Pins view rendering.
//!
//! Displays every tracked pin with its sync age and freshness label. The
//! table is filtered by the search text and sorted by the chosen column.

use chrono::Utc;
use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::app::App;
use crate::data::duration::format_age;
use crate::data::PinRow;
use eltwatch_types::PinStatus;

/// Column to sort by in the Pins view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    #[default]
    Title,
    /// Sort by last sync time.
    LastSync,
    /// Sort by freshness label (stale last when ascending).
    Freshness,
}

impl SortColumn {
    /// Cycle to the next sort column.
    pub fn next(self) -> Self {
        match self {
            SortColumn::Title => SortColumn::LastSync,
            SortColumn::LastSync => SortColumn::Freshness,
            SortColumn::Freshness => SortColumn::Title,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortColumn::Title => "title",
            SortColumn::LastSync => "synced",
            SortColumn::Freshness => "freshness",
        }
    }
}

/// Render the Pins view.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    let Some(ref inventory) = app.inventory else {
        let paragraph = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "  Loading pins...",
                Style::default().add_modifier(Modifier::DIM),
            )),
        ])
        .block(block.title(" Pins "));
        frame.render_widget(paragraph, area);
        return;
    };

    let now = Utc::now();
    let rows = app.visible_pins(now);

    let filter_info = if app.filter_active {
        format!(" /{}_", app.filter_text)
    } else if !app.filter_text.is_empty() {
        format!(" /{}/ [c:clear]", app.filter_text)
    } else {
        String::new()
    };

    let selected_visual_index = app.selected_pin_index.min(rows.len().saturating_sub(1));
    let position_info = if !rows.is_empty() {
        format!(" [{}/{}]", selected_visual_index + 1, rows.len())
    } else {
        String::new()
    };

    let sort_dir = if app.sort_ascending { "↑" } else { "↓" };
    let title = format!(
        " Pins ({}/{}) [s:sort {}{}]{}{} ",
        rows.len(),
        inventory.pins.len(),
        app.sort_column.label(),
        sort_dir,
        filter_info,
        position_info
    );
    let block = block.title(title);

    if rows.is_empty() {
        let message = if inventory.pins.is_empty() {
            "  No pins tracked yet"
        } else {
            "  No pins match the search"
        };
        let paragraph = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(message, Style::default().add_modifier(Modifier::DIM))),
        ])
        .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let header = Row::new(vec![
        Cell::from("Pin"),
        Cell::from(format_header("Title", SortColumn::Title, app)),
        Cell::from("Status"),
        Cell::from(format_header("Synced", SortColumn::LastSync, app)),
        Cell::from(format_header("Freshness", SortColumn::Freshness, app)),
    ])
    .height(1)
    .style(app.theme.header);

    let table_rows: Vec<Row> = rows
        .iter()
        .map(|row| {
            let marker = if app.selected_pin_id.as_deref() == Some(row.pin.pin_id.as_str()) {
                "*"
            } else {
                " "
            };
            let status_style = match row.pin.current_status {
                PinStatus::Active => Style::default(),
                PinStatus::Deleted => Style::default().add_modifier(Modifier::DIM),
            };

            Row::new(vec![
                Cell::from(format!("{}{}", marker, row.pin.pin_id)),
                Cell::from(row.pin.title.clone()),
                Cell::from(row.pin.current_status.as_str()).style(status_style),
                Cell::from(format_age(row.age)),
                Cell::from(row.freshness.label())
                    .style(app.theme.status_style(row.freshness.status())),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(12), // Pin id
        Constraint::Fill(3),    // Title
        Constraint::Length(8),  // Status
        Constraint::Length(10), // Synced
        Constraint::Length(11), // Freshness
    ];

    let table = Table::new(table_rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select(Some(selected_visual_index));

    frame.render_stateful_widget(table, area, &mut state);
}

fn format_header(name: &str, col: SortColumn, app: &App) -> Span<'static> {
    if app.sort_column == col {
        let arrow = if app.sort_ascending { "↑" } else { "↓" };
        Span::raw(format!("{}{}", name, arrow))
    } else {
        Span::raw(name.to_string())
    }
}

/// Sort pin rows by the given column and direction.
pub fn sort_rows_by(rows: &mut [PinRow<'_>], column: SortColumn, ascending: bool) {
    rows.sort_by(|a, b| {
        let primary = match column {
            SortColumn::Title => a.pin.title.to_lowercase().cmp(&b.pin.title.to_lowercase()),
            SortColumn::LastSync => a.pin.last_synced_at.cmp(&b.pin.last_synced_at),
            SortColumn::Freshness => a.freshness.cmp(&b.freshness),
        };

        let primary = if ascending {
            primary
        } else {
            primary.reverse()
        };

        // Secondary sort by pin id for stability when primary values are equal
        if primary == std::cmp::Ordering::Equal {
            a.pin.pin_id.cmp(&b.pin.pin_id)
        } else {
            primary
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Freshness, Thresholds};
    use chrono::{TimeDelta, TimeZone};
    use eltwatch_types::{ActivePin, Timestamp};

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
            created_at: now() - TimeDelta::days(5),
        }
    }

    fn rows(pins: &[ActivePin]) -> Vec<PinRow<'_>> {
        let thresholds = Thresholds::default();
        pins.iter()
            .map(|p| PinRow {
                pin: p,
                freshness: Freshness::evaluate(p.last_synced_at, now(), &thresholds),
                age: now().signed_duration_since(p.last_synced_at),
            })
            .collect()
    }

    fn ids(rows: &[PinRow<'_>]) -> Vec<String> {
        rows.iter().map(|r| r.pin.pin_id.clone()).collect()
    }

    #[test]
    fn test_sort_column_cycle() {
        assert_eq!(SortColumn::Title.next(), SortColumn::LastSync);
        assert_eq!(SortColumn::Freshness.next(), SortColumn::Title);
    }

    #[test]
    fn test_sort_by_title_ignores_case() {
        let pins = vec![pin("1", "loft", 1), pin("2", "Forest", 1), pin("3", "meal", 1)];
        let mut r = rows(&pins);
        sort_rows_by(&mut r, SortColumn::Title, true);
        assert_eq!(ids(&r), vec!["2", "1", "3"]);

        sort_rows_by(&mut r, SortColumn::Title, false);
        assert_eq!(ids(&r), vec!["3", "1", "2"]);
    }

    #[test]
    fn test_sort_by_last_sync() {
        let pins = vec![pin("1", "a", 5), pin("2", "b", 30), pin("3", "c", 1)];
        let mut r = rows(&pins);
        sort_rows_by(&mut r, SortColumn::LastSync, true);
        assert_eq!(ids(&r), vec!["2", "1", "3"]);
    }

    #[test]
    fn test_sort_by_freshness_puts_stale_last() {
        let pins = vec![pin("1", "a", 30), pin("2", "b", 2), pin("3", "c", 48)];
        let mut r = rows(&pins);
        sort_rows_by(&mut r, SortColumn::Freshness, true);
        assert_eq!(ids(&r), vec!["2", "1", "3"]);
        assert_eq!(r[2].freshness.label(), "STALE DATA");
    }
}
