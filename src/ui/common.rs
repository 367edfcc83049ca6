//! Common UI components shared across views.
//!
//! This module contains the header bar, tab bar, status bar, and help overlay.

use chrono::Utc;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use crate::app::{App, View};
use crate::data::duration::format_age;
use crate::data::HealthStatus;

/// Sparkline characters (8 levels of height).
const SPARKLINE_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Render the header bar with the pipeline overview.
///
/// Displays: overall status, cycle state, buffer fill, pin counts.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let now = Utc::now();

    let Some(ref health) = app.health else {
        let line = Line::from(vec![
            Span::styled(" ELTWATCH ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("| Loading..."),
        ]);
        frame.render_widget(Paragraph::new(line), area);
        return;
    };

    let cycle_state = health.cycle_state(now, &app.thresholds);
    let buffer_status = app.thresholds.buffer_status(health.buffer_count);

    let (total_pins, stale_pins) = app.inventory.as_ref().map_or((0, 0), |inv| {
        (inv.pins.len(), inv.stale_count(now, &app.thresholds))
    });
    let pins_status = if stale_pins > 0 {
        HealthStatus::Warning
    } else {
        HealthStatus::Healthy
    };

    let overall = cycle_state.status().max(buffer_status).max(pins_status);

    let line = Line::from(vec![
        Span::styled(" ● ", app.theme.status_style(overall)),
        Span::styled("ELTWATCH ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("│ cycle "),
        Span::styled(cycle_state.label(), app.theme.status_style(cycle_state.status())),
        Span::raw(" │ buffer "),
        Span::styled(
            format_count(health.buffer_count),
            app.theme.status_style(buffer_status),
        ),
        Span::raw(" │ "),
        Span::styled(
            format!("{}", total_pins),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" pins "),
        if stale_pins > 0 {
            Span::styled(
                format!("{}", stale_pins),
                Style::default().fg(app.theme.warning),
            )
        } else {
            Span::styled("0", Style::default().add_modifier(Modifier::DIM))
        },
        Span::raw(" stale"),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

/// Format a count for display (e.g., 1234 -> "1.2K", 1234567 -> "1.2M").
pub fn format_count(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

/// Render 0-7 levels as block characters, keeping the last `width` values.
pub fn render_sparkline(data: &[u8], width: usize) -> String {
    if data.is_empty() {
        return " ".repeat(width);
    }

    let skip = data.len().saturating_sub(width);
    data[skip..]
        .iter()
        .map(|&v| SPARKLINE_CHARS[v.min(7) as usize])
        .collect()
}

/// Render the tab bar showing available views.
///
/// Highlights the currently active view.
pub fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = vec![
        Line::from(" 1:Health "),
        Line::from(" 2:Pins "),
        Line::from(" 3:Velocity "),
    ];

    let selected = match app.current_view {
        View::Health => 0,
        View::Pins => 1,
        View::Velocity => 2,
    };

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(app.theme.tab_inactive)
        .highlight_style(app.theme.tab_active)
        .divider("|");

    frame.render_widget(tabs, area);
}

/// Render the status bar at the bottom.
///
/// Shows the fetch error indicator when the last fetch of some kind failed,
/// otherwise the source, time since last update and available controls.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    if let Some((what, err)) = app.current_error() {
        let retained = if app.health.is_some() || app.inventory.is_some() {
            " (showing last data)"
        } else {
            ""
        };
        let paragraph = Paragraph::new(format!(" ⚠ {}: {}{} | r:retry q:quit", what, err, retained))
            .style(app.theme.status_style(HealthStatus::Critical));
        frame.render_widget(paragraph, area);
        return;
    }

    let controls = match app.current_view {
        View::Health => "Tab:switch r:refresh e:export ?:help q:quit",
        View::Pins => {
            if app.filter_active {
                "Type to search | Enter:apply Esc:cancel"
            } else {
                "/:search s:sort Enter:velocity ?:help q:quit"
            }
        }
        View::Velocity => "Esc:back x:clear r:refresh ?:help q:quit",
    };

    let status = match app.health {
        Some(ref health) => {
            let age = Utc::now().signed_duration_since(health.last_updated);
            format!(
                " {} | Updated {} | {}",
                app.source_description(),
                format_age(age),
                controls
            )
        }
        None => format!(" {} | Loading... | q:quit", app.source_description()),
    };

    let paragraph = Paragraph::new(status).style(Style::default().add_modifier(Modifier::DIM));

    frame.render_widget(paragraph, area);
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the current view.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        Line::from(vec![Span::styled(
            " Navigation",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  1/2/3       Health / Pins / Velocity"),
        Line::from("  ←/→ h/l     Switch views"),
        Line::from("  ↑/↓ j/k     Navigate list"),
        Line::from("  PgUp/PgDn   Jump 10 items"),
        Line::from("  Enter       Open pin velocity"),
        Line::from("  Esc         Go back"),
        Line::from(""),
        Line::from(vec![Span::styled(
            " Pins",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  /         Search title or pin id"),
        Line::from("  c         Clear search"),
        Line::from("  s         Cycle sort column"),
        Line::from("  S         Toggle sort direction"),
        Line::from("  x         Clear pin selection"),
        Line::from(""),
        Line::from(vec![Span::styled(
            " General",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  r         Refresh now"),
        Line::from("  e         Export to JSON"),
        Line::from("  q         Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let paragraph = Paragraph::new(help_text).block(block);

    let help_width = 44u16.min(area.width.saturating_sub(4));
    let help_height = 26u16.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(help_width)) / 2;
    let y = area.y + (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    frame.render_widget(ratatui::widgets::Clear, help_area);
    frame.render_widget(paragraph, help_area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(842), "842");
        assert_eq!(format_count(1250), "1.2K");
        assert_eq!(format_count(2_500_000), "2.5M");
    }

    #[test]
    fn test_render_sparkline() {
        assert_eq!(render_sparkline(&[], 3), "   ");
        assert_eq!(render_sparkline(&[0, 7, 3], 8), "▁█▄");
        assert_eq!(render_sparkline(&[0, 1, 2, 3], 2), "▃▄");
        assert_eq!(render_sparkline(&[9], 1), "█");
    }
}
