//! Health view rendering.
//!
//! Shows the latest ingestion cycle with its state badge, the zombie alert
//! when the cycle is stuck, and the raw buffer saturation gauge with its
//! recent trend.

use chrono::Utc;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};

use crate::app::App;
use crate::data::duration::{format_age, format_duration};
use crate::data::{CycleState, SystemHealthData};
use crate::ui::common::{format_count, render_sparkline};

/// Render the Health view.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let Some(ref health) = app.health else {
        let block = panel(app, " System Health ");
        let text = if app.current_error().is_some() {
            "  Waiting for the first successful fetch..."
        } else {
            "  Loading..."
        };
        let paragraph = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(text, Style::default().add_modifier(Modifier::DIM))),
        ])
        .block(block);
        frame.render_widget(paragraph, area);
        return;
    };

    let chunks = Layout::vertical([
        Constraint::Min(8),    // Cycle
        Constraint::Length(3), // Buffer gauge
        Constraint::Length(3), // Buffer trend
    ])
    .split(area);

    render_cycle(frame, app, health, chunks[0]);
    render_buffer_gauge(frame, app, health, chunks[1]);
    render_buffer_trend(frame, app, health, chunks[2]);
}

fn panel<'a>(app: &App, title: &'a str) -> Block<'a> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border))
}

fn render_cycle(frame: &mut Frame, app: &App, health: &SystemHealthData, area: Rect) {
    let now = Utc::now();
    let state = health.cycle_state(now, &app.thresholds);
    let bold = Style::default().add_modifier(Modifier::BOLD);

    let mut lines = vec![Line::from(vec![
        Span::raw(" State: "),
        Span::styled(format!(" {} ", state.label()), app.theme.badge_style(state.status())),
    ])];

    match &health.latest_cycle {
        None => {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "  No ingestion cycles recorded yet",
                Style::default().add_modifier(Modifier::DIM),
            )));
        }
        Some(cycle) => {
            if state == CycleState::Zombie {
                let limit = app
                    .thresholds
                    .zombie_after
                    .to_std()
                    .map(format_duration)
                    .unwrap_or_default();
                lines.push(Line::from(Span::styled(
                    format!(
                        " CICLO ZOMBIE: running since {}, limit {} ",
                        format_age(now.signed_duration_since(cycle.started_at)),
                        limit
                    ),
                    app.theme.alert,
                )));
            }

            lines.push(Line::from(""));
            lines.push(Line::from(vec![
                Span::raw(" Cycle:     "),
                Span::styled(cycle.cycle_id.clone(), bold),
            ]));
            lines.push(Line::from(vec![
                Span::raw(" Started:   "),
                Span::raw(format!(
                    "{} ({})",
                    cycle.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
                    format_age(now.signed_duration_since(cycle.started_at))
                )),
            ]));

            let runtime = health
                .cycle_runtime(now)
                .and_then(|d| d.to_std().ok())
                .map(format_duration)
                .unwrap_or_else(|| "-".to_string());
            let ended = cycle
                .ended_at
                .map(|t| t.format("%H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "-".to_string());
            lines.push(Line::from(format!(" Runtime:   {}    Ended: {}", runtime, ended)));

            let rate = app
                .history
                .records_rate()
                .map(|r| format!("{:.1}/s", r))
                .unwrap_or_else(|| "-".to_string());
            lines.push(Line::from(vec![
                Span::raw(" Records:   "),
                Span::styled(format_count(health.records_processed()), bold),
                Span::raw(format!("    Rate: {}", rate)),
            ]));
        }
    }

    let paragraph = Paragraph::new(lines).block(panel(app, " Latest Ingestion Cycle "));
    frame.render_widget(paragraph, area);
}

fn render_buffer_gauge(frame: &mut Frame, app: &App, health: &SystemHealthData, area: Rect) {
    let block = panel(app, " Raw Buffer ");

    match app.thresholds.buffer_ratio(health.buffer_count) {
        Ok(ratio) => {
            let status = app.thresholds.buffer_status(health.buffer_count);
            let gauge = Gauge::default()
                .block(block)
                .gauge_style(app.theme.status_style(status))
                .ratio(ratio)
                .label(format!(
                    "{} / {} ({:.0}%)",
                    health.buffer_count,
                    app.thresholds.buffer_capacity,
                    ratio * 100.0
                ));
            frame.render_widget(gauge, area);
        }
        Err(e) => {
            let paragraph = Paragraph::new(format!(" {}", e))
                .style(app.theme.status_style(crate::data::HealthStatus::Critical))
                .block(block);
            frame.render_widget(paragraph, area);
        }
    }
}

fn render_buffer_trend(frame: &mut Frame, app: &App, health: &SystemHealthData, area: Rect) {
    let width = area.width.saturating_sub(30).max(8) as usize;
    let sparkline = render_sparkline(&app.history.buffer_sparkline(), width);

    let line = Line::from(vec![
        Span::raw(" "),
        Span::styled(sparkline, Style::default().fg(app.theme.highlight)),
        Span::raw(format!(
            "  {} polls, updated {}",
            app.history.len(),
            health.last_updated.format("%H:%M:%S")
        )),
    ]);

    let paragraph = Paragraph::new(line).block(panel(app, " Buffer Trend "));
    frame.render_widget(paragraph, area);
}
