//! Velocity view rendering.
//!
//! Bar chart of the per-cycle metric deltas of the selected pin, oldest
//! snapshot on the left.

use chrono::Local;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph},
    Frame,
};

use crate::app::{App, VelocityState};
use crate::data::velocity::{VelocityPoint, VelocitySeries};
use crate::data::HealthStatus;

/// Width of a single bar in cells.
const BAR_WIDTH: u16 = 3;
/// Gap between snapshot groups.
const GROUP_GAP: u16 = 2;

/// Render the Velocity view.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Pin Velocity ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    let dim = Style::default().add_modifier(Modifier::DIM);

    let message: Vec<Line> = match &app.velocity {
        VelocityState::Loaded(series) => {
            render_series(frame, app, series, area);
            return;
        }
        VelocityState::Idle => vec![
            Line::from(""),
            Line::from(Span::styled("  No pin selected", dim)),
            Line::from(Span::styled("  Pick one in the Pins view (2) and press Enter", dim)),
        ],
        VelocityState::Loading(pin_id) => vec![
            Line::from(""),
            Line::from(Span::styled(format!("  Loading history for {}...", pin_id), dim)),
        ],
        VelocityState::NotFound(pin_id) => vec![
            Line::from(""),
            Line::from(Span::styled(
                format!("  Pin {} was not found in the store", pin_id),
                app.theme.status_style(HealthStatus::Warning),
            )),
        ],
        VelocityState::Failed(error) => vec![
            Line::from(""),
            Line::from(Span::styled(
                format!("  {}", error),
                app.theme.status_style(HealthStatus::Critical),
            )),
            Line::from(Span::styled("  Check the store connection, then press r", dim)),
        ],
    };

    frame.render_widget(Paragraph::new(message).block(block), area);
}

fn render_series(frame: &mut Frame, app: &App, series: &VelocitySeries, area: Rect) {
    let chunks = Layout::vertical([
        Constraint::Length(5), // Pin info
        Constraint::Min(6),    // Chart
    ])
    .split(area);

    let pin = &series.pin;
    let mut info = vec![
        Line::from(vec![
            Span::styled(
                format!(" PIN_{} ", pin.short_id()),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(" {} ({})", pin.pin_id, pin.current_status)),
        ]),
        Line::from(format!(" {}", pin.title)),
    ];

    match series.latest() {
        Some(latest) => info.push(latest_line(app, latest)),
        None => info.push(Line::from(Span::styled(
            " No metric history yet: this pin is waiting for its first ingestion cycle",
            Style::default().add_modifier(Modifier::DIM),
        ))),
    }

    let info_block = Block::default()
        .title(" Pin Velocity Analysis ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));
    frame.render_widget(Paragraph::new(info).block(info_block), chunks[0]);

    if series.is_empty() {
        return;
    }

    // Keep the most recent snapshots that fit.
    let group_width = BAR_WIDTH * 2 + GROUP_GAP;
    let fits = (chunks[1].width.saturating_sub(2) / group_width).max(1) as usize;
    let skip = series.points.len().saturating_sub(fits);
    let shown = &series.points[skip..];

    let legend = Line::from(vec![
        Span::styled(" ■ Δ Impressions ", Style::default().fg(app.theme.impressions)),
        Span::styled(" ■ Δ Saves ", Style::default().fg(app.theme.saves)),
    ]);

    let mut chart = BarChart::default()
        .block(
            Block::default()
                .title(legend)
                .title_bottom(Line::from(format!(
                    " {} of {} snapshots, source: pin_metric_history ",
                    shown.len(),
                    series.points.len()
                )))
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(app.theme.border)),
        )
        .bar_width(BAR_WIDTH)
        .bar_gap(0)
        .group_gap(GROUP_GAP)
        .max(series.max_delta().max(1));

    for point in shown {
        chart = chart.data(bar_group(app, point));
    }

    frame.render_widget(chart, chunks[1]);
}

fn bar_group<'a>(app: &App, point: &'a VelocityPoint) -> BarGroup<'a> {
    let bars = [
        delta_bar(point.delta_impressions, Style::default().fg(app.theme.impressions)),
        delta_bar(point.delta_saves, Style::default().fg(app.theme.saves)),
    ];

    BarGroup::default()
        .label(Line::from(point.label.as_str()))
        .bars(&bars)
}

/// Negative deltas draw as empty bars but keep their value as text.
fn delta_bar(value: i64, style: Style) -> Bar<'static> {
    Bar::default()
        .value(value.max(0) as u64)
        .text_value(value.to_string())
        .style(style)
}

fn latest_line(app: &App, latest: &VelocityPoint) -> Line<'static> {
    let mut spans = vec![
        Span::raw(format!(
            " Latest {} ",
            latest.recorded_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        )),
        Span::styled(
            format!("Δ impressions {:+}", latest.delta_impressions),
            Style::default().fg(app.theme.impressions),
        ),
        Span::raw("  "),
        Span::styled(
            format!("Δ saves {:+}", latest.delta_saves),
            Style::default().fg(app.theme.saves),
        ),
    ];

    if let Some(clicks) = latest.delta_outbound_clicks {
        spans.push(Span::raw(format!("  Δ clicks {:+}", clicks)));
    }

    spans.push(Span::styled(
        format!("  cycle {}", latest.cycle_id),
        Style::default().add_modifier(Modifier::DIM),
    ));

    Line::from(spans)
}
