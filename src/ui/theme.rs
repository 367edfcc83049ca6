//! Theme configuration for the TUI.
//!
//! Supports light and dark themes with automatic terminal detection.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use crate::data::HealthStatus;

/// Color and style theme for the TUI.
///
/// Use [`Theme::auto_detect()`] for automatic theme selection based on
/// terminal background, or [`Theme::dark()`]/[`Theme::light()`] explicitly.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent color for highlights and active elements.
    pub highlight: Color,
    /// Running cycles, stale pins and a filling buffer.
    pub warning: Color,
    /// Failed or zombie cycles and a buffer past its warning level.
    pub critical: Color,
    /// Completed cycles and freshly synced pins.
    pub healthy: Color,
    /// Color for borders and separators.
    pub border: Color,
    /// Bars for impression deltas.
    pub impressions: Color,
    /// Bars for save deltas.
    pub saves: Color,
    /// Style for header rows in tables.
    pub header: Style,
    /// Style for selected/highlighted rows.
    pub selected: Style,
    /// Style for the tab of the current view.
    pub tab_active: Style,
    /// Style for the other tabs.
    pub tab_inactive: Style,
    /// Full-width alert shown for a zombie cycle.
    pub alert: Style,
    /// Border style for every panel (rounded, plain, etc.).
    pub border_type: BorderType,
}

impl Theme {
    /// Create a dark theme suitable for dark terminal backgrounds.
    pub fn dark() -> Self {
        Self {
            highlight: Color::Cyan,
            warning: Color::Yellow,
            critical: Color::Red,
            healthy: Color::Green,
            border: Color::Gray,
            impressions: Color::LightBlue,
            saves: Color::LightGreen,
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD),
            tab_active: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::Gray),
            alert: Style::default()
                .fg(Color::White)
                .bg(Color::Red)
                .add_modifier(Modifier::BOLD),
            border_type: BorderType::Rounded,
        }
    }

    /// Create a light theme suitable for light terminal backgrounds.
    pub fn light() -> Self {
        Self {
            highlight: Color::Blue,
            warning: Color::Yellow,
            critical: Color::Red,
            healthy: Color::Green,
            border: Color::DarkGray,
            impressions: Color::Blue,
            saves: Color::Green,
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::LightBlue).add_modifier(Modifier::BOLD),
            tab_active: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::DarkGray),
            alert: Style::default()
                .fg(Color::White)
                .bg(Color::Red)
                .add_modifier(Modifier::BOLD),
            border_type: BorderType::Rounded,
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Get style for a health status
    pub fn status_style(&self, status: HealthStatus) -> Style {
        match status {
            HealthStatus::Healthy => Style::default().fg(self.healthy),
            HealthStatus::Warning => Style::default().fg(self.warning),
            HealthStatus::Critical => {
                Style::default().fg(self.critical).add_modifier(Modifier::BOLD)
            }
        }
    }

    /// Badge style: status color as background.
    pub fn badge_style(&self, status: HealthStatus) -> Style {
        let bg = match status {
            HealthStatus::Healthy => self.healthy,
            HealthStatus::Warning => self.warning,
            HealthStatus::Critical => self.critical,
        };
        Style::default().fg(Color::Black).bg(bg).add_modifier(Modifier::BOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_badge_uses_status_as_background() {
        let theme = Theme::dark();

        assert_eq!(theme.badge_style(HealthStatus::Critical).bg, Some(Color::Red));
        assert_eq!(theme.badge_style(HealthStatus::Healthy).bg, Some(Color::Green));
        assert_eq!(theme.badge_style(HealthStatus::Warning).fg, Some(Color::Black));
    }

    #[test]
    fn test_only_critical_status_is_bold() {
        let theme = Theme::light();

        let critical = theme.status_style(HealthStatus::Critical);
        assert!(critical.add_modifier.contains(Modifier::BOLD));
        assert!(!theme
            .status_style(HealthStatus::Warning)
            .add_modifier
            .contains(Modifier::BOLD));
    }

    #[test]
    fn test_delta_bars_differ_from_status_colors() {
        for theme in [Theme::dark(), Theme::light()] {
            assert_ne!(theme.impressions, theme.saves);
            assert_ne!(theme.impressions, theme.critical);
        }
    }
}
