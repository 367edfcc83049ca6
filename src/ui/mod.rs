//! Terminal UI rendering using ratatui.
//!
//! Each view is implemented in its own submodule with a `render` function.
//!
//! ## Submodules
//!
//! - [`health`]: Latest cycle badge, zombie alert and raw buffer gauge
//! - [`pins`]: Searchable, sortable pin inventory with freshness labels
//! - [`velocity`]: Delta bar chart for the selected pin
//! - [`common`]: Shared components (header, tabs, status bar, help overlay)
//! - [`theme`]: Light/dark theme support with terminal auto-detection
//!
//! ## Rendering Architecture
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ Header (common::render_header)       │
//! ├──────────────────────────────────────┤
//! │ Tabs (common::render_tabs)           │
//! ├──────────────────────────────────────┤
//! │                                      │
//! │ View Content                         │
//! │ (health/pins/velocity::render)       │
//! │                                      │
//! ├──────────────────────────────────────┤
//! │ Status Bar (common::render_status)   │
//! └──────────────────────────────────────┘
//!         ↑
//!    Overlay rendered on top:
//!    - common::render_help
//! ```
//!
//! Views read the wall clock once per frame and pass it to the evaluators,
//! so every label on screen is computed against the same instant.

pub mod common;
pub mod health;
pub mod pins;
pub mod theme;
pub mod velocity;

pub use pins::SortColumn;
pub use theme::Theme;
