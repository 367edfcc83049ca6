use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    Terminal,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eltwatch::app::{build_report, write_report, App, View};
use eltwatch::data::{PinInventory, SystemHealthData, Thresholds};
use eltwatch::source::{Poller, StoreReader};
use eltwatch::{events, ui, Overrides, Settings, StoreKind};

#[derive(Parser, Debug)]
#[command(name = "eltwatch")]
#[command(about = "Terminal dashboard for monitoring a Pinterest ELT ingestion pipeline")]
struct Args {
    /// TOML config file (store, thresholds, refresh)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use generated mock data
    #[arg(long, conflicts_with_all = ["file", "supabase"])]
    mock: bool,

    /// Read the store from a JSON fixture file
    #[arg(short, long, conflicts_with_all = ["mock", "supabase"])]
    file: Option<PathBuf>,

    /// Supabase project URL
    #[arg(long, conflicts_with_all = ["mock", "file"])]
    supabase: Option<String>,

    /// Supabase API key
    #[arg(long, env = "SUPABASE_KEY", hide_env_values = true)]
    key: Option<String>,

    /// Poll interval (e.g., "30s", "1m")
    #[arg(short, long)]
    refresh: Option<String>,

    /// Pins not synced for longer than this are stale (e.g., "24h")
    #[arg(long)]
    stale_after: Option<String>,

    /// Running cycles older than this are zombies (e.g., "10m")
    #[arg(long)]
    zombie_after: Option<String>,

    /// Raw buffer capacity for the saturation gauge
    #[arg(long)]
    buffer_capacity: Option<u64>,

    /// Buffer count above which the gauge turns critical
    #[arg(long)]
    buffer_warn: Option<u64>,

    /// Log file (the terminal belongs to the TUI)
    #[arg(long, default_value = "eltwatch.log")]
    log_file: PathBuf,

    /// Export current state to JSON file and exit
    #[arg(short, long)]
    export: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        let store_kind = if self.mock {
            Some(StoreKind::Mock)
        } else if self.file.is_some() {
            Some(StoreKind::File)
        } else if self.supabase.is_some() {
            Some(StoreKind::Supabase)
        } else {
            None
        };

        Overrides {
            store_kind,
            url: self.supabase.clone(),
            key: self.key.clone(),
            file: self.file.clone(),
            refresh: self.refresh.clone(),
            stale_after: self.stale_after.clone(),
            zombie_after: self.zombie_after.clone(),
            buffer_capacity: self.buffer_capacity,
            buffer_warning: self.buffer_warn,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_file)?;

    let settings = Settings::load(args.config.as_deref(), &args.overrides())?;
    let thresholds = settings.thresholds()?;
    let refresh = settings.refresh_interval()?;

    let rt = tokio::runtime::Runtime::new()?;
    let store = settings.build_store()?;

    // Handle export mode (non-interactive)
    if let Some(export_path) = args.export {
        return rt.block_on(export_to_file(store.as_ref(), &export_path, &thresholds));
    }

    let handle = {
        let _guard = rt.enter();
        Poller::new(store).interval(refresh).start()
    };

    let result = run_tui(Box::new(handle), thresholds);

    // Abort anything still in flight rather than waiting for it.
    rt.shutdown_timeout(Duration::from_millis(100));
    tracing::info!("Exiting");

    result
}

fn init_logging(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eltwatch=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .init();

    Ok(())
}

/// Run the TUI with the given data source
fn run_tui(source: Box<dyn eltwatch::DataSource>, thresholds: Thresholds) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Restore the terminal before printing a panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic);
    }));

    let mut app = App::new(source, thresholds);
    tracing::info!(source = app.source_description(), "Dashboard started");

    let result = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    const MIN_WIDTH: u16 = 60;
    const MIN_HEIGHT: u16 = 12;

    while app.running {
        app.reload_data();

        terminal.draw(|frame| {
            let area = frame.area();

            if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
                let msg = format!(
                    "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
                    area.width, area.height, MIN_WIDTH, MIN_HEIGHT
                );
                let paragraph = ratatui::widgets::Paragraph::new(msg)
                    .alignment(ratatui::layout::Alignment::Center)
                    .style(ratatui::style::Style::default().fg(ratatui::style::Color::Yellow));
                let centered = ratatui::layout::Rect::new(
                    0,
                    (area.height / 2).saturating_sub(2),
                    area.width,
                    5u16.min(area.height),
                );
                frame.render_widget(paragraph, centered);
                return;
            }

            let chunks = Layout::vertical([
                Constraint::Length(1), // Header bar
                Constraint::Length(1), // Tabs
                Constraint::Min(8),    // Content
                Constraint::Length(1), // Status bar
            ])
            .split(area);

            ui::common::render_header(frame, app, chunks[0]);
            ui::common::render_tabs(frame, app, chunks[1]);

            match app.current_view {
                View::Health => ui::health::render(frame, app, chunks[2]),
                View::Pins => ui::pins::render(frame, app, chunks[2]),
                View::Velocity => ui::velocity::render(frame, app, chunks[2]),
            }

            ui::common::render_status_bar(frame, app, chunks[3]);

            if app.show_help {
                ui::common::render_help(frame, app, area);
            }
        })?;

        if let Some(event) = events::poll_event(Duration::from_millis(100))? {
            match event {
                Event::Key(key) => events::handle_key_event(app, key),
                Event::Mouse(mouse) => {
                    // Content starts after header (1) + tabs (1) + table border and header (1)
                    events::handle_mouse_event(app, mouse, 3);
                }
                _ => {}
            }
        }
    }

    Ok(())
}

/// Fetch the store once and write the report.
async fn export_to_file(
    store: &dyn StoreReader,
    export_path: &Path,
    thresholds: &Thresholds,
) -> Result<()> {
    let (cycle, buffer_count, pins) = tokio::try_join!(
        store.fetch_latest_cycle(),
        store.fetch_buffer_count(),
        store.fetch_active_pins(),
    )
    .with_context(|| format!("Failed to read {}", store.description()))?;

    let now = Utc::now();
    let health = SystemHealthData::from_fetch(cycle, buffer_count, now, thresholds);
    let inventory = PinInventory::new(pins, now);

    let report = build_report(Some(&health), Some(&inventory), thresholds, now)?;
    write_report(export_path, &report)?;

    tracing::info!(path = %export_path.display(), "Exported state");
    println!("Exported pipeline state to: {}", export_path.display());
    Ok(())
}
