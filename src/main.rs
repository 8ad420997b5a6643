use anyhow::{Context, Result};
use arboard::Clipboard;
use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};
use log::{LevelFilter, error, info, warn};
use ratatui::prelude::CrosstermBackend;
use simplelog::{Config as LogConfig, WriteLogger};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::str::FromStr;
use std::time::{Duration, Instant};

use connview::app::App;
use connview::cli::build_cli;
use connview::config::Config;
use connview::sort::SortColumn;
use connview::ui;

/// Upper bound on how long the loop blocks waiting for input
const TICK_RATE: Duration = Duration::from_millis(200);
const PAGE_SIZE: usize = 10;

fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    // Set up logging only if log-level was provided
    if let Some(level) = matches.get_one::<String>("log-level") {
        let level = LevelFilter::from_str(level)
            .with_context(|| format!("Invalid log level '{}'", level))?;
        setup_logging(level)?;
    }

    info!("Starting connview");

    // Build configuration from the config file, then command line arguments
    let mut config = Config::load(matches.get_one::<String>("config").map(String::as_str))?;
    if let Some(path) = &config.config_path {
        info!("Loaded configuration from {}", path.display());
    }

    if let Some(interval) = matches.get_one::<u64>("refresh-interval") {
        config.refresh_interval = *interval;
        info!("Using refresh interval: {}ms", interval);
    }

    if matches.get_flag("auto-refresh") {
        config.auto_refresh = true;
    }

    if let Some(filter) = matches.get_one::<String>("filter") {
        config.filter = filter.clone();
        info!("Initial filter: {}", filter);
    }

    if let Some(column) = matches.get_one::<String>("sort") {
        config.sort_column = Some(column.clone());
        config.sort_descending = matches.get_flag("desc");
    }

    let mut app = App::with_system_source(config)?;
    info!("Reading connections from {}", app.source_name());
    if !app.refresh().is_ok() {
        warn!("Initial refresh was incomplete");
    }

    // Set up terminal
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = ui::setup_terminal(backend)?;
    info!("Terminal UI initialized");

    // Run the UI loop
    let res = run_ui_loop(&mut terminal, &mut app);

    // Cleanup
    ui::restore_terminal(&mut terminal)?;

    // Return any error that occurred
    if let Err(err) = res {
        error!("Application error: {}", err);
        println!("Error: {}", err);
    }

    info!("connview shutting down");
    Ok(())
}

fn setup_logging(level: LevelFilter) -> Result<()> {
    // Create logs directory if it doesn't exist
    let log_dir = Path::new("logs");
    if !log_dir.exists() {
        fs::create_dir_all(log_dir)?;
    }

    // Create timestamped log file name
    let timestamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
    let log_file_path = log_dir.join(format!("connview_{}.log", timestamp));

    // Initialize the logger
    WriteLogger::init(level, LogConfig::default(), File::create(log_file_path)?)?;

    Ok(())
}

fn run_ui_loop<B: ratatui::prelude::Backend>(
    terminal: &mut ui::Terminal<B>,
    app: &mut App,
) -> Result<()> {
    let mut ui_state = ui::UIState::default();

    loop {
        // Auto-refresh runs between ticks, never while a key is being handled
        app.tick(Instant::now());

        {
            let view: &App = app;
            let rows = view.visible_rows();
            ui_state.ensure_valid_selection(&rows);
            ui_state.clear_expired_message();

            terminal.draw(|f| {
                if let Err(err) = ui::draw(f, view, &ui_state, &rows) {
                    error!("UI draw error: {}", err);
                }
            })?;
        }

        // Block until input arrives or the next refresh is due
        let timeout = app
            .auto_refresh
            .time_until_due(Instant::now())
            .map_or(TICK_RATE, |due| due.min(TICK_RATE));

        if !crossterm::event::poll(timeout)? {
            continue;
        }

        match crossterm::event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                let keep_running = if ui_state.editing_filter {
                    handle_filter_key(app, &mut ui_state, key)
                } else {
                    handle_key(app, &mut ui_state, key)
                };
                if !keep_running {
                    break;
                }
            }
            Event::Mouse(mouse) if mouse.kind == MouseEventKind::Down(MouseButton::Left) => {
                let area = terminal.get_frame().area();
                if let Some(column) = ui::header_column_at(area, mouse.column, mouse.row) {
                    app.select_sort_column(column);
                }
            }
            _ => {}
        }
    }

    Ok(())
}

/// Keys while the filter bar has focus; the filter updates as the user types.
/// Returns false when the application should exit.
fn handle_filter_key(app: &mut App, ui_state: &mut ui::UIState, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Enter => {
            ui_state.editing_filter = false;
            info!("Filter set to '{}'", app.query());
        }
        KeyCode::Esc => {
            ui_state.editing_filter = false;
            app.set_query("");
        }
        KeyCode::Backspace => {
            let mut query = app.query().to_string();
            query.pop();
            app.set_query(&query);
        }
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            info!("User requested immediate exit with Ctrl+C");
            return false;
        }
        KeyCode::Char(c) => {
            let query = format!("{}{}", app.query(), c);
            app.set_query(&query);
        }
        _ => {}
    }
    true
}

/// Returns false when the application should exit
fn handle_key(app: &mut App, ui_state: &mut ui::UIState, key: KeyEvent) -> bool {
    let rows = app.visible_rows();

    match (key.code, key.modifiers) {
        // Quit with confirmation
        (KeyCode::Char('q'), _) => {
            if ui_state.quit_confirmation {
                info!("User confirmed application exit");
                return false;
            }
            info!("User requested quit - showing confirmation");
            ui_state.quit_confirmation = true;
            return true;
        }

        // Ctrl+C always quits immediately
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
            info!("User requested immediate exit with Ctrl+C");
            return false;
        }

        (KeyCode::Char('h'), _) => {
            ui_state.show_help = !ui_state.show_help;
        }

        (KeyCode::Up, _) | (KeyCode::Char('k'), _) => ui_state.move_selection_up(&rows),
        (KeyCode::Down, _) | (KeyCode::Char('j'), _) => ui_state.move_selection_down(&rows),
        (KeyCode::PageUp, _) => ui_state.move_selection_page_up(&rows, PAGE_SIZE),
        (KeyCode::PageDown, _) => ui_state.move_selection_page_down(&rows, PAGE_SIZE),

        // Copy local endpoint to clipboard
        (KeyCode::Char('c'), _) => {
            if let Some(row) = ui_state.get_selected_index(&rows).and_then(|i| rows.get(i)) {
                let endpoint = row.local_endpoint();
                copy_to_clipboard(ui_state, &endpoint);
            }
        }

        (KeyCode::Char('r'), _) | (KeyCode::F(5), _) => {
            info!("Manual refresh");
            app.refresh();
        }

        (KeyCode::Char('a'), _) => {
            let enabled = app.toggle_auto_refresh(Instant::now());
            ui_state.set_message(if enabled {
                format!(
                    "Auto-refresh every {:.1}s",
                    app.auto_refresh.interval().as_secs_f64()
                )
            } else {
                "Auto-refresh off".to_string()
            });
        }

        (KeyCode::Char('/'), _) => {
            ui_state.editing_filter = true;
            ui_state.show_help = false;
        }

        (KeyCode::Char(c @ '1'..='7'), _) => {
            let index = c as usize - '1' as usize;
            if let Some(column) = SortColumn::from_index(index) {
                app.select_sort_column(column);
            }
        }

        (KeyCode::Esc, _) => {
            ui_state.show_help = false;
        }

        _ => {}
    }

    // Any key other than 'q' cancels a pending quit
    ui_state.quit_confirmation = false;
    true
}

fn copy_to_clipboard(ui_state: &mut ui::UIState, text: &str) {
    match Clipboard::new() {
        Ok(mut clipboard) => {
            if let Err(e) = clipboard.set_text(text) {
                error!("Failed to copy to clipboard: {}", e);
                ui_state.set_message(format!("Failed to copy: {}", e));
            } else {
                info!("Copied {} to clipboard", text);
                ui_state.set_message(format!("Copied {} to clipboard", text));
            }
        }
        Err(e) => {
            error!("Failed to access clipboard: {}", e);
            ui_state.set_message(format!("Clipboard error: {}", e));
        }
    }
}
