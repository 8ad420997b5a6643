use anyhow::Result;
use ratatui::{
    Frame, Terminal as RatatuiTerminal,
    layout::{Constraint, Direction, Flex, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, HighlightSpacing, Paragraph, Row, Table, Wrap},
};
use std::time::{Duration, Instant};

use crate::app::App;
use crate::rows::{DisplayRow, Highlight};
use crate::sort::SortColumn;
use crate::tracker::IdentityKey;

pub type Terminal<B> = RatatuiTerminal<B>;

/// How long transient status messages stay visible
const MESSAGE_TIMEOUT: Duration = Duration::from_secs(3);
const COLUMN_SPACING: u16 = 1;
const HIGHLIGHT_SYMBOL: &str = "> ";

/// Set up the terminal for the TUI application
pub fn setup_terminal<B: ratatui::backend::Backend>(backend: B) -> Result<Terminal<B>> {
    let mut terminal = RatatuiTerminal::new(backend)?;
    terminal.clear()?;
    terminal.hide_cursor()?;
    crossterm::terminal::enable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableMouseCapture
    )?;
    Ok(terminal)
}

/// Restore the terminal to its original state
pub fn restore_terminal<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>) -> Result<()> {
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::event::DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// UI state for managing the interface
#[derive(Default)]
pub struct UIState {
    pub selected_key: Option<IdentityKey>,
    pub show_help: bool,
    pub quit_confirmation: bool,
    /// Filter bar has keyboard focus
    pub editing_filter: bool,
    pub message: Option<(String, Instant)>,
}

impl UIState {
    /// Get the current selected row index, if any
    pub fn get_selected_index(&self, rows: &[&DisplayRow]) -> Option<usize> {
        if let Some(ref selected_key) = self.selected_key {
            rows.iter().position(|row| IdentityKey::of(row) == *selected_key)
        } else if !rows.is_empty() {
            Some(0) // Default to first row
        } else {
            None
        }
    }

    /// Set the selected row to the one at the given index
    pub fn set_selected_by_index(&mut self, rows: &[&DisplayRow], index: usize) {
        if let Some(row) = rows.get(index) {
            self.selected_key = Some(IdentityKey::of(row));
        }
    }

    /// Move selection up by one position, wrapping to the bottom
    pub fn move_selection_up(&mut self, rows: &[&DisplayRow]) {
        if rows.is_empty() {
            return;
        }

        let current_index = self.get_selected_index(rows).unwrap_or(0);
        if current_index > 0 {
            self.set_selected_by_index(rows, current_index - 1);
        } else {
            self.set_selected_by_index(rows, rows.len() - 1);
        }
    }

    /// Move selection down by one position, wrapping to the top
    pub fn move_selection_down(&mut self, rows: &[&DisplayRow]) {
        if rows.is_empty() {
            return;
        }

        let current_index = self.get_selected_index(rows).unwrap_or(0);
        if current_index < rows.len().saturating_sub(1) {
            self.set_selected_by_index(rows, current_index + 1);
        } else {
            self.set_selected_by_index(rows, 0);
        }
    }

    pub fn move_selection_page_up(&mut self, rows: &[&DisplayRow], page_size: usize) {
        if rows.is_empty() {
            return;
        }

        let current_index = self.get_selected_index(rows).unwrap_or(0);
        self.set_selected_by_index(rows, current_index.saturating_sub(page_size));
    }

    pub fn move_selection_page_down(&mut self, rows: &[&DisplayRow], page_size: usize) {
        if rows.is_empty() {
            return;
        }

        let current_index = self.get_selected_index(rows).unwrap_or(0);
        let new_index = (current_index + page_size).min(rows.len() - 1);
        self.set_selected_by_index(rows, new_index);
    }

    /// Ensure we have a valid selection when the row set changes
    pub fn ensure_valid_selection(&mut self, rows: &[&DisplayRow]) {
        if rows.is_empty() {
            self.selected_key = None;
            return;
        }

        if self.selected_key.is_none() || self.get_selected_index(rows).is_none() {
            self.set_selected_by_index(rows, 0);
        }
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some((message.into(), Instant::now()));
    }

    /// Message still within its display window
    pub fn active_message(&self) -> Option<&str> {
        match &self.message {
            Some((msg, time)) if time.elapsed() < MESSAGE_TIMEOUT => Some(msg.as_str()),
            _ => None,
        }
    }

    pub fn clear_expired_message(&mut self) {
        if self.active_message().is_none() {
            self.message = None;
        }
    }
}

fn column_widths() -> [Constraint; 7] {
    [
        Constraint::Length(20), // Process
        Constraint::Length(8),  // PID
        Constraint::Length(26), // Local IP
        Constraint::Length(6),  // Port
        Constraint::Length(12), // Status
        Constraint::Length(9),  // Family
        Constraint::Length(11), // Type
    ]
}

/// Screen areas: filter bar, table, detail line, status bar
fn screen_layout(area: Rect) -> [Rect; 4] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Filter
            Constraint::Min(0),    // Table
            Constraint::Length(3), // Details
            Constraint::Length(1), // Status bar
        ])
        .split(area);
    [chunks[0], chunks[1], chunks[2], chunks[3]]
}

/// Column whose header cell contains the point, given the full frame area
pub fn header_column_at(frame_area: Rect, x: u16, y: u16) -> Option<SortColumn> {
    let table_area = screen_layout(frame_area)[1];
    let inner = Block::default().borders(Borders::ALL).inner(table_area);
    if y != inner.y || !inner.contains(Position::new(x, y)) {
        return None;
    }

    let symbol_width = HIGHLIGHT_SYMBOL.len() as u16;
    let columns_area = Rect {
        x: inner.x + symbol_width,
        width: inner.width.saturating_sub(symbol_width),
        ..inner
    };
    Layout::horizontal(column_widths())
        .flex(Flex::Start)
        .spacing(COLUMN_SPACING)
        .split(columns_area)
        .iter()
        .position(|cell| x >= cell.x && x < cell.x + cell.width)
        .and_then(SortColumn::from_index)
}

/// Draw the UI
pub fn draw(f: &mut Frame, app: &App, ui_state: &UIState, rows: &[&DisplayRow]) -> Result<()> {
    let [filter_area, table_area, details_area, status_area] = screen_layout(f.area());

    draw_filter_bar(f, app, ui_state, filter_area);
    if ui_state.show_help {
        draw_help(f, table_area)?;
    } else {
        draw_connections_table(f, app, ui_state, rows, table_area);
    }
    draw_details(f, ui_state, rows, details_area);
    draw_status_bar(f, app, ui_state, rows.len(), status_area);

    Ok(())
}

fn draw_filter_bar(f: &mut Frame, app: &App, ui_state: &UIState, area: Rect) {
    let mut spans = vec![Span::raw(app.query().to_string())];
    if ui_state.editing_filter {
        spans.push(Span::styled(
            "_",
            Style::default().add_modifier(Modifier::SLOW_BLINK),
        ));
    }
    let ignored = &app.filter().ignored;
    if !ignored.is_empty() {
        spans.push(Span::styled(
            format!("  (ignored: {})", ignored.join(" ")),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let (title, border_style) = if ui_state.editing_filter {
        (
            "Filter (Enter to keep, Esc to clear)",
            Style::default().fg(Color::Yellow),
        )
    } else {
        ("Filter (press / to edit)", Style::default())
    };

    let filter = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(title),
    );
    f.render_widget(filter, area);
}

fn draw_connections_table(
    f: &mut Frame,
    app: &App,
    ui_state: &UIState,
    rows: &[&DisplayRow],
    area: Rect,
) {
    let header_cells = SortColumn::ALL.iter().map(|column| {
        let title = if app.sort.column == Some(*column) {
            format!("{} {}", column.title(), app.sort.direction.arrow())
        } else {
            column.title().to_string()
        };
        Cell::from(title).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });
    let header = Row::new(header_cells).height(1).bottom_margin(1);

    let table_rows: Vec<Row> = rows
        .iter()
        .map(|row| {
            let cells = [
                Cell::from(row.process_name.clone()),
                Cell::from(row.pid_label()),
                Cell::from(row.local_ip.to_string()),
                Cell::from(row.local_port.to_string()),
                Cell::from(row.status.clone()),
                Cell::from(row.family),
                Cell::from(row.socket_type),
            ];
            Row::new(cells).style(highlight_style(row.highlight))
        })
        .collect();

    let mut state = ratatui::widgets::TableState::default();
    if let Some(selected_index) = ui_state.get_selected_index(rows) {
        state.select(Some(selected_index));
    }

    let title = format!(
        "Connections ({} of {})",
        rows.len(),
        app.rows().len()
    );
    let table = Table::new(table_rows, column_widths())
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .column_spacing(COLUMN_SPACING)
        .flex(Flex::Start)
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol(HIGHLIGHT_SYMBOL)
        .highlight_spacing(HighlightSpacing::Always);

    f.render_stateful_widget(table, area, &mut state);
}

fn highlight_style(highlight: Highlight) -> Style {
    match highlight {
        Highlight::New => Style::default().fg(Color::Green),
        Highlight::Changed => Style::default().fg(Color::Yellow),
        Highlight::Unchanged => Style::default(),
    }
}

/// Selected row's endpoints, which the table has no room for
fn draw_details(f: &mut Frame, ui_state: &UIState, rows: &[&DisplayRow], area: Rect) {
    let line = match ui_state.get_selected_index(rows).and_then(|i| rows.get(i)) {
        Some(row) => Line::from(vec![
            Span::styled("Local: ", Style::default().fg(Color::Yellow)),
            Span::raw(row.local_endpoint()),
            Span::styled("  Remote: ", Style::default().fg(Color::Yellow)),
            Span::raw(row.remote_endpoint()),
            Span::styled("  Process: ", Style::default().fg(Color::Yellow)),
            Span::raw(format!("{} ({})", row.process_name, row.pid_label())),
        ]),
        None => Line::from("No connection selected"),
    };

    let details = Paragraph::new(line)
        .block(Block::default().borders(Borders::ALL).title("Details"))
        .wrap(Wrap { trim: true });
    f.render_widget(details, area);
}

/// Draw help screen
fn draw_help(f: &mut Frame, area: Rect) -> Result<()> {
    let key = |k: &str, text: &str| {
        Line::from(vec![
            Span::styled(format!("{} ", k), Style::default().fg(Color::Yellow)),
            Span::raw(text.to_string()),
        ])
    };

    let help_text: Vec<Line> = vec![
        Line::from(vec![
            Span::styled(
                "connview ",
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("- current network connections"),
        ]),
        Line::from(""),
        key("q", "Quit application (press twice to confirm)"),
        key("Ctrl+C", "Quit immediately"),
        key("r / F5", "Refresh now"),
        key("a", "Toggle auto-refresh"),
        key("/", "Edit filter (Enter keeps it, Esc clears it)"),
        key("1-7", "Sort by column; again to reverse (or click a header)"),
        key("↑/k, ↓/j", "Navigate connections (wraps around)"),
        key("Page Up/Down", "Navigate connections by page"),
        key("c", "Copy local address to clipboard"),
        key("h", "Toggle this help screen"),
        Line::from(""),
        Line::from(Span::styled(
            "Filter syntax",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        key("name:<text>", "Process name contains text"),
        key("pid:<n>", "Process id equals n"),
        key("lport:<n>", "Local port equals n"),
        key("status:<text>", "Status contains text"),
        key("ip:<text>", "Local IP contains text"),
        key("<text>", "Process name or status contains text"),
        Line::from("Terms are combined with AND; unknown fields are ignored."),
        Line::from(""),
        Line::from(vec![
            Span::styled("green", Style::default().fg(Color::Green)),
            Span::raw(" new since last refresh, "),
            Span::styled("yellow", Style::default().fg(Color::Yellow)),
            Span::raw(" status changed"),
        ]),
    ];

    let help = Paragraph::new(help_text)
        .block(Block::default().borders(Borders::ALL).title("Help"))
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: true })
        .alignment(ratatui::layout::Alignment::Left);

    f.render_widget(help, area);

    Ok(())
}

/// Draw status bar
fn draw_status_bar(f: &mut Frame, app: &App, ui_state: &UIState, visible: usize, area: Rect) {
    let report = app.last_report();
    let (status, style) = if ui_state.quit_confirmation {
        (
            " Press 'q' again to quit or any other key to cancel ".to_string(),
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )
    } else if let Some(msg) = ui_state.active_message() {
        (
            format!(" {} ", msg),
            Style::default().fg(Color::Black).bg(Color::Green),
        )
    } else if let Some(ref err) = report.error {
        (
            format!(" {} | 'r' to retry ", err),
            Style::default().fg(Color::White).bg(Color::Red),
        )
    } else {
        let auto = if app.auto_refresh.is_enabled() {
            format!("auto {:.1}s", app.auto_refresh.interval().as_secs_f64())
        } else {
            "auto off".to_string()
        };
        let updated = app
            .last_refresh()
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        (
            format!(
                " 'h' help | 'r' refresh | 'a' {} | Rows: {}/{} | New: {} Changed: {} | Updated {} ",
                auto,
                visible,
                app.rows().len(),
                report.new,
                report.changed,
                updated
            ),
            Style::default().fg(Color::White).bg(Color::Blue),
        )
    };

    let status_bar = Paragraph::new(status)
        .style(style)
        .alignment(ratatui::layout::Alignment::Left);

    f.render_widget(status_bar, area);
}
