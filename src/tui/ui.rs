//! UI rendering for the TUI.

use super::app::{App, FocusArea, Mode};
use crate::session::SessionState;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io::{self, Stdout};

/// Set up the terminal for TUI rendering.
pub fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<Stdout>>> {
    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

/// Restore the terminal to normal mode.
pub fn restore_terminal(mut terminal: Terminal<CrosstermBackend<Stdout>>) -> io::Result<()> {
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        crossterm::terminal::LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Render the entire UI.
pub fn render(app: &App, frame: &mut Frame) {
    let size = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(10),   // Body
            Constraint::Length(3), // Input
            Constraint::Length(1), // Status bar
        ])
        .split(size);

    render_header(app, frame, chunks[0]);
    render_body(app, frame, chunks[1]);
    render_input(app, frame, chunks[2]);
    render_status_bar(app, frame, chunks[3]);

    if app.mode == Mode::Help {
        render_help_overlay(app, frame, size);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let state = app.session_state();
    let port_info = match app.controller.descriptor() {
        Some(descriptor) => descriptor.to_string(),
        None => format!("next: {} baud", app.baud),
    };
    let state_color = match state {
        SessionState::Connected => app.theme.success_color,
        SessionState::Disconnected => app.theme.inactive,
        SessionState::Connecting | SessionState::Disconnecting => app.theme.info_color,
    };

    let header = Line::from(vec![
        Span::styled(
            " serial-term ",
            Style::default()
                .fg(app.theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled(port_info, Style::default().fg(app.theme.fg)),
        Span::raw(" | "),
        Span::styled(state.to_string(), Style::default().fg(state_color)),
        Span::raw(" | "),
        Span::styled(app.uptime_string(), Style::default().fg(app.theme.fg)),
    ]);

    let header_widget = Paragraph::new(header).style(Style::default().bg(app.theme.selection));
    frame.render_widget(header_widget, area);
}

fn render_body(app: &App, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(22), Constraint::Min(40)])
        .split(area);

    render_port_list(app, frame, chunks[0]);
    render_log(app, frame, chunks[1]);
}

fn border_style(app: &App, focused: bool) -> Style {
    if focused {
        Style::default().fg(app.theme.accent)
    } else {
        Style::default().fg(app.theme.border)
    }
}

fn render_port_list(app: &App, frame: &mut Frame, area: Rect) {
    let connected = app.controller.descriptor().map(|d| d.path.as_str());

    let items: Vec<ListItem> = app
        .available_ports
        .iter()
        .enumerate()
        .map(|(i, port)| {
            let is_connected = connected == Some(port.as_str());
            let style = if i == app.selected_port {
                Style::default()
                    .fg(app.theme.fg)
                    .bg(app.theme.selection)
                    .add_modifier(Modifier::BOLD)
            } else if is_connected {
                Style::default().fg(app.theme.success_color)
            } else {
                Style::default().fg(app.theme.fg)
            };

            let prefix = if is_connected {
                "● "
            } else if i == app.selected_port {
                "> "
            } else {
                "  "
            };

            ListItem::new(format!("{}{}", prefix, port)).style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style(app, app.focus == FocusArea::PortList))
            .title(format!(" Ports ({}) ", app.baud)),
    );

    frame.render_widget(list, area);
}

fn render_log(app: &App, frame: &mut Frame, area: Rect) {
    let visible = area.height.saturating_sub(2) as usize;
    let end = app.log.len().saturating_sub(app.scroll_offset);
    let start = end.saturating_sub(visible);

    let lines: Vec<Line> = app
        .log
        .lines()
        .skip(start)
        .take(end - start)
        .map(|line| {
            Line::from(Span::styled(
                line.text.clone(),
                Style::default().fg(app.theme.line_color(line.kind)),
            ))
        })
        .collect();

    let title = if app.scroll_offset > 0 {
        format!(" Log (+{}) ", app.scroll_offset)
    } else {
        " Log ".to_string()
    };

    let log_widget = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style(app, app.focus == FocusArea::Log))
                .title(title),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(log_widget, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let mode_indicator = match app.mode {
        Mode::Normal => "[NORMAL]",
        Mode::Insert => "[INSERT]",
        Mode::Help => "",
    };
    let title = format!(
        " Command {} ({}) ",
        mode_indicator, app.config.terminal.line_ending
    );

    let input_widget = Paragraph::new(app.input.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style(app, app.mode == Mode::Insert))
            .title(title),
    );

    frame.render_widget(input_widget, area);

    if app.mode == Mode::Insert {
        let cursor_x = area.x + 1 + app.cursor_pos as u16;
        frame.set_cursor_position((cursor_x, area.y + 1));
    }
}

fn render_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let status_text = app.status_message.as_deref().unwrap_or("Ready");

    let keybinds = "q:quit  c:connect  d:disconnect  b:baud  r:refresh  i:type  F1:help";

    let status = Line::from(vec![
        Span::styled(format!(" {} ", status_text), Style::default().fg(app.theme.fg)),
        Span::raw(" | "),
        Span::styled(keybinds, Style::default().fg(app.theme.inactive)),
    ]);

    let status_widget = Paragraph::new(status).style(Style::default().bg(app.theme.selection));
    frame.render_widget(status_widget, area);
}

fn render_help_overlay(app: &App, frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 70, area);

    frame.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(Span::styled(
            "Keybindings",
            Style::default()
                .fg(app.theme.accent)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Normal Mode:"),
        Line::from("  q / Ctrl+C - Quit (disconnects first)"),
        Line::from("  c / Enter  - Connect to the selected port"),
        Line::from("  d          - Disconnect"),
        Line::from("  b          - Cycle baud rate"),
        Line::from("  r          - Refresh port list"),
        Line::from("  i          - Type a command"),
        Line::from("  Tab        - Switch between ports and log"),
        Line::from("  j/k        - Move selection / scroll"),
        Line::from("  PgUp/PgDn  - Scroll log"),
        Line::from("  Ctrl+L     - Clear log"),
        Line::from(""),
        Line::from("Insert Mode:"),
        Line::from("  Enter      - Send command"),
        Line::from("  Up/Down    - History"),
        Line::from("  Esc        - Back to normal mode"),
        Line::from(""),
        Line::from(Span::styled(
            "Press Esc or F1 to close",
            Style::default().fg(app.theme.inactive),
        )),
    ];

    let help_widget = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.accent))
                .title(" Help ")
                .style(Style::default().bg(app.theme.bg)),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(help_widget, popup_area);
}

/// Create a centered rectangle with the given percentage of the parent area.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
