//! Rendering routines for the Tavern TUI.

use crate::app::App;
use chrono::Local;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, BorderType, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap,
};
use tavern_rs_core::ChatPhase;
use tavern_rs_protocol::{Role, Session};

const PRIMARY: Color = Color::Rgb(236, 91, 43);
const SECONDARY: Color = Color::Rgb(238, 121, 72);
const TEXT: Color = Color::Rgb(238, 238, 238);
const TEXT_MUTED: Color = Color::Rgb(128, 128, 128);
const BORDER: Color = Color::Rgb(60, 60, 60);
const YELLOW: Color = Color::Rgb(229, 192, 123);

const SIDEBAR_WIDTH: u16 = 24;
const PREVIEW_CHARS: usize = 48;

/// Draw the entire TUI frame.
pub fn draw(frame: &mut Frame<'_>, app: &mut App) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(0),    // sidebar + chat
            Constraint::Length(3), // input
            Constraint::Length(1), // status bar
        ])
        .split(frame.area());

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
        .split(root[1]);

    draw_header(frame, app, root[0]);
    draw_sidebar(frame, app, body[0]);
    if app.viewer.is_some() {
        draw_past_viewer(frame, app, body[1]);
    } else {
        draw_chat(frame, app, body[1]);
    }
    draw_input(frame, app, root[2]);
    draw_status_bar(frame, app, root[3]);
}

fn draw_header(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let label = Style::default().fg(TEXT_MUTED);
    let mut spans = vec![Span::styled(
        " tavern ",
        Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD),
    )];
    match app.view.active_character() {
        Some(character) => {
            spans.push(Span::styled(" character ", label));
            spans.push(Span::styled(character.name.clone(), Style::default().fg(TEXT)));
            if let Some(description) = character.description.as_deref() {
                spans.push(Span::styled(format!("  {description}"), label));
            }
        }
        None => spans.push(Span::styled(" select a character with Tab", label)),
    }
    if let Some(session) = app.view.session.as_ref() {
        let session_label = match session.id {
            Some(id) => {
                let id = id.to_string();
                id[..8.min(id.len())].to_string()
            }
            None => "unsaved".to_string(),
        };
        let style = if session.is_persisted() {
            Style::default().fg(TEXT)
        } else {
            Style::default().fg(YELLOW)
        };
        spans.push(Span::styled("  session ", label));
        spans.push(Span::styled(session_label, style));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), inner);
}

fn draw_sidebar(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER))
        .title(Span::styled(" Characters ", Style::default().fg(TEXT_MUTED)));

    let active = app.view.active.as_deref();
    let lines: Vec<Line<'_>> = app
        .view
        .characters
        .iter()
        .map(|character| {
            if Some(character.id.as_str()) == active {
                let marker = if app.is_busy() { "… " } else { "▸ " };
                Line::from(vec![
                    Span::styled(marker, Style::default().fg(PRIMARY)),
                    Span::styled(
                        character.name.clone(),
                        Style::default().fg(SECONDARY).add_modifier(Modifier::BOLD),
                    ),
                ])
            } else {
                Line::from(Span::styled(
                    format!("  {}", character.name),
                    Style::default().fg(TEXT),
                ))
            }
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Draw the chat transcript with border and scrollbar.
fn draw_chat(frame: &mut Frame<'_>, app: &mut App, area: Rect) {
    let lines = app.render_lines();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER))
        .title(Span::styled(" Chat ", Style::default().fg(TEXT_MUTED)));

    let inner = block.inner(area);
    let content_width = inner.width.saturating_sub(1);
    let content_height = inner.height as usize;

    let total_lines = Paragraph::new(lines.clone())
        .wrap(Wrap { trim: false })
        .line_count(content_width)
        .max(1);

    let max_scroll = total_lines.saturating_sub(content_height) as u16;
    app.update_scroll_bounds(max_scroll);
    let scroll = app.scroll;

    let chat_inner = Rect {
        width: content_width,
        ..inner
    };
    let chat = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));

    frame.render_widget(block, area);
    frame.render_widget(chat, chat_inner);

    if total_lines > content_height {
        let mut scrollbar_state = ScrollbarState::default()
            .content_length(total_lines)
            .position(scroll as usize)
            .viewport_content_length(content_height);
        let scrollbar_area = Rect {
            x: inner.x + inner.width.saturating_sub(1),
            y: inner.y,
            width: 1,
            height: inner.height,
        };
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .style(Style::default().fg(BORDER))
                .thumb_style(Style::default().fg(TEXT_MUTED)),
            scrollbar_area,
            &mut scrollbar_state,
        );
    }
}

fn draw_past_viewer(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(SECONDARY))
        .title(Span::styled(
            " Past sessions (Enter restore, Esc close) ",
            Style::default().fg(SECONDARY),
        ));

    let selected = app.viewer.map(|viewer| viewer.selected).unwrap_or_default();
    let lines: Vec<Line<'_>> = if app.view.past_sessions.is_empty() {
        vec![Line::from(Span::styled(
            "  nothing here yet",
            Style::default().fg(TEXT_MUTED),
        ))]
    } else {
        app.view
            .past_sessions
            .iter()
            .enumerate()
            .map(|(index, session)| past_session_line(session, index == selected))
            .collect()
    };

    let height = block.inner(area).height as usize;
    let offset = selected.saturating_sub(height.saturating_sub(1)) as u16;
    frame.render_widget(Paragraph::new(lines).block(block).scroll((offset, 0)), area);
}

fn past_session_line(session: &Session, selected: bool) -> Line<'static> {
    let when = if session.updated_at.is_some() || session.created_at.is_some() {
        session
            .recency()
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string()
    } else {
        "undated         ".to_string()
    };
    let preview: String = session
        .messages
        .iter()
        .find(|message| message.role == Role::User)
        .map(|message| message.content.chars().take(PREVIEW_CHARS).collect())
        .unwrap_or_default();
    let (marker, style) = if selected {
        ("▸ ", Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD))
    } else {
        ("  ", Style::default().fg(TEXT))
    };
    Line::from(vec![
        Span::styled(marker, style),
        Span::styled(when, style),
        Span::styled(
            format!("  {:>3} msgs  ", session.messages.len()),
            Style::default().fg(TEXT_MUTED),
        ),
        Span::styled(preview, style),
    ])
}

/// Draw the input box with border and cursor.
fn draw_input(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let editing = app.editing.is_some();
    let ready = editing || app.view.can_send();
    let title = if editing {
        " Editing message (Enter save, Esc cancel) "
    } else if app.view.phase == ChatPhase::Sending {
        " Waiting for reply "
    } else if app.view.session.as_ref().is_some_and(|s| !s.is_persisted()) {
        " Chat not saved yet "
    } else {
        " Message "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(if ready { SECONDARY } else { BORDER }))
        .title(Span::styled(
            title,
            Style::default().fg(if ready { SECONDARY } else { TEXT_MUTED }),
        ));
    let inner = block.inner(area);

    let prompt_style = Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD);
    let text = if app.input.is_empty() {
        Line::from(vec![
            Span::styled(" ", prompt_style),
            Span::styled("Type a message...", Style::default().fg(TEXT_MUTED)),
        ])
    } else {
        Line::from(vec![
            Span::styled(" ", prompt_style),
            Span::styled(app.input.as_str(), Style::default().fg(TEXT)),
        ])
    };

    frame.render_widget(block, area);
    frame.render_widget(Paragraph::new(text), inner);
    if app.viewer.is_none() {
        let width = app.input.chars().count() as u16;
        frame.set_cursor_position((inner.x + 1 + width, inner.y));
    }
}

/// Draw the status bar at the bottom.
fn draw_status_bar(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let status_color = if app.is_busy() {
        PRIMARY
    } else if app.status == "idle" {
        TEXT_MUTED
    } else {
        YELLOW
    };

    let key = Style::default().fg(TEXT_MUTED);
    let hint = Style::default().fg(BORDER);
    let shortcuts = vec![
        Span::styled(" Tab", key),
        Span::styled(" character", hint),
        Span::styled("  ^N", key),
        Span::styled(" new", hint),
        Span::styled("  ^L", key),
        Span::styled(" clear", hint),
        Span::styled("  ^P", key),
        Span::styled(" past", hint),
        Span::styled("  ^E", key),
        Span::styled(" edit", hint),
        Span::styled("  ^O", key),
        Span::styled(" logout", hint),
        Span::styled("  Esc", key),
        Span::styled(" quit", hint),
    ];

    let right_text = format!(" {} ", app.status);
    let right_len = right_text.chars().count() as u16;
    let left_area = Rect {
        width: area.width.saturating_sub(right_len),
        ..area
    };
    let right_area = Rect {
        x: area.x + area.width.saturating_sub(right_len),
        width: right_len.min(area.width),
        ..area
    };

    frame.render_widget(Paragraph::new(Line::from(shortcuts)), left_area);
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            right_text,
            Style::default().fg(status_color),
        ))),
        right_area,
    );
}
