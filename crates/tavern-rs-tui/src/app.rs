//! Application state for the Tavern TUI.

use chrono::Local;
use log::debug;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use std::cmp::min;
use tavern_rs_core::{
    ChatPhase, ChatView, EditError, LogoutOutcome, PastSessionsLoad, SelectOutcome, SendOutcome,
    SendRejection, StartOutcome, TavernCoreError,
};
use tavern_rs_protocol::{CharacterId, Message, Role, Session};

const USER_COLOR: Color = Color::Rgb(238, 121, 72);
const ASSISTANT_COLOR: Color = Color::Rgb(120, 200, 230);
const MUTED: Color = Color::Rgb(128, 128, 128);

/// Past-session picker state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PastViewer {
    pub selected: usize,
}

/// Top-level application state for the TUI.
///
/// Chat data is never owned here: `view` is refreshed from the orchestrator
/// before every frame.
pub struct App {
    /// Latest orchestrator snapshot.
    pub view: ChatView,
    /// Input buffer; mirrors the orchestrator draft unless an edit is open.
    pub input: String,
    /// Message being edited, if any.
    pub editing: Option<Message>,
    /// Open past-session picker.
    pub viewer: Option<PastViewer>,
    /// Status line text.
    pub status: String,
    /// Current scroll offset.
    pub scroll: u16,
    /// Whether to auto-scroll to the bottom.
    pub auto_scroll: bool,
    /// Maximum scroll offset for the chat view.
    pub chat_max_scroll: u16,
    /// Advances on every tick while a request is outstanding.
    pub spinner: usize,
}

impl App {
    pub fn new() -> Self {
        Self {
            view: ChatView::default(),
            input: String::new(),
            editing: None,
            viewer: None,
            status: "idle".to_string(),
            scroll: 0,
            auto_scroll: true,
            chat_max_scroll: 0,
            spinner: 0,
        }
    }

    /// Replace the snapshot, keeping the picker selection in range.
    pub fn sync(&mut self, view: ChatView) {
        if self.editing.is_none() {
            self.input = view.draft.clone();
        }
        if view.session.as_ref().map(|s| s.id) != self.view.session.as_ref().map(|s| s.id)
            || view.active != self.view.active
        {
            self.enable_auto_scroll();
        }
        self.view = view;
        if let Some(viewer) = self.viewer.as_mut() {
            let len = self.view.past_sessions.len();
            viewer.selected = min(viewer.selected, len.saturating_sub(1));
        }
    }

    pub fn push_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    /// Whether the active character is waiting on the network.
    pub fn is_busy(&self) -> bool {
        matches!(self.view.phase, ChatPhase::Resolving | ChatPhase::Sending)
    }

    pub fn tick(&mut self) {
        if self.is_busy() {
            self.spinner = self.spinner.wrapping_add(1);
        }
    }

    /// Character `step` places away from the active one, wrapping around.
    pub fn neighbor_character(&self, step: isize) -> Option<CharacterId> {
        let characters = &self.view.characters;
        if characters.is_empty() {
            return None;
        }
        let len = characters.len() as isize;
        let next = match self.view.active.as_deref() {
            Some(active) => match characters.iter().position(|c| c.id == active) {
                Some(index) => (index as isize + step).rem_euclid(len),
                None => 0,
            },
            None => 0,
        };
        characters.get(next as usize).map(|c| c.id.clone())
    }

    /// Open the most recent persisted user message for editing.
    pub fn begin_edit(&mut self) -> bool {
        let Some(message) = self
            .view
            .messages()
            .iter()
            .rev()
            .find(|message| message.role == Role::User && message.id.is_some())
            .cloned()
        else {
            return false;
        };
        debug!("editing message (message_id={:?})", message.id);
        self.input = message.content.clone();
        self.editing = Some(message);
        true
    }

    /// Close the edit and return the message carrying the new content.
    pub fn take_edit(&mut self) -> Option<Message> {
        let mut message = self.editing.take()?;
        message.content = std::mem::replace(&mut self.input, self.view.draft.clone());
        Some(message)
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
        self.input = self.view.draft.clone();
    }

    pub fn open_viewer(&mut self) {
        self.viewer = Some(PastViewer::default());
    }

    pub fn close_viewer(&mut self) {
        self.viewer = None;
    }

    pub fn viewer_up(&mut self) {
        if let Some(viewer) = self.viewer.as_mut() {
            viewer.selected = viewer.selected.saturating_sub(1);
        }
    }

    pub fn viewer_down(&mut self) {
        let len = self.view.past_sessions.len();
        if let Some(viewer) = self.viewer.as_mut()
            && viewer.selected + 1 < len
        {
            viewer.selected += 1;
        }
    }

    pub fn selected_past(&self) -> Option<Session> {
        let viewer = self.viewer?;
        self.view.past_sessions.get(viewer.selected).cloned()
    }

    /// Transcript lines for the chat pane.
    pub fn render_lines(&self) -> Vec<Line<'static>> {
        let speaker = self
            .view
            .active_character()
            .map(|character| character.name.clone())
            .unwrap_or_else(|| "assistant".to_string());
        let mut lines = Vec::new();
        for message in self.view.messages() {
            let (label, color) = match message.role {
                Role::User => ("you".to_string(), USER_COLOR),
                Role::Assistant => (speaker.clone(), ASSISTANT_COLOR),
            };
            let mut header = vec![Span::styled(
                label,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )];
            if let Some(timestamp) = message.timestamp {
                header.push(Span::styled(
                    format!("  {}", timestamp.with_timezone(&Local).format("%H:%M")),
                    Style::default().fg(MUTED),
                ));
            }
            lines.push(Line::from(header));
            for text in message.content.lines() {
                lines.push(Line::from(format!("  {text}")));
            }
            lines.push(Line::from(""));
        }
        if self.view.phase == ChatPhase::Sending {
            let dots = ".".repeat(self.spinner % 3 + 1);
            lines.push(Line::from(Span::styled(
                format!("{speaker} is typing{dots}"),
                Style::default().fg(MUTED).add_modifier(Modifier::ITALIC),
            )));
        }
        lines
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.auto_scroll = false;
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = min(self.scroll.saturating_add(lines), self.chat_max_scroll);
        if self.scroll >= self.chat_max_scroll {
            self.auto_scroll = true;
        }
    }

    pub fn scroll_to_top(&mut self) {
        self.auto_scroll = false;
        self.scroll = 0;
    }

    pub fn enable_auto_scroll(&mut self) {
        self.auto_scroll = true;
        self.scroll = self.chat_max_scroll;
    }

    /// Update scroll bounds after layout changes; stays pinned to the bottom
    /// only while auto-scroll is on.
    pub fn update_scroll_bounds(&mut self, max_scroll: u16) {
        self.chat_max_scroll = max_scroll;
        if self.auto_scroll {
            self.scroll = max_scroll;
        } else {
            self.scroll = min(self.scroll, max_scroll);
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

pub fn select_status(character_id: &str, outcome: &SelectOutcome) -> String {
    match outcome {
        SelectOutcome::FromCache | SelectOutcome::Resumed => format!("chatting with {character_id}"),
        SelectOutcome::Started(start) => start_status(start),
        SelectOutcome::Superseded => "selection superseded".to_string(),
    }
}

pub fn start_status(outcome: &StartOutcome) -> String {
    match outcome {
        StartOutcome::Confirmed(_) => "new chat started".to_string(),
        StartOutcome::Unconfirmed { cause } => {
            format!("chat not saved ({cause}); reselect the character to retry")
        }
        StartOutcome::Superseded => "new chat superseded".to_string(),
    }
}

pub fn start_error_status(error: &TavernCoreError) -> String {
    format!("cannot start chat: {error}")
}

pub fn send_status(result: &Result<SendOutcome, SendRejection>) -> String {
    match result {
        Ok(SendOutcome::Replied(_)) => "idle".to_string(),
        Ok(SendOutcome::Degraded { cause }) => format!("reply failed: {cause}"),
        Ok(SendOutcome::Discarded) => "reply discarded; session changed".to_string(),
        Err(rejection) => format!("not sent: {rejection}"),
    }
}

pub fn edit_status(result: &Result<Message, EditError>) -> String {
    match result {
        Ok(_) => "message updated".to_string(),
        Err(error) => format!("edit not saved: {error}"),
    }
}

pub fn past_status(load: &PastSessionsLoad) -> String {
    match load {
        PastSessionsLoad::Loaded(sessions) if sessions.is_empty() => {
            "no past sessions".to_string()
        }
        PastSessionsLoad::Loaded(sessions) => format!("{} past sessions", sessions.len()),
        PastSessionsLoad::Recovered { cause } => format!("past sessions unavailable: {cause}"),
    }
}

pub fn logout_status(outcome: &LogoutOutcome) -> String {
    match outcome {
        LogoutOutcome::Acknowledged => "logged out".to_string(),
        LogoutOutcome::LocalOnly { cause } => format!("logged out locally ({cause})"),
    }
}
