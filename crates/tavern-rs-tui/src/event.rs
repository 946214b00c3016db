//! TUI event types for input and orchestrator results.

use crossterm::event::KeyEvent;
use tavern_rs_core::{
    EditError, GatewayError, LogoutOutcome, PastSessionsLoad, SelectOutcome, SendOutcome,
    SendRejection, StartOutcome, TavernCoreError,
};
use tavern_rs_protocol::{CharacterId, Message};

/// Application event emitted by input handlers or spawned orchestrator tasks.
#[derive(Debug)]
pub enum AppEvent {
    /// Keyboard input event.
    Input(KeyEvent),
    /// Scroll event in the chat view.
    Scroll(i16),
    /// Periodic redraw while a request is outstanding.
    Tick,
    /// Character directory finished loading.
    Characters(Result<usize, GatewayError>),
    /// A character selection resolved.
    Selected {
        character_id: CharacterId,
        outcome: SelectOutcome,
    },
    /// A new chat was created or failed to persist.
    Started(Result<StartOutcome, TavernCoreError>),
    /// A send finished.
    Sent(Result<SendOutcome, SendRejection>),
    /// An edit finished.
    Edited(Result<Message, EditError>),
    /// Past sessions for a character finished loading.
    PastSessions {
        character_id: CharacterId,
        load: PastSessionsLoad,
    },
    /// Logout finished; the loop exits after handling it.
    LoggedOut(LogoutOutcome),
}
