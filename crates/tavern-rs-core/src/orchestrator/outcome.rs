//! Result types for orchestrator transitions.
//!
//! Recovered failures are variants here; surfaced failures are `Err`.

use crate::error::GatewayError;
use tavern_rs_protocol::{Character, CharacterId, Message, Session, SessionId};

/// Per-character interaction phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatPhase {
    #[default]
    Unselected,
    /// Awaiting the fetch-or-create decision.
    Resolving,
    /// Ready for interaction.
    Active,
    /// An assistant reply is outstanding.
    Sending,
}

/// How a selection resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectOutcome {
    /// Served from the cache without a network call.
    FromCache,
    /// The latest remote session became current.
    Resumed,
    /// No usable remote session; a new one was started.
    Started(StartOutcome),
    /// A newer transition for the character replaced this one.
    Superseded,
}

/// How a new-session start resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    /// The session was persisted under this id.
    Confirmed(SessionId),
    /// Creation failed; the provisional session stays cached and sending is
    /// refused until a later selection creates it.
    Unconfirmed { cause: GatewayError },
    Superseded,
}

/// How an accepted send resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// The assistant reply was appended.
    Replied(Message),
    /// Generation failed; the failure reply was appended instead.
    Degraded { cause: GatewayError },
    /// The session was replaced while the request was outstanding.
    Discarded,
}

/// Result of a logout. Local state is cleared in every case.
#[derive(Debug, Clone, PartialEq)]
pub enum LogoutOutcome {
    Acknowledged,
    LocalOnly { cause: GatewayError },
}

/// Consistent copy of everything a front-end renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatView {
    pub characters: Vec<Character>,
    pub active: Option<CharacterId>,
    pub phase: ChatPhase,
    pub session: Option<Session>,
    pub past_sessions: Vec<Session>,
    pub draft: String,
}

impl ChatView {
    pub fn messages(&self) -> &[Message] {
        self.session
            .as_ref()
            .map(|session| session.messages.as_slice())
            .unwrap_or_default()
    }

    pub fn active_character(&self) -> Option<&Character> {
        let active = self.active.as_deref()?;
        self.characters.iter().find(|character| character.id == active)
    }

    /// Whether a send would currently be accepted, ignoring the draft text.
    pub fn can_send(&self) -> bool {
        self.phase == ChatPhase::Active
            && self
                .session
                .as_ref()
                .is_some_and(|session| session.is_persisted())
    }
}
