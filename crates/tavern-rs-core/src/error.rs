//! Error types for the session orchestration core.

use tavern_rs_protocol::CharacterId;
use thiserror::Error;

/// Failures reported by remote collaborators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The requested record does not exist.
    #[error("not found")]
    NotFound,
    /// The credential was missing, expired, or rejected.
    #[error("unauthorized")]
    Unauthorized,
    /// The remote service answered with an unexpected status.
    #[error("unexpected status {status}: {message}")]
    Status { status: u16, message: String },
    /// The request never completed (connect failure, timeout).
    #[error("transport error: {0}")]
    Transport(String),
    /// The response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Contract violations detected by the session cache.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    /// A write targeted a character with no current session.
    #[error("no current session for character {0}")]
    NoCurrentSession(CharacterId),
}

/// Errors returned by orchestrator operations that require a selection.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TavernCoreError {
    /// No character is active.
    #[error("no character selected")]
    NoCharacterSelected,
}

/// Reasons a send was refused without touching any state.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SendRejection {
    #[error("message is empty")]
    EmptyMessage,
    #[error("no character selected")]
    NoCharacterSelected,
    #[error("session has not been created yet")]
    SessionNotPersisted,
    #[error("a reply is already pending")]
    ReplyPending,
}

/// Edit failures; these are always surfaced to the user.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EditError {
    /// Only persisted messages can be edited.
    #[error("message has no id")]
    MissingId,
    #[error("no character selected")]
    NoCharacterSelected,
    /// The remote update failed; the cached sequence is unchanged.
    #[error("edit failed: {0}")]
    Gateway(#[from] GatewayError),
}
