//! Wire types shared between the Tavern client, core, and front-end.
//!
//! Field names follow the backend's camelCase JSON so records can be passed
//! through to the remote store unchanged.

mod character;
mod message;
mod request;
mod session;

pub use character::Character;
pub use message::{Message, Role};
pub use request::{CreateSessionRequest, GenerateReplyRequest};
pub use session::Session;

use uuid::Uuid;

/// Identifier of a character in the remote directory.
pub type CharacterId = String;
/// Identifier of the user owning a session.
pub type OwnerId = String;
/// Server-issued session identifier.
pub type SessionId = Uuid;
/// Server-issued message identifier.
pub type MessageId = Uuid;
