//! Persisted conversation threads.

use crate::{CharacterId, Message, OwnerId, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One conversation thread tied to a character and an owning user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Server-issued identifier, absent until the session is persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SessionId>,
    /// Owning user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<OwnerId>,
    /// Character this session belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_id: Option<CharacterId>,
    /// Ordered transcript.
    #[serde(default, rename = "messageList")]
    pub messages: Vec<Message>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Session {
    /// In-memory session for a character that has not been persisted yet.
    pub fn provisional(
        owner_id: Option<OwnerId>,
        character_id: impl Into<CharacterId>,
        messages: Vec<Message>,
    ) -> Self {
        Self {
            id: None,
            owner_id,
            character_id: Some(character_id.into()),
            messages,
            created_at: None,
            updated_at: None,
        }
    }

    /// Whether the remote store has issued an identifier.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Timestamp used to order sessions: `updated_at`, then `created_at`,
    /// then the Unix epoch.
    pub fn recency(&self) -> DateTime<Utc> {
        self.updated_at
            .or(self.created_at)
            .unwrap_or(DateTime::UNIX_EPOCH)
    }
}
