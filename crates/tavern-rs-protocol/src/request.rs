//! Request payloads sent to the remote session store.

use crate::{CharacterId, Message, OwnerId, SessionId};
use serde::{Deserialize, Serialize};

/// Body of a "create session" request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<OwnerId>,
    pub character_id: CharacterId,
    pub message_list: Vec<Message>,
}

/// Body of an "append user message and generate a reply" request.
///
/// `history` excludes the new user message, which travels in `user_message`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReplyRequest {
    pub chat_id: SessionId,
    pub character_id: CharacterId,
    pub history: Vec<Message>,
    pub user_message: String,
}
