//! Collaborator contracts consumed by the orchestrator.

use crate::error::GatewayError;
use async_trait::async_trait;
use tavern_rs_protocol::{
    Character, CreateSessionRequest, GenerateReplyRequest, Message, OwnerId, Session,
};

/// Read-only source of character definitions.
#[async_trait]
pub trait CharacterDirectory: Send + Sync {
    async fn list(&self) -> Result<Vec<Character>, GatewayError>;
}

/// Remote session store and reply generator.
#[async_trait]
pub trait SessionGateway: Send + Sync {
    /// Persist a new session and return the stored record.
    async fn create_session(&self, request: CreateSessionRequest)
    -> Result<Session, GatewayError>;

    /// Most recent session for a character; `NotFound` when none exists.
    async fn latest_session(
        &self,
        character_id: &str,
        owner_id: &str,
    ) -> Result<Session, GatewayError>;

    /// Every session the owner has with a character.
    async fn list_sessions(
        &self,
        character_id: &str,
        owner_id: &str,
    ) -> Result<Vec<Session>, GatewayError>;

    /// Append the user message to the session and return the assistant reply.
    async fn append_and_generate(
        &self,
        request: GenerateReplyRequest,
    ) -> Result<Message, GatewayError>;

    /// Replace a persisted message and return the stored version.
    async fn update_message(&self, message: Message) -> Result<Message, GatewayError>;
}

/// Local credential state.
pub trait IdentityProvider: Send + Sync {
    fn owner_id(&self) -> Option<OwnerId>;
    fn is_authenticated(&self) -> bool;
    /// Forget the stored credential.
    fn clear(&self);
}

/// Remote session termination.
#[async_trait]
pub trait LogoutEndpoint: Send + Sync {
    async fn logout(&self) -> Result<(), GatewayError>;
}
