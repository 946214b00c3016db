//! Session orchestration core for Tavern.
//!
//! This crate owns the per-character session cache, the past-session index,
//! greeting synthesis, and the orchestrator state machine. Remote services are
//! reached only through the collaborator traits in [`gateway`].

pub mod cache;
pub mod error;
pub mod gateway;
pub mod greeting;
pub mod orchestrator;
pub mod past;

pub use cache::SessionCache;
pub use error::{CacheError, EditError, GatewayError, SendRejection, TavernCoreError};
/// Collaborator contracts implemented by transports and test fakes.
pub use gateway::{CharacterDirectory, IdentityProvider, LogoutEndpoint, SessionGateway};
pub use greeting::{DEFAULT_GREETING, build_greeting, seed_greeting};
pub use orchestrator::{
    ChatPhase, ChatView, Collaborators, LogoutOutcome, Orchestrator, OrchestratorOptions,
    SelectOutcome, SendOutcome, StartOutcome,
};
pub use past::{PastSessionIndex, PastSessionsLoad, sort_by_recency};
