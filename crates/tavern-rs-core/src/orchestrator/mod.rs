//! Session orchestrator: the per-character chat state machine.
//!
//! Every method takes `&self`. Internal state sits behind a mutex that is
//! released before any remote call, so transitions may run on spawned tasks
//! while the front-end keeps reading snapshots. Each transition that replaces
//! a character's current session takes a fresh generation ticket; a response
//! whose ticket is no longer current is discarded instead of overwriting
//! newer state.

mod outcome;
mod state;

pub use outcome::{ChatPhase, ChatView, LogoutOutcome, SelectOutcome, SendOutcome, StartOutcome};

use crate::cache::SessionCache;
use crate::error::{EditError, GatewayError, SendRejection, TavernCoreError};
use crate::gateway::{CharacterDirectory, IdentityProvider, LogoutEndpoint, SessionGateway};
use crate::greeting::seed_greeting;
use crate::past::{PastSessionIndex, PastSessionsLoad};
use chrono::Utc;
use log::{debug, info, warn};
use parking_lot::Mutex;
use state::{ChatState, Generation};
use std::sync::Arc;
use tavern_rs_config::ChatConfig;
use tavern_rs_protocol::{
    Character, CharacterId, CreateSessionRequest, GenerateReplyRequest, Message, Role, Session,
};

/// Texts the orchestrator synthesizes on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorOptions {
    pub fallback_greeting: String,
    pub send_failure_reply: String,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self::from(&ChatConfig::default())
    }
}

impl From<&ChatConfig> for OrchestratorOptions {
    fn from(config: &ChatConfig) -> Self {
        Self {
            fallback_greeting: config.fallback_greeting.clone(),
            send_failure_reply: config.send_failure_reply.clone(),
        }
    }
}

/// Remote collaborators the orchestrator drives.
#[derive(Clone)]
pub struct Collaborators {
    pub directory: Arc<dyn CharacterDirectory>,
    pub gateway: Arc<dyn SessionGateway>,
    pub identity: Arc<dyn IdentityProvider>,
    pub logout: Arc<dyn LogoutEndpoint>,
}

pub struct Orchestrator {
    collaborators: Collaborators,
    options: OrchestratorOptions,
    cache: SessionCache,
    past: PastSessionIndex,
    state: Mutex<ChatState>,
}

impl Orchestrator {
    pub fn new(collaborators: Collaborators, options: OrchestratorOptions) -> Self {
        let cache = SessionCache::new();
        let past = PastSessionIndex::new(collaborators.gateway.clone(), cache.clone());
        Self {
            collaborators,
            options,
            cache,
            past,
            state: Mutex::new(ChatState::default()),
        }
    }

    /// Reload the character directory.
    pub async fn refresh_characters(&self) -> Result<Vec<Character>, GatewayError> {
        let characters = self.collaborators.directory.list().await?;
        info!("loaded characters (count={})", characters.len());
        self.state.lock().characters = characters.clone();
        Ok(characters)
    }

    /// Load characters and select the first one if nothing is selected yet.
    pub async fn bootstrap(&self) -> Result<Option<SelectOutcome>, GatewayError> {
        let characters = self.refresh_characters().await?;
        if self.active_character().is_some() {
            return Ok(None);
        }
        let Some(first) = characters.first() else {
            info!("character directory is empty");
            return Ok(None);
        };
        Ok(Some(self.select_character(&first.id).await))
    }

    /// Make `character_id` active, resolving its current session.
    ///
    /// A cached session is used as-is unless its creation failed, in which
    /// case resolution is retried. Otherwise the latest remote session is
    /// fetched; if that fails or there is no signed-in owner, a new session is
    /// started.
    pub async fn select_character(&self, character_id: &str) -> SelectOutcome {
        let generation = {
            let mut state = self.state.lock();
            state.active = Some(character_id.to_string());
            if self.cache.has_current(character_id) && !state.is_unconfirmed(character_id) {
                if state.phase(character_id) != ChatPhase::Sending {
                    state.set_phase(character_id, ChatPhase::Active);
                }
                debug!("selected cached session (character_id={})", character_id);
                return SelectOutcome::FromCache;
            }
            state.set_phase(character_id, ChatPhase::Resolving);
            state.bump(character_id)
        };
        info!("resolving session (character_id={})", character_id);

        let Some(owner_id) = self.collaborators.identity.owner_id() else {
            debug!(
                "no owner id; starting new session (character_id={})",
                character_id
            );
            return self.start_with(character_id, generation).await.into();
        };

        match self
            .collaborators
            .gateway
            .latest_session(character_id, &owner_id)
            .await
        {
            Ok(mut session) => {
                let mut state = self.state.lock();
                if !state.is_current(character_id, generation) {
                    debug!("discarding superseded fetch (character_id={})", character_id);
                    return SelectOutcome::Superseded;
                }
                let character = state.character(character_id);
                let mut messages = std::mem::take(&mut session.messages);
                seed_greeting(
                    &mut messages,
                    character.as_ref(),
                    &self.options.fallback_greeting,
                );
                if session.character_id.is_none() {
                    session.character_id = Some(character_id.to_string());
                }
                info!(
                    "resumed session (character_id={}, session_id={:?}, messages={})",
                    character_id,
                    session.id,
                    messages.len()
                );
                if session.id.is_none() {
                    warn!(
                        "resumed session has no id; retrying on next selection (character_id={})",
                        character_id
                    );
                    state.mark_unconfirmed(character_id);
                }
                self.cache.set_current(character_id, session, messages);
                state.set_phase(character_id, ChatPhase::Active);
                SelectOutcome::Resumed
            }
            Err(err) => {
                match err {
                    GatewayError::NotFound => debug!(
                        "no remote session; starting new one (character_id={})",
                        character_id
                    ),
                    other => warn!(
                        "fetching latest session failed; starting new one (character_id={}, error={})",
                        character_id, other
                    ),
                }
                self.start_with(character_id, generation).await.into()
            }
        }
    }

    /// Start a fresh session for the active character.
    pub async fn start_new_chat(&self) -> Result<StartOutcome, TavernCoreError> {
        let (character_id, generation) = {
            let mut state = self.state.lock();
            let character_id = state
                .active
                .clone()
                .ok_or(TavernCoreError::NoCharacterSelected)?;
            let generation = state.bump(&character_id);
            (character_id, generation)
        };
        Ok(self.start_with(&character_id, generation).await)
    }

    /// Drop the active character's current session and start a new one.
    /// Past sessions are untouched.
    pub async fn clear_chat(&self) -> Result<StartOutcome, TavernCoreError> {
        let (character_id, generation) = {
            let mut state = self.state.lock();
            let character_id = state
                .active
                .clone()
                .ok_or(TavernCoreError::NoCharacterSelected)?;
            let generation = state.bump(&character_id);
            self.cache.invalidate(&character_id);
            (character_id, generation)
        };
        info!("cleared chat (character_id={})", character_id);
        Ok(self.start_with(&character_id, generation).await)
    }

    /// Cache a provisional session, then persist it.
    ///
    /// The seeded greeting goes out in `messageList`, so the backend stores it
    /// with the session. The cached greeting keeps no message id until the
    /// session is fetched again, which leaves it out of `edit_message`.
    async fn start_with(&self, character_id: &str, generation: Generation) -> StartOutcome {
        let owner_id = self.collaborators.identity.owner_id();
        let messages = {
            let mut state = self.state.lock();
            if !state.is_current(character_id, generation) {
                return StartOutcome::Superseded;
            }
            let character = state.character(character_id);
            let mut messages = Vec::new();
            seed_greeting(
                &mut messages,
                character.as_ref(),
                &self.options.fallback_greeting,
            );
            self.cache.set_current(
                character_id,
                Session::provisional(owner_id.clone(), character_id, Vec::new()),
                messages.clone(),
            );
            state.set_phase(character_id, ChatPhase::Active);
            messages
        };

        let request = CreateSessionRequest {
            owner_id,
            character_id: character_id.to_string(),
            message_list: messages,
        };
        let result = self.collaborators.gateway.create_session(request).await;

        let mut state = self.state.lock();
        if !state.is_current(character_id, generation) {
            debug!("discarding superseded create (character_id={})", character_id);
            return StartOutcome::Superseded;
        }
        let persisted = match result {
            Ok(persisted) => persisted,
            Err(cause) => {
                warn!(
                    "creating session failed; keeping provisional session (character_id={}, error={})",
                    character_id, cause
                );
                state.mark_unconfirmed(character_id);
                return StartOutcome::Unconfirmed { cause };
            }
        };
        let Some(session_id) = persisted.id else {
            warn!(
                "created session has no id; keeping provisional session (character_id={})",
                character_id
            );
            state.mark_unconfirmed(character_id);
            return StartOutcome::Unconfirmed {
                cause: GatewayError::Decode("created session has no id".to_string()),
            };
        };
        if self.cache.confirm(character_id, persisted).is_err() {
            return StartOutcome::Superseded;
        }
        info!(
            "session created (character_id={}, session_id={})",
            character_id, session_id
        );
        StartOutcome::Confirmed(session_id)
    }

    /// Send a user message on the active character's current session.
    ///
    /// The user message is appended before the request is issued. Generation
    /// failures are masked with the configured failure reply.
    pub async fn send_message(&self, text: &str) -> Result<SendOutcome, SendRejection> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SendRejection::EmptyMessage);
        }

        let (character_id, session_id, history) = {
            let mut state = self.state.lock();
            let character_id = state
                .active
                .clone()
                .ok_or(SendRejection::NoCharacterSelected)?;
            if state.phase(&character_id) == ChatPhase::Sending {
                return Err(SendRejection::ReplyPending);
            }
            let session = self
                .cache
                .current(&character_id)
                .ok_or(SendRejection::SessionNotPersisted)?;
            let session_id = session.id.ok_or(SendRejection::SessionNotPersisted)?;
            self.cache
                .append_message(&character_id, Message::user(text))
                .map_err(|_| SendRejection::SessionNotPersisted)?;
            state.draft.clear();
            state.set_phase(&character_id, ChatPhase::Sending);
            (character_id, session_id, session.messages)
        };
        debug!(
            "sending message (character_id={}, session_id={}, history={})",
            character_id,
            session_id,
            history.len()
        );

        let request = GenerateReplyRequest {
            chat_id: session_id,
            character_id: character_id.clone(),
            history,
            user_message: text.to_string(),
        };
        let result = self.collaborators.gateway.append_and_generate(request).await;

        let mut state = self.state.lock();
        if self.cache.current_id(&character_id) != Some(session_id) {
            info!(
                "discarding reply for replaced session (character_id={}, session_id={})",
                character_id, session_id
            );
            return Ok(SendOutcome::Discarded);
        }
        let (reply, outcome) = match result {
            Ok(mut reply) => {
                reply.role = Role::Assistant;
                if reply.timestamp.is_none() {
                    reply.timestamp = Some(Utc::now());
                }
                (reply.clone(), SendOutcome::Replied(reply))
            }
            Err(cause) => {
                warn!(
                    "reply generation failed (character_id={}, session_id={}, error={})",
                    character_id, session_id, cause
                );
                (
                    Message::assistant(self.options.send_failure_reply.clone()),
                    SendOutcome::Degraded { cause },
                )
            }
        };
        if self.cache.append_message(&character_id, reply).is_err() {
            return Ok(SendOutcome::Discarded);
        }
        state.set_phase(&character_id, ChatPhase::Active);
        Ok(outcome)
    }

    /// Persist an edited message and replace it in place on success.
    pub async fn edit_message(&self, message: Message) -> Result<Message, EditError> {
        let message_id = message.id.ok_or(EditError::MissingId)?;
        let character_id = self
            .active_character()
            .ok_or(EditError::NoCharacterSelected)?;

        let mut updated = self
            .collaborators
            .gateway
            .update_message(message)
            .await
            .inspect_err(|err| {
                warn!(
                    "editing message failed (character_id={}, message_id={}, error={})",
                    character_id, message_id, err
                )
            })?;
        if updated.id.is_none() {
            updated.id = Some(message_id);
        }

        if self.cache.replace_message(&character_id, updated.clone()) {
            info!(
                "message edited (character_id={}, message_id={})",
                character_id, message_id
            );
        }
        Ok(updated)
    }

    /// Reload the archived sessions of a character.
    pub async fn load_past_sessions(&self, character_id: &str) -> PastSessionsLoad {
        let owner_id = self.collaborators.identity.owner_id();
        self.past.load(character_id, owner_id.as_deref()).await
    }

    /// Make an archived session current for its character.
    ///
    /// Sessions without both an id and a character id are ignored.
    pub fn select_past_session(&self, mut session: Session) -> bool {
        let (Some(session_id), Some(character_id)) = (session.id, session.character_id.clone())
        else {
            debug!("ignoring past session without id or character");
            return false;
        };

        let mut state = self.state.lock();
        let character = state.character(&character_id);
        let mut messages = std::mem::take(&mut session.messages);
        seed_greeting(
            &mut messages,
            character.as_ref(),
            &self.options.fallback_greeting,
        );
        state.bump(&character_id);
        self.cache.set_current(&character_id, session, messages);
        state.set_phase(&character_id, ChatPhase::Active);
        state.active = Some(character_id.clone());
        info!(
            "restored past session (character_id={}, session_id={})",
            character_id, session_id
        );
        true
    }

    /// End the signed-in session. Local state is cleared even when the remote
    /// call fails.
    pub async fn logout(&self) -> LogoutOutcome {
        let outcome = match self.collaborators.logout.logout().await {
            Ok(()) => LogoutOutcome::Acknowledged,
            Err(cause) => {
                warn!("remote logout failed (error={})", cause);
                LogoutOutcome::LocalOnly { cause }
            }
        };
        self.collaborators.identity.clear();
        let mut state = self.state.lock();
        state.reset();
        self.cache.clear();
        self.past.clear();
        info!("logged out");
        outcome
    }

    pub fn is_authenticated(&self) -> bool {
        self.collaborators.identity.is_authenticated()
    }

    pub fn characters(&self) -> Vec<Character> {
        self.state.lock().characters.clone()
    }

    pub fn active_character(&self) -> Option<CharacterId> {
        self.state.lock().active.clone()
    }

    pub fn phase(&self, character_id: &str) -> ChatPhase {
        self.state.lock().phase(character_id)
    }

    pub fn messages(&self, character_id: &str) -> Vec<Message> {
        self.cache.messages(character_id).unwrap_or_default()
    }

    pub fn current_session(&self, character_id: &str) -> Option<Session> {
        self.cache.current(character_id)
    }

    pub fn past_sessions(&self, character_id: &str) -> Vec<Session> {
        self.past.get(character_id)
    }

    pub fn draft(&self) -> String {
        self.state.lock().draft.clone()
    }

    pub fn set_draft(&self, draft: impl Into<String>) {
        self.state.lock().draft = draft.into();
    }

    /// Copy of the state a front-end renders, taken under one lock.
    pub fn snapshot(&self) -> ChatView {
        let state = self.state.lock();
        let (phase, session, past_sessions) = match state.active.as_deref() {
            Some(active) => (
                state.phase(active),
                self.cache.current(active),
                self.past.get(active),
            ),
            None => (ChatPhase::Unselected, None, Vec::new()),
        };
        ChatView {
            characters: state.characters.clone(),
            active: state.active.clone(),
            phase,
            session,
            past_sessions,
            draft: state.draft.clone(),
        }
    }
}

impl From<StartOutcome> for SelectOutcome {
    fn from(outcome: StartOutcome) -> Self {
        match outcome {
            StartOutcome::Superseded => SelectOutcome::Superseded,
            other => SelectOutcome::Started(other),
        }
    }
}
