//! Per-character index of archived sessions.

use crate::cache::SessionCache;
use crate::error::GatewayError;
use crate::gateway::SessionGateway;
use log::{debug, warn};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tavern_rs_protocol::{CharacterId, Session};

/// Result of a past-session load.
#[derive(Debug, Clone, PartialEq)]
pub enum PastSessionsLoad {
    /// Sessions fetched, filtered, and sorted.
    Loaded(Vec<Session>),
    /// The fetch failed; the index now holds an empty list for the character.
    Recovered { cause: GatewayError },
}

impl PastSessionsLoad {
    /// Sessions now indexed for the character.
    pub fn sessions(&self) -> &[Session] {
        match self {
            PastSessionsLoad::Loaded(sessions) => sessions,
            PastSessionsLoad::Recovered { .. } => &[],
        }
    }
}

/// Sort newest first by `updated_at`, then `created_at`. Undated sessions go
/// last and keep their relative order.
pub fn sort_by_recency(sessions: &mut [Session]) {
    sessions.sort_by_key(|session| std::cmp::Reverse(session.recency()));
}

#[derive(Default)]
struct IndexState {
    entries: HashMap<CharacterId, Vec<Session>>,
    /// Bumped by `clear` so loads started before a logout are dropped.
    epoch: u64,
}

/// Archived sessions per character, loaded on demand.
#[derive(Clone)]
pub struct PastSessionIndex {
    gateway: Arc<dyn SessionGateway>,
    cache: SessionCache,
    state: Arc<RwLock<IndexState>>,
}

impl PastSessionIndex {
    pub fn new(gateway: Arc<dyn SessionGateway>, cache: SessionCache) -> Self {
        Self {
            gateway,
            cache,
            state: Arc::new(RwLock::new(IndexState::default())),
        }
    }

    /// Fetch the owner's sessions for a character, excluding the current one.
    ///
    /// The result overwrites anything previously indexed for the character.
    /// Without an owner the fetch is skipped and treated as unauthorized.
    pub async fn load(&self, character_id: &str, owner_id: Option<&str>) -> PastSessionsLoad {
        let epoch = self.state.read().epoch;
        let result = match owner_id {
            Some(owner_id) => self.gateway.list_sessions(character_id, owner_id).await,
            None => Err(GatewayError::Unauthorized),
        };

        let (sessions, outcome) = match result {
            Ok(mut sessions) => {
                // Read the live current id after the await: it may have moved.
                if let Some(current) = self.cache.current_id(character_id) {
                    sessions.retain(|session| session.id != Some(current));
                }
                sort_by_recency(&mut sessions);
                (sessions.clone(), PastSessionsLoad::Loaded(sessions))
            }
            Err(cause) => {
                warn!(
                    "past sessions unavailable (character_id={}, error={})",
                    character_id, cause
                );
                (Vec::new(), PastSessionsLoad::Recovered { cause })
            }
        };

        let mut state = self.state.write();
        if state.epoch != epoch {
            debug!(
                "not indexing past sessions loaded before clear (character_id={})",
                character_id
            );
            return outcome;
        }
        debug!(
            "indexed past sessions (character_id={}, count={})",
            character_id,
            sessions.len()
        );
        state.entries.insert(character_id.to_string(), sessions);
        outcome
    }

    /// Indexed sessions, or an empty list if never loaded.
    pub fn get(&self, character_id: &str) -> Vec<Session> {
        self.state
            .read()
            .entries
            .get(character_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_loaded(&self, character_id: &str) -> bool {
        self.state.read().entries.contains_key(character_id)
    }

    pub fn invalidate(&self, character_id: &str) -> bool {
        self.state.write().entries.remove(character_id).is_some()
    }

    pub fn clear(&self) {
        let mut state = self.state.write();
        state.entries.clear();
        state.epoch += 1;
    }
}
