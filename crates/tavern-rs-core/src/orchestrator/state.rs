//! Mutable orchestrator state guarded by a single mutex.

use super::ChatPhase;
use std::collections::{HashMap, HashSet};
use tavern_rs_protocol::{Character, CharacterId};

/// Ticket issued to a transition; responses carrying a stale ticket are
/// dropped.
pub(crate) type Generation = u64;

#[derive(Default)]
pub(crate) struct ChatState {
    pub(crate) characters: Vec<Character>,
    pub(crate) active: Option<CharacterId>,
    pub(crate) draft: String,
    phases: HashMap<CharacterId, ChatPhase>,
    generations: HashMap<CharacterId, Generation>,
    /// Characters whose cached session failed to persist.
    unconfirmed: HashSet<CharacterId>,
    /// Monotonic across logouts so an old ticket never matches again.
    next_generation: Generation,
}

impl ChatState {
    pub(crate) fn phase(&self, character_id: &str) -> ChatPhase {
        self.phases
            .get(character_id)
            .copied()
            .unwrap_or_default()
    }

    pub(crate) fn set_phase(&mut self, character_id: &str, phase: ChatPhase) {
        self.phases.insert(character_id.to_string(), phase);
    }

    /// Start a new transition for the character, superseding older ones.
    pub(crate) fn bump(&mut self, character_id: &str) -> Generation {
        self.unconfirmed.remove(character_id);
        self.next_generation += 1;
        self.generations
            .insert(character_id.to_string(), self.next_generation);
        self.next_generation
    }

    pub(crate) fn is_current(&self, character_id: &str, generation: Generation) -> bool {
        self.generations.get(character_id) == Some(&generation)
    }

    pub(crate) fn mark_unconfirmed(&mut self, character_id: &str) {
        self.unconfirmed.insert(character_id.to_string());
    }

    pub(crate) fn is_unconfirmed(&self, character_id: &str) -> bool {
        self.unconfirmed.contains(character_id)
    }

    pub(crate) fn character(&self, character_id: &str) -> Option<Character> {
        self.characters
            .iter()
            .find(|character| character.id == character_id)
            .cloned()
    }

    /// Forget everything tied to the signed-in user.
    pub(crate) fn reset(&mut self) {
        self.active = None;
        self.draft.clear();
        self.phases.clear();
        self.generations.clear();
        self.unconfirmed.clear();
    }
}
