//! Per-character store of the current session and its message sequence.

use crate::error::CacheError;
use log::{debug, warn};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tavern_rs_protocol::{CharacterId, Message, Session, SessionId};

/// Current-session cache keyed by character.
///
/// Each entry owns exactly one message sequence: the `messages` of the cached
/// `Session`. All methods are synchronous and never straddle an `.await`.
#[derive(Clone, Default)]
pub struct SessionCache {
    sessions: Arc<RwLock<HashMap<CharacterId, Session>>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_current(&self, character_id: &str) -> bool {
        self.sessions.read().contains_key(character_id)
    }

    /// Snapshot of the current session, messages included.
    pub fn current(&self, character_id: &str) -> Option<Session> {
        self.sessions.read().get(character_id).cloned()
    }

    pub fn messages(&self, character_id: &str) -> Option<Vec<Message>> {
        self.sessions
            .read()
            .get(character_id)
            .map(|session| session.messages.clone())
    }

    /// Persisted id of the current session, if it has one.
    pub fn current_id(&self, character_id: &str) -> Option<SessionId> {
        self.sessions
            .read()
            .get(character_id)
            .and_then(|session| session.id)
    }

    /// Replace the session and its message sequence for `character_id`.
    pub fn set_current(&self, character_id: &str, mut session: Session, messages: Vec<Message>) {
        debug!(
            "caching current session (character_id={}, session_id={:?}, messages={})",
            character_id,
            session.id,
            messages.len()
        );
        session.messages = messages;
        self.sessions
            .write()
            .insert(character_id.to_string(), session);
    }

    /// Drop the current entry. Returns whether one existed.
    pub fn invalidate(&self, character_id: &str) -> bool {
        let removed = self.sessions.write().remove(character_id).is_some();
        debug!(
            "invalidated current session (character_id={}, removed={})",
            character_id, removed
        );
        removed
    }

    /// Append to the cached sequence in place.
    ///
    /// Appending without a current session is a caller bug; it is reported and
    /// logged, and the cache is left untouched.
    pub fn append_message(&self, character_id: &str, message: Message) -> Result<(), CacheError> {
        let mut sessions = self.sessions.write();
        let Some(session) = sessions.get_mut(character_id) else {
            warn!(
                "append without current session (character_id={}, role={})",
                character_id,
                message.role.as_str()
            );
            return Err(CacheError::NoCurrentSession(character_id.to_string()));
        };
        debug!(
            "appending message (character_id={}, role={}, content_len={})",
            character_id,
            message.role.as_str(),
            message.content.len()
        );
        session.messages.push(message);
        Ok(())
    }

    /// Swap the provisional record for the persisted one, keeping the cached
    /// message sequence.
    pub fn confirm(&self, character_id: &str, mut persisted: Session) -> Result<(), CacheError> {
        let mut sessions = self.sessions.write();
        let Some(slot) = sessions.get_mut(character_id) else {
            warn!(
                "confirm without current session (character_id={}, session_id={:?})",
                character_id, persisted.id
            );
            return Err(CacheError::NoCurrentSession(character_id.to_string()));
        };
        persisted.messages = std::mem::take(&mut slot.messages);
        if persisted.character_id.is_none() {
            persisted.character_id = Some(character_id.to_string());
        }
        debug!(
            "confirmed session (character_id={}, session_id={:?})",
            character_id, persisted.id
        );
        *slot = persisted;
        Ok(())
    }

    /// Replace the message with the same id in place. Returns whether a
    /// message was replaced.
    pub fn replace_message(&self, character_id: &str, message: Message) -> bool {
        let Some(id) = message.id else {
            return false;
        };
        let mut sessions = self.sessions.write();
        let Some(slot) = sessions
            .get_mut(character_id)
            .and_then(|session| session.messages.iter_mut().find(|m| m.id == Some(id)))
        else {
            debug!(
                "message not cached (character_id={}, message_id={})",
                character_id, id
            );
            return false;
        };
        *slot = message;
        true
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut sessions = self.sessions.write();
        debug!("clearing session cache (entries={})", sessions.len());
        sessions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::SessionCache;
    use crate::error::CacheError;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use tavern_rs_protocol::{Message, Session};
    use uuid::Uuid;

    fn persisted(character_id: &str) -> Session {
        let mut session = Session::provisional(Some("u1".to_string()), character_id, Vec::new());
        session.id = Some(Uuid::new_v4());
        session.created_at = Some(Utc::now());
        session
    }

    #[test]
    fn append_without_current_session_is_reported() {
        let cache = SessionCache::new();
        let err = cache
            .append_message("c1", Message::user("hello"))
            .expect_err("no session");
        assert_eq!(err, CacheError::NoCurrentSession("c1".to_string()));
        assert!(!cache.has_current("c1"));
    }

    #[test]
    fn set_current_replaces_record_and_sequence() {
        let cache = SessionCache::new();
        cache.set_current(
            "c1",
            Session::provisional(None, "c1", Vec::new()),
            vec![Message::assistant("Hi!")],
        );
        let session = persisted("c1");
        let id = session.id;
        cache.set_current("c1", session, vec![Message::user("a"), Message::user("b")]);
        assert_eq!(cache.current_id("c1"), id);
        assert_eq!(cache.messages("c1").expect("messages").len(), 2);
    }

    #[test]
    fn confirm_keeps_cached_messages() {
        let cache = SessionCache::new();
        cache.set_current(
            "c1",
            Session::provisional(None, "c1", Vec::new()),
            vec![Message::assistant("Hi!")],
        );
        let mut stored = persisted("c1");
        stored.messages = vec![Message::assistant("server copy")];
        stored.character_id = None;
        let id = stored.id;
        cache.confirm("c1", stored).expect("confirm");

        let current = cache.current("c1").expect("current");
        assert_eq!(current.id, id);
        assert_eq!(current.character_id.as_deref(), Some("c1"));
        assert_eq!(current.messages.len(), 1);
        assert_eq!(current.messages[0].content, "Hi!");
    }

    #[test]
    fn confirm_after_invalidate_fails() {
        let cache = SessionCache::new();
        assert!(!cache.invalidate("c1"));
        assert!(cache.confirm("c1", persisted("c1")).is_err());
    }

    #[test]
    fn replace_message_matches_by_id() {
        let cache = SessionCache::new();
        let mut first = Message::user("one");
        first.id = Some(Uuid::new_v4());
        let mut second = Message::assistant("two");
        second.id = Some(Uuid::new_v4());
        cache.set_current("c1", persisted("c1"), vec![first.clone(), second.clone()]);

        let mut edited = first.clone();
        edited.content = "uno".to_string();
        assert!(cache.replace_message("c1", edited));
        assert!(!cache.replace_message("c1", Message::user("no id")));

        let messages = cache.messages("c1").expect("messages");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "uno");
        assert_eq!(messages[1], second);
    }

    #[test]
    fn clear_drops_all_entries() {
        let cache = SessionCache::new();
        cache.set_current("c1", persisted("c1"), Vec::new());
        cache.set_current("c2", persisted("c2"), Vec::new());
        cache.clear();
        assert!(!cache.has_current("c1"));
        assert!(!cache.has_current("c2"));
    }
}
