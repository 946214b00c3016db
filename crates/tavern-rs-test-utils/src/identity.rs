use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tavern_rs_core::IdentityProvider;
use tavern_rs_protocol::OwnerId;

/// In-memory identity that counts `clear` calls.
#[derive(Debug, Default)]
pub struct StaticIdentity {
    owner_id: Mutex<Option<OwnerId>>,
    clears: AtomicUsize,
}

impl StaticIdentity {
    pub fn signed_in(owner_id: impl Into<OwnerId>) -> Self {
        Self {
            owner_id: Mutex::new(Some(owner_id.into())),
            clears: AtomicUsize::new(0),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl IdentityProvider for StaticIdentity {
    fn owner_id(&self) -> Option<OwnerId> {
        self.owner_id.lock().clone()
    }

    fn is_authenticated(&self) -> bool {
        self.owner_id.lock().is_some()
    }

    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
        *self.owner_id.lock() = None;
    }
}
