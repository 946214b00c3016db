use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tavern_rs_core::{GatewayError, LogoutEndpoint};

/// Logout endpoint that records calls and optionally fails.
#[derive(Debug, Default)]
pub struct RecordingLogout {
    calls: AtomicUsize,
    failure: Mutex<Option<GatewayError>>,
}

impl RecordingLogout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(error: GatewayError) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failure: Mutex::new(Some(error)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogoutEndpoint for RecordingLogout {
    async fn logout(&self) -> Result<(), GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failure.lock().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
