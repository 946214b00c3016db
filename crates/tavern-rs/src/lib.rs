//! Public SDK surface for Tavern.
//!
//! Re-exports the session core, the HTTP collaborators, and the config and
//! protocol crates so embedders depend on a single crate.

pub use tavern_rs_client as client;
pub use tavern_rs_config as config;
/// Re-export for convenience.
pub use tavern_rs_core as core;
pub use tavern_rs_protocol as protocol;

pub use tavern_rs_core::{Collaborators, Orchestrator, OrchestratorOptions};

#[inline]
/// Initialize logging using env_logger if the "logging" feature is enabled.
///
/// No-op without the feature.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::builder().format_timestamp_millis().try_init();
    }
}
