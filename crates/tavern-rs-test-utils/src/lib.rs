//! Test helpers shared across Tavern crates.

pub mod directory;
pub mod gateway;
pub mod identity;
pub mod logout;

pub use directory::StaticDirectory;
pub use gateway::{Gate, GatewayCall, ScriptedGateway, persisted_session};
pub use identity::StaticIdentity;
pub use logout::RecordingLogout;

use std::sync::Arc;
use tavern_rs_core::Collaborators;

/// Wire fakes into a `Collaborators` set.
pub fn collaborators(
    directory: Arc<StaticDirectory>,
    gateway: Arc<ScriptedGateway>,
    identity: Arc<StaticIdentity>,
    logout: Arc<RecordingLogout>,
) -> Collaborators {
    Collaborators {
        directory,
        gateway,
        identity,
        logout,
    }
}
