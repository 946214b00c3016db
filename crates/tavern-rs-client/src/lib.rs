//! HTTP transport and credential storage for Tavern.
//!
//! [`ApiClient`] implements the core's collaborator traits against the REST
//! backend; [`FileIdentity`] keeps the signed-in credential on disk.

mod error;
mod http;
mod identity;

pub use error::{ClientError, IdentityError};
pub use http::{ApiClient, BearerToken};
pub use identity::{FileIdentity, decode_jwt_user_id};
