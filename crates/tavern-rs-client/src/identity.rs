//! File-backed credential store.

use crate::error::IdentityError;
use crate::http::BearerToken;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use log::{debug, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tavern_rs_core::IdentityProvider;
use tavern_rs_protocol::OwnerId;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredCredential {
    token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
}

/// Credential persisted as `{"token": "...", "userId": "..."}`.
pub struct FileIdentity {
    path: PathBuf,
    credential: RwLock<Option<StoredCredential>>,
}

impl FileIdentity {
    /// Load the credential at `path`; a missing file means signed out.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, IdentityError> {
        let path = path.into();
        let credential = match fs::read_to_string(&path) {
            Ok(raw) => Some(serde_json::from_str::<StoredCredential>(&raw)?),
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => return Err(err.into()),
        };
        debug!(
            "credential loaded (path={}, present={})",
            path.display(),
            credential.is_some()
        );
        Ok(Self {
            path,
            credential: RwLock::new(credential),
        })
    }

    /// Persist a credential, creating parent directories as needed.
    pub fn store(&self, token: impl Into<String>, user_id: Option<String>) -> Result<(), IdentityError> {
        let credential = StoredCredential {
            token: token.into(),
            user_id,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&credential)?)?;
        *self.credential.write() = Some(credential);
        Ok(())
    }

    pub fn token(&self) -> Option<String> {
        self.credential.read().as_ref().map(|c| c.token.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IdentityProvider for FileIdentity {
    fn owner_id(&self) -> Option<OwnerId> {
        let guard = self.credential.read();
        let credential = guard.as_ref()?;
        credential
            .user_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .or_else(|| decode_jwt_user_id(&credential.token))
    }

    fn is_authenticated(&self) -> bool {
        let guard = self.credential.read();
        let Some(credential) = guard.as_ref() else {
            return false;
        };
        if credential.token.trim().is_empty() {
            return false;
        }
        match jwt_claims(&credential.token).and_then(|claims| claims.get("exp")?.as_i64()) {
            Some(exp) => exp > Utc::now().timestamp(),
            None => true,
        }
    }

    fn clear(&self) {
        *self.credential.write() = None;
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("credential removed (path={})", self.path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!(
                "failed to remove credential (path={}, error={})",
                self.path.display(),
                err
            ),
        }
    }
}

impl BearerToken for FileIdentity {
    fn bearer_token(&self) -> Option<String> {
        self.token().filter(|token| !token.trim().is_empty())
    }
}

fn jwt_claims(token: &str) -> Option<Value> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Read the `userId` claim from a JWT payload without verifying it.
pub fn decode_jwt_user_id(token: &str) -> Option<OwnerId> {
    match jwt_claims(token)?.get("userId")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{FileIdentity, decode_jwt_user_id};
    use crate::http::BearerToken;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tavern_rs_core::IdentityProvider;
    use tempfile::tempdir;

    fn jwt(claims: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{payload}.signature")
    }

    #[test]
    fn decodes_string_and_numeric_user_ids() {
        assert_eq!(
            decode_jwt_user_id(&jwt(json!({ "userId": "u-7" }))),
            Some("u-7".to_string())
        );
        assert_eq!(
            decode_jwt_user_id(&jwt(json!({ "userId": 42 }))),
            Some("42".to_string())
        );
        assert_eq!(decode_jwt_user_id(&jwt(json!({ "sub": "x" }))), None);
        assert_eq!(decode_jwt_user_id("not-a-jwt"), None);
    }

    #[test]
    fn missing_file_is_signed_out() {
        let dir = tempdir().expect("tempdir");
        let identity = FileIdentity::load(dir.path().join("token.json")).expect("load");
        assert!(!identity.is_authenticated());
        assert_eq!(identity.owner_id(), None);
        assert_eq!(identity.bearer_token(), None);
    }

    #[test]
    fn store_then_reload_round_trips() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("token.json");
        let identity = FileIdentity::load(&path).expect("load");
        identity
            .store(jwt(json!({ "userId": "from-jwt" })), None)
            .expect("store");

        let reloaded = FileIdentity::load(&path).expect("reload");
        assert!(reloaded.is_authenticated());
        assert_eq!(reloaded.owner_id(), Some("from-jwt".to_string()));
    }

    #[test]
    fn explicit_user_id_wins_over_claim() {
        let dir = tempdir().expect("tempdir");
        let identity = FileIdentity::load(dir.path().join("token.json")).expect("load");
        identity
            .store(jwt(json!({ "userId": "claim" })), Some("stored".to_string()))
            .expect("store");
        assert_eq!(identity.owner_id(), Some("stored".to_string()));
    }

    #[test]
    fn expired_token_is_not_authenticated() {
        let dir = tempdir().expect("tempdir");
        let identity = FileIdentity::load(dir.path().join("token.json")).expect("load");
        identity
            .store(jwt(json!({ "userId": "u1", "exp": 1 })), None)
            .expect("store");
        assert!(!identity.is_authenticated());
        assert_eq!(identity.owner_id(), Some("u1".to_string()));
    }

    #[test]
    fn clear_removes_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("token.json");
        let identity = FileIdentity::load(&path).expect("load");
        identity.store("opaque", Some("u1".to_string())).expect("store");
        assert!(path.exists());

        identity.clear();
        assert!(!path.exists());
        assert!(!identity.is_authenticated());
        identity.clear();
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("token.json");
        std::fs::write(&path, "{ nope").expect("write");
        assert!(FileIdentity::load(&path).is_err());
    }
}
