use async_trait::async_trait;
use parking_lot::Mutex;
use tavern_rs_core::{CharacterDirectory, GatewayError};
use tavern_rs_protocol::Character;

/// Directory returning a fixed list, or a fixed error once `fail_with` is set.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    characters: Vec<Character>,
    failure: Mutex<Option<GatewayError>>,
}

impl StaticDirectory {
    pub fn new(characters: Vec<Character>) -> Self {
        Self {
            characters,
            failure: Mutex::new(None),
        }
    }

    pub fn fail_with(&self, error: GatewayError) {
        *self.failure.lock() = Some(error);
    }
}

#[async_trait]
impl CharacterDirectory for StaticDirectory {
    async fn list(&self) -> Result<Vec<Character>, GatewayError> {
        match self.failure.lock().clone() {
            Some(error) => Err(error),
            None => Ok(self.characters.clone()),
        }
    }
}
