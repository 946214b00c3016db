//! Character definitions owned by the remote directory.

use crate::CharacterId;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Persona the user converses with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    /// Character identifier.
    pub id: CharacterId,
    /// Display name.
    pub name: String,
    /// Optional human-friendly description.
    #[serde(default)]
    pub description: Option<String>,
    /// Optional system prompt used by the backend.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Optional opening line shown in empty sessions.
    #[serde(default)]
    pub short_greeting: Option<String>,
    /// Free-form character attributes; `null` decodes as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub custom_fields: BTreeMap<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeMap<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::deserialize(deserializer)?.unwrap_or_default())
}

impl Character {
    /// Minimal character with only an id and display name.
    pub fn new(id: impl Into<CharacterId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            system_prompt: None,
            short_greeting: None,
            custom_fields: BTreeMap::new(),
        }
    }

    /// Set the short greeting.
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.short_greeting = Some(greeting.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::Character;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn decodes_backend_character() {
        let json = r#"{
            "id": "c1",
            "name": "Ada",
            "shortGreeting": "Hi!",
            "customFields": { "mood": "cheerful" },
            "resourceStatus": "ACTIVE"
        }"#;
        let character: Character = serde_json::from_str(json).expect("character");
        assert_eq!(character.short_greeting.as_deref(), Some("Hi!"));
        assert_eq!(
            character.custom_fields.get("mood"),
            Some(&json!("cheerful"))
        );
        assert_eq!(character.system_prompt, None);
    }

    #[test]
    fn null_custom_fields_decode_as_empty() {
        let json = r#"{ "id": "c1", "name": "Ada", "customFields": null }"#;
        let character: Character = serde_json::from_str(json).expect("character");
        assert!(character.custom_fields.is_empty());
    }

    #[test]
    fn structured_custom_fields_are_kept() {
        let json = r#"{
            "id": "c1",
            "name": "Ada",
            "customFields": { "age": 36, "traits": ["curious", "precise"], "bio": null }
        }"#;
        let character: Character = serde_json::from_str(json).expect("character");
        assert_eq!(character.custom_fields.get("age"), Some(&json!(36)));
        assert_eq!(
            character.custom_fields.get("traits"),
            Some(&json!(["curious", "precise"]))
        );
        assert_eq!(character.custom_fields.get("bio"), Some(&json!(null)));
    }
}
