//! Synthetic opening message for empty sessions.

use tavern_rs_protocol::{Character, Message};

/// Greeting used when a character has no short greeting of its own.
pub const DEFAULT_GREETING: &str = tavern_rs_config::DEFAULT_FALLBACK_GREETING;

/// Build the greeting for `character`, or `None` when no character is given.
pub fn build_greeting(character: Option<&Character>, fallback: &str) -> Option<Message> {
    let character = character?;
    let text = character
        .short_greeting
        .as_deref()
        .filter(|greeting| !greeting.trim().is_empty())
        .unwrap_or(fallback);
    Some(Message::assistant(text))
}

/// Push the greeting onto `messages` if the sequence is empty.
pub fn seed_greeting(messages: &mut Vec<Message>, character: Option<&Character>, fallback: &str) {
    if messages.is_empty()
        && let Some(greeting) = build_greeting(character, fallback)
    {
        messages.push(greeting);
    }
}
