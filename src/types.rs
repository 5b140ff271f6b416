//! Message and dictionary types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for messages
pub type MessageId = String;

pub(crate) fn new_message_id() -> MessageId {
    Uuid::new_v4().to_string()
}

/// Who produced a message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// The person typing
    User,
    /// Driah itself
    #[serde(alias = "bot")]
    Assistant,
}

impl Sender {
    /// Label used in exported transcripts
    pub fn transcript_label(&self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Assistant => "Driah AI",
        }
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Assistant => write!(f, "assistant"),
        }
    }
}

/// One entry of the conversation log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Stable identifier assigned at append time.
    ///
    /// Snapshots written before identifiers existed get a fresh one on load.
    #[serde(default = "new_message_id")]
    pub id: MessageId,
    /// Message text as shown to the user
    pub text: String,
    /// Who sent it
    pub sender: Sender,
    /// When it was appended
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new message stamped with the current time
    pub fn new(text: impl Into<String>, sender: Sender) -> Self {
        Self {
            id: new_message_id(),
            text: text.into(),
            sender,
            timestamp: Utc::now(),
        }
    }

    /// Short form of the id, for listings
    pub fn short_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }
}

/// Stored value of a dictionary term
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Definition {
    pub meaning: String,
    pub example: String,
}

/// A dictionary term together with its definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryEntry {
    /// Lowercase, trimmed key
    pub term: String,
    pub meaning: String,
    pub example: String,
}

impl DictionaryEntry {
    pub(crate) fn from_parts(term: &str, definition: &Definition) -> Self {
        Self {
            term: term.to_string(),
            meaning: definition.meaning.clone(),
            example: definition.example.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_snapshot_without_id_gets_one() {
        let json = r#"{"text":"hi","sender":"bot","timestamp":"2024-03-01T10:00:00.000Z"}"#;
        let message: Message = serde_json::from_str(json).unwrap();

        assert_eq!(message.sender, Sender::Assistant);
        assert_eq!(message.text, "hi");
        assert!(!message.id.is_empty());
    }

    #[test]
    fn sender_serializes_lowercase() {
        let json = serde_json::to_string(&Sender::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
        assert_eq!(Sender::User.transcript_label(), "You");
        assert_eq!(Sender::Assistant.transcript_label(), "Driah AI");
    }

    #[test]
    fn short_id_is_a_prefix() {
        let message = Message::new("hello", Sender::User);
        assert_eq!(message.short_id().len(), 8);
        assert!(message.id.starts_with(message.short_id()));
    }
}
