//! Conversation log with write-through persistence

use crate::error::Result;
use crate::storage_traits::{KvStore, HISTORY_KEY};
use crate::types::{new_message_id, Message, MessageId, Sender};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

/// Header line of an exported transcript
pub const TRANSCRIPT_HEADER: &str = "Driah AI Chat History\n=====================\n\n";

/// Render messages as a plain-text transcript
pub fn render_transcript(messages: &[Message]) -> String {
    let mut transcript = String::from(TRANSCRIPT_HEADER);
    for message in messages {
        transcript.push_str(message.sender.transcript_label());
        transcript.push_str(": ");
        transcript.push_str(&message.text);
        transcript.push_str("\n\n");
    }
    transcript
}

/// Persisted shape of a message. Logs written before ids existed omit `id`.
#[derive(Deserialize)]
struct StoredMessage {
    id: Option<MessageId>,
    text: String,
    sender: Sender,
    timestamp: DateTime<Utc>,
}

impl StoredMessage {
    fn into_message(self) -> Message {
        Message {
            id: self.id.unwrap_or_else(new_message_id),
            text: self.text,
            sender: self.sender,
            timestamp: self.timestamp,
        }
    }
}

/// Ordered message log backed by a [`KvStore`]
pub struct HistoryStore {
    messages: Vec<Message>,
    kv: Arc<dyn KvStore>,
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore")
            .field("messages", &self.messages.len())
            .field("backend", &self.kv.backend_name())
            .finish()
    }
}

impl HistoryStore {
    /// Load the persisted log. Missing or unreadable data starts empty.
    ///
    /// Messages stored without an id are given one, and the log is written
    /// back so the ids stay the same on the next restore.
    pub async fn restore(kv: Arc<dyn KvStore>) -> Result<Self> {
        let stored: Vec<StoredMessage> = match kv.get(HISTORY_KEY).await? {
            Some(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!("Stored chat history is unreadable, starting empty: {}", e);
                Vec::new()
            }),
            None => Vec::new(),
        };

        let missing_ids = stored.iter().filter(|m| m.id.is_none()).count();
        let messages: Vec<Message> = stored.into_iter().map(StoredMessage::into_message).collect();
        let store = Self { messages, kv };

        if missing_ids > 0 {
            tracing::info!("Assigned ids to {} stored messages", missing_ids);
            store.persist().await?;
        }

        tracing::debug!("Restored {} messages", store.messages.len());

        Ok(store)
    }

    pub async fn persist(&self) -> Result<()> {
        let json = self.snapshot()?;
        self.kv.put(HISTORY_KEY, &json).await
    }

    /// Append a message stamped with the current time
    pub async fn append(&mut self, text: impl Into<String>, sender: Sender) -> Result<Message> {
        let message = Message::new(text, sender);
        self.messages.push(message.clone());
        self.persist().await?;
        Ok(message)
    }

    /// Remove the message with this id
    pub async fn remove(&mut self, id: &str) -> Result<bool> {
        match self.messages.iter().position(|m| m.id == id) {
            Some(index) => self.remove_at(index).await,
            None => Ok(false),
        }
    }

    /// Remove the first message whose text and sender both match
    pub async fn remove_matching(&mut self, text: &str, sender: Sender) -> Result<bool> {
        match self
            .messages
            .iter()
            .position(|m| m.text == text && m.sender == sender)
        {
            Some(index) => self.remove_at(index).await,
            None => Ok(false),
        }
    }

    async fn remove_at(&mut self, index: usize) -> Result<bool> {
        let removed = self.messages.remove(index);
        self.persist().await?;
        tracing::debug!("Removed message {}", removed.id);
        Ok(true)
    }

    /// Resolve a full id or a unique id prefix
    pub fn resolve(&self, prefix: &str) -> Option<MessageId> {
        let mut hits = self.messages.iter().filter(|m| m.id.starts_with(prefix));
        match (hits.next(), hits.next()) {
            (Some(only), None) if !prefix.is_empty() => Some(only.id.clone()),
            _ => None,
        }
    }

    /// All messages in conversation order
    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn transcript(&self) -> String {
        render_transcript(&self.messages)
    }

    /// JSON array of the whole log, the same shape that is persisted
    pub fn snapshot(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.messages)?)
    }

    /// Replace the log with a snapshot and persist it
    pub async fn import(&mut self, json: &str) -> Result<usize> {
        let messages: Vec<Message> = serde_json::from_str(json)?;
        self.messages = messages;
        self.persist().await?;
        tracing::info!("Imported {} messages", self.messages.len());
        Ok(self.messages.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage_backend::MemoryKvStore;

    async fn empty_store() -> (Arc<dyn KvStore>, HistoryStore) {
        let kv: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let store = HistoryStore::restore(Arc::clone(&kv)).await.unwrap();
        (kv, store)
    }

    #[tokio::test]
    async fn restore_without_data_is_empty_and_unseeded() {
        let (kv, store) = empty_store().await;
        assert!(store.is_empty());
        assert_eq!(kv.get(HISTORY_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn append_keeps_order_and_persists() {
        let (kv, mut store) = empty_store().await;
        store.append("hi", Sender::User).await.unwrap();
        store.append("Hello there!", Sender::Assistant).await.unwrap();

        let reloaded = HistoryStore::restore(kv).await.unwrap();
        let texts: Vec<_> = reloaded.all().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["hi", "Hello there!"]);
        assert_eq!(reloaded.all(), store.all());
    }

    #[tokio::test]
    async fn duplicate_messages_are_removed_one_at_a_time() {
        let (_, mut store) = empty_store().await;
        let first = store.append("same", Sender::User).await.unwrap();
        let second = store.append("same", Sender::User).await.unwrap();

        assert!(store.remove_matching("same", Sender::User).await.unwrap());
        assert_eq!(store.len(), 1);
        assert_eq!(store.all()[0].id, second.id);

        assert!(!store.remove(&first.id).await.unwrap());
        assert!(store.remove(&second.id).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn remove_by_id_targets_the_exact_message() {
        let (_, mut store) = empty_store().await;
        let first = store.append("same", Sender::User).await.unwrap();
        let second = store.append("same", Sender::User).await.unwrap();

        assert!(store.remove(&second.id).await.unwrap());
        assert_eq!(store.len(), 1);
        assert_eq!(store.all()[0].id, first.id);
    }

    #[tokio::test]
    async fn sender_is_part_of_the_match() {
        let (_, mut store) = empty_store().await;
        store.append("ok", Sender::Assistant).await.unwrap();
        assert!(!store.remove_matching("ok", Sender::User).await.unwrap());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn corrupt_blob_starts_empty() {
        let kv: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        kv.put(HISTORY_KEY, "[{\"text\":").await.unwrap();
        let store = HistoryStore::restore(kv).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn transcript_has_header_and_labels() {
        let (_, mut store) = empty_store().await;
        store.append("hi", Sender::User).await.unwrap();
        store.append("Hello there!", Sender::Assistant).await.unwrap();

        assert_eq!(
            store.transcript(),
            "Driah AI Chat History\n=====================\n\nYou: hi\n\nDriah AI: Hello there!\n\n"
        );
    }

    #[tokio::test]
    async fn snapshot_import_reproduces_the_log() {
        let (_, mut store) = empty_store().await;
        store.append("define chatbot", Sender::User).await.unwrap();
        store
            .append("chatbot: a program\n\nExample: me", Sender::Assistant)
            .await
            .unwrap();
        let snapshot = store.snapshot().unwrap();

        let (_, mut other) = empty_store().await;
        assert_eq!(other.import(&snapshot).await.unwrap(), 2);
        assert_eq!(other.all(), store.all());
    }

    #[tokio::test]
    async fn ids_assigned_on_restore_survive_the_next_restore() {
        let kv: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        kv.put(
            HISTORY_KEY,
            r#"[{"text":"hi","sender":"user","timestamp":"2024-03-01T10:00:00Z"}]"#,
        )
        .await
        .unwrap();

        let first = HistoryStore::restore(Arc::clone(&kv)).await.unwrap();
        let first_id = first.all()[0].id.clone();

        let mut second = HistoryStore::restore(Arc::clone(&kv)).await.unwrap();
        assert_eq!(second.all()[0].id, first_id);
        assert_eq!(second.all()[0].text, "hi");
        assert!(second.remove(&first_id).await.unwrap());
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn restore_keeps_stored_ids_without_rewriting() {
        let kv: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let blob = r#"[{"id":"abc","text":"hi","sender":"bot","timestamp":"2024-03-01T10:00:00Z"}]"#;
        kv.put(HISTORY_KEY, blob).await.unwrap();

        let store = HistoryStore::restore(Arc::clone(&kv)).await.unwrap();
        assert_eq!(store.all()[0].id, "abc");
        assert_eq!(store.all()[0].sender, Sender::Assistant);
        assert_eq!(kv.get(HISTORY_KEY).await.unwrap().as_deref(), Some(blob));
    }

    #[tokio::test]
    async fn resolve_requires_a_unique_prefix() {
        let (_, mut store) = empty_store().await;
        let message = store.append("hi", Sender::User).await.unwrap();

        assert_eq!(store.resolve(message.short_id()), Some(message.id.clone()));
        assert_eq!(store.resolve(""), None);
        assert_eq!(store.resolve("zzzz-not-an-id"), None);
    }
}
