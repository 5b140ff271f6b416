//! Application context tying the engine to its stores
//!
//! [`Assistant`] is what a front end talks to. It owns the dictionary, the
//! conversation log, the preferences and the randomness source; every
//! mutation goes through `&mut self`, so there is exactly one writer per
//! store and every write is persisted before the call returns.

use crate::dictionary::DictionaryStore;
use crate::engine::{Intent, ResponseEngine};
use crate::error::{AssistantError, Result};
use crate::history::HistoryStore;
use crate::preferences::Preferences;
use crate::rules;
use crate::storage_backend::{open_store, StorageKind};
use crate::storage_traits::KvStore;
use crate::types::{Message, MessageId, Sender};

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Assistant configuration
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Where the SQLite file lives
    pub data_dir: PathBuf,
    /// Persistence backend
    pub storage: StorageKind,
    /// Minimum simulated typing time before a reply
    pub typing_delay: Duration,
    /// Extra random typing time, uniform in `0..=typing_jitter`
    pub typing_jitter: Duration,
    /// Pause before greeting a fresh conversation
    pub welcome_delay: Duration,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./driah_data"),
            storage: StorageKind::Sqlite,
            typing_delay: Duration::from_millis(1000),
            typing_jitter: Duration::from_millis(1000),
            welcome_delay: Duration::from_millis(500),
        }
    }
}

/// Configuration builder
#[derive(Debug, Default)]
pub struct AssistantConfigBuilder {
    config: AssistantConfig,
}

impl AssistantConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    pub fn storage(mut self, storage: StorageKind) -> Self {
        self.config.storage = storage;
        self
    }

    pub fn typing_delay(mut self, delay: Duration, jitter: Duration) -> Self {
        self.config.typing_delay = delay;
        self.config.typing_jitter = jitter;
        self
    }

    pub fn welcome_delay(mut self, delay: Duration) -> Self {
        self.config.welcome_delay = delay;
        self
    }

    /// Skip all simulated delays
    pub fn instant(self) -> Self {
        self.typing_delay(Duration::ZERO, Duration::ZERO)
            .welcome_delay(Duration::ZERO)
    }

    pub fn build(self) -> AssistantConfig {
        self.config
    }
}

/// The assistant's answer to one user message
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub intent: Intent,
    /// The assistant message appended to the history
    pub message: Message,
}

/// Result of writing the transcript to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Nothing to write; the assistant said so in the chat
    Empty,
    Written { path: PathBuf, bytes: usize },
}

/// Driah: rule engine plus the stores it reads and writes
pub struct Assistant {
    config: AssistantConfig,
    engine: ResponseEngine,
    dictionary: DictionaryStore,
    history: HistoryStore,
    preferences: Preferences,
    rng: Box<dyn RngCore + Send>,
}

impl std::fmt::Debug for Assistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assistant")
            .field("config", &self.config)
            .field("dictionary", &self.dictionary)
            .field("history", &self.history)
            .field("preferences", &self.preferences)
            .finish()
    }
}

impl Assistant {
    /// Open the configured backend and restore every store
    pub async fn open(config: AssistantConfig) -> Result<Self> {
        let kv = open_store(config.storage, &config.data_dir).await?;
        Self::with_store(config, kv).await
    }

    /// Restore every store from an already opened backend
    pub async fn with_store(config: AssistantConfig, kv: Arc<dyn KvStore>) -> Result<Self> {
        let dictionary = DictionaryStore::restore(Arc::clone(&kv)).await?;
        let history = HistoryStore::restore(Arc::clone(&kv)).await?;
        let preferences = Preferences::restore(Arc::clone(&kv)).await?;

        tracing::info!(
            backend = kv.backend_name(),
            words = dictionary.len(),
            messages = history.len(),
            "Assistant ready"
        );

        Ok(Self {
            config,
            engine: ResponseEngine::new(),
            dictionary,
            history,
            preferences,
            rng: Box::new(StdRng::from_entropy()),
        })
    }

    /// Replace the randomness source (jokes, fallbacks, typing jitter)
    pub fn with_rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    /// Replace the rule table
    pub fn with_engine(mut self, engine: ResponseEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Greet a fresh conversation. Does nothing once any message exists.
    pub async fn welcome(&mut self) -> Result<Option<Message>> {
        if !self.history.is_empty() {
            return Ok(None);
        }
        let message = self.history.append(rules::WELCOME, Sender::Assistant).await?;
        Ok(Some(message))
    }

    /// Record a user message. Blank input is ignored.
    pub async fn accept(&mut self, raw: &str) -> Result<Option<Message>> {
        let text = raw.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let message = self.history.append(text, Sender::User).await?;
        Ok(Some(message))
    }

    /// Answer an accepted user message and record the answer.
    ///
    /// A word learned from the message only reaches the in-memory dictionary
    /// once it has been persisted.
    pub async fn reply_to(&mut self, message: &Message) -> Result<Reply> {
        let mut working = self.dictionary.dictionary().clone();
        let response = self
            .engine
            .respond(&message.text, &mut working, &mut *self.rng);

        if let Some(term) = &response.learned {
            self.dictionary.commit(working).await?;
            tracing::info!("Learned \"{}\" from conversation", term);
        }

        let reply = self
            .history
            .append(response.text.clone(), Sender::Assistant)
            .await?;

        Ok(Reply {
            text: response.text,
            intent: response.intent,
            message: reply,
        })
    }

    /// Accept and answer in one step, without any typing delay
    pub async fn send(&mut self, raw: &str) -> Result<Option<Reply>> {
        match self.accept(raw).await? {
            Some(message) => Ok(Some(self.reply_to(&message).await?)),
            None => Ok(None),
        }
    }

    /// Teach a word through the structured form.
    ///
    /// Returns the confirmation (also appended to the chat), or `None` when
    /// the term or meaning is blank.
    pub async fn teach(
        &mut self,
        term: &str,
        meaning: &str,
        example: Option<&str>,
    ) -> Result<Option<String>> {
        match self.dictionary.upsert(term, meaning, example).await {
            Ok(term) => {
                let text = rules::learned_reply(&term);
                self.history.append(text.clone(), Sender::Assistant).await?;
                Ok(Some(text))
            }
            Err(AssistantError::Validation(reason)) => {
                tracing::debug!("Ignoring teach request: {}", reason);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Delete one message by id
    pub async fn delete(&mut self, id: &str) -> Result<bool> {
        self.history.remove(id).await
    }

    /// Delete the first message with this text and sender
    pub async fn delete_matching(&mut self, text: &str, sender: Sender) -> Result<bool> {
        self.history.remove_matching(text, sender).await
    }

    /// Full id for a unique id prefix
    pub fn resolve_message(&self, prefix: &str) -> Option<MessageId> {
        self.history.resolve(prefix)
    }

    pub fn export_transcript(&self) -> String {
        self.history.transcript()
    }

    /// Write the transcript to `path` and note it in the chat
    pub async fn download_transcript(&mut self, path: impl AsRef<Path>) -> Result<DownloadOutcome> {
        if self.history.is_empty() {
            self.history
                .append(rules::EMPTY_HISTORY_REPLY, Sender::Assistant)
                .await?;
            return Ok(DownloadOutcome::Empty);
        }

        let path = path.as_ref().to_path_buf();
        let transcript = self.history.transcript();
        tokio::fs::write(&path, &transcript).await?;
        self.history
            .append(rules::DOWNLOADED_REPLY, Sender::Assistant)
            .await?;

        Ok(DownloadOutcome::Written {
            path,
            bytes: transcript.len(),
        })
    }

    /// JSON snapshot of the history, importable with [`Assistant::import_snapshot`]
    pub fn export_snapshot(&self) -> Result<String> {
        self.history.snapshot()
    }

    /// Replace the history with a snapshot
    pub async fn import_snapshot(&mut self, json: &str) -> Result<usize> {
        self.history.import(json).await
    }

    pub fn dark_mode(&self) -> bool {
        self.preferences.dark_mode()
    }

    pub async fn toggle_dark_mode(&mut self) -> Result<bool> {
        self.preferences.toggle_dark_mode().await
    }

    /// How long the front end should show the typing indicator
    pub fn typing_delay(&mut self) -> Duration {
        let extra = self
            .rng
            .gen_range(Duration::ZERO..=self.config.typing_jitter);
        self.config.typing_delay.saturating_add(extra)
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    pub fn dictionary(&self) -> &DictionaryStore {
        &self.dictionary
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn engine(&self) -> &ResponseEngine {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::NO_EXAMPLE;
    use crate::storage_backend::MemoryKvStore;
    use crate::storage_traits::DICTIONARY_KEY;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Memory store whose dictionary writes can be switched off
    #[derive(Default)]
    struct ReadOnlyDictionary {
        inner: MemoryKvStore,
        refuse: AtomicBool,
    }

    #[async_trait]
    impl KvStore for ReadOnlyDictionary {
        fn backend_name(&self) -> &'static str {
            "read-only-dictionary"
        }

        async fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key).await
        }

        async fn put(&self, key: &str, value: &str) -> Result<()> {
            if key == DICTIONARY_KEY && self.refuse.load(Ordering::SeqCst) {
                return Err(AssistantError::Storage("disk full".into()));
            }
            self.inner.put(key, value).await
        }
    }

    async fn in_memory() -> Assistant {
        let config = AssistantConfigBuilder::new()
            .storage(StorageKind::Memory)
            .instant()
            .build();
        Assistant::open(config)
            .await
            .unwrap()
            .with_rng(StdRng::seed_from_u64(11))
    }

    #[tokio::test]
    async fn send_records_both_sides() {
        let mut assistant = in_memory().await;
        let reply = assistant.send("  who are you?  ").await.unwrap().unwrap();

        assert_eq!(reply.intent, Intent::Identity);
        let log = assistant.history().all();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].text, "who are you?");
        assert_eq!(log[0].sender, Sender::User);
        assert_eq!(log[1], reply.message);
    }

    #[tokio::test]
    async fn blank_input_is_ignored() {
        let mut assistant = in_memory().await;
        assert!(assistant.send("   ").await.unwrap().is_none());
        assert!(assistant.history().is_empty());
    }

    #[tokio::test]
    async fn welcome_only_on_empty_history() {
        let mut assistant = in_memory().await;
        let welcome = assistant.welcome().await.unwrap().unwrap();
        assert_eq!(welcome.text, rules::WELCOME);
        assert!(assistant.welcome().await.unwrap().is_none());
        assert_eq!(assistant.history().len(), 1);
    }

    #[tokio::test]
    async fn teach_form_and_learn_sentence_agree() {
        let mut by_form = in_memory().await;
        let confirmation = by_form.teach("Foo", "bar", None).await.unwrap();
        assert_eq!(
            confirmation.as_deref(),
            Some("I've learned the word \"foo\"! Thank you for teaching me.")
        );

        let mut by_sentence = in_memory().await;
        let reply = by_sentence.send("learn foo: bar").await.unwrap().unwrap();
        assert_eq!(Some(reply.text), confirmation);

        assert_eq!(
            by_form.dictionary().lookup("foo"),
            by_sentence.dictionary().lookup("foo")
        );
        assert_eq!(by_form.dictionary().lookup("foo").unwrap().example, NO_EXAMPLE);
    }

    #[tokio::test]
    async fn invalid_teach_is_silent() {
        let mut assistant = in_memory().await;
        let before = assistant.dictionary().len();

        assert!(assistant.teach("word", "  ", Some("ex")).await.unwrap().is_none());
        assert_eq!(assistant.dictionary().len(), before);
        assert!(assistant.history().is_empty());
    }

    #[tokio::test]
    async fn learned_words_survive_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let config = AssistantConfigBuilder::new()
            .data_dir(dir.path())
            .instant()
            .build();

        {
            let mut assistant = Assistant::open(config.clone()).await.unwrap();
            assistant
                .send("learn Crate: a compilation unit: serde is a crate")
                .await
                .unwrap();
            assistant.toggle_dark_mode().await.unwrap();
        }

        let mut assistant = Assistant::open(config).await.unwrap();
        assert_eq!(assistant.dictionary().len(), 6);
        assert_eq!(assistant.history().len(), 2);
        assert!(assistant.dark_mode());

        let reply = assistant.send("define crate?").await.unwrap().unwrap();
        assert_eq!(
            reply.text,
            "crate: a compilation unit\n\nExample: serde is a crate"
        );
    }

    #[tokio::test]
    async fn delete_by_id_and_by_value() {
        let mut assistant = in_memory().await;
        let first = assistant.accept("again").await.unwrap().unwrap();
        let second = assistant.accept("again").await.unwrap().unwrap();

        assert!(assistant.delete(&second.id).await.unwrap());
        assert_eq!(assistant.history().all()[0].id, first.id);

        assert!(assistant.delete_matching("again", Sender::User).await.unwrap());
        assert!(!assistant.delete_matching("again", Sender::User).await.unwrap());
        assert!(assistant.history().is_empty());
    }

    #[tokio::test]
    async fn download_of_empty_history_only_complains() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.txt");
        let mut assistant = in_memory().await;

        let outcome = assistant.download_transcript(&path).await.unwrap();
        assert_eq!(outcome, DownloadOutcome::Empty);
        assert!(!path.exists());
        assert_eq!(assistant.history().all()[0].text, rules::EMPTY_HISTORY_REPLY);
    }

    #[tokio::test]
    async fn download_writes_transcript_then_confirms() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.txt");
        let mut assistant = in_memory().await;
        assistant.send("thanks").await.unwrap();

        let outcome = assistant.download_transcript(&path).await.unwrap();
        assert!(matches!(outcome, DownloadOutcome::Written { .. }));

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            format!(
                "Driah AI Chat History\n=====================\n\nYou: thanks\n\nDriah AI: {}\n\n",
                rules::THANKS_REPLY
            )
        );
        assert_eq!(
            assistant.history().all().last().unwrap().text,
            rules::DOWNLOADED_REPLY
        );
    }

    #[tokio::test]
    async fn snapshot_round_trip_is_identical() {
        let mut source = in_memory().await;
        source.send("hello").await.unwrap();
        source.send("tell me a joke").await.unwrap();
        let snapshot = source.export_snapshot().unwrap();

        let kv: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let mut target = Assistant::with_store(AssistantConfig::default(), kv)
            .await
            .unwrap();
        assert_eq!(target.import_snapshot(&snapshot).await.unwrap(), 4);
        assert_eq!(target.history().all(), source.history().all());
    }

    #[tokio::test]
    async fn failed_dictionary_write_leaves_memory_unchanged() {
        let kv = Arc::new(ReadOnlyDictionary::default());
        let config = AssistantConfigBuilder::new()
            .storage(StorageKind::Memory)
            .instant()
            .build();
        let mut assistant = Assistant::with_store(config, kv.clone() as Arc<dyn KvStore>)
            .await
            .unwrap();
        kv.refuse.store(true, Ordering::SeqCst);

        let err = assistant.send("learn ferris: the Rust mascot").await;
        assert!(matches!(err, Err(AssistantError::Storage(_))));
        assert!(assistant.dictionary().lookup("ferris").is_none());

        let err = assistant.teach("crab", "a crustacean", None).await;
        assert!(matches!(err, Err(AssistantError::Storage(_))));
        assert!(assistant.dictionary().lookup("crab").is_none());
        assert_eq!(assistant.dictionary().len(), 5);
    }

    #[tokio::test]
    async fn zero_jitter_gives_the_base_delay() {
        let config = AssistantConfigBuilder::new()
            .storage(StorageKind::Memory)
            .typing_delay(Duration::from_millis(250), Duration::ZERO)
            .build();
        let mut assistant = Assistant::open(config).await.unwrap();
        assert_eq!(assistant.typing_delay(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn typing_delay_stays_in_range() {
        let config = AssistantConfigBuilder::new()
            .storage(StorageKind::Memory)
            .typing_delay(Duration::from_millis(1000), Duration::from_millis(1000))
            .build();
        let mut assistant = Assistant::open(config).await.unwrap();

        for _ in 0..20 {
            let delay = assistant.typing_delay();
            assert!(delay >= Duration::from_millis(1000));
            assert!(delay <= Duration::from_millis(2000));
        }
    }
}
