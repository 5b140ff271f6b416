//! # Driah - a small rule-driven chat assistant
//!
//! Driah answers free-text messages by running them through an ordered
//! cascade of intent rules ([`ResponseEngine`]). Users can teach it new words,
//! either with a `learn term: meaning: example` sentence or through
//! [`Assistant::teach`]; the words live in a persisted [`DictionaryStore`]
//! and are served back by `define ...` / `what is ...` questions.
//!
//! ```rust,no_run
//! use driah::{Assistant, AssistantConfig};
//!
//! #[tokio::main]
//! async fn main() -> driah::Result<()> {
//!     let mut assistant = Assistant::open(AssistantConfig::default()).await?;
//!     assistant.send("learn ferris: the Rust mascot").await?;
//!     if let Some(reply) = assistant.send("define ferris").await? {
//!         println!("{}", reply.text);
//!     }
//!     Ok(())
//! }
//! ```

pub mod assistant;
pub mod dictionary;
pub mod engine;
pub mod error;
pub mod history;
pub mod preferences;
pub mod rules;
pub mod storage_backend;
pub mod storage_traits;
pub mod types;

pub use assistant::{Assistant, AssistantConfig, AssistantConfigBuilder, DownloadOutcome, Reply};
pub use dictionary::{normalize_term, Dictionary, DictionaryStore, NO_EXAMPLE};
pub use engine::{Handler, Intent, Matcher, Response, ResponseEngine, Rule, Utterance};
pub use error::{AssistantError, Result};
pub use history::{render_transcript, HistoryStore, TRANSCRIPT_HEADER};
pub use preferences::Preferences;
pub use storage_backend::{open_store, MemoryKvStore, SqliteKvStore, StorageKind};
pub use storage_traits::{KvStore, DARK_MODE_KEY, DICTIONARY_KEY, HISTORY_KEY};
pub use types::{Definition, DictionaryEntry, Message, MessageId, Sender};
