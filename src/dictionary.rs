//! User-extensible term dictionary
//!
//! Terms are keyed by their trimmed, lowercased form. The store persists the
//! whole map as one JSON object after every mutation, and falls back to a
//! built-in seed when nothing usable is stored yet.

use crate::error::{AssistantError, Result};
use crate::storage_traits::{KvStore, DICTIONARY_KEY};
use crate::types::{Definition, DictionaryEntry};

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Example text stored when a term is taught without one
pub const NO_EXAMPLE: &str = "No example provided.";

const SEED: &[(&str, &str, &str)] = &[
    (
        "hello",
        "A greeting used when meeting someone.",
        "Hello, how are you today?",
    ),
    (
        "goodbye",
        "A farewell used when parting ways with someone.",
        "I have to go now, goodbye!",
    ),
    (
        "artificial intelligence",
        "The simulation of human intelligence in machines programmed to think and learn like humans.",
        "Driah AI uses artificial intelligence to understand and respond to messages.",
    ),
    (
        "chatbot",
        "A computer program designed to simulate conversation with human users.",
        "Driah is a chatbot that can have conversations with users.",
    ),
    (
        "driah",
        "The nickname of Gift Sumaiya, the girlfriend of Omare Emmanuel (Omar Lainz).",
        "Driah AI was named after Gift Sumaiya, whose nickname is Driah.",
    ),
];

/// Normalize a term the way it is stored and looked up
pub fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

/// In-memory term map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary {
    entries: HashMap<String, Definition>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in entries used on first run
    pub fn seeded() -> Self {
        let entries = SEED
            .iter()
            .map(|(term, meaning, example)| {
                (
                    term.to_string(),
                    Definition {
                        meaning: meaning.to_string(),
                        example: example.to_string(),
                    },
                )
            })
            .collect();

        Self { entries }
    }

    /// Case-insensitive lookup
    pub fn lookup(&self, term: &str) -> Option<DictionaryEntry> {
        let term = normalize_term(term);
        self.entries
            .get(&term)
            .map(|definition| DictionaryEntry::from_parts(&term, definition))
    }

    pub fn contains(&self, term: &str) -> bool {
        self.entries.contains_key(&normalize_term(term))
    }

    /// Insert or replace a term, returning the normalized key.
    ///
    /// Fails with [`AssistantError::Validation`] when the term or meaning is
    /// blank; a blank or missing example becomes [`NO_EXAMPLE`].
    pub fn upsert(&mut self, term: &str, meaning: &str, example: Option<&str>) -> Result<String> {
        let term = normalize_term(term);
        let meaning = meaning.trim();

        if term.is_empty() {
            return Err(AssistantError::Validation("term must not be empty".into()));
        }
        if meaning.is_empty() {
            return Err(AssistantError::Validation(
                "meaning must not be empty".into(),
            ));
        }

        let example = example
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .unwrap_or(NO_EXAMPLE);

        self.entries.insert(
            term.clone(),
            Definition {
                meaning: meaning.to_string(),
                example: example.to_string(),
            },
        );

        Ok(term)
    }

    /// All entries in lexicographic order of term
    pub fn all(&self) -> Vec<DictionaryEntry> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(term, definition)| DictionaryEntry::from_parts(term, definition))
            .collect();
        entries.sort_by(|a, b| a.term.cmp(&b.term));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize as a JSON object `term -> {meaning, example}`, keys sorted
    pub fn to_json(&self) -> Result<String> {
        let sorted: BTreeMap<&String, &Definition> = self.entries.iter().collect();
        Ok(serde_json::to_string(&sorted)?)
    }

    /// Parse a stored object, normalizing its keys.
    ///
    /// When several keys normalize to the same term, the key already in
    /// normal form wins, otherwise the first key in sorted order.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, Definition> = serde_json::from_str(json)?;
        let mut entries: HashMap<String, Definition> = HashMap::with_capacity(raw.len());
        for (key, definition) in raw {
            let term = normalize_term(&key);
            if entries.contains_key(&term) {
                tracing::warn!("Stored dictionary has duplicate term '{}' (key '{}')", term, key);
                if key != term {
                    continue;
                }
            }
            entries.insert(term, definition);
        }
        Ok(Self { entries })
    }
}

/// Dictionary with write-through persistence
pub struct DictionaryStore {
    dictionary: Dictionary,
    kv: Arc<dyn KvStore>,
}

impl std::fmt::Debug for DictionaryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DictionaryStore")
            .field("entries", &self.dictionary.len())
            .field("backend", &self.kv.backend_name())
            .finish()
    }
}

impl DictionaryStore {
    /// Load the persisted dictionary.
    ///
    /// A missing or unparseable blob is replaced by the seed, which is
    /// written back immediately.
    pub async fn restore(kv: Arc<dyn KvStore>) -> Result<Self> {
        let restored = match kv.get(DICTIONARY_KEY).await? {
            Some(json) => match Dictionary::from_json(&json) {
                Ok(dictionary) => Some(dictionary),
                Err(e) => {
                    tracing::warn!("Stored dictionary is unreadable, reseeding: {}", e);
                    None
                }
            },
            None => None,
        };

        match restored {
            Some(dictionary) => {
                tracing::debug!("Restored {} dictionary entries", dictionary.len());
                Ok(Self { dictionary, kv })
            }
            None => {
                let store = Self {
                    dictionary: Dictionary::seeded(),
                    kv,
                };
                store.persist().await?;
                tracing::info!("Seeded dictionary with {} entries", store.len());
                Ok(store)
            }
        }
    }

    pub async fn persist(&self) -> Result<()> {
        let json = self.dictionary.to_json()?;
        self.kv.put(DICTIONARY_KEY, &json).await
    }

    /// Validate, insert and persist. Returns the normalized term.
    ///
    /// Nothing changes in memory unless the write succeeds.
    pub async fn upsert(
        &mut self,
        term: &str,
        meaning: &str,
        example: Option<&str>,
    ) -> Result<String> {
        let mut candidate = self.dictionary.clone();
        let term = candidate.upsert(term, meaning, example)?;
        self.commit(candidate).await?;
        Ok(term)
    }

    /// Persist `dictionary`, then make it the current one
    pub async fn commit(&mut self, dictionary: Dictionary) -> Result<()> {
        let json = dictionary.to_json()?;
        self.kv.put(DICTIONARY_KEY, &json).await?;
        self.dictionary = dictionary;
        Ok(())
    }

    pub fn lookup(&self, term: &str) -> Option<DictionaryEntry> {
        self.dictionary.lookup(term)
    }

    pub fn all(&self) -> Vec<DictionaryEntry> {
        self.dictionary.all()
    }

    pub fn len(&self) -> usize {
        self.dictionary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dictionary.is_empty()
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }
}
