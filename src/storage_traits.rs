//! Storage backend trait definitions

use crate::error::Result;
use async_trait::async_trait;

/// Key holding the JSON conversation log
pub const HISTORY_KEY: &str = "chat_history";

/// Key holding the JSON dictionary object
pub const DICTIONARY_KEY: &str = "dictionary";

/// Key holding the theme flag (`"true"` / `"false"`)
pub const DARK_MODE_KEY: &str = "dark_mode_preference";

/// Durable key-value surface the stores persist their blobs into
#[async_trait]
pub trait KvStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Read a blob, `None` if the key was never written
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write (or overwrite) a blob
    async fn put(&self, key: &str, value: &str) -> Result<()>;
}
