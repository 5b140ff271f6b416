//! Presentation preferences (currently only the theme)

use crate::error::Result;
use crate::storage_traits::{KvStore, DARK_MODE_KEY};

use std::sync::Arc;

/// Persisted presentation settings
pub struct Preferences {
    dark_mode: bool,
    kv: Arc<dyn KvStore>,
}

impl std::fmt::Debug for Preferences {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preferences")
            .field("dark_mode", &self.dark_mode)
            .finish()
    }
}

impl Preferences {
    /// Only the exact string `"true"` turns dark mode on
    pub async fn restore(kv: Arc<dyn KvStore>) -> Result<Self> {
        let dark_mode = kv.get(DARK_MODE_KEY).await?.as_deref() == Some("true");
        Ok(Self { dark_mode, kv })
    }

    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }

    pub async fn set_dark_mode(&mut self, enabled: bool) -> Result<()> {
        self.dark_mode = enabled;
        self.kv
            .put(DARK_MODE_KEY, if enabled { "true" } else { "false" })
            .await
    }

    /// Flip the theme and return the new value
    pub async fn toggle_dark_mode(&mut self) -> Result<bool> {
        self.set_dark_mode(!self.dark_mode).await?;
        Ok(self.dark_mode)
    }
}
