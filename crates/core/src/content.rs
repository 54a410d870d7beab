//! Content provider trait: one storage-backed text artifact per category.
//!
//! Providers cache what they read and reload when the backing storage has
//! been modified since. Absent content is not an error: it reads as `""`.

use crate::category::Category;
use crate::error::StoreError;
use crate::truncate::{Truncated, truncate};
use async_trait::async_trait;
use std::path::Path;

/// Placed between existing content and appended text.
pub const APPEND_SEPARATOR: &str = "\n\n";

/// Turns the current content into its replacement. See
/// [`ContentProvider::modify`].
pub type Edit = Box<dyn FnOnce(&str) -> String + Send>;

/// `text` after `current`, separated by a blank line unless `current` is
/// empty.
pub fn join_appended(current: &str, text: &str) -> String {
    if current.is_empty() {
        text.to_string()
    } else {
        format!("{current}{APPEND_SEPARATOR}{text}")
    }
}

/// A readable, writable text artifact for a single category.
///
/// Implementations: `FileContent` (plain text blob), `IndexContent`
/// (title plus running chapter summaries).
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// The category this provider serves.
    fn category(&self) -> &Category;

    /// Where the content is stored.
    fn location(&self) -> &Path;

    /// Current content, reloaded first if storage changed.
    async fn get_current(&self) -> Result<String, StoreError>;

    /// Replace the content. Storage is written first; the cached copy only
    /// changes once the write succeeded.
    async fn update(&self, text: &str) -> Result<(), StoreError>;

    /// Replace the content with `edit(current)`.
    ///
    /// The default reads then writes without holding a lock in between;
    /// implementations with their own lock should override it so the edit
    /// sees exactly the content it replaces.
    async fn modify(&self, edit: Edit) -> Result<(), StoreError> {
        let current = self.get_current().await?;
        self.update(&edit(&current)).await
    }

    /// Add `text` after the current content, separated by a blank line.
    async fn append(&self, text: &str) -> Result<(), StoreError> {
        let text = text.to_string();
        self.modify(Box::new(move |current: &str| join_appended(current, &text)))
            .await
    }

    /// Current content cut to `ceiling` tokens.
    async fn get_current_with_limit(&self, ceiling: usize) -> Result<Truncated, StoreError> {
        let text = self.get_current().await?;
        Ok(truncate(&text, ceiling))
    }

    /// Display title, for providers that carry one.
    async fn title(&self) -> Result<Option<String>, StoreError> {
        Ok(None)
    }
}
