//! File-backed content provider: one plain-text blob per category.
//!
//! The file is read lazily and cached. Each read compares the file's
//! modification time with the cached one and reloads when the file is newer,
//! so edits made outside the engine are picked up without a restart.
//!
//! Missing files read as empty. Writes go to disk first and only then
//! replace the cached text.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use storyloom_core::content::Edit;
use storyloom_core::{Category, ContentProvider, StoreError};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Cached state for one file. Text and timestamp only change together.
#[derive(Debug, Default)]
struct ContentRecord {
    text: String,
    modified: Option<SystemTime>,
    loaded: bool,
}

impl ContentRecord {
    /// Fresh unless nothing was loaded yet or storage moved on: the file is
    /// strictly newer, appeared, or disappeared.
    fn is_fresh(&self, on_disk: Option<SystemTime>) -> bool {
        if !self.loaded {
            return false;
        }
        match (on_disk, self.modified) {
            (Some(disk), Some(cached)) => disk <= cached,
            (None, None) => true,
            _ => false,
        }
    }
}

/// A cached, invalidation-aware text file.
pub struct FileContent {
    category: Category,
    path: PathBuf,
    record: RwLock<ContentRecord>,
}

impl FileContent {
    /// Create a provider for `path`. Nothing is read until first access.
    pub fn new(category: Category, path: impl Into<PathBuf>) -> Self {
        Self {
            category,
            path: path.into(),
            record: RwLock::new(ContentRecord::default()),
        }
    }

    /// Current modification time, `None` when the file does not exist.
    async fn stat(&self) -> Result<Option<SystemTime>, StoreError> {
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta.modified().map(Some).map_err(|e| StoreError::Metadata {
                path: self.path.clone(),
                source: e,
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Metadata {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    /// Bring `record` up to date with the file.
    async fn refresh(&self, record: &mut ContentRecord) -> Result<(), StoreError> {
        let on_disk = self.stat().await?;
        if record.is_fresh(on_disk) {
            return Ok(());
        }

        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };

        debug!(
            category = %self.category,
            path = %self.path.display(),
            bytes = text.len(),
            reload = record.loaded,
            "Content loaded"
        );
        *record = ContentRecord {
            text,
            modified: on_disk,
            loaded: true,
        };
        Ok(())
    }

    /// Write `text` to disk, then cache it. The record is untouched on failure.
    async fn write_through(
        &self,
        record: &mut ContentRecord,
        text: &str,
    ) -> Result<(), StoreError> {
        ensure_parent(&self.path).await?;

        tokio::fs::write(&self.path, text)
            .await
            .map_err(|e| StoreError::Write {
                path: self.path.clone(),
                source: e,
            })?;

        *record = self.settle(text).await?;
        debug!(
            category = %self.category,
            path = %self.path.display(),
            bytes = text.len(),
            "Content written"
        );
        Ok(())
    }

    /// The record to cache after writing `written`.
    ///
    /// The timestamp is taken after the write, so another writer may land in
    /// between. The file is read back under that timestamp: if it no longer
    /// holds `written`, the other writer's text is cached with its own
    /// timestamp instead of pairing ours with theirs.
    async fn settle(&self, written: &str) -> Result<ContentRecord, StoreError> {
        let modified = self.stat().await?;
        let on_disk = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };

        if on_disk != written {
            warn!(
                category = %self.category,
                path = %self.path.display(),
                "File changed during write, keeping the newer content"
            );
        }
        Ok(ContentRecord {
            text: on_disk,
            modified,
            loaded: true,
        })
    }
}

/// The parent directory must already exist; it is never created here.
async fn ensure_parent(path: &Path) -> Result<(), StoreError> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    match tokio::fs::metadata(parent).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        _ => Err(StoreError::MissingParent(path.to_path_buf())),
    }
}

#[async_trait]
impl ContentProvider for FileContent {
    fn category(&self) -> &Category {
        &self.category
    }

    fn location(&self) -> &Path {
        &self.path
    }

    async fn get_current(&self) -> Result<String, StoreError> {
        {
            let record = self.record.read().await;
            if record.is_fresh(self.stat().await?) {
                return Ok(record.text.clone());
            }
        }

        // Re-checked under the exclusive lock; another reader may have
        // reloaded in between.
        let mut record = self.record.write().await;
        self.refresh(&mut record).await?;
        Ok(record.text.clone())
    }

    async fn update(&self, text: &str) -> Result<(), StoreError> {
        let mut record = self.record.write().await;
        self.write_through(&mut record, text).await
    }

    /// Runs under the write lock, so concurrent edits never lose each other.
    async fn modify(&self, edit: Edit) -> Result<(), StoreError> {
        let mut record = self.record.write().await;
        self.refresh(&mut record).await?;
        let next = edit(&record.text);
        self.write_through(&mut record, &next).await
    }
}
