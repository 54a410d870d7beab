//! The novel index: title plus a running list of chapter summaries.
//!
//! Stored as two files side by side:
//! - `index.json`: an [`IndexRecord`]
//! - `title`: the novel title as plain text
//!
//! As a [`ContentProvider`] the index renders its summaries as
//! `"<chapter_id>: <summary>"` entries separated by blank lines.

use crate::file_content::FileContent;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use storyloom_core::content::Edit;
use storyloom_core::{Category, ContentProvider, StoreError};
use tokio::sync::Mutex;
use tracing::debug;

pub const INDEX_FILE: &str = "index.json";
pub const TITLE_FILE: &str = "title";
pub const INDEX_VERSION: &str = "1.0";

/// One chapter's entry in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterSummary {
    pub chapter_id: String,
    #[serde(default)]
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub word_count: usize,
    /// RFC 3339; filled in on upsert when empty.
    #[serde(default)]
    pub timestamp: String,
}

impl ChapterSummary {
    pub fn new(chapter_id: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            chapter_id: chapter_id.into(),
            title: String::new(),
            summary: summary.into(),
            word_count: 0,
            timestamp: String::new(),
        }
    }
}

/// Contents of `index.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub last_update: String,
    #[serde(default)]
    pub total_chapters: usize,
    #[serde(default)]
    pub summaries: Vec<ChapterSummary>,
}

fn default_version() -> String {
    INDEX_VERSION.into()
}

impl Default for IndexRecord {
    fn default() -> Self {
        Self {
            version: default_version(),
            last_update: String::new(),
            total_chapters: 0,
            summaries: vec![],
        }
    }
}

impl IndexRecord {
    /// Replace the entry with the same chapter id, or append a new one.
    pub fn upsert(&mut self, mut summary: ChapterSummary) {
        let now = now_rfc3339();
        if summary.timestamp.is_empty() {
            summary.timestamp = now.clone();
        }
        match self
            .summaries
            .iter_mut()
            .find(|s| s.chapter_id == summary.chapter_id)
        {
            Some(existing) => *existing = summary,
            None => self.summaries.push(summary),
        }
        self.total_chapters = self.summaries.len();
        self.last_update = now;
    }

    /// The last `count` summaries, rendered.
    pub fn render_recent(&self, count: usize) -> String {
        let skip = self.summaries.len().saturating_sub(count);
        render(&self.summaries[skip..])
    }

    /// All summaries, rendered.
    pub fn render(&self) -> String {
        render(&self.summaries)
    }
}

fn render(summaries: &[ChapterSummary]) -> String {
    summaries
        .iter()
        .map(|s| format!("{}: {}", s.chapter_id, s.summary))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Index provider over `index.json` and `title`.
pub struct IndexContent {
    index: FileContent,
    title: FileContent,
    /// Serializes read-modify-write cycles on the record.
    edit: Mutex<()>,
}

impl IndexContent {
    /// `index.json` and `title` inside `dir`.
    pub fn new(dir: &Path) -> Self {
        Self::with_paths(dir.join(INDEX_FILE), dir.join(TITLE_FILE))
    }

    pub fn with_paths(index_path: impl Into<PathBuf>, title_path: impl Into<PathBuf>) -> Self {
        Self {
            index: FileContent::new(Category::INDEX, index_path),
            title: FileContent::new(Category::INDEX, title_path),
            edit: Mutex::new(()),
        }
    }

    pub fn title_location(&self) -> &Path {
        self.title.location()
    }

    /// The parsed index. An absent or blank file is an empty record.
    pub async fn record(&self) -> Result<IndexRecord, StoreError> {
        let raw = self.index.get_current().await?;
        self.parse(&raw)
    }

    fn parse(&self, raw: &str) -> Result<IndexRecord, StoreError> {
        if raw.trim().is_empty() {
            return Ok(IndexRecord::default());
        }
        serde_json::from_str(raw).map_err(|e| StoreError::Malformed {
            path: self.index.location().to_path_buf(),
            reason: e.to_string(),
        })
    }

    async fn save(&self, record: &IndexRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(record).map_err(|e| StoreError::Malformed {
            path: self.index.location().to_path_buf(),
            reason: e.to_string(),
        })?;
        self.index.update(&json).await
    }

    pub async fn set_title(&self, title: &str) -> Result<(), StoreError> {
        self.title.update(title.trim()).await
    }

    /// Insert or replace a chapter summary and persist the index.
    pub async fn upsert_summary(&self, summary: ChapterSummary) -> Result<IndexRecord, StoreError> {
        let _guard = self.edit.lock().await;
        let mut record = self.record().await?;
        let chapter_id = summary.chapter_id.clone();
        record.upsert(summary);
        self.save(&record).await?;
        debug!(chapter_id = %chapter_id, total = record.total_chapters, "Chapter summary saved");
        Ok(record)
    }

    /// The last `count` summaries, rendered like [`ContentProvider::get_current`].
    pub async fn recent_summary(&self, count: usize) -> Result<String, StoreError> {
        Ok(self.record().await?.render_recent(count))
    }
}

#[async_trait]
impl ContentProvider for IndexContent {
    fn category(&self) -> &Category {
        self.index.category()
    }

    fn location(&self) -> &Path {
        self.index.location()
    }

    async fn get_current(&self) -> Result<String, StoreError> {
        Ok(self.record().await?.render())
    }

    /// Replace the whole record. Input that is not a valid index is rejected
    /// before anything is written.
    async fn update(&self, text: &str) -> Result<(), StoreError> {
        let _guard = self.edit.lock().await;
        self.parse(text)?;
        self.index.update(text).await
    }

    async fn append(&self, _text: &str) -> Result<(), StoreError> {
        Err(StoreError::Malformed {
            path: self.index.location().to_path_buf(),
            reason: "the index takes chapter summaries, not appended text".into(),
        })
    }

    async fn modify(&self, _edit: Edit) -> Result<(), StoreError> {
        Err(StoreError::Malformed {
            path: self.index.location().to_path_buf(),
            reason: "the rendered index cannot be edited as text".into(),
        })
    }

    async fn title(&self) -> Result<Option<String>, StoreError> {
        let title = self.title.get_current().await?;
        let title = title.trim();
        Ok((!title.is_empty()).then(|| title.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn empty_index_renders_nothing() {
        let dir = TempDir::new().unwrap();
        let index = IndexContent::new(dir.path());
        assert_eq!(index.get_current().await.unwrap(), "");
        assert_eq!(index.record().await.unwrap(), IndexRecord::default());
        assert_eq!(index.title().await.unwrap(), None);
    }

    #[tokio::test]
    async fn upsert_appends_then_replaces() {
        let dir = TempDir::new().unwrap();
        let index = IndexContent::new(dir.path());

        index
            .upsert_summary(ChapterSummary::new("ch1", "The hero leaves home."))
            .await
            .unwrap();
        index
            .upsert_summary(ChapterSummary::new("ch2", "A storm at sea."))
            .await
            .unwrap();
        let record = index
            .upsert_summary(ChapterSummary::new("ch1", "The hero is exiled."))
            .await
            .unwrap();

        assert_eq!(record.total_chapters, 2);
        assert_eq!(record.summaries[0].summary, "The hero is exiled.");
        assert!(!record.summaries[0].timestamp.is_empty());
        assert!(!record.last_update.is_empty());
        assert_eq!(
            index.get_current().await.unwrap(),
            "ch1: The hero is exiled.\n\nch2: A storm at sea."
        );
    }

    #[tokio::test]
    async fn recent_summary_takes_the_tail() {
        let dir = TempDir::new().unwrap();
        let index = IndexContent::new(dir.path());
        for n in 1..=4 {
            index
                .upsert_summary(ChapterSummary::new(format!("ch{n}"), format!("part {n}")))
                .await
                .unwrap();
        }
        assert_eq!(
            index.recent_summary(2).await.unwrap(),
            "ch3: part 3\n\nch4: part 4"
        );
        assert_eq!(index.recent_summary(10).await.unwrap().matches("ch").count(), 4);
        assert_eq!(index.recent_summary(0).await.unwrap(), "");
    }

    #[tokio::test]
    async fn title_is_trimmed_plain_text() {
        let dir = TempDir::new().unwrap();
        let index = IndexContent::new(dir.path());
        index.set_title("  The Glass Sea \n").await.unwrap();
        assert_eq!(index.title().await.unwrap().as_deref(), Some("The Glass Sea"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join(TITLE_FILE)).unwrap(),
            "The Glass Sea"
        );
    }

    #[tokio::test]
    async fn malformed_update_is_rejected_before_writing() {
        let dir = TempDir::new().unwrap();
        let index = IndexContent::new(dir.path());
        index
            .upsert_summary(ChapterSummary::new("ch1", "kept"))
            .await
            .unwrap();

        let err = index.update("{ not json").await.unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
        assert_eq!(index.get_current().await.unwrap(), "ch1: kept");
    }

    #[tokio::test]
    async fn accepts_records_written_by_other_tools() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(INDEX_FILE),
            r#"{"version":"1.0","last_update":"2024-05-01T10:00:00+08:00","total_chapters":1,
               "summaries":[{"chapter_id":"001","title":"Start","summary":"It begins.",
                             "word_count":3200,"timestamp":"2024-05-01T10:00:00+08:00"}]}"#,
        )
        .unwrap();
        let index = IndexContent::new(dir.path());
        let record = index.record().await.unwrap();
        assert_eq!(record.summaries[0].word_count, 3200);
        assert_eq!(index.get_current().await.unwrap(), "001: It begins.");
    }

    #[tokio::test]
    async fn corrupt_file_is_a_read_failure() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(INDEX_FILE), "[1, 2").unwrap();
        let index = IndexContent::new(dir.path());
        assert!(matches!(
            index.get_current().await,
            Err(StoreError::Malformed { .. })
        ));
    }

    #[tokio::test]
    async fn append_is_refused() {
        let dir = TempDir::new().unwrap();
        let index = IndexContent::new(dir.path());
        assert!(index.append("loose text").await.is_err());
        assert!(index.modify(Box::new(|s: &str| s.to_uppercase())).await.is_err());
    }
}
