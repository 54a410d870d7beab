//! The content store: the set of category providers one session reads from.
//!
//! A `ContentStore` is a cheap, cloneable handle. Clones share providers and
//! therefore share their caches; there is no process-wide registry.

use crate::file_content::FileContent;
use crate::index::IndexContent;
use crate::sections::{CHARACTER_HEADING, add_section, replace_section, section_names};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storyloom_core::error::ConfigError;
use storyloom_core::{
    Budget, Category, ContentProvider, Estimator, Result, StoreError, Truncated,
};
use tracing::{debug, warn};

/// File names of the built-in categories, relative to the novel directory.
pub const PLAN_FILE: &str = "plan.md";
pub const CHARACTER_FILE: &str = "character.md";
pub const WORLDVIEW_FILE: &str = "worldview.md";
pub const CHAPTERS_FILE: &str = "chapters.md";

/// Shared handle over the registered category providers.
#[derive(Clone, Default)]
pub struct ContentStore {
    providers: Vec<Arc<dyn ContentProvider>>,
    index: Option<Arc<IndexContent>>,
}

impl ContentStore {
    /// An empty store. Register providers before sharing it.
    pub fn new() -> Self {
        Self::default()
    }

    /// The five built-in categories under `dir`.
    pub fn with_default_layout(dir: &Path) -> Self {
        Self::new()
            .register(FileContent::new(Category::PLAN, dir.join(PLAN_FILE)))
            .register(FileContent::new(Category::CHARACTER, dir.join(CHARACTER_FILE)))
            .register(FileContent::new(Category::WORLDVIEW, dir.join(WORLDVIEW_FILE)))
            .register(FileContent::new(Category::CHAPTERS, dir.join(CHAPTERS_FILE)))
            .with_index(IndexContent::new(dir))
    }

    /// The built-in layout plus extra `(category, file name)` pairs under `dir`.
    pub fn with_layout(dir: &Path, extras: impl IntoIterator<Item = (Category, String)>) -> Self {
        extras
            .into_iter()
            .fold(Self::with_default_layout(dir), |store, (category, file)| {
                store.register(FileContent::new(category, dir.join(file)))
            })
    }

    /// Add a provider, replacing any earlier one for the same category.
    pub fn register(mut self, provider: impl ContentProvider + 'static) -> Self {
        self.insert(Arc::new(provider));
        self
    }

    /// Register the index provider, which is also reachable through [`Self::index`].
    pub fn with_index(mut self, index: IndexContent) -> Self {
        let index = Arc::new(index);
        self.insert(index.clone());
        self.index = Some(index);
        self
    }

    fn insert(&mut self, provider: Arc<dyn ContentProvider>) {
        let category = provider.category().clone();
        debug!(category = %category, path = %provider.location().display(), "Provider registered");
        if category == Category::INDEX {
            self.index = None;
        }
        match self.providers.iter_mut().find(|p| *p.category() == category) {
            Some(slot) => *slot = provider,
            None => self.providers.push(provider),
        }
    }

    pub fn provider(&self, category: &Category) -> Option<&Arc<dyn ContentProvider>> {
        self.providers.iter().find(|p| p.category() == category)
    }

    fn require(&self, category: &Category) -> Result<&Arc<dyn ContentProvider>> {
        self.provider(category)
            .ok_or_else(|| ConfigError::UnknownCategory(category.to_string()).into())
    }

    /// Registered categories, in registration order.
    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.providers.iter().map(|p| p.category())
    }

    pub fn contains(&self, category: &Category) -> bool {
        self.provider(category).is_some()
    }

    /// The index provider, when one is registered.
    pub fn index(&self) -> Option<&IndexContent> {
        self.index.as_deref()
    }

    pub async fn get_current(&self, category: &Category) -> Result<String> {
        Ok(self.require(category)?.get_current().await?)
    }

    pub async fn get_current_with_limit(
        &self,
        category: &Category,
        ceiling: usize,
    ) -> Result<Truncated> {
        Ok(self.require(category)?.get_current_with_limit(ceiling).await?)
    }

    pub async fn update(&self, category: &Category, text: &str) -> Result<()> {
        Ok(self.require(category)?.update(text).await?)
    }

    pub async fn append(&self, category: &Category, text: &str) -> Result<()> {
        Ok(self.require(category)?.append(text).await?)
    }

    /// Add a `## name` section to the character notes.
    pub async fn add_character(&self, name: &str, description: &str) -> Result<()> {
        let (provider, name) = self.character_section(name)?;
        let description = description.to_string();
        provider
            .modify(Box::new(move |current: &str| {
                add_section(current, CHARACTER_HEADING, &name, &description)
            }))
            .await?;
        Ok(())
    }

    /// Replace one character's section, keeping every other character as
    /// it was. An unknown name is added.
    pub async fn update_character(&self, name: &str, description: &str) -> Result<()> {
        let (provider, name) = self.character_section(name)?;
        let description = description.to_string();
        provider
            .modify(Box::new(move |current: &str| {
                replace_section(current, CHARACTER_HEADING, &name, &description)
            }))
            .await?;
        Ok(())
    }

    /// Names of the characters with a section, in document order.
    pub async fn character_names(&self) -> Result<Vec<String>> {
        let text = self.get_current(&Category::CHARACTER).await?;
        Ok(section_names(&text).into_iter().map(String::from).collect())
    }

    fn character_section(&self, name: &str) -> Result<(&Arc<dyn ContentProvider>, String)> {
        let provider = self.require(&Category::CHARACTER)?;
        let name = name.trim();
        if name.is_empty() || name.contains('\n') {
            return Err(StoreError::Malformed {
                path: provider.location().to_path_buf(),
                reason: format!("invalid character name {name:?}"),
            }
            .into());
        }
        Ok((provider, name.to_string()))
    }

    /// Copy a category's file to `<file>.backup.<YYYYmmddHHMMSS>`.
    ///
    /// Returns `None` when there is nothing to back up.
    pub async fn backup(&self, category: &Category) -> Result<Option<PathBuf>> {
        let source = self.require(category)?.location().to_path_buf();
        let exists = tokio::fs::try_exists(&source)
            .await
            .map_err(|e| StoreError::Metadata {
                path: source.clone(),
                source: e,
            })?;
        if !exists {
            return Ok(None);
        }

        let stamp = Utc::now().format("%Y%m%d%H%M%S");
        let mut name = source.clone().into_os_string();
        name.push(format!(".backup.{stamp}"));
        let target = PathBuf::from(name);

        tokio::fs::copy(&source, &target)
            .await
            .map_err(|e| StoreError::Write {
                path: target.clone(),
                source: e,
            })?;
        debug!(category = %category, path = %target.display(), "Backup written");
        Ok(Some(target))
    }

    /// Size, freshness and budget fit of every registered category.
    ///
    /// A category that fails to load is reported with its error rather than
    /// failing the whole report.
    pub async fn report(&self, budget: &Budget) -> Vec<CategoryReport> {
        let allocation = budget.allocate();
        let mut reports = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            let category = provider.category();
            let location = provider.location();
            let ceiling = allocation.get(category);
            let meta = tokio::fs::metadata(location).await.ok();

            let mut report = CategoryReport {
                category: category.clone(),
                location: location.to_path_buf(),
                exists: meta.is_some(),
                size_bytes: meta.as_ref().map_or(0, |m| m.len()),
                modified: meta
                    .and_then(|m| m.modified().ok())
                    .map(DateTime::<Utc>::from),
                tokens: 0,
                fast_tokens: 0,
                ceiling,
                within_budget: true,
                error: None,
            };

            match provider.get_current().await {
                Ok(text) => {
                    let tokens = Estimator::Detailed.count(&text);
                    report.tokens = tokens;
                    report.fast_tokens = Estimator::Fast.count(&text);
                    report.within_budget = ceiling.is_none_or(|c| tokens <= c);
                }
                Err(e) => {
                    warn!(category = %category, error = %e, "Category unreadable");
                    report.within_budget = false;
                    report.error = Some(e.to_string());
                }
            }
            reports.push(report);
        }

        reports
    }
}

impl std::fmt::Debug for ContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|p| (p.category(), p.location())))
            .finish()
    }
}

/// One row of [`ContentStore::report`].
#[derive(Debug, Clone, Serialize)]
pub struct CategoryReport {
    pub category: Category,
    pub location: PathBuf,
    pub exists: bool,
    pub size_bytes: u64,
    pub modified: Option<DateTime<Utc>>,
    /// Detailed estimate of the full content.
    pub tokens: usize,
    /// Fast estimate of the full content.
    pub fast_tokens: usize,
    /// Allocated ceiling; `None` when the budget gives this category no share.
    pub ceiling: Option<usize>,
    pub within_budget: bool,
    pub error: Option<String>,
}
