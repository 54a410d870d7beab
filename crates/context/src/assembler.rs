//! Context assembly: one bounded context string from every category.
//!
//! Each weighted category is read through the [`ContentStore`], cut to its
//! allocated ceiling, and placed into a fixed section layout:
//!
//! 1. **Title** and **Summary** (index)
//! 2. **Worldview**
//! 3. **Characters**
//! 4. **Plan**
//! 5. **Chapters**
//! 6. extra categories, in weight order
//!
//! Every built-in section is always present. Empty, unweighted and
//! unreadable categories render a placeholder, so downstream templates see
//! the same shape on every call.
//!
//! # Failure handling
//!
//! A category that fails to load does not abort assembly. It renders as a
//! placeholder and the failure is listed in [`AssemblyMetadata::failures`].

use futures::future::join_all;
use serde::Serialize;
use std::borrow::Cow;
use storyloom_core::error::ConfigError;
use storyloom_core::{Budget, Category, StoreError, Truncated};
use storyloom_store::ContentStore;
use tracing::{debug, warn};

// ── Types ─────────────────────────────────────────────────────────────────

/// Shown when the index has no title.
pub const UNTITLED: &str = "Untitled";

/// The assembled context, ready to drop into a prompt.
#[derive(Debug, Clone, Serialize)]
pub struct AssembledContext {
    /// Novel title, or [`UNTITLED`].
    pub title: String,
    /// Truncated text per weighted category, in weight order. Empty when the
    /// category had nothing to contribute.
    pub sections: Vec<Section>,
    /// The rendered context.
    pub formatted: String,
    /// Assembly metadata (token counts, truncation, failures).
    pub metadata: AssemblyMetadata,
}

impl AssembledContext {
    /// Truncated text for `category`, if it was part of the budget.
    pub fn get(&self, category: &Category) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.category == *category)
            .map(|s| s.text.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub category: Category,
    pub text: String,
}

/// Detailed metadata about one assembly.
#[derive(Debug, Clone, Serialize)]
pub struct AssemblyMetadata {
    /// Configured total budget.
    pub budget: usize,
    /// Sum of section tokens; labels and placeholders are not counted.
    pub total_tokens: usize,
    /// Budget utilization percentage (0.0–100.0).
    pub utilization_pct: f32,
    /// Per-section statistics, in weight order.
    pub per_section: Vec<SectionStats>,
    /// Categories that could not be read.
    pub failures: Vec<SectionFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionStats {
    pub category: Category,
    /// Allocated ceiling.
    pub ceiling: usize,
    /// Estimate of the stored content before truncation.
    pub source_tokens: usize,
    /// Estimate of the text kept.
    pub tokens: usize,
    pub truncated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionFailure {
    pub category: Category,
    pub error: String,
}

// ── Assembler ─────────────────────────────────────────────────────────────

/// The context assembler. Holds a store handle; create one and reuse it.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    store: ContentStore,
}

impl ContextAssembler {
    pub fn new(store: ContentStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Every weighted category must have a provider in the store.
    pub fn check(&self, budget: &Budget) -> Result<(), ConfigError> {
        match budget.weights().categories().find(|c| !self.store.contains(c)) {
            Some(unknown) => Err(ConfigError::UnknownCategory(unknown.to_string())),
            None => Ok(()),
        }
    }

    /// Assemble the context for `budget`.
    ///
    /// # Algorithm
    ///
    /// 1. Reject budgets naming categories the store does not know
    /// 2. Allocate per-category ceilings
    /// 3. Fetch every category's limited content concurrently
    /// 4. Render sections in the fixed order, whatever order fetches finished in
    pub async fn assemble(&self, budget: &Budget) -> Result<AssembledContext, ConfigError> {
        self.check(budget)?;
        let allocation = budget.allocate();

        let fetches = allocation.iter().map(|(category, ceiling)| async move {
            let result = match self.store.provider(category) {
                Some(provider) => provider.get_current_with_limit(ceiling).await,
                None => Ok(Truncated::default()),
            };
            (category.clone(), ceiling, result)
        });
        let (fetched, title) = futures::join!(join_all(fetches), self.fetch_title());

        let mut sections = Vec::with_capacity(fetched.len());
        let mut per_section = Vec::with_capacity(fetched.len());
        let mut failures = Vec::new();

        for (category, ceiling, result) in fetched {
            let content = match result {
                Ok(content) => content,
                Err(e) => {
                    warn!(
                        category = %category,
                        error = %e,
                        "Category unavailable, using placeholder"
                    );
                    failures.push(SectionFailure {
                        category: category.clone(),
                        error: e.to_string(),
                    });
                    Truncated::default()
                }
            };
            per_section.push(SectionStats {
                category: category.clone(),
                ceiling,
                source_tokens: content.source_tokens,
                tokens: content.tokens,
                truncated: content.truncated,
            });
            sections.push(Section {
                category,
                text: content.text,
            });
        }

        let title = match title {
            Ok(Some(title)) => title,
            Ok(None) => UNTITLED.to_string(),
            Err(e) => {
                warn!(error = %e, "Title unavailable");
                failures.push(SectionFailure {
                    category: Category::INDEX,
                    error: e.to_string(),
                });
                UNTITLED.to_string()
            }
        };

        let formatted = render(&title, &sections);
        let total_tokens: usize = per_section.iter().map(|s| s.tokens).sum();
        let utilization_pct = (total_tokens as f32 / budget.total() as f32) * 100.0;

        debug!(
            budget = budget.total(),
            total_tokens,
            sections = sections.len(),
            failures = failures.len(),
            "Context assembled"
        );

        Ok(AssembledContext {
            title,
            sections,
            formatted,
            metadata: AssemblyMetadata {
                budget: budget.total(),
                total_tokens,
                utilization_pct,
                per_section,
                failures,
            },
        })
    }

    async fn fetch_title(&self) -> Result<Option<String>, StoreError> {
        match self.store.provider(&Category::INDEX) {
            Some(index) => index.title().await,
            None => Ok(None),
        }
    }
}

// ── Rendering ─────────────────────────────────────────────────────────────

/// Section label for a category.
fn label(category: &Category) -> Cow<'static, str> {
    match category.as_str() {
        "index" => "Summary".into(),
        "worldview" => "Worldview".into(),
        "character" => "Characters".into(),
        "plan" => "Plan".into(),
        "chapters" => "Chapters".into(),
        other => {
            let spaced = other.replace(['_', '-'], " ");
            let mut chars = spaced.chars();
            match chars.next() {
                Some(first) => format!("{}{}", first.to_ascii_uppercase(), chars.as_str()).into(),
                None => Cow::Owned(spaced),
            }
        }
    }
}

fn placeholder(category: &Category) -> Cow<'static, str> {
    match category.as_str() {
        "index" => "No chapter summaries yet.".into(),
        "worldview" => "No worldview notes yet.".into(),
        "character" => "No character notes yet.".into(),
        "plan" => "No plan yet.".into(),
        "chapters" => "No chapters yet.".into(),
        other => format!("No {other} notes yet.").into(),
    }
}

fn render(title: &str, sections: &[Section]) -> String {
    let text_of = |category: &Category| {
        sections
            .iter()
            .find(|s| s.category == *category)
            .map(|s| s.text.as_str())
            .filter(|t| !t.trim().is_empty())
    };

    let mut blocks = vec![format!("Title: {title}")];
    let extras = sections
        .iter()
        .map(|s| &s.category)
        .filter(|c| !c.is_builtin());

    for category in Category::BUILTIN.iter().chain(extras) {
        let body = text_of(category)
            .map(Cow::Borrowed)
            .unwrap_or_else(|| placeholder(category));
        blocks.push(format!("{}:\n{}", label(category), body));
    }

    blocks.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use storyloom_core::{CategoryWeights, ContentProvider, estimate};
    use storyloom_store::ChapterSummary;
    use tempfile::TempDir;

    fn budget(total: usize, pairs: &[(&str, f64)]) -> Budget {
        Budget::new(total, CategoryWeights::from_pairs(pairs.iter().copied()).unwrap()).unwrap()
    }

    /// A provider whose storage is always unreadable.
    struct Broken {
        category: Category,
        path: PathBuf,
    }

    #[async_trait]
    impl ContentProvider for Broken {
        fn category(&self) -> &Category {
            &self.category
        }

        fn location(&self) -> &Path {
            &self.path
        }

        async fn get_current(&self) -> Result<String, StoreError> {
            Err(StoreError::Read {
                path: self.path.clone(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            })
        }

        async fn update(&self, _text: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    async fn populated(dir: &TempDir) -> ContentStore {
        let store = ContentStore::with_default_layout(dir.path());
        store
            .update(&Category::WORLDVIEW, "Islands float above a glass sea.")
            .await
            .unwrap();
        store
            .update(&Category::CHARACTER, "Mira: a cartographer who cannot swim.")
            .await
            .unwrap();
        store
            .update(&Category::PLAN, "Next: Mira finds the drowned map.")
            .await
            .unwrap();
        store
            .update(&Category::CHAPTERS, "Chapter 1. The wind turned.")
            .await
            .unwrap();
        let index = store.index().unwrap();
        index.set_title("The Glass Sea").await.unwrap();
        index
            .upsert_summary(ChapterSummary::new("ch1", "Mira leaves port."))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn sections_render_in_fixed_order() {
        let dir = TempDir::new().unwrap();
        let assembler = ContextAssembler::new(populated(&dir).await);
        // Weight order differs from render order on purpose.
        let budget = budget(
            4000,
            &[
                ("chapters", 0.6),
                ("plan", 0.15),
                ("character", 0.1),
                ("worldview", 0.1),
                ("index", 0.05),
            ],
        );
        let ctx = assembler.assemble(&budget).await.unwrap();

        assert_eq!(
            ctx.formatted,
            "Title: The Glass Sea\n\n\
             Summary:\nch1: Mira leaves port.\n\n\
             Worldview:\nIslands float above a glass sea.\n\n\
             Characters:\nMira: a cartographer who cannot swim.\n\n\
             Plan:\nNext: Mira finds the drowned map.\n\n\
             Chapters:\nChapter 1. The wind turned."
        );
        let order: Vec<&str> = ctx.sections.iter().map(|s| s.category.as_str()).collect();
        assert_eq!(order, ["chapters", "plan", "character", "worldview", "index"]);
        assert!(ctx.metadata.failures.is_empty());
    }

    #[tokio::test]
    async fn empty_store_renders_placeholders() {
        let dir = TempDir::new().unwrap();
        let assembler = ContextAssembler::new(ContentStore::with_default_layout(dir.path()));
        let ctx = assembler
            .assemble(&Budget::with_default_weights(1000).unwrap())
            .await
            .unwrap();

        assert_eq!(ctx.title, UNTITLED);
        for expected in [
            "No chapter summaries yet.",
            "No worldview notes yet.",
            "No character notes yet.",
            "No plan yet.",
            "No chapters yet.",
        ] {
            assert!(ctx.formatted.contains(expected), "missing {expected:?}");
        }
        assert_eq!(ctx.metadata.total_tokens, 0);
        assert_eq!(ctx.get(&Category::PLAN), Some(""));
    }

    #[tokio::test]
    async fn unweighted_builtins_still_get_a_section() {
        let dir = TempDir::new().unwrap();
        let assembler = ContextAssembler::new(populated(&dir).await);
        let ctx = assembler
            .assemble(&budget(100, &[("plan", 1.0)]))
            .await
            .unwrap();
        assert!(ctx.formatted.contains("Worldview:\nNo worldview notes yet."));
        assert!(ctx.formatted.contains("Plan:\nNext: Mira finds the drowned map."));
        assert_eq!(ctx.get(&Category::WORLDVIEW), None);
    }

    #[tokio::test]
    async fn every_section_respects_its_ceiling() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::with_default_layout(dir.path());
        store
            .update(&Category::CHAPTERS, &"The tide rose again. ".repeat(500))
            .await
            .unwrap();
        store
            .update(&Category::WORLDVIEW, &"天地玄黄".repeat(300))
            .await
            .unwrap();
        let assembler = ContextAssembler::new(store);
        let budget = Budget::with_default_weights(500).unwrap();
        let ctx = assembler.assemble(&budget).await.unwrap();

        for stats in &ctx.metadata.per_section {
            assert!(stats.tokens <= stats.ceiling, "{} over ceiling", stats.category);
            assert_eq!(stats.tokens, estimate(ctx.get(&stats.category).unwrap()));
        }
        let chapters = ctx
            .metadata
            .per_section
            .iter()
            .find(|s| s.category == Category::CHAPTERS)
            .unwrap();
        assert!(chapters.truncated);
        assert_eq!(chapters.source_tokens, 1665);
        assert!(ctx.metadata.total_tokens <= budget.total() + 5);
        assert!(ctx.metadata.utilization_pct > 0.0);
    }

    #[tokio::test]
    async fn failing_category_degrades_to_placeholder() {
        let dir = TempDir::new().unwrap();
        let store = populated(&dir).await.register(Broken {
            category: Category::WORLDVIEW,
            path: dir.path().join("worldview.md"),
        });
        let assembler = ContextAssembler::new(store);
        let ctx = assembler
            .assemble(&Budget::with_default_weights(2000).unwrap())
            .await
            .unwrap();

        assert!(ctx.formatted.contains("Worldview:\nNo worldview notes yet."));
        assert!(ctx.formatted.contains("Plan:\nNext: Mira finds the drowned map."));
        assert_eq!(ctx.metadata.failures.len(), 1);
        assert_eq!(ctx.metadata.failures[0].category, Category::WORLDVIEW);
        assert!(ctx.metadata.failures[0].error.contains("denied"));
    }

    #[tokio::test]
    async fn unknown_category_is_rejected() {
        let dir = TempDir::new().unwrap();
        let assembler = ContextAssembler::new(ContentStore::with_default_layout(dir.path()));
        let err = assembler
            .assemble(&budget(100, &[("plan", 0.5), ("timeline", 0.5)]))
            .await
            .unwrap_err();
        assert_eq!(err, ConfigError::UnknownCategory("timeline".into()));
    }

    #[tokio::test]
    async fn extra_categories_follow_the_builtins() {
        let dir = TempDir::new().unwrap();
        let side_plots = Category::new("side_plots").unwrap();
        let store = ContentStore::with_layout(dir.path(), [(side_plots.clone(), "side.md".into())]);
        store.update(&side_plots, "The smuggler's debt.").await.unwrap();
        let assembler = ContextAssembler::new(store);

        let ctx = assembler
            .assemble(&budget(1000, &[("side_plots", 0.5), ("chapters", 0.5)]))
            .await
            .unwrap();
        assert!(ctx.formatted.ends_with("Side plots:\nThe smuggler's debt."));
    }

    #[tokio::test]
    async fn assembly_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let assembler = ContextAssembler::new(populated(&dir).await);
        let budget = Budget::with_default_weights(300).unwrap();
        let first = assembler.assemble(&budget).await.unwrap();
        let second = assembler.assemble(&budget).await.unwrap();
        assert_eq!(first.formatted, second.formatted);
    }

    #[test]
    fn labels_for_extra_categories() {
        assert_eq!(label(&Category::new("side_plots").unwrap()), "Side plots");
        assert_eq!(label(&Category::new("lore").unwrap()), "Lore");
        assert_eq!(label(&Category::CHARACTER), "Characters");
    }
}
