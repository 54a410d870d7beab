//! Configuration loading, validation, and management for Storyloom.
//!
//! Loads configuration from `~/.storyloom/config.toml` with environment
//! variable overrides. Validation turns the `[budget]` section into a
//! [`Budget`] so a bad weight table fails at startup, not mid-assembly.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use storyloom_core::error::ConfigError as BudgetError;
use storyloom_core::{Budget, Category, CategoryWeights};

/// Overrides `novel_dir`.
pub const ENV_NOVEL_DIR: &str = "STORYLOOM_NOVEL_DIR";
/// Overrides `budget.max_tokens`.
pub const ENV_MAX_TOKENS: &str = "STORYLOOM_MAX_TOKENS";

/// The root configuration structure.
///
/// Maps directly to `~/.storyloom/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding the novel's artifacts
    #[serde(default = "default_novel_dir")]
    pub novel_dir: PathBuf,

    /// Token budget and category shares
    #[serde(default)]
    pub budget: BudgetConfig,

    /// Categories beyond the built-in five
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<CategoryConfig>,
}

fn default_novel_dir() -> PathBuf {
    PathBuf::from("novel")
}

fn default_max_tokens() -> usize {
    8000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            novel_dir: default_novel_dir(),
            budget: BudgetConfig::default(),
            categories: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Total token ceiling for one assembled context
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Category shares, in document order
    #[serde(default)]
    pub weights: WeightTable,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            weights: WeightTable::default(),
        }
    }
}

/// An extra category and the file that backs it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,

    /// File name under `novel_dir`; defaults to `<name>.md`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl CategoryConfig {
    pub fn file_name(&self) -> String {
        self.file
            .clone()
            .unwrap_or_else(|| format!("{}.md", self.name))
    }
}

/// `name = fraction` pairs that keep the order they were written in.
///
/// The order decides iteration order of the allocation and where extra
/// categories appear in the assembled context.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable(pub Vec<(String, f64)>);

impl Default for WeightTable {
    fn default() -> Self {
        Self(
            CategoryWeights::default()
                .iter()
                .map(|(category, weight)| (category.to_string(), weight))
                .collect(),
        )
    }
}

impl Serialize for WeightTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, weight) in &self.0 {
            map.serialize_entry(name, weight)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for WeightTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedWeights;

        impl<'de> Visitor<'de> for OrderedWeights {
            type Value = WeightTable;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a table of category = fraction")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, weight)) = access.next_entry::<String, f64>()? {
                    entries.push((name, weight));
                }
                Ok(WeightTable(entries))
            }
        }

        deserializer.deserialize_map(OrderedWeights)
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.storyloom/config.toml).
    ///
    /// Environment overrides:
    /// - `STORYLOOM_NOVEL_DIR`
    /// - `STORYLOOM_MAX_TOKENS`
    pub fn load() -> Result<(Self, Budget), ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load from `path`, apply environment overrides, then validate.
    pub fn load_with_env(path: &Path) -> Result<(Self, Budget), ConfigError> {
        Self::load_with_lookup(path, |key| std::env::var(key).ok())
    }

    /// Load from `path`, apply overrides from `lookup`, then validate once.
    ///
    /// Validation runs after the overrides, so an override can repair a
    /// file value that would fail on its own.
    pub fn load_with_lookup(
        path: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(Self, Budget), ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_overrides(lookup)?;
        let budget = config.validate()?;
        Ok((config, budget))
    }

    /// Parse configuration from a specific file path. Not validated; call
    /// [`Self::validate`] before use.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Apply overrides from `lookup` (the process environment in `load`).
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(dir) = lookup(ENV_NOVEL_DIR) {
            self.novel_dir = PathBuf::from(dir);
        }

        if let Some(raw) = lookup(ENV_MAX_TOKENS) {
            self.budget.max_tokens = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "{ENV_MAX_TOKENS} must be a positive integer, got '{raw}'"
                ))
            })?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".storyloom")
    }

    /// Validate the configuration and build the budget it describes.
    ///
    /// Every weighted category must be built in or declared under
    /// `[[categories]]`.
    pub fn validate(&self) -> Result<Budget, ConfigError> {
        let extras = self.extra_categories()?;

        let weights = CategoryWeights::from_pairs(
            self.budget.weights.0.iter().map(|(name, w)| (name.as_str(), *w)),
        )?;
        for category in weights.categories() {
            if !category.is_builtin() && !extras.iter().any(|(c, _)| c == category) {
                return Err(BudgetError::UnknownCategory(category.to_string()).into());
            }
        }

        Ok(Budget::new(self.budget.max_tokens, weights)?)
    }

    /// Declared extra categories with their file names.
    pub fn extra_categories(&self) -> Result<Vec<(Category, String)>, ConfigError> {
        let mut out: Vec<(Category, String)> = Vec::with_capacity(self.categories.len());
        for entry in &self.categories {
            let category = Category::new(entry.name.as_str())?;
            if category.is_builtin() || out.iter().any(|(c, _)| *c == category) {
                return Err(BudgetError::DuplicateCategory(category.to_string()).into());
            }
            out.push((category, entry.file_name()));
        }
        Ok(out)
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Invalid budget: {0}")]
    Budget(#[from] BudgetError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        let budget = config.validate().unwrap();
        assert_eq!(budget.total(), 8000);
        assert_eq!(budget.weights(), &CategoryWeights::default());
        assert_eq!(config.novel_dir, PathBuf::from("novel"));
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn weight_table_keeps_document_order() {
        let toml_str = r#"
novel_dir = "/srv/novel"

[budget]
max_tokens = 128000

[budget.weights]
plan = 0.6
character = 0.03
worldview = 0.04
index = 0.03
chapters = 0.3
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        let names: Vec<&str> = config.budget.weights.0.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["plan", "character", "worldview", "index", "chapters"]);

        let allocation = config.validate().unwrap().allocate();
        assert_eq!(allocation.get(&Category::PLAN), Some(76_800));
    }

    #[test]
    fn extra_categories_must_be_declared() {
        let toml_str = r#"
[budget.weights]
plan = 0.5
timeline = 0.5
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Budget(BudgetError::UnknownCategory(name))) if name == "timeline"
        ));

        let toml_str = r#"
[budget.weights]
plan = 0.5
timeline = 0.5

[[categories]]
name = "timeline"
file = "events.txt"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_ok());
        let extras = config.extra_categories().unwrap();
        assert_eq!(extras[0].1, "events.txt");
    }

    #[test]
    fn builtin_names_cannot_be_redeclared() {
        let config = AppConfig {
            categories: vec![CategoryConfig {
                name: "plan".into(),
                file: None,
            }],
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Budget(BudgetError::DuplicateCategory(_)))
        ));
    }

    #[test]
    fn extra_category_file_defaults_to_markdown() {
        let entry = CategoryConfig {
            name: "lore".into(),
            file: None,
        };
        assert_eq!(entry.file_name(), "lore.md");
    }

    #[test]
    fn invalid_weights_rejected() {
        let mut config = AppConfig::default();
        config.budget.weights = WeightTable(vec![("plan".into(), 0.5), ("index".into(), 0.2)]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Budget(BudgetError::WeightSum { .. }))
        ));
    }

    #[test]
    fn zero_budget_rejected() {
        let mut config = AppConfig::default();
        config.budget.max_tokens = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Budget(BudgetError::InvalidTotal(0)))
        ));
    }

    #[test]
    fn overrides_replace_dir_and_total() {
        let env: HashMap<&str, &str> =
            HashMap::from([(ENV_NOVEL_DIR, "/tmp/other"), (ENV_MAX_TOKENS, " 4096 ")]);
        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.novel_dir, PathBuf::from("/tmp/other"));
        assert_eq!(config.budget.max_tokens, 4096);
    }

    #[test]
    fn malformed_override_is_an_error() {
        let mut config = AppConfig::default();
        let result = config.apply_overrides(|key| (key == ENV_MAX_TOKENS).then(|| "lots".into()));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        let config = result.unwrap();
        assert_eq!(config.budget.max_tokens, 8000);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "novel_dir = \"books/one\"\n[budget]\nmax_tokens = 2000\n").unwrap();
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.novel_dir, PathBuf::from("books/one"));
        assert_eq!(config.budget.max_tokens, 2000);
        assert_eq!(config.budget.weights, WeightTable::default());
    }

    #[test]
    fn unparseable_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[budget\nmax_tokens = ").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn override_repairs_an_invalid_file_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[budget]\nmax_tokens = 0\n").unwrap();

        assert!(AppConfig::load_from(&path).is_ok());
        assert!(AppConfig::load_with_lookup(&path, |_| None).is_err());

        let (config, budget) =
            AppConfig::load_with_lookup(&path, |key| (key == ENV_MAX_TOKENS).then(|| "4096".into()))
                .unwrap();
        assert_eq!(config.budget.max_tokens, 4096);
        assert_eq!(budget.total(), 4096);
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("max_tokens = 8000"));
        assert!(toml_str.contains("[budget.weights]"));
        assert!(toml_str.contains("chapters = 0.6"));
    }
}
