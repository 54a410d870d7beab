//! Content categories and their budget weights.
//!
//! A [`Category`] is a named slice of the assembled context with its own
//! storage location and budget share. Five categories are built in; callers
//! may declare more, as long as the name is a short lowercase identifier.
//!
//! [`CategoryWeights`] is validated once, when it is built, and is immutable
//! afterwards. To change a share, build a new set.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Maximum length of a category name.
pub const MAX_CATEGORY_NAME: usize = 32;

/// Tolerance on the sum of all weights.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

/// A validated category name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Category(Cow<'static, str>);

impl Category {
    /// Prior planning notes.
    pub const PLAN: Category = Category(Cow::Borrowed("plan"));
    /// Character notes.
    pub const CHARACTER: Category = Category(Cow::Borrowed("character"));
    /// Setting notes.
    pub const WORLDVIEW: Category = Category(Cow::Borrowed("worldview"));
    /// Narrative history.
    pub const CHAPTERS: Category = Category(Cow::Borrowed("chapters"));
    /// Title plus running chapter summaries.
    pub const INDEX: Category = Category(Cow::Borrowed("index"));

    /// The built-in categories, in the order the assembler renders them.
    pub const BUILTIN: [Category; 5] = [
        Self::INDEX,
        Self::WORLDVIEW,
        Self::CHARACTER,
        Self::PLAN,
        Self::CHAPTERS,
    ];

    /// Validate and wrap a caller-supplied name.
    pub fn new(name: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(ConfigError::InvalidCategoryName(name));
        }
        if let Some(builtin) = Self::BUILTIN.iter().find(|c| c.as_str() == name) {
            return Ok(builtin.clone());
        }
        Ok(Self(Cow::Owned(name)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is one of the five built-in categories.
    pub fn is_builtin(&self) -> bool {
        Self::BUILTIN.contains(self)
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {}
        _ => return false,
    }
    name.len() <= MAX_CATEGORY_NAME
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Category {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.0.into_owned()
    }
}

impl std::str::FromStr for Category {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Ordered `(category, fraction)` pairs.
///
/// Invariants, all checked by [`CategoryWeights::new`]:
/// - every fraction is finite and `>= 0`
/// - no category appears twice
/// - fractions sum to `1.0 ± 0.01`
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryWeights {
    entries: Vec<(Category, f64)>,
}

impl CategoryWeights {
    pub fn new(entries: impl IntoIterator<Item = (Category, f64)>) -> Result<Self, ConfigError> {
        let entries: Vec<(Category, f64)> = entries.into_iter().collect();

        for (i, (category, weight)) in entries.iter().enumerate() {
            if entries[..i].iter().any(|(seen, _)| seen == category) {
                return Err(ConfigError::DuplicateCategory(category.to_string()));
            }
            if !weight.is_finite() {
                return Err(ConfigError::NonFiniteWeight {
                    category: category.to_string(),
                });
            }
            if *weight < 0.0 {
                return Err(ConfigError::NegativeWeight {
                    category: category.to_string(),
                    weight: *weight,
                });
            }
        }

        let sum: f64 = entries.iter().map(|(_, w)| w).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightSum { sum });
        }

        Ok(Self { entries })
    }

    /// Build from raw names, validating each one.
    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> Result<Self, ConfigError> {
        let entries = pairs
            .into_iter()
            .map(|(name, weight)| Ok((Category::new(name)?, weight)))
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Self::new(entries)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Category, f64)> {
        self.entries.iter().map(|(c, w)| (c, *w))
    }

    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.entries.iter().map(|(c, _)| c)
    }

    pub fn get(&self, category: &Category) -> Option<f64> {
        self.entries
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, w)| *w)
    }

    pub fn contains(&self, category: &Category) -> bool {
        self.get(category).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of categories with a strictly positive share.
    pub fn nonzero_count(&self) -> usize {
        self.entries.iter().filter(|(_, w)| *w > 0.0).count()
    }
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            entries: vec![
                (Category::PLAN, 0.15),
                (Category::CHARACTER, 0.10),
                (Category::WORLDVIEW, 0.10),
                (Category::CHAPTERS, 0.60),
                (Category::INDEX, 0.05),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_names_resolve_to_constants() {
        assert_eq!(Category::new("plan").unwrap(), Category::PLAN);
        assert!(Category::new("index").unwrap().is_builtin());
        assert!(!Category::new("timeline").unwrap().is_builtin());
    }

    #[test]
    fn rejects_malformed_names() {
        let long = "x".repeat(40);
        for bad in ["", "Plan", "1st", "has space", "ünicode", long.as_str()] {
            assert!(
                matches!(Category::new(bad), Err(ConfigError::InvalidCategoryName(_))),
                "{bad:?} should be rejected"
            );
        }
        assert!(Category::new("side_plots-2").is_ok());
    }

    #[test]
    fn category_serde_validates() {
        let c: Category = serde_json::from_str("\"worldview\"").unwrap();
        assert_eq!(c, Category::WORLDVIEW);
        assert!(serde_json::from_str::<Category>("\"Bad Name\"").is_err());
        assert_eq!(serde_json::to_string(&Category::PLAN).unwrap(), "\"plan\"");
    }

    #[test]
    fn default_weights_are_valid() {
        let w = CategoryWeights::default();
        let rebuilt = CategoryWeights::new(w.iter().map(|(c, w)| (c.clone(), w))).unwrap();
        assert_eq!(rebuilt, w);
        assert_eq!(w.len(), 5);
        assert_eq!(w.get(&Category::CHAPTERS), Some(0.60));
    }

    #[test]
    fn sum_within_one_percent_is_accepted() {
        assert!(CategoryWeights::from_pairs([("plan", 0.5), ("index", 0.505)]).is_ok());
        assert!(CategoryWeights::from_pairs([("plan", 0.5), ("index", 0.495)]).is_ok());
    }

    #[test]
    fn sum_outside_tolerance_is_rejected() {
        let err = CategoryWeights::from_pairs([("plan", 0.5), ("index", 0.4)]).unwrap_err();
        assert!(matches!(err, ConfigError::WeightSum { .. }));
        assert!(CategoryWeights::from_pairs([]).is_err());
    }

    #[test]
    fn negative_weight_is_rejected() {
        let err =
            CategoryWeights::from_pairs([("plan", 1.2), ("index", -0.2)]).unwrap_err();
        assert!(matches!(err, ConfigError::NegativeWeight { .. }));
    }

    #[test]
    fn nan_weight_is_rejected() {
        let err = CategoryWeights::from_pairs([("plan", f64::NAN)]).unwrap_err();
        assert!(matches!(err, ConfigError::NonFiniteWeight { .. }));
    }

    #[test]
    fn duplicates_are_rejected() {
        let err = CategoryWeights::from_pairs([("plan", 0.5), ("plan", 0.5)]).unwrap_err();
        assert_eq!(err, ConfigError::DuplicateCategory("plan".into()));
    }

    #[test]
    fn order_is_preserved() {
        let w = CategoryWeights::from_pairs([("worldview", 0.2), ("plan", 0.3), ("lore", 0.5)])
            .unwrap();
        let names: Vec<&str> = w.categories().map(|c| c.as_str()).collect();
        assert_eq!(names, ["worldview", "plan", "lore"]);
    }

    #[test]
    fn nonzero_count_skips_zero_shares() {
        let w = CategoryWeights::from_pairs([("plan", 0.0), ("index", 1.0)]).unwrap();
        assert_eq!(w.nonzero_count(), 1);
    }
}
