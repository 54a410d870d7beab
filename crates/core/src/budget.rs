//! Token budget and per-category allocation.
//!
//! # Algorithm
//!
//! 1. `ceiling = ceil(total × weight)` per category, at least 1 when the
//!    weight is positive
//! 2. If the ceilings sum past `total`, rescale once:
//!    `floor(ceiling × total / sum)`, again at least 1 for positive weights
//!
//! Step 2 runs a single time. The floor-of-1 rule can leave the sum above
//! `total` by at most one token per positive-weight category; callers that
//! need a hard total must account for that slack.

use crate::category::{Category, CategoryWeights};
use crate::error::ConfigError;
use serde::Serialize;

/// Absorbs binary floating-point noise before rounding up, so that
/// `128000 × 0.6` allocates 76800 rather than 76801.
const CEIL_SLACK: f64 = 1e-6;

/// Total token ceiling plus the shares of each category.
#[derive(Debug, Clone, PartialEq)]
pub struct Budget {
    total: usize,
    weights: CategoryWeights,
}

impl Budget {
    /// Build a budget. Fails when `total` is zero; weights were validated
    /// when they were built.
    pub fn new(total: usize, weights: CategoryWeights) -> Result<Self, ConfigError> {
        if total == 0 {
            return Err(ConfigError::InvalidTotal(total));
        }
        Ok(Self { total, weights })
    }

    /// A budget of `total` tokens with the default weights.
    pub fn with_default_weights(total: usize) -> Result<Self, ConfigError> {
        Self::new(total, CategoryWeights::default())
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn weights(&self) -> &CategoryWeights {
        &self.weights
    }

    /// Compute the per-category ceilings.
    pub fn allocate(&self) -> Allocation {
        allocate(self.total, &self.weights)
    }
}

/// Integer ceilings per category, in weight order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Allocation {
    entries: Vec<(Category, usize)>,
}

impl Allocation {
    pub fn get(&self, category: &Category) -> Option<usize> {
        self.entries
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, n)| *n)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Category, usize)> {
        self.entries.iter().map(|(c, n)| (c, *n))
    }

    /// Sum of all ceilings.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, n)| n).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Divide `total` tokens across the weighted categories.
///
/// Pure. See the module docs for the rounding and rescale rules.
pub fn allocate(total: usize, weights: &CategoryWeights) -> Allocation {
    let mut entries: Vec<(Category, usize)> = weights
        .iter()
        .map(|(category, weight)| {
            let raw = total as f64 * weight;
            let mut ceiling = (raw - CEIL_SLACK).ceil().max(0.0) as usize;
            if weight > 0.0 {
                ceiling = ceiling.max(1);
            }
            (category.clone(), ceiling)
        })
        .collect();

    let sum: usize = entries.iter().map(|(_, n)| n).sum();
    if sum > total {
        for ((_, ceiling), (_, weight)) in entries.iter_mut().zip(weights.iter()) {
            let scaled = (*ceiling as u128 * total as u128 / sum as u128) as usize;
            *ceiling = if weight > 0.0 { scaled.max(1) } else { scaled };
        }
        tracing::debug!(total, requested = sum, "Rescaled category allocation");
    }

    Allocation { entries }
}
