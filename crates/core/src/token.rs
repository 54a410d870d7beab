//! Token estimation utilities.
//!
//! No model tokenizer is available, so sizes are estimated from the script
//! mix of the text. Text is split on whitespace and each piece is classified:
//!
//! | Piece | Rule | Cost |
//! |-------|------|------|
//! | CJK-dominant | > 50% CJK ideographs | 1.5 per codepoint |
//! | numeric-dominant | > 70% decimal digits (`Nd`) | 0.5 per piece |
//! | Latin / mixed | anything else | 0.75 per piece + 0.33 per punctuation mark (`P*`) |
//!
//! Costs are summed and floored. The arithmetic is done in hundredths on
//! integers so results are exact and identical on every platform.
//!
//! Whitespace never joins two pieces, so the estimate of two texts separated
//! by whitespace is the estimate of their merged [`TokenTally`]. The truncator
//! relies on this to track running totals exactly.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};
use unicode_general_category::{GeneralCategory, get_general_category};

const CJK_COST: u64 = 150;
const LATIN_COST: u64 = 75;
const NUMERIC_COST: u64 = 50;
const PUNCT_COST: u64 = 33;
const HUNDREDTHS: u64 = 100;

/// Estimate the token count for a string.
///
/// Pure and deterministic. Never under-counts dense CJK text relative to
/// Latin text sharing the same budget.
pub fn estimate(text: &str) -> usize {
    TokenTally::of(text).tokens()
}

/// Cheaper estimate: codepoint count / 1.2, rounded half up.
///
/// Does not agree with [`estimate`]; pick one per use site and stay with it.
pub fn estimate_fast(text: &str) -> usize {
    let chars = text.chars().count();
    (chars * 10 + 6) / 12
}

/// Which estimator a caller wants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Estimator {
    /// Script-aware estimate ([`estimate`]).
    #[default]
    Detailed,
    /// Codepoint-ratio estimate ([`estimate_fast`]).
    Fast,
}

impl Estimator {
    pub fn count(self, text: &str) -> usize {
        match self {
            Self::Detailed => estimate(text),
            Self::Fast => estimate_fast(text),
        }
    }
}

/// Per-class counts from which an estimate is derived.
///
/// Tallies add: for any `a`, `b` and whitespace `ws`,
/// `TokenTally::of(a + ws + b) == TokenTally::of(a) + TokenTally::of(b)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenTally {
    pub cjk_chars: u64,
    pub latin_words: u64,
    pub numeric_words: u64,
    pub punctuation: u64,
}

impl TokenTally {
    /// Tally every whitespace-separated piece of `text`.
    pub fn of(text: &str) -> Self {
        text.split_whitespace().map(Self::of_word).sum()
    }

    /// Tally a single piece that contains no whitespace.
    pub fn of_word(word: &str) -> Self {
        let mut total = 0u64;
        let mut cjk = 0u64;
        let mut digits = 0u64;
        let mut punct = 0u64;
        for c in word.chars() {
            total += 1;
            if is_cjk(c) {
                cjk += 1;
            } else if is_decimal_digit(c) {
                digits += 1;
            }
            if is_punctuation(c) {
                punct += 1;
            }
        }

        if total == 0 {
            return Self::default();
        }
        // cjk / total > 0.5
        if cjk * 2 > total {
            return Self {
                cjk_chars: total,
                ..Self::default()
            };
        }
        // digits / total > 0.7
        if digits * 10 > total * 7 {
            return Self {
                numeric_words: 1,
                ..Self::default()
            };
        }
        Self {
            latin_words: 1,
            punctuation: punct,
            ..Self::default()
        }
    }

    /// The floored token estimate for this tally.
    pub fn tokens(&self) -> usize {
        let hundredths = self.cjk_chars * CJK_COST
            + self.latin_words * LATIN_COST
            + self.numeric_words * NUMERIC_COST
            + self.punctuation * PUNCT_COST;
        (hundredths / HUNDREDTHS) as usize
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Add for TokenTally {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            cjk_chars: self.cjk_chars + rhs.cjk_chars,
            latin_words: self.latin_words + rhs.latin_words,
            numeric_words: self.numeric_words + rhs.numeric_words,
            punctuation: self.punctuation + rhs.punctuation,
        }
    }
}

impl AddAssign for TokenTally {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for TokenTally {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// CJK Unified Ideographs and extensions A through F.
fn is_cjk(c: char) -> bool {
    matches!(
        c as u32,
        0x4E00..=0x9FFF
            | 0x3400..=0x4DBF
            | 0x20000..=0x2A6DF
            | 0x2A700..=0x2B73F
            | 0x2B740..=0x2B81F
            | 0x2B820..=0x2CEAF
            | 0x2CEB0..=0x2EBEF
    )
}

/// Unicode decimal digits, fullwidth and other scripts included.
fn is_decimal_digit(c: char) -> bool {
    c.is_ascii_digit() || get_general_category(c) == GeneralCategory::DecimalNumber
}

/// Any Unicode punctuation category. Symbols such as `$` or `+` are not
/// punctuation.
fn is_punctuation(c: char) -> bool {
    matches!(
        get_general_category(c),
        GeneralCategory::ConnectorPunctuation
            | GeneralCategory::DashPunctuation
            | GeneralCategory::OpenPunctuation
            | GeneralCategory::ClosePunctuation
            | GeneralCategory::InitialPunctuation
            | GeneralCategory::FinalPunctuation
            | GeneralCategory::OtherPunctuation
    )
}
