//! Bounded truncation of text to a token ceiling.
//!
//! The result is always a literal prefix of the input whose estimate is at
//! most the ceiling. The cut point is chosen at the cleanest boundary that
//! fits, trying in order:
//!
//! 1. whole lines
//! 2. whole words of the first line that does not fit
//! 3. codepoints of that line, when not even its first word fits
//!
//! Running estimates are kept as a [`TokenTally`], so the reported token count
//! is exactly `estimate(prefix)`.

use crate::token::TokenTally;
use serde::{Deserialize, Serialize};

/// Output of [`truncate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Truncated {
    /// Literal prefix of the input.
    pub text: String,
    /// `estimate(text)`.
    pub tokens: usize,
    /// Estimate of the input before cutting.
    pub source_tokens: usize,
    /// Whether anything was cut.
    pub truncated: bool,
}

impl Truncated {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Cut `text` to the longest preferred prefix whose estimate fits `ceiling`.
///
/// Total over all inputs: a zero ceiling yields an empty prefix and text that
/// already fits is returned unchanged.
pub fn truncate(text: &str, ceiling: usize) -> Truncated {
    let source_tokens = TokenTally::of(text).tokens();
    if ceiling == 0 {
        return Truncated {
            text: String::new(),
            tokens: 0,
            source_tokens,
            truncated: !text.is_empty(),
        };
    }

    if source_tokens <= ceiling {
        return Truncated {
            text: text.to_string(),
            tokens: source_tokens,
            source_tokens,
            truncated: false,
        };
    }

    let (end, used) = fit_lines(text, ceiling);
    Truncated {
        text: text[..end].to_string(),
        tokens: used.tokens(),
        source_tokens,
        truncated: true,
    }
}

/// Returns the byte end of the fitting prefix and its tally.
fn fit_lines(text: &str, ceiling: usize) -> (usize, TokenTally) {
    let mut used = TokenTally::default();
    let mut end = 0;
    let mut line_start = 0;

    for line in text.split('\n') {
        let candidate = used + TokenTally::of(line);
        if candidate.tokens() <= ceiling {
            used = candidate;
            end = line_start + line.len();
            line_start = end + 1;
            continue;
        }

        let (line_end, with_line) = fit_words(line, used, ceiling);
        if line_end > 0 {
            return (line_start + line_end, with_line);
        }
        break;
    }

    (end, used)
}

fn fit_words(line: &str, base: TokenTally, ceiling: usize) -> (usize, TokenTally) {
    let mut used = base;
    let mut end = 0;

    for (start, word) in word_spans(line) {
        let candidate = used + TokenTally::of_word(word);
        if candidate.tokens() > ceiling {
            if end == 0 {
                return fit_codepoints(line, base, ceiling);
            }
            break;
        }
        used = candidate;
        end = start + word.len();
    }

    (end, used)
}

/// Binary search over codepoint count. Only prefixes verified to fit are
/// kept, so the result is safe even where the estimate is not monotonic
/// in length (a piece can flip from CJK-dominant to Latin).
fn fit_codepoints(line: &str, base: TokenTally, ceiling: usize) -> (usize, TokenTally) {
    let bounds: Vec<usize> = line
        .char_indices()
        .skip(1)
        .map(|(i, _)| i)
        .chain(std::iter::once(line.len()))
        .collect();

    let mut best = (0, base);
    let (mut lo, mut hi) = (1, bounds.len());
    while lo <= hi {
        let mid = lo + (hi - lo) / 2;
        let end = bounds[mid - 1];
        let candidate = base + TokenTally::of(&line[..end]);
        if candidate.tokens() <= ceiling {
            best = (end, candidate);
            lo = mid + 1;
        } else {
            hi = mid - 1;
        }
    }
    best
}

/// Whitespace-delimited words with their byte offsets in `line`.
fn word_spans(line: &str) -> impl Iterator<Item = (usize, &str)> {
    let base = line.as_ptr() as usize;
    line.split_whitespace()
        .map(move |word| (word.as_ptr() as usize - base, word))
}
