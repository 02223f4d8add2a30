//! Vocabulary building from raw OCR text.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;

use super::index::SimilarityIndex;

// `$` and `@` are kept: OCR confuses them with letters.
static PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\[\](){}'~".,/\\|&^*%#!<>?;:]"#).expect("valid regex"));
static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\t \n_-]").expect("valid regex"));

/// Splits OCR text into lower-cased word tokens.
///
/// Punctuation is stripped first, then the text is split on whitespace,
/// underscores and dashes. Tokens shorter than `min_len` characters are
/// dropped, as are all-digit tokens unless `allow_numbers` is set.
pub fn tokenize(text: &str, min_len: usize, allow_numbers: bool) -> Vec<String> {
    let cleaned = PUNCTUATION.replace_all(text, "");
    SEPARATORS
        .split(&cleaned)
        .filter(|t| t.chars().count() >= min_len)
        .filter(|t| allow_numbers || !t.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_lowercase)
        .collect()
}

/// Ranks tokens by frequency and returns `num` of them after skipping the
/// `start` most common. Ties are broken alphabetically.
pub fn most_common<S: AsRef<str>>(tokens: &[S], num: usize, start: usize) -> Vec<(String, u64)> {
    let mut counts: FxHashMap<&str, u64> = FxHashMap::default();
    for t in tokens {
        *counts.entry(t.as_ref()).or_default() += 1;
    }
    counts
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)))
        .skip(start)
        .take(num)
        .map(|(t, c)| (t.to_owned(), c))
        .collect()
}

impl SimilarityIndex {
    /// Adds the `num` most common tokens of `text`, skipping the `start`
    /// most common ones (typically stop words), with their frequencies as
    /// counts. Returns how many distinct tokens were added.
    pub fn add_common_tokens(&mut self, text: &str, num: usize, start: usize) -> usize {
        let tokens = tokenize(text, 2, false);
        let ranked = most_common(&tokens, num, start);
        for (token, count) in &ranked {
            self.insert(token, *count);
        }
        tracing::debug!(
            scanned = tokens.len(),
            added = ranked.len(),
            "added common tokens"
        );
        ranked.len()
    }
}
