//! Similarity index: a closed vocabulary with a maintained similarity graph.
//!
//! Every pair of tokens whose similarity reaches the index threshold is
//! linked. Queries use a linear scan to find seed tokens above the
//! threshold and then hill-climb through the links, which lets them settle
//! on a better spelling without rescoring the whole vocabulary from every
//! seed.
//!
//! Tokens live in an arena (`Vec<Option<Token>>`); links are arena indices,
//! so the cyclic graph needs no shared ownership. Removal tombstones the
//! slot and recycles it on the next insertion.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::error::{Result, ScanError};

use super::ratio::similarity;
use super::table::{IndexTable, TableRow};

/// Link threshold used by [`SimilarityIndex::default`].
pub const DEFAULT_THRESHOLD: f64 = 50.0;

/// Score at which a query stops searching.
pub const DEFAULT_TARGET_SIMILARITY: f64 = 80.0;

/// Checks that `threshold` is a similarity score, i.e. finite and within
/// [0, 100].
pub fn validate_threshold(threshold: f64) -> Result<f64> {
    if threshold.is_finite() && (0.0..=100.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(ScanError::InvalidParams(format!(
            "similarity threshold must be within [0, 100], got {threshold}"
        )))
    }
}

/// Arena slot of a token.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TokenId(pub usize);

#[derive(Debug, Clone)]
struct Token {
    value: String,
    count: u64,
    neighbors: FxHashSet<TokenId>,
}

/// Best dictionary entry for a query string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    /// Matched dictionary value, or the query itself when unmatched.
    pub value: String,
    /// Similarity in [0, 100]; 0 means no token reached the threshold.
    pub score: f64,
}

impl Match {
    pub fn is_unmatched(&self) -> bool {
        self.score <= 0.0
    }
}

/// Approximate string dictionary.
///
/// Queries take `&self` and the type has no interior mutability, so a
/// shared index can serve concurrent queries; mutation needs exclusive
/// access.
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    threshold: f64,
    tokens: Vec<Option<Token>>,
    free: Vec<TokenId>,
    lookup: FxHashMap<String, TokenId>,
    total_occurrences: u64,
}

impl Default for SimilarityIndex {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl SimilarityIndex {
    /// Creates an empty index linking tokens at or above `threshold`.
    ///
    /// The threshold is clamped to [0, 100]; NaN falls back to
    /// [`DEFAULT_THRESHOLD`]. Use [`validate_threshold`] first to reject
    /// such values instead.
    pub fn new(threshold: f64) -> Self {
        let threshold = if threshold.is_nan() {
            DEFAULT_THRESHOLD
        } else {
            threshold.clamp(0.0, 100.0)
        };
        Self {
            threshold,
            tokens: Vec::new(),
            free: Vec::new(),
            lookup: FxHashMap::default(),
            total_occurrences: 0,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    /// Sum of the counts of every insertion still in the index.
    pub fn total_occurrences(&self) -> u64 {
        self.total_occurrences
    }

    pub fn contains(&self, value: &str) -> bool {
        self.lookup.contains_key(value)
    }

    pub fn count(&self, value: &str) -> Option<u64> {
        self.lookup.get(value).map(|&id| self.token(id).count)
    }

    /// Values linked to `value`, sorted.
    pub fn neighbors(&self, value: &str) -> Option<Vec<&str>> {
        let id = *self.lookup.get(value)?;
        let mut out: Vec<&str> = self
            .token(id)
            .neighbors
            .iter()
            .map(|&n| self.token(n).value.as_str())
            .collect();
        out.sort_unstable();
        Some(out)
    }

    /// Dictionary values in arena order.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.live().map(|(_, t)| t.value.as_str())
    }

    /// Dictionary values with their counts, in arena order.
    pub fn words_with_count(&self) -> impl Iterator<Item = (&str, u64)> {
        self.live().map(|(_, t)| (t.value.as_str(), t.count))
    }

    /// Number of links in the similarity graph.
    pub fn edge_count(&self) -> usize {
        self.live().map(|(_, t)| t.neighbors.len()).sum::<usize>() / 2
    }

    /// Adds `count` occurrences of `value`.
    ///
    /// A known value only has its count increased. A new value is scored
    /// against every token once and linked to those at or above the
    /// threshold.
    pub fn insert(&mut self, value: &str, count: u64) {
        self.total_occurrences += count;
        if let Some(&id) = self.lookup.get(value) {
            self.token_mut(id).count += count;
            return;
        }

        let neighbors: FxHashSet<TokenId> = self
            .live()
            .filter(|(_, t)| similarity(value, &t.value) >= self.threshold)
            .map(|(id, _)| id)
            .collect();

        let id = match self.free.pop() {
            Some(id) => id,
            None => {
                self.tokens.push(None);
                TokenId(self.tokens.len() - 1)
            }
        };
        for &n in &neighbors {
            self.token_mut(n).neighbors.insert(id);
        }
        self.tokens[id.0] = Some(Token {
            value: value.to_owned(),
            count,
            neighbors,
        });
        self.lookup.insert(value.to_owned(), id);
    }

    /// Removes `value` and all of its links. Returns its count, or `None`
    /// (leaving the index untouched) if it was absent.
    pub fn remove(&mut self, value: &str) -> Option<u64> {
        let id = self.lookup.remove(value)?;
        let token = self.tokens[id.0].take()?;
        for n in &token.neighbors {
            self.token_mut(*n).neighbors.remove(&id);
        }
        self.free.push(id);
        self.total_occurrences = self.total_occurrences.saturating_sub(token.count);
        Some(token.count)
    }

    /// Drops every token, keeping the threshold.
    pub fn clear(&mut self) {
        self.tokens.clear();
        self.free.clear();
        self.lookup.clear();
        self.total_occurrences = 0;
    }

    /// Changes the link threshold and updates the graph to match.
    ///
    /// Raising it only re-scores existing links; lowering it re-scores every
    /// unlinked pair. Fails with `InvalidParams`, leaving the index as it
    /// was, when `threshold` is not within [0, 100].
    pub fn set_threshold(&mut self, threshold: f64) -> Result<()> {
        let threshold = validate_threshold(threshold)?;
        if threshold > self.threshold {
            let stale: Vec<(TokenId, TokenId)> = self
                .live()
                .flat_map(|(a, t)| {
                    t.neighbors
                        .iter()
                        .filter(move |&&b| a < b)
                        .map(move |&b| (a, b))
                })
                .filter(|&(a, b)| {
                    similarity(&self.token(a).value, &self.token(b).value) < threshold
                })
                .collect();
            for &(a, b) in &stale {
                self.unlink(a, b);
            }
            tracing::debug!(
                from = self.threshold,
                to = threshold,
                removed = stale.len(),
                "raised similarity threshold"
            );
        } else if threshold < self.threshold {
            let ids: Vec<TokenId> = self.live().map(|(id, _)| id).collect();
            let mut added = 0usize;
            for (pos, &a) in ids.iter().enumerate() {
                for &b in &ids[pos + 1..] {
                    if self.token(a).neighbors.contains(&b) {
                        continue;
                    }
                    if similarity(&self.token(a).value, &self.token(b).value) >= threshold {
                        self.link(a, b);
                        added += 1;
                    }
                }
            }
            tracing::debug!(
                from = self.threshold,
                to = threshold,
                added,
                "lowered similarity threshold"
            );
        }
        self.threshold = threshold;
        Ok(())
    }

    /// Finds the dictionary entry most similar to `text`.
    ///
    /// An exact key returns immediately with score 100. Otherwise every
    /// token is scored; each one at or above the threshold seeds a greedy
    /// walk over its links towards higher similarity, with nodes visited at
    /// most once per query. The search stops as soon as a result reaches
    /// `target_similarity`. Equal scores prefer the more frequent token.
    /// When no token reaches the threshold the result is `(text, 0)`.
    pub fn query(&self, text: &str, target_similarity: f64) -> Match {
        if self.lookup.contains_key(text) {
            return Match {
                value: text.to_owned(),
                score: 100.0,
            };
        }

        let mut visited = vec![false; self.tokens.len()];
        let mut best: Option<(TokenId, f64)> = None;

        for (id, token) in self.live() {
            let score = similarity(text, &token.value);
            if score < self.threshold {
                continue;
            }
            let candidate = if score >= target_similarity {
                (id, score)
            } else {
                self.climb(text, id, score, &mut visited)
            };
            if self.improves(candidate, best) {
                best = Some(candidate);
            }
            if best.is_some_and(|(_, s)| s >= target_similarity) {
                break;
            }
        }

        match best {
            Some((id, score)) => Match {
                value: self.token(id).value.clone(),
                score,
            },
            None => Match {
                value: text.to_owned(),
                score: 0.0,
            },
        }
    }

    /// Scores every token without using the graph. Same contract as
    /// [`query`](Self::query) except that no threshold applies: the best
    /// token with a positive score is returned.
    pub fn query_exhaustive(&self, text: &str, target_similarity: f64) -> Match {
        if self.lookup.contains_key(text) {
            return Match {
                value: text.to_owned(),
                score: 100.0,
            };
        }

        let mut best: Option<(TokenId, f64)> = None;
        for (id, token) in self.live() {
            let candidate = (id, similarity(text, &token.value));
            if candidate.1 > 0.0 && self.improves(candidate, best) {
                best = Some(candidate);
                if candidate.1 >= target_similarity {
                    break;
                }
            }
        }

        match best {
            Some((id, score)) => Match {
                value: self.token(id).value.clone(),
                score,
            },
            None => Match {
                value: text.to_owned(),
                score: 0.0,
            },
        }
    }

    /// Checks that links are symmetric and match the threshold exactly.
    ///
    /// Scores every pair, so this is quadratic in the vocabulary size.
    pub fn verify_graph(&self) -> Result<()> {
        let live: Vec<(TokenId, &Token)> = self.live().collect();
        for (pos, &(a, ta)) in live.iter().enumerate() {
            for &(b, tb) in &live[pos + 1..] {
                let ab = ta.neighbors.contains(&b);
                let ba = tb.neighbors.contains(&a);
                if ab != ba {
                    return Err(ScanError::CorruptIndex(format!(
                        "asymmetric link between {:?} and {:?}",
                        ta.value, tb.value
                    )));
                }
                if ab != (similarity(&ta.value, &tb.value) >= self.threshold) {
                    return Err(ScanError::CorruptIndex(format!(
                        "link between {:?} and {:?} disagrees with threshold {}",
                        ta.value, tb.value, self.threshold
                    )));
                }
            }
        }
        Ok(())
    }

    /// Exports the index as a table of rows with neighbor names.
    pub fn save(&self) -> IndexTable {
        IndexTable {
            threshold: self.threshold,
            total_occurrences: self.total_occurrences,
            rows: self
                .live()
                .map(|(_, t)| {
                    let mut neighbors: Vec<String> = t
                        .neighbors
                        .iter()
                        .map(|&n| self.token(n).value.clone())
                        .collect();
                    neighbors.sort_unstable();
                    TableRow {
                        value: t.value.clone(),
                        count: t.count,
                        neighbors,
                    }
                })
                .collect(),
        }
    }

    /// Rebuilds an index from a saved table.
    ///
    /// Fails with `CorruptIndex` on a threshold outside [0, 100], duplicate
    /// values, neighbor names that do not resolve, one-sided links, or links
    /// scoring below the threshold. Only the stored links are scored, so a
    /// table missing a link between two similar tokens still loads; run
    /// [`verify_graph`](Self::verify_graph) to catch that.
    pub fn load(table: &IndexTable) -> Result<Self> {
        let threshold = validate_threshold(table.threshold).map_err(|_| {
            ScanError::CorruptIndex(format!("invalid threshold {}", table.threshold))
        })?;
        let mut index = Self::new(threshold);
        index.total_occurrences = table.total_occurrences;

        for (slot, row) in table.rows.iter().enumerate() {
            if index.lookup.insert(row.value.clone(), TokenId(slot)).is_some() {
                return Err(ScanError::CorruptIndex(format!(
                    "duplicate token {:?}",
                    row.value
                )));
            }
            index.tokens.push(Some(Token {
                value: row.value.clone(),
                count: row.count,
                neighbors: FxHashSet::default(),
            }));
        }

        for (slot, row) in table.rows.iter().enumerate() {
            let mut neighbors = FxHashSet::default();
            for name in &row.neighbors {
                let Some(&n) = index.lookup.get(name) else {
                    return Err(ScanError::CorruptIndex(format!(
                        "token {:?} links to unknown token {:?}",
                        row.value, name
                    )));
                };
                if n.0 == slot {
                    return Err(ScanError::CorruptIndex(format!(
                        "token {:?} links to itself",
                        row.value
                    )));
                }
                neighbors.insert(n);
            }
            index.token_mut(TokenId(slot)).neighbors = neighbors;
        }

        for (a, token) in index.live() {
            for &b in &token.neighbors {
                let other = index.token(b);
                if !other.neighbors.contains(&a) {
                    return Err(ScanError::CorruptIndex(format!(
                        "token {:?} links to {:?} but not the reverse",
                        token.value, other.value
                    )));
                }
                if a < b && similarity(&token.value, &other.value) < index.threshold {
                    return Err(ScanError::CorruptIndex(format!(
                        "link between {:?} and {:?} is below threshold {}",
                        token.value, other.value, index.threshold
                    )));
                }
            }
        }

        tracing::debug!(
            tokens = index.len(),
            edges = index.edge_count(),
            threshold = index.threshold,
            "loaded similarity index"
        );
        Ok(index)
    }

    fn climb(
        &self,
        text: &str,
        seed: TokenId,
        seed_score: f64,
        visited: &mut [bool],
    ) -> (TokenId, f64) {
        visited[seed.0] = true;
        let mut current = seed;
        let mut best_score = seed_score;
        loop {
            let mut next = None;
            for &n in &self.token(current).neighbors {
                if visited[n.0] {
                    continue;
                }
                visited[n.0] = true;
                let score = similarity(text, &self.token(n).value);
                if score > best_score {
                    best_score = score;
                    next = Some(n);
                }
            }
            match next {
                Some(n) => current = n,
                None => return (current, best_score),
            }
        }
    }

    fn improves(&self, candidate: (TokenId, f64), best: Option<(TokenId, f64)>) -> bool {
        match best {
            None => true,
            Some((id, score)) => {
                let (cand, cand_score) = candidate;
                cand_score > score
                    || (cand_score == score && self.token(cand).count > self.token(id).count)
            }
        }
    }

    fn link(&mut self, a: TokenId, b: TokenId) {
        self.token_mut(a).neighbors.insert(b);
        self.token_mut(b).neighbors.insert(a);
    }

    fn unlink(&mut self, a: TokenId, b: TokenId) {
        self.token_mut(a).neighbors.remove(&b);
        self.token_mut(b).neighbors.remove(&a);
    }

    fn live(&self) -> impl Iterator<Item = (TokenId, &Token)> {
        self.tokens
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.as_ref().map(|t| (TokenId(i), t)))
    }

    // Ids handed out by `lookup` and neighbor sets always point at live
    // slots; a tombstone here means the graph itself is broken.
    fn token(&self, id: TokenId) -> &Token {
        match &self.tokens[id.0] {
            Some(t) => t,
            None => unreachable!("dangling token id {}", id.0),
        }
    }

    fn token_mut(&mut self, id: TokenId) -> &mut Token {
        match &mut self.tokens[id.0] {
            Some(t) => t,
            None => unreachable!("dangling token id {}", id.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_slots_are_recycled() {
        let mut index = SimilarityIndex::new(50.0);
        index.insert("alpha", 1);
        index.insert("beta", 1);
        index.remove("alpha");
        index.insert("gamma", 1);
        assert_eq!(index.tokens.len(), 2);
        assert_eq!(index.words().collect::<Vec<_>>(), vec!["gamma", "beta"]);
    }

    #[test]
    fn climb_visits_each_node_once() {
        let mut index = SimilarityIndex::new(10.0);
        for w in ["aaaa", "aaab", "aabb", "abbb", "bbbb"] {
            index.insert(w, 1);
        }
        let mut visited = vec![false; index.tokens.len()];
        let seed = index.lookup["abbb"];
        let (best, score) = index.climb("aaaa", seed, similarity("aaaa", "abbb"), &mut visited);
        assert_eq!(index.token(best).value, "aaaa");
        assert_eq!(score, 100.0);
        assert!(visited.iter().all(|&v| v));
    }

    #[test]
    fn equal_scores_prefer_frequent_token() {
        let mut index = SimilarityIndex::new(50.0);
        index.insert("cat", 1);
        index.insert("car", 9);
        let m = index.query("caz", 100.0);
        assert_eq!(m.value, "car");
    }
}
