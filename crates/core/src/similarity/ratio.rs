//! Normalized edit-distance similarity.

/// Similarity of two strings as a percentage.
///
/// `(1 - levenshtein(a, b) / max(len(a), len(b))) * 100`, with lengths in
/// Unicode scalar values. Two empty strings are identical (100); an empty
/// string against a non-empty one scores 0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 100.0;
    }
    let distance = strsim::levenshtein(a, b);
    (1.0 - distance as f64 / longest as f64) * 100.0
}
