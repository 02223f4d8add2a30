//! City-name validation against a known list of cities.

use super::index::{DEFAULT_TARGET_SIMILARITY, Match, SimilarityIndex};
use super::ratio::similarity;

/// Minimum score for [`CityMatcher::match_city`] to accept a match.
pub const DEFAULT_CITY_CUTOFF: f64 = 60.0;

const CITY_LINK_THRESHOLD: f64 = 50.0;
const CONTINUED_MARKER: &str = "-continued";
const CONTINUED_SPAN: usize = 12;

/// Matches OCR'd city headers against a closed list of city names.
#[derive(Debug, Clone)]
pub struct CityMatcher {
    index: SimilarityIndex,
}

impl Default for CityMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl CityMatcher {
    pub fn new() -> Self {
        Self {
            index: SimilarityIndex::new(CITY_LINK_THRESHOLD),
        }
    }

    /// Wraps an existing index of lower-case city names.
    pub fn from_index(index: SimilarityIndex) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &SimilarityIndex {
        &self.index
    }

    /// Adds one city per non-blank line.
    pub fn load_cities<'a>(&mut self, lines: impl IntoIterator<Item = &'a str>) {
        for line in lines {
            let city = line.trim().to_lowercase();
            if !city.is_empty() {
                self.index.insert(&city, 1);
            }
        }
    }

    /// Returns the known city `line` most likely spells, if it scores at
    /// least `cutoff`.
    ///
    /// Directories repeat a city header at the top of a column with a
    /// "-continued" suffix; a trailing segment that looks like that marker
    /// is cut off before matching.
    pub fn match_city(&self, line: &str, cutoff: f64) -> Option<String> {
        let line = line.trim().to_lowercase();
        let chars: Vec<char> = line.chars().collect();
        let split = chars.len().saturating_sub(CONTINUED_SPAN);
        let tail: String = chars[split..].iter().collect();
        let line = if similarity(&tail, CONTINUED_MARKER) > cutoff {
            chars[..split].iter().collect::<String>().trim_end().to_owned()
        } else {
            line
        };

        let Match { value, score } = self.index.query(&line, DEFAULT_TARGET_SIMILARITY);
        (score >= cutoff).then_some(value)
    }
}
