//! Approximate token matching against a closed vocabulary.
//!
//! Contains:
//! - `similarity`, a normalized edit-distance score in [0, 100]
//! - `SimilarityIndex`, a dictionary with a maintained similarity graph
//! - `IndexTable`, the persisted form of an index (TSV codec included)
//! - Vocabulary building from raw OCR text
//! - `CityMatcher`, city-name validation on top of an index

mod city;
mod index;
mod ratio;
mod table;
mod vocabulary;

pub use city::{CityMatcher, DEFAULT_CITY_CUTOFF};
pub use index::{
    DEFAULT_TARGET_SIMILARITY, DEFAULT_THRESHOLD, Match, SimilarityIndex, TokenId,
    validate_threshold,
};
pub use ratio::similarity;
pub use table::{IndexTable, TableRow};
pub use vocabulary::{most_common, tokenize};
