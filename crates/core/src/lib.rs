//! dirscan - layout segmentation and OCR token correction for scanned
//! column-formatted directory pages.
//!
//! The crate works on abstract inputs: positioned text regions produced by
//! an external contour/OCR step, and plain strings. It never reads images,
//! runs OCR, or talks to a geocoder.

pub mod error;
pub mod geometry;
pub mod layout;
pub mod similarity;

pub use error::{Result, ScanError};
pub use geometry::{BoundingBox, HasBBox, TextBlock};
pub use layout::{
    ColumnClusterer, ColumnLayout, ColumnParams, ColumnSlot, ExtraSlotPolicy, LayoutSegmenter,
    PageConfig, RecordGroup, SegmentParams,
};
pub use similarity::{CityMatcher, IndexTable, Match, SimilarityIndex, similarity};
