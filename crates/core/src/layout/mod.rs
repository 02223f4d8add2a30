//! Page layout analysis for column-formatted directories.
//!
//! This module contains:
//! - Layout parameters (ColumnParams, SegmentParams, PageConfig)
//! - Column clustering (ColumnClusterer, ColumnSlot, match_ratio)
//! - Header selection and record grouping (LayoutSegmenter)
//! - Hanging-indent splitting of fused record boxes

pub mod columns;
pub mod indent;
pub mod params;
pub mod segment;

pub use columns::{Column, ColumnClusterer, ColumnLayout, ColumnSlot, match_ratio};
pub use indent::split_hanging_indents;
pub use params::{ColumnParams, ExtraSlotPolicy, PageConfig, SegmentParams};
pub use segment::{BodyRecord, HeaderRecord, LayoutSegmenter, RecordGroup};

use crate::error::Result;
use crate::geometry::HasBBox;

/// Clusters and segments one page with the settings in `config`.
pub fn segment_page<B: HasBBox>(
    boxes: &[B],
    config: &PageConfig,
) -> Result<(ColumnLayout, Vec<RecordGroup>)> {
    config.validate()?;
    let layout =
        ColumnClusterer::new(config.columns.clone()).cluster(boxes, config.expected_columns)?;
    let groups = LayoutSegmenter::new(config.segment.clone()).segment(boxes, &layout)?;
    Ok((layout, groups))
}
