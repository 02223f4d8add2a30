//! Header detection and record grouping.
//!
//! Section headers in these directories sit outside the column grid (they
//! usually span a whole page), so headers are picked from the boxes column
//! clustering rejected. Each header then owns the column boxes below it on
//! its own page, up to the next header on that page.

use serde::Serialize;

use crate::error::{Result, ScanError};
use crate::geometry::{HasBBox, TextBlock};

use super::columns::ColumnLayout;
use super::params::SegmentParams;

/// Body boxes attributed to one header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordGroup {
    /// Index of the header box in the segmented slice.
    pub header: usize,
    /// Indices of the body boxes, column-major: every box of the first
    /// column top-to-bottom, then the next column, and so on.
    pub bodies: Vec<usize>,
}

/// A header block with its OCR text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HeaderRecord<'a>(pub &'a TextBlock);

/// A body (record) block with its OCR text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BodyRecord<'a>(pub &'a TextBlock);

impl HeaderRecord<'_> {
    pub fn text(&self) -> &str {
        &self.0.text
    }
}

impl BodyRecord<'_> {
    pub fn text(&self) -> &str {
        &self.0.text
    }
}

impl RecordGroup {
    /// Resolves indices against the text blocks that were segmented.
    pub fn records<'a>(&self, blocks: &'a [TextBlock]) -> (HeaderRecord<'a>, Vec<BodyRecord<'a>>) {
        (
            HeaderRecord(&blocks[self.header]),
            self.bodies.iter().map(|&i| BodyRecord(&blocks[i])).collect(),
        )
    }
}

/// Splits a clustered page into header-bounded record groups.
#[derive(Debug, Clone, Default)]
pub struct LayoutSegmenter {
    params: SegmentParams,
}

impl LayoutSegmenter {
    pub fn new(params: SegmentParams) -> Self {
        Self { params }
    }

    /// Picks header boxes among the non-column boxes of `layout`.
    ///
    /// Returns indices ordered for reading: headers on the first page
    /// top-to-bottom, then headers on the second page top-to-bottom.
    /// `boxes` must be the slice `layout` was built from.
    pub fn select_headers<B: HasBBox>(
        &self,
        boxes: &[B],
        layout: &ColumnLayout,
    ) -> Result<Vec<usize>> {
        self.params.validate()?;
        if boxes.len() != layout.box_count() {
            return Err(ScanError::InvalidParams(format!(
                "layout covers {} boxes but {} were given",
                layout.box_count(),
                boxes.len()
            )));
        }
        let widest = layout
            .non_column
            .iter()
            .map(|&i| boxes[i].width())
            .max()
            .ok_or(ScanError::NoHeadersFound)?;
        let min_width = f64::from(widest) * self.params.min_header_width_fraction;

        let mut headers: Vec<usize> = layout
            .non_column
            .iter()
            .copied()
            .filter(|&i| f64::from(boxes[i].width()) >= min_width)
            .collect();
        if headers.is_empty() {
            return Err(ScanError::NoHeadersFound);
        }

        headers.sort_by_key(|&i| {
            (
                layout.page_of_x(f64::from(boxes[i].x())),
                boxes[i].y(),
                boxes[i].x(),
            )
        });
        Ok(headers)
    }

    /// Groups column boxes under the header above them.
    ///
    /// A header owns the column boxes of its own page that start below it
    /// and above the next header, or down to the bottom of the page when the
    /// next header is on the other page or there is none. Column boxes above
    /// the first header of a page belong to no group and are dropped.
    pub fn segment<B: HasBBox>(
        &self,
        boxes: &[B],
        layout: &ColumnLayout,
    ) -> Result<Vec<RecordGroup>> {
        let headers = self.select_headers(boxes, layout)?;

        let mut groups = Vec::with_capacity(headers.len());
        for (pos, &header) in headers.iter().enumerate() {
            let top = boxes[header].y();
            let page = layout.page_of_x(f64::from(boxes[header].x()));
            let limit = headers
                .get(pos + 1)
                .filter(|&&next| layout.page_of_x(f64::from(boxes[next].x())) == page)
                .map(|&next| boxes[next].y());

            let mut bodies = Vec::new();
            for (col, column) in layout.columns.iter().enumerate() {
                if layout.column_page(col) != page {
                    continue;
                }
                bodies.extend(column.members.iter().copied().filter(|&i| {
                    let y = boxes[i].y();
                    y > top && limit.is_none_or(|end| y < end)
                }));
            }
            groups.push(RecordGroup { header, bodies });
        }

        let grouped: usize = groups.iter().map(|g| g.bodies.len()).sum();
        let in_columns: usize = layout.columns.iter().map(|c| c.members.len()).sum();
        if grouped < in_columns {
            tracing::debug!(
                dropped = in_columns - grouped,
                "column boxes above the first header were not grouped"
            );
        }
        tracing::debug!(headers = groups.len(), records = grouped, "segmented page");

        Ok(groups)
    }
}
