//! Column clustering for multi-column directory pages.
//!
//! Boxes are assigned to column slots by how symmetrically they straddle a
//! slot's center. Clustering runs in four passes:
//! 1. online assignment against evenly spaced seed slots, spawning new slots
//!    for boxes no slot accepts (bounded by `max_slots_multiplier`)
//! 2. noise filtering and surplus-slot removal down to the expected count
//! 3. a final assignment of every box to the surviving slots
//! 4. per-slot outlier exclusion on edge positions

use std::cmp::Reverse;

use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::error::{Result, ScanError};
use crate::geometry::HasBBox;

use super::params::{ColumnParams, ExtraSlotPolicy};

/// Running summary of the boxes assigned to one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColumnSlot {
    center_x: f64,
    width: f64,
    count: usize,
}

impl ColumnSlot {
    /// Creates an empty slot. The first absorbed box replaces its geometry.
    pub fn new(center_x: f64, width: f64) -> Self {
        Self {
            center_x,
            width,
            count: 0,
        }
    }

    pub fn center_x(&self) -> f64 {
        self.center_x
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn left(&self) -> f64 {
        self.center_x - self.width / 2.0
    }

    pub fn right(&self) -> f64 {
        self.center_x + self.width / 2.0
    }

    /// Folds a box into the running mean of center and width.
    pub fn absorb<B: HasBBox>(&mut self, b: &B) {
        let n = (self.count + 1) as f64;
        self.center_x += (box_center(b) - self.center_x) / n;
        self.width += (f64::from(b.width()) - self.width) / n;
        self.count += 1;
    }

    fn from_members<B: HasBBox>(boxes: &[B], members: &[usize], fallback: ColumnSlot) -> Self {
        if members.is_empty() {
            return Self {
                count: 0,
                ..fallback
            };
        }
        let mut slot = ColumnSlot::new(fallback.center_x, fallback.width);
        for &i in members {
            slot.absorb(&boxes[i]);
        }
        slot
    }
}

fn box_center<B: HasBBox>(b: &B) -> f64 {
    f64::from(b.x()) + f64::from(b.width()) / 2.0
}

/// How symmetrically `b` straddles the center of `slot`.
///
/// Returns 1.0 for a box centered on the slot and 0.0 for a box lying
/// entirely on one side of the slot's center line.
pub fn match_ratio<B: HasBBox>(slot: &ColumnSlot, b: &B) -> f64 {
    let left = slot.center_x - f64::from(b.x());
    let right = f64::from(b.right()) - slot.center_x;
    if left <= 0.0 || right <= 0.0 {
        return 0.0;
    }
    (left.min(right) / left.max(right)).clamp(0.0, 1.0)
}

/// Index and ratio of the best matching slot; ties go to the leftmost.
fn best_slot<B: HasBBox>(slots: &[ColumnSlot], b: &B) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, slot) in slots.iter().enumerate() {
        let ratio = match_ratio(slot, b);
        if best.is_none_or(|(_, r)| ratio > r) {
            best = Some((i, ratio));
        }
    }
    best
}

/// One column of the clustered page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub slot: ColumnSlot,
    /// Indices into the clustered box slice, sorted top-to-bottom.
    pub members: Vec<usize>,
}

/// Output of [`ColumnClusterer::cluster`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnLayout {
    /// Columns sorted left-to-right.
    pub columns: Vec<Column>,
    /// Indices of boxes rejected from every column, sorted top-to-bottom.
    pub non_column: Vec<usize>,
    /// Horizontal page split for two-page images, `None` for a single page.
    pub page_boundary: Option<f64>,
    pub columns_per_page: usize,
    box_count: usize,
}

impl ColumnLayout {
    /// Assembles a layout from precomputed columns, e.g. when replaying a
    /// stored clustering. `box_count` is the length of the clustered slice;
    /// every member and non-column index must fall below it.
    pub fn from_parts(
        columns: Vec<Column>,
        non_column: Vec<usize>,
        page_boundary: Option<f64>,
        columns_per_page: usize,
        box_count: usize,
    ) -> Result<Self> {
        let stray = columns
            .iter()
            .flat_map(|c| c.members.iter())
            .chain(&non_column)
            .find(|&&i| i >= box_count);
        if let Some(&i) = stray {
            return Err(ScanError::InvalidParams(format!(
                "box index {i} out of range for {box_count} boxes"
            )));
        }
        Ok(Self {
            columns,
            non_column,
            page_boundary,
            columns_per_page,
            box_count,
        })
    }

    /// Page (0 or 1) a horizontal position falls on.
    pub fn page_of_x(&self, x: f64) -> usize {
        match self.page_boundary {
            Some(boundary) if x >= boundary => 1,
            _ => 0,
        }
    }

    /// Page (0 or 1) the column at `index` belongs to.
    pub fn column_page(&self, index: usize) -> usize {
        self.page_of_x(self.columns[index].slot.center_x)
    }

    /// Column index assigned to each input box, `None` for non-column boxes.
    pub fn assignments(&self) -> Vec<Option<usize>> {
        let mut out = vec![None; self.box_count];
        for (col, column) in self.columns.iter().enumerate() {
            for &i in &column.members {
                out[i] = Some(col);
            }
        }
        out
    }

    pub fn box_count(&self) -> usize {
        self.box_count
    }
}

/// Assigns boxes to an expected number of column slots.
#[derive(Debug, Clone, Default)]
pub struct ColumnClusterer {
    params: ColumnParams,
}

impl ColumnClusterer {
    pub fn new(params: ColumnParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ColumnParams {
        &self.params
    }

    /// Clusters `boxes` into `expected_columns` columns.
    ///
    /// `expected_columns` counts columns across the whole image, so a
    /// two-page image with two columns per page expects 4.
    pub fn cluster<B: HasBBox>(
        &self,
        boxes: &[B],
        expected_columns: usize,
    ) -> Result<ColumnLayout> {
        self.params.validate(expected_columns)?;
        if boxes.len() < expected_columns {
            return Err(ScanError::InsufficientData {
                boxes: boxes.len(),
                expected: expected_columns,
            });
        }
        let columns_per_page = expected_columns / self.params.pages_per_image;

        let slots = self.online_pass(boxes, expected_columns);
        let slots = self.filter_noise(slots);
        let slots = self.drop_extra_slots(slots, expected_columns);
        if slots.len() < expected_columns {
            tracing::warn!(
                found = slots.len(),
                expected = expected_columns,
                "fewer columns than expected"
            );
        }

        let (mut columns, mut non_column) = self.assign(boxes, &slots);
        self.exclude_outliers(boxes, &mut columns, &mut non_column);

        for column in &mut columns {
            column
                .members
                .sort_by_key(|&i| (boxes[i].y(), boxes[i].x()));
        }
        non_column.sort_by_key(|&i| (boxes[i].y(), boxes[i].x()));

        let page_boundary = if self.params.pages_per_image == 2 {
            if columns.len() > columns_per_page {
                let last_first = columns[columns_per_page - 1].slot.center_x;
                let first_second = columns[columns_per_page].slot.center_x;
                Some((last_first + first_second) / 2.0)
            } else {
                tracing::warn!(
                    found = columns.len(),
                    "not enough columns to locate the page boundary"
                );
                None
            }
        } else {
            None
        };

        tracing::debug!(
            boxes = boxes.len(),
            columns = columns.len(),
            non_column = non_column.len(),
            ?page_boundary,
            "clustered columns"
        );

        Ok(ColumnLayout {
            columns,
            non_column,
            page_boundary,
            columns_per_page,
            box_count: boxes.len(),
        })
    }

    fn online_pass<B: HasBBox>(&self, boxes: &[B], expected: usize) -> Vec<ColumnSlot> {
        let left = boxes.iter().map(|b| b.x()).min().unwrap_or(0);
        let right = boxes.iter().map(|b| b.right()).max().unwrap_or(left + 1);
        let span = f64::from(right - left);
        let pitch = span / expected as f64;

        let mut slots: Vec<ColumnSlot> = (0..expected)
            .map(|i| ColumnSlot::new(f64::from(left) + pitch * (i as f64 + 0.5), pitch))
            .collect();
        let cap = expected * self.params.max_slots_multiplier;

        for b in boxes {
            match best_slot(&slots, b) {
                Some((i, ratio)) if ratio >= self.params.min_match_ratio => slots[i].absorb(b),
                _ if slots.len() < cap => {
                    let mut slot = ColumnSlot::new(box_center(b), f64::from(b.width()));
                    slot.absorb(b);
                    slots.push(slot);
                }
                Some((i, ratio)) if ratio > 0.0 => slots[i].absorb(b),
                _ => {}
            }
        }
        slots
    }

    fn filter_noise(&self, slots: Vec<ColumnSlot>) -> Vec<ColumnSlot> {
        let best = slots.iter().map(|s| s.count).max().unwrap_or(0);
        let floor = best as f64 * self.params.noise_fraction;
        let mut kept: Vec<ColumnSlot> = slots
            .into_iter()
            .filter(|s| s.count > 0 && s.count as f64 >= floor)
            .collect();
        kept.sort_by_key(|s| OrderedFloat(s.center_x));
        kept
    }

    fn drop_extra_slots(&self, mut slots: Vec<ColumnSlot>, expected: usize) -> Vec<ColumnSlot> {
        while slots.len() > expected {
            let victim = match self.params.extra_slot_policy {
                ExtraSlotPolicy::DropLeftmost => 0,
                ExtraSlotPolicy::DropRightmost => slots.len() - 1,
                ExtraSlotPolicy::DropFewest => slots
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, s)| (s.count, Reverse(OrderedFloat(s.width))))
                    .map(|(i, _)| i)
                    .unwrap_or(0),
            };
            let dropped = slots.remove(victim);
            tracing::debug!(
                center = dropped.center_x,
                count = dropped.count,
                "dropped surplus column slot"
            );
        }
        slots
    }

    fn assign<B: HasBBox>(&self, boxes: &[B], slots: &[ColumnSlot]) -> (Vec<Column>, Vec<usize>) {
        let mut members: Vec<Vec<usize>> = vec![Vec::new(); slots.len()];
        let mut non_column = Vec::new();
        for (i, b) in boxes.iter().enumerate() {
            match best_slot(slots, b) {
                Some((col, ratio)) if ratio >= self.params.min_match_ratio => members[col].push(i),
                _ => non_column.push(i),
            }
        }
        let columns = slots
            .iter()
            .zip(members)
            .map(|(slot, members)| Column {
                slot: ColumnSlot::from_members(boxes, &members, *slot),
                members,
            })
            .collect();
        (columns, non_column)
    }

    /// Moves members whose edges stray from their column to `non_column`.
    ///
    /// The spread is the standard deviation of the pooled left and right
    /// edge coordinates of the column's members; a member is an outlier when
    /// the distance of its (left, right) pair from the mean pair exceeds
    /// `outlier_std_dev_threshold` times that spread.
    fn exclude_outliers<B: HasBBox>(
        &self,
        boxes: &[B],
        columns: &mut [Column],
        non_column: &mut Vec<usize>,
    ) {
        let k = self.params.outlier_std_dev_threshold;
        for column in columns.iter_mut() {
            if column.members.len() < 2 {
                continue;
            }
            let n = column.members.len() as f64;
            let edges: Vec<(f64, f64)> = column
                .members
                .iter()
                .map(|&i| (f64::from(boxes[i].x()), f64::from(boxes[i].right())))
                .collect();
            let mean_left = edges.iter().map(|e| e.0).sum::<f64>() / n;
            let mean_right = edges.iter().map(|e| e.1).sum::<f64>() / n;
            let pooled_mean = (mean_left + mean_right) / 2.0;
            let variance = edges
                .iter()
                .map(|&(l, r)| (l - pooled_mean).powi(2) + (r - pooled_mean).powi(2))
                .sum::<f64>()
                / (2.0 * n);
            let limit = k * variance.sqrt();

            let mut keep = Vec::with_capacity(column.members.len());
            let mut outliers = Vec::new();
            for (&i, &(l, r)) in column.members.iter().zip(&edges) {
                if ((l - mean_left).powi(2) + (r - mean_right).powi(2)).sqrt() <= limit {
                    keep.push(i);
                } else {
                    outliers.push(i);
                }
            }
            if !outliers.is_empty() {
                tracing::debug!(
                    center = column.slot.center_x,
                    outliers = outliers.len(),
                    "excluded column outliers"
                );
                column.slot = ColumnSlot::from_members(boxes, &keep, column.slot);
                column.members = keep;
                non_column.extend(outliers);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;

    fn bb(x: i32, y: i32, w: i32, h: i32) -> BoundingBox {
        BoundingBox::new(x, y, w, h).unwrap()
    }

    #[test]
    fn match_ratio_is_one_when_centered() {
        let slot = ColumnSlot::new(50.0, 100.0);
        assert_eq!(match_ratio(&slot, &bb(0, 0, 100, 10)), 1.0);
        assert_eq!(match_ratio(&slot, &bb(25, 0, 50, 10)), 1.0);
    }

    #[test]
    fn match_ratio_is_zero_when_one_sided() {
        let slot = ColumnSlot::new(50.0, 100.0);
        assert_eq!(match_ratio(&slot, &bb(60, 0, 40, 10)), 0.0);
        assert_eq!(match_ratio(&slot, &bb(0, 0, 50, 10)), 0.0);
    }

    #[test]
    fn match_ratio_is_partial_when_off_center() {
        let slot = ColumnSlot::new(50.0, 100.0);
        // 25 px left of center, 75 px right of it
        let r = match_ratio(&slot, &bb(25, 0, 100, 10));
        assert!((r - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn absorb_keeps_running_mean() {
        let mut slot = ColumnSlot::new(999.0, 1.0);
        slot.absorb(&bb(0, 0, 100, 10));
        assert_eq!(slot.center_x(), 50.0);
        assert_eq!(slot.width(), 100.0);
        slot.absorb(&bb(20, 0, 80, 10));
        assert_eq!(slot.center_x(), 55.0);
        assert_eq!(slot.width(), 90.0);
        assert_eq!(slot.count(), 2);
    }

    #[test]
    fn best_slot_prefers_leftmost_on_tie() {
        let slots = [ColumnSlot::new(50.0, 100.0), ColumnSlot::new(50.0, 100.0)];
        assert_eq!(best_slot(&slots, &bb(0, 0, 100, 10)), Some((0, 1.0)));
        assert_eq!(best_slot::<BoundingBox>(&[], &bb(0, 0, 1, 1)), None);
    }

    #[test]
    fn drop_policies_pick_expected_victims() {
        let mut a = ColumnSlot::new(10.0, 10.0);
        a.count = 5;
        let mut b = ColumnSlot::new(50.0, 10.0);
        b.count = 2;
        let mut c = ColumnSlot::new(90.0, 10.0);
        c.count = 7;
        let slots = vec![a, b, c];

        let run = |policy| {
            ColumnClusterer::new(ColumnParams {
                extra_slot_policy: policy,
                ..ColumnParams::default()
            })
            .drop_extra_slots(slots.clone(), 2)
            .iter()
            .map(|s| s.center_x)
            .collect::<Vec<_>>()
        };
        assert_eq!(run(ExtraSlotPolicy::DropLeftmost), vec![50.0, 90.0]);
        assert_eq!(run(ExtraSlotPolicy::DropRightmost), vec![10.0, 50.0]);
        assert_eq!(run(ExtraSlotPolicy::DropFewest), vec![10.0, 90.0]);
    }
}
