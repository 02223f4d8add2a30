//! Splitting of merged record boxes at hanging indents.
//!
//! Morphological closing often fuses consecutive records of a column into a
//! single region. Directories that set continuation lines with a hanging
//! indent can be split again by walking the region's outline: whenever the
//! outline returns from the indented position to the flush-left margin, a
//! new record starts at that height.

use crate::geometry::{BoundingBox, HasBBox};

/// Splits `bbox` into one box per hanging-indent record.
///
/// `outline` is the region's contour in traversal order, in the same
/// coordinate space as `bbox`. A point counts as indented when it lies more
/// than `indent_fraction × width` right of the left edge. Every split box
/// spans the full width of `bbox`. Returns `bbox` alone when no split point
/// is found.
pub fn split_hanging_indents(
    bbox: &BoundingBox,
    outline: &[(i32, i32)],
    indent_fraction: f64,
) -> Vec<BoundingBox> {
    let margin = f64::from(bbox.x()) + f64::from(bbox.width()) * indent_fraction;
    let mut pieces = Vec::new();
    let mut flush_left = true;
    let mut top = bbox.y();

    for &(x, y) in outline {
        let indented = f64::from(x) > margin;
        if flush_left {
            flush_left = !indented;
        } else if !indented {
            flush_left = true;
            if y > top {
                if let Ok(piece) = BoundingBox::from_corners(bbox.x(), top, bbox.right(), y) {
                    pieces.push(piece);
                    top = y;
                }
            }
        }
    }

    if bbox.bottom() > top {
        if let Ok(last) = BoundingBox::from_corners(bbox.x(), top, bbox.right(), bbox.bottom()) {
            pieces.push(last);
        }
    }

    if pieces.is_empty() {
        pieces.push(*bbox);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bb(x: i32, y: i32, w: i32, h: i32) -> BoundingBox {
        BoundingBox::new(x, y, w, h).unwrap()
    }

    #[test]
    fn splits_where_outline_returns_to_margin() {
        // Two records: flush line at y=0..10 with indented continuation to
        // y=20, then a second flush line at y=20..30.
        let region = bb(0, 0, 200, 30);
        let outline = [
            (0, 0),
            (0, 10),
            (20, 10),
            (20, 20),
            (0, 20),
            (0, 30),
            (200, 30),
            (200, 0),
        ];
        let pieces = split_hanging_indents(&region, &outline, 0.05);
        assert_eq!(pieces, vec![bb(0, 0, 200, 20), bb(0, 20, 200, 10)]);
    }

    #[test]
    fn keeps_region_without_indents() {
        let region = bb(10, 10, 100, 40);
        let outline = [(10, 10), (10, 50), (110, 50), (110, 10)];
        assert_eq!(split_hanging_indents(&region, &outline, 0.05), vec![region]);
    }

    #[test]
    fn empty_outline_returns_region() {
        let region = bb(0, 0, 5, 5);
        assert_eq!(split_hanging_indents(&region, &[], 0.1), vec![region]);
    }
}
