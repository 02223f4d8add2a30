//! Geometric primitives for detected text regions.
//!
//! Provides:
//! - `BoundingBox`, an immutable axis-aligned rectangle in image pixel space
//! - `HasBBox`, the trait clustering and segmentation are generic over
//! - `TextBlock`, a box with OCR text attached by the caller
//! - Page cropping helpers (edge-noise removal and region expansion)

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};

/// Trait for objects that occupy a rectangle on the page.
///
/// Coordinates follow image conventions: `y` grows downwards, so `y` is the
/// top edge and `bottom()` the lower edge.
pub trait HasBBox {
    fn x(&self) -> i32;
    fn y(&self) -> i32;
    fn width(&self) -> i32;
    fn height(&self) -> i32;

    fn right(&self) -> i32 {
        self.x() + self.width()
    }

    fn bottom(&self) -> i32 {
        self.y() + self.height()
    }

    fn x_mid(&self) -> i32 {
        self.x() + self.width() / 2
    }

    fn y_mid(&self) -> i32 {
        self.y() + self.height() / 2
    }

    fn bbox(&self) -> BoundingBox {
        BoundingBox {
            x: self.x(),
            y: self.y(),
            w: self.width(),
            h: self.height(),
        }
    }
}

/// An axis-aligned rectangle describing a detected text region.
///
/// Width and height are always positive. A box never changes after
/// creation; `offset` and `expand` return new boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawBox")]
pub struct BoundingBox {
    x: i32,
    y: i32,
    w: i32,
    h: i32,
}

#[derive(Deserialize)]
struct RawBox {
    x: i32,
    y: i32,
    w: i32,
    h: i32,
}

impl TryFrom<RawBox> for BoundingBox {
    type Error = ScanError;

    fn try_from(raw: RawBox) -> Result<Self> {
        BoundingBox::new(raw.x, raw.y, raw.w, raw.h)
    }
}

impl BoundingBox {
    /// Creates a box, rejecting non-positive extents.
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Result<Self> {
        if w <= 0 || h <= 0 {
            return Err(ScanError::InvalidBox {
                width: w,
                height: h,
            });
        }
        Ok(Self { x, y, w, h })
    }

    /// Creates a box from two corners, in either order.
    pub fn from_corners(x0: i32, y0: i32, x1: i32, y1: i32) -> Result<Self> {
        Self::new(x0.min(x1), y0.min(y1), (x1 - x0).abs(), (y1 - y0).abs())
    }

    /// Returns this box shifted by `(dx, dy)`.
    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Returns this box grown by `dx` on the left and right and `dy` on the
    /// top and bottom. Negative margins shrink it, never below one pixel.
    pub fn expand(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x - dx,
            y: self.y - dy,
            w: (self.w + 2 * dx).max(1),
            h: (self.h + 2 * dy).max(1),
        }
    }

    /// Smallest box containing every box in `boxes`, or `None` when empty.
    pub fn union<'a>(boxes: impl IntoIterator<Item = &'a BoundingBox>) -> Option<Self> {
        let mut iter = boxes.into_iter();
        let first = iter.next()?;
        let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.right(), first.bottom());
        for b in iter {
            x0 = x0.min(b.x);
            y0 = y0.min(b.y);
            x1 = x1.max(b.right());
            y1 = y1.max(b.bottom());
        }
        Some(Self {
            x: x0,
            y: y0,
            w: x1 - x0,
            h: y1 - y0,
        })
    }
}

impl HasBBox for BoundingBox {
    fn x(&self) -> i32 {
        self.x
    }
    fn y(&self) -> i32 {
        self.y
    }
    fn width(&self) -> i32 {
        self.w
    }
    fn height(&self) -> i32 {
        self.h
    }
    fn bbox(&self) -> BoundingBox {
        *self
    }
}

/// A text region with the OCR output the caller attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(flatten)]
    pub bbox: BoundingBox,
    #[serde(default)]
    pub text: String,
}

impl TextBlock {
    pub fn new(bbox: BoundingBox, text: impl Into<String>) -> Self {
        Self {
            bbox,
            text: text.into(),
        }
    }
}

impl HasBBox for TextBlock {
    fn x(&self) -> i32 {
        self.bbox.x
    }
    fn y(&self) -> i32 {
        self.bbox.y
    }
    fn width(&self) -> i32 {
        self.bbox.w
    }
    fn height(&self) -> i32 {
        self.bbox.h
    }
}

/// Pixel margins to add around an OCR region, as a fraction of the image
/// size split evenly between both sides.
pub fn expansion_margin(image_width: i32, image_height: i32, percent: f64) -> (i32, i32) {
    (
        (f64::from(image_width) * percent / 2.0) as i32,
        (f64::from(image_height) * percent / 2.0) as i32,
    )
}

/// Result of [`strip_edge_boxes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCrop {
    /// Crop rectangle in original image coordinates.
    pub crop: BoundingBox,
    /// Surviving boxes, re-based so the crop origin is `(0, 0)`.
    pub boxes: Vec<BoundingBox>,
}

/// Removes boxes that touch the image border and crops to the rest.
///
/// Contour extraction reports scanner shadows and page edges as regions
/// hugging the outermost pixel row or column. Those are dropped; the crop
/// is the union of the survivors grown by `expansion_percent` of the image
/// size and clamped to the image.
pub fn strip_edge_boxes(
    boxes: &[BoundingBox],
    image_width: i32,
    image_height: i32,
    expansion_percent: f64,
) -> Result<PageCrop> {
    let kept: Vec<BoundingBox> = boxes
        .iter()
        .filter(|b| {
            b.x > 1 && b.right() < image_width - 1 && b.y > 1 && b.bottom() < image_height - 1
        })
        .copied()
        .collect();

    let Some(content) = BoundingBox::union(&kept) else {
        return Err(ScanError::EmptyPage);
    };

    let (dx, dy) = expansion_margin(image_width, image_height, expansion_percent);
    let grown = content.expand(dx, dy);
    let x0 = grown.x.max(0);
    let y0 = grown.y.max(0);
    let x1 = grown.right().min(image_width);
    let y1 = grown.bottom().min(image_height);
    let crop = BoundingBox::from_corners(x0, y0, x1, y1)?;

    tracing::debug!(
        total = boxes.len(),
        kept = kept.len(),
        "stripped image-edge boxes"
    );

    Ok(PageCrop {
        crop,
        boxes: kept.iter().map(|b| b.offset(-x0, -y0)).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bb(x: i32, y: i32, w: i32, h: i32) -> BoundingBox {
        BoundingBox::new(x, y, w, h).unwrap()
    }

    #[test]
    fn rejects_degenerate_boxes() {
        assert!(matches!(
            BoundingBox::new(0, 0, 0, 5),
            Err(ScanError::InvalidBox { width: 0, height: 5 })
        ));
        assert!(BoundingBox::new(0, 0, 5, -1).is_err());
    }

    #[test]
    fn midpoints_use_integer_halves() {
        let b = bb(10, 20, 5, 7);
        assert_eq!(b.x_mid(), 12);
        assert_eq!(b.y_mid(), 23);
        assert_eq!(b.right(), 15);
        assert_eq!(b.bottom(), 27);
    }

    #[test]
    fn offset_returns_new_box() {
        let b = bb(10, 20, 5, 7);
        let moved = b.offset(-10, 5);
        assert_eq!(b, bb(10, 20, 5, 7));
        assert_eq!(moved, bb(0, 25, 5, 7));
    }

    #[test]
    fn union_covers_all_boxes() {
        let a = bb(0, 0, 10, 10);
        let b = bb(5, 5, 10, 10);
        assert_eq!(BoundingBox::union([&a, &b]), Some(bb(0, 0, 15, 15)));
        assert_eq!(BoundingBox::union(std::iter::empty()), None);
    }

    #[test]
    fn strip_edge_boxes_drops_border_noise_and_rebases() {
        let boxes = vec![bb(1, 40, 30, 30), bb(100, 100, 50, 20), bb(200, 300, 40, 10)];
        let page = strip_edge_boxes(&boxes, 1000, 1000, 0.02).unwrap();
        // margin is 10px each way around (100,100)-(240,310)
        assert_eq!(page.crop, bb(90, 90, 160, 230));
        assert_eq!(page.boxes, vec![bb(10, 10, 50, 20), bb(110, 210, 40, 10)]);
    }

    #[test]
    fn strip_edge_boxes_fails_when_nothing_survives() {
        let boxes = vec![bb(1, 1, 10, 10)];
        assert!(matches!(
            strip_edge_boxes(&boxes, 100, 100, 0.0),
            Err(ScanError::EmptyPage)
        ));
    }

    #[test]
    fn text_block_deserializes_flat_json() {
        let block: TextBlock =
            serde_json::from_str(r#"{"x":1,"y":2,"w":3,"h":4,"text":"ACME CO"}"#).unwrap();
        assert_eq!(block.bbox, bb(1, 2, 3, 4));
        assert_eq!(block.text, "ACME CO");
        assert!(serde_json::from_str::<TextBlock>(r#"{"x":1,"y":2,"w":0,"h":4}"#).is_err());
    }
}
