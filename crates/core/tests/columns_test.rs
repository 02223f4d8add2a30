//! Tests for column clustering on synthetic directory pages.

use dirscan_core::error::ScanError;
use dirscan_core::geometry::{BoundingBox, HasBBox};
use dirscan_core::layout::{ColumnClusterer, ColumnLayout, ColumnParams, ExtraSlotPolicy};

// ============================================================================
// Helper functions
// ============================================================================

fn bb(x: i32, y: i32, w: i32, h: i32) -> BoundingBox {
    BoundingBox::new(x, y, w, h).unwrap()
}

/// `rows` boxes of width `w` stacked 20 px apart at each x in `lefts`,
/// interleaved row by row.
fn grid(lefts: &[i32], w: i32, rows: i32) -> Vec<BoundingBox> {
    let mut boxes = Vec::new();
    for row in 0..rows {
        for &x in lefts {
            boxes.push(bb(x, row * 20, w, 15));
        }
    }
    boxes
}

fn centers(layout: &ColumnLayout) -> Vec<f64> {
    layout.columns.iter().map(|c| c.slot.center_x()).collect()
}

fn two_pages() -> ColumnClusterer {
    ColumnClusterer::new(ColumnParams {
        pages_per_image: 2,
        ..ColumnParams::default()
    })
}

// ============================================================================
// Basic clustering
// ============================================================================

#[test]
fn test_two_clean_columns() {
    let boxes = grid(&[0, 500], 100, 5);
    let layout = ColumnClusterer::default().cluster(&boxes, 2).unwrap();

    assert_eq!(centers(&layout), vec![50.0, 550.0]);
    assert_eq!(layout.columns[0].members, vec![0, 2, 4, 6, 8]);
    assert_eq!(layout.columns[1].members, vec![1, 3, 5, 7, 9]);
    assert!(layout.non_column.is_empty());
    assert_eq!(layout.page_boundary, None);
    assert_eq!(layout.columns[0].slot.width(), 100.0);
    assert_eq!(layout.columns[0].slot.count(), 5);
}

#[test]
fn test_every_box_lands_in_exactly_one_place() {
    let mut boxes = grid(&[0, 350], 250, 6);
    boxes.push(bb(0, 200, 600, 15));
    boxes.push(bb(-100, 300, 300, 15));
    let layout = ColumnClusterer::default().cluster(&boxes, 2).unwrap();

    let mut seen: Vec<usize> = layout
        .columns
        .iter()
        .flat_map(|c| c.members.iter().copied())
        .chain(layout.non_column.iter().copied())
        .collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..boxes.len()).collect::<Vec<_>>());

    let assignments = layout.assignments();
    assert_eq!(assignments.len(), boxes.len());
    for &i in &layout.non_column {
        assert_eq!(assignments[i], None);
    }
}

#[test]
fn test_members_sorted_top_to_bottom() {
    let boxes = vec![
        bb(0, 80, 100, 15),
        bb(0, 20, 100, 15),
        bb(500, 60, 100, 15),
        bb(0, 40, 100, 15),
        bb(500, 0, 100, 15),
    ];
    let layout = ColumnClusterer::default().cluster(&boxes, 2).unwrap();
    for column in &layout.columns {
        let ys: Vec<i32> = column.members.iter().map(|&i| boxes[i].y()).collect();
        let mut sorted = ys.clone();
        sorted.sort_unstable();
        assert_eq!(ys, sorted);
    }
}

#[test]
fn test_too_few_boxes() {
    let boxes = vec![bb(0, 0, 100, 15)];
    let err = ColumnClusterer::default().cluster(&boxes, 2).unwrap_err();
    assert!(matches!(
        err,
        ScanError::InsufficientData {
            boxes: 1,
            expected: 2
        }
    ));
}

#[test]
fn test_fewer_columns_than_expected_is_not_an_error() {
    let boxes = grid(&[0], 100, 4);
    let layout = ColumnClusterer::default().cluster(&boxes, 2).unwrap();
    assert_eq!(layout.columns.len(), 1);
    assert_eq!(layout.columns[0].members, vec![0, 1, 2, 3]);
}

#[test]
fn test_invalid_params_rejected() {
    let boxes = grid(&[0, 200, 600], 100, 2);
    assert!(matches!(
        two_pages().cluster(&boxes, 3),
        Err(ScanError::InvalidParams(_))
    ));

    let bad_ratio = ColumnClusterer::new(ColumnParams {
        min_match_ratio: 1.5,
        ..ColumnParams::default()
    });
    assert!(matches!(
        bad_ratio.cluster(&boxes, 2),
        Err(ScanError::InvalidParams(_))
    ));
}

// ============================================================================
// Noise and headers
// ============================================================================

#[test]
fn test_page_wide_headers_are_not_columns() {
    let mut boxes = vec![bb(0, 0, 600, 15)];
    for row in 1..6 {
        boxes.push(bb(0, row * 20, 250, 15));
        boxes.push(bb(350, row * 20, 250, 15));
    }
    boxes.push(bb(0, 200, 600, 15));
    for row in 11..14 {
        boxes.push(bb(0, row * 20, 250, 15));
        boxes.push(bb(350, row * 20, 250, 15));
    }

    let layout = ColumnClusterer::default().cluster(&boxes, 2).unwrap();
    assert_eq!(centers(&layout), vec![125.0, 475.0]);
    assert_eq!(layout.non_column, vec![0, 11]);
    assert_eq!(layout.columns[0].members.len(), 8);
    assert_eq!(layout.columns[1].members.len(), 8);
}

#[test]
fn test_extra_slot_policies() {
    // A small stray column sits between two full ones.
    let mut boxes = grid(&[0, 600], 100, 5);
    boxes.push(bb(300, 200, 100, 15));
    boxes.push(bb(300, 220, 100, 15));

    let run = |policy| {
        let clusterer = ColumnClusterer::new(ColumnParams {
            noise_fraction: 0.3,
            extra_slot_policy: policy,
            ..ColumnParams::default()
        });
        centers(&clusterer.cluster(&boxes, 2).unwrap())
    };
    assert_eq!(run(ExtraSlotPolicy::DropFewest), vec![50.0, 650.0]);
    assert_eq!(run(ExtraSlotPolicy::DropLeftmost), vec![350.0, 650.0]);
    assert_eq!(run(ExtraSlotPolicy::DropRightmost), vec![50.0, 350.0]);
}

#[test]
fn test_misaligned_member_excluded_as_outlier() {
    let mut boxes: Vec<BoundingBox> = (0..6).map(|row| bb(200, row * 20, 100, 15)).collect();
    // Centered on the column but far wider than its neighbors.
    boxes.push(bb(100, 200, 300, 15));
    boxes.extend((0..6).map(|row| bb(700, row * 20, 100, 15)));

    let layout = ColumnClusterer::default().cluster(&boxes, 2).unwrap();
    assert_eq!(layout.non_column, vec![6]);
    assert_eq!(layout.columns[0].members, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(layout.columns[0].slot.width(), 100.0);
    assert_eq!(layout.columns[0].slot.count(), 6);
}

// ============================================================================
// Two-page images
// ============================================================================

#[test]
fn test_two_page_boundary_between_inner_columns() {
    let boxes = grid(&[0, 200, 600, 800], 100, 4);
    let layout = two_pages().cluster(&boxes, 4).unwrap();

    assert_eq!(centers(&layout), vec![50.0, 250.0, 650.0, 850.0]);
    assert_eq!(layout.columns_per_page, 2);
    assert_eq!(layout.page_boundary, Some(450.0));
    assert_eq!(layout.page_of_x(449.0), 0);
    assert_eq!(layout.page_of_x(450.0), 1);
    assert_eq!(
        (0..4).map(|c| layout.column_page(c)).collect::<Vec<_>>(),
        vec![0, 0, 1, 1]
    );
}

#[test]
fn test_two_page_boundary_missing_when_columns_collapse() {
    let boxes = grid(&[0, 200], 100, 4);
    let layout = two_pages().cluster(&boxes, 4).unwrap();
    assert_eq!(layout.columns.len(), 2);
    assert_eq!(layout.page_boundary, None);
    assert_eq!(layout.page_of_x(10_000.0), 0);
}
