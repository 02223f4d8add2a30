//! Layout segmentation parameters.
//!
//! Contains ColumnParams, SegmentParams and the per-publication PageConfig
//! bundle. The defaults are values tuned on sample directories, not derived
//! from first principles; every one of them can be overridden from a config
//! file.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};

/// What to drop when clustering leaves more column slots than expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtraSlotPolicy {
    /// Drop the leftmost surplus slot first.
    DropLeftmost,
    /// Drop the rightmost surplus slot first.
    DropRightmost,
    /// Drop the slots with the fewest member boxes first; among equally
    /// small slots the widest goes first, since page-spanning headers tend
    /// to collect there.
    #[default]
    DropFewest,
}

/// Parameters for column clustering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnParams {
    /// A box joins a slot only if its match ratio against the slot is at
    /// least this value. Range: 0.0 to 1.0.
    pub min_match_ratio: f64,

    /// Upper bound on slots created during the online pass, as a multiple of
    /// the expected column count.
    pub max_slots_multiplier: usize,

    /// Slots holding fewer members than this fraction of the fullest slot
    /// are treated as noise.
    pub noise_fraction: f64,

    /// Members farther than this many standard deviations from their slot
    /// are moved to the non-column list.
    pub outlier_std_dev_threshold: f64,

    /// Physical pages per scanned image (1 or 2).
    pub pages_per_image: usize,

    /// Policy for surplus slots after noise filtering.
    pub extra_slot_policy: ExtraSlotPolicy,
}

impl Default for ColumnParams {
    fn default() -> Self {
        Self {
            min_match_ratio: 0.5,
            max_slots_multiplier: 3,
            noise_fraction: 0.4,
            outlier_std_dev_threshold: 1.0,
            pages_per_image: 1,
            extra_slot_policy: ExtraSlotPolicy::DropFewest,
        }
    }
}

impl ColumnParams {
    /// Checks ranges and the relation to `expected_columns`.
    pub fn validate(&self, expected_columns: usize) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_match_ratio) {
            return Err(ScanError::InvalidParams(format!(
                "min_match_ratio must be within [0, 1], got {}",
                self.min_match_ratio
            )));
        }
        if !(0.0..=1.0).contains(&self.noise_fraction) {
            return Err(ScanError::InvalidParams(format!(
                "noise_fraction must be within [0, 1], got {}",
                self.noise_fraction
            )));
        }
        if self.max_slots_multiplier == 0 {
            return Err(ScanError::InvalidParams(
                "max_slots_multiplier must be at least 1".into(),
            ));
        }
        if self.outlier_std_dev_threshold.is_nan() || self.outlier_std_dev_threshold < 0.0 {
            return Err(ScanError::InvalidParams(format!(
                "outlier_std_dev_threshold must be non-negative, got {}",
                self.outlier_std_dev_threshold
            )));
        }
        if !(1..=2).contains(&self.pages_per_image) {
            return Err(ScanError::InvalidParams(format!(
                "pages_per_image must be 1 or 2, got {}",
                self.pages_per_image
            )));
        }
        if expected_columns == 0 || expected_columns % self.pages_per_image != 0 {
            return Err(ScanError::InvalidParams(format!(
                "{expected_columns} columns cannot be split over {} pages",
                self.pages_per_image
            )));
        }
        Ok(())
    }
}

/// Parameters for header selection and record grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentParams {
    /// Non-column boxes narrower than this fraction of the widest
    /// non-column box are discarded as noise instead of becoming headers.
    pub min_header_width_fraction: f64,
}

impl Default for SegmentParams {
    fn default() -> Self {
        Self {
            min_header_width_fraction: 0.2,
        }
    }
}

impl SegmentParams {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_header_width_fraction) {
            return Err(ScanError::InvalidParams(format!(
                "min_header_width_fraction must be within [0, 1], got {}",
                self.min_header_width_fraction
            )));
        }
        Ok(())
    }
}

/// Layout settings for one publication format (state and year).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    /// Columns across the whole image (columns per page × pages per image).
    pub expected_columns: usize,
    pub columns: ColumnParams,
    pub segment: SegmentParams,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            expected_columns: 2,
            columns: ColumnParams::default(),
            segment: SegmentParams::default(),
        }
    }
}

impl PageConfig {
    pub fn validate(&self) -> Result<()> {
        self.columns.validate(self.expected_columns)?;
        self.segment.validate()
    }

    pub fn columns_per_page(&self) -> usize {
        self.expected_columns / self.columns.pages_per_image.max(1)
    }
}
