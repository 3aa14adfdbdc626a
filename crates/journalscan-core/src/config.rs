// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration. Every tuning constant lives here as an immutable
// record passed into each call; nothing is read from process-wide state.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{JournalScanError, Result};

/// Fixed S-curve control points (input, output), both in [0, 1].
pub const DEFAULT_TONE_CURVE: [[f32; 2]; 5] = [
    [0.0, 0.0],
    [0.25, 0.05],
    [0.5, 0.5],
    [0.75, 0.95],
    [1.0, 1.0],
];

/// Parameters of the enhancement chain.
///
/// `posterize_levels`, `contrast_level` and `gamma_level` are the user-facing
/// options; the remaining fields default to the tuned constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementParameters {
    /// Quantization steps per colour channel (2..=8).
    pub posterize_levels: u8,
    /// Contrast multiplier around mid-grey (1.5..=2.5).
    pub contrast_level: f32,
    /// Final power-law exponent (0.3..=0.6).
    pub gamma_level: f32,
    /// Shorter side is scaled up to at least this many pixels.
    pub upscale_floor: u32,
    pub brightness: f32,
    pub saturation: f32,
    pub exposure_ev: f32,
    pub sharpen_strength: f32,
    pub sharpen_radius: f32,
    pub unsharp_radius: f32,
    pub unsharp_intensity: f32,
    pub denoise_level: f32,
    pub denoise_sharpness: f32,
    pub tone_curve: [[f32; 2]; 5],
}

impl Default for EnhancementParameters {
    fn default() -> Self {
        Self {
            posterize_levels: 4,
            contrast_level: 2.0,
            gamma_level: 0.4,
            upscale_floor: 1500,
            brightness: 0.2,
            saturation: 1.5,
            exposure_ev: 0.3,
            sharpen_strength: 1.2,
            sharpen_radius: 1.69,
            unsharp_radius: 2.5,
            unsharp_intensity: 0.5,
            denoise_level: 0.01,
            denoise_sharpness: 0.6,
            tone_curve: DEFAULT_TONE_CURVE,
        }
    }
}

impl EnhancementParameters {
    pub const POSTERIZE_RANGE: std::ops::RangeInclusive<u8> = 2..=8;
    pub const CONTRAST_RANGE: std::ops::RangeInclusive<f32> = 1.5..=2.5;
    pub const GAMMA_RANGE: std::ops::RangeInclusive<f32> = 0.3..=0.6;

    /// Check the user-facing options against their documented ranges.
    pub fn validate(&self) -> Result<()> {
        if !Self::POSTERIZE_RANGE.contains(&self.posterize_levels) {
            return Err(JournalScanError::InvalidConfig(format!(
                "posterize_levels must be in 2..=8, got {}",
                self.posterize_levels
            )));
        }
        if !Self::CONTRAST_RANGE.contains(&self.contrast_level) {
            return Err(JournalScanError::InvalidConfig(format!(
                "contrast_level must be in 1.5..=2.5, got {}",
                self.contrast_level
            )));
        }
        if !Self::GAMMA_RANGE.contains(&self.gamma_level) {
            return Err(JournalScanError::InvalidConfig(format!(
                "gamma_level must be in 0.3..=0.6, got {}",
                self.gamma_level
            )));
        }
        if self.upscale_floor == 0 {
            return Err(JournalScanError::InvalidConfig(
                "upscale_floor must be positive".into(),
            ));
        }
        let curve_is_monotonic = self
            .tone_curve
            .windows(2)
            .all(|w| w[1][0] > w[0][0] && w[1][1] >= w[0][1]);
        if !curve_is_monotonic {
            return Err(JournalScanError::InvalidConfig(
                "tone_curve points must increase in both input and output".into(),
            ));
        }
        Ok(())
    }
}

/// Thresholds for the consolidated page detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Detection runs on a copy whose longer side is at most this many pixels.
    pub working_size: u32,
    /// Minimum quadrilateral confidence.
    pub min_confidence: f32,
    /// Minimum quadrilateral area as a fraction of the frame.
    pub min_size: f32,
    /// Shorter-over-longer side ratio bounds.
    pub min_aspect: f32,
    pub max_aspect: f32,
    /// `K` in `score = area - (1 - max_y) * K`.
    pub position_bias: f32,
    /// Polygon simplification tolerance as a fraction of contour perimeter.
    pub polygon_epsilon: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Minimum separation of the two Otsu class means, as a fraction of full
    /// scale, before a foreground mask is trusted.
    pub mask_min_contrast: f32,
    /// Smallest foreground component kept, as a fraction of the frame.
    pub mask_min_area: f32,
    /// A component touching more frame edges than this is backdrop, not page.
    pub mask_max_touched_edges: u8,
    /// Try the page-bottom contour when segmentation finds nothing.
    pub page_edge_fallback: bool,
    /// Minimum horizontal span of a page-bottom edge, as a fraction of width.
    pub page_edge_min_width: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            working_size: 800,
            min_confidence: 0.3,
            min_size: 0.2,
            min_aspect: 0.3,
            max_aspect: 1.0,
            position_bias: 0.05,
            polygon_epsilon: 0.02,
            canny_low: 50.0,
            canny_high: 150.0,
            mask_min_contrast: 0.12,
            mask_min_area: 0.02,
            mask_max_touched_edges: 2,
            page_edge_fallback: false,
            page_edge_min_width: 0.5,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.working_size < 64 {
            return Err(JournalScanError::InvalidConfig(format!(
                "working_size must be at least 64, got {}",
                self.working_size
            )));
        }
        check_unit("min_confidence", self.min_confidence)?;
        check_unit("min_size", self.min_size)?;
        check_unit("min_aspect", self.min_aspect)?;
        check_unit("max_aspect", self.max_aspect)?;
        if self.min_aspect > self.max_aspect {
            return Err(JournalScanError::InvalidConfig(format!(
                "min_aspect ({}) exceeds max_aspect ({})",
                self.min_aspect, self.max_aspect
            )));
        }
        if self.canny_low > self.canny_high {
            return Err(JournalScanError::InvalidConfig(
                "canny_low must not exceed canny_high".into(),
            ));
        }
        check_unit("mask_min_contrast", self.mask_min_contrast)?;
        check_unit("mask_min_area", self.mask_min_area)?;
        check_ratio("page_edge_min_width", self.page_edge_min_width)?;
        Ok(())
    }
}

/// Parameters for removing a dark strip along the bottom edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandTrimConfig {
    /// Only this fraction of the height, measured from the bottom, is scanned.
    pub max_scan_ratio: f32,
    /// Rows with mean Rec. 709 luminance below this (0..1) count as dark.
    pub luminance_threshold: f32,
    /// A band shorter than this fraction of the height is left alone.
    pub min_band_ratio: f32,
    /// Width of the downscaled copy used for scanning.
    pub scan_width: u32,
}

impl Default for BandTrimConfig {
    fn default() -> Self {
        Self {
            max_scan_ratio: 0.25,
            luminance_threshold: 0.15,
            min_band_ratio: 0.02,
            scan_width: 512,
        }
    }
}

impl BandTrimConfig {
    pub fn validate(&self) -> Result<()> {
        check_ratio("max_scan_ratio", self.max_scan_ratio)?;
        check_unit("luminance_threshold", self.luminance_threshold)?;
        check_ratio("min_band_ratio", self.min_band_ratio)?;
        if self.scan_width == 0 {
            return Err(JournalScanError::InvalidConfig(
                "scan_width must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Everything the preprocessing pipeline needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub detector: DetectorConfig,
    pub band_trim: BandTrimConfig,
    pub enhancement: EnhancementParameters,
}

impl PipelineConfig {
    /// Read a JSON config file; missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.detector.validate()?;
        self.band_trim.validate()?;
        self.enhancement.validate()
    }
}

fn check_unit(name: &str, value: f32) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(JournalScanError::InvalidConfig(format!(
            "{name} must be within 0..=1, got {value}"
        )))
    }
}

/// Like [`check_unit`] but zero is rejected too.
fn check_ratio(name: &str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(JournalScanError::InvalidConfig(format!(
            "{name} must be within (0, 1], got {value}"
        )))
    }
}
