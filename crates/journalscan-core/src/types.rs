// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types: geometry, coordinate conventions, and the per-run report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Sizes and coordinates ---------------------------------------------------

/// Pixel dimensions of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Length of the shorter side.
    pub fn shorter_side(&self) -> u32 {
        self.width.min(self.height)
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Where the origin of a normalized coordinate space sits.
///
/// Detection results use `BottomLeft` (y grows upward, the convention of most
/// text-recognition engines); rasters are addressed `TopLeft`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OriginConvention {
    TopLeft,
    BottomLeft,
}

/// A point in normalized image space, each component in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x: f32,
    pub y: f32,
}

impl NormalizedPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A point in pixel space with a top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f32,
    pub y: f32,
}

impl PixelPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &PixelPoint) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Convert a normalized point into top-left-origin pixel coordinates.
pub fn normalized_to_pixel(
    point: NormalizedPoint,
    size: ImageSize,
    convention: OriginConvention,
) -> PixelPoint {
    let x = point.x * size.width as f32;
    let y = match convention {
        OriginConvention::TopLeft => point.y * size.height as f32,
        OriginConvention::BottomLeft => (1.0 - point.y) * size.height as f32,
    };
    PixelPoint { x, y }
}

/// Inverse of [`normalized_to_pixel`].
pub fn pixel_to_normalized(
    point: PixelPoint,
    size: ImageSize,
    convention: OriginConvention,
) -> NormalizedPoint {
    let x = point.x / size.width as f32;
    let top_down = point.y / size.height as f32;
    let y = match convention {
        OriginConvention::TopLeft => top_down,
        OriginConvention::BottomLeft => 1.0 - top_down,
    };
    NormalizedPoint { x, y }
}

// -- Rectangles ---------------------------------------------------------------

/// Axis-aligned pixel rectangle (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering a whole image.
    pub fn full(size: ImageSize) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Map a rectangle measured on a `from`-sized image onto a `to`-sized one,
    /// rounding outward so no foreground is lost.
    pub fn rescale(&self, from: ImageSize, to: ImageSize) -> Self {
        let sx = to.width as f64 / from.width as f64;
        let sy = to.height as f64 / from.height as f64;
        let x0 = (self.x as f64 * sx).floor() as u32;
        let y0 = (self.y as f64 * sy).floor() as u32;
        let x1 = ((self.right() as f64 * sx).ceil() as u32).min(to.width);
        let y1 = ((self.bottom() as f64 * sy).ceil() as u32).min(to.height);
        Self::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
    }
}

/// Axis-aligned rectangle in normalized space. `y` is the lower edge under the
/// bottom-left convention.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl NormalizedRect {
    pub fn min_x(&self) -> f32 {
        self.x
    }

    pub fn min_y(&self) -> f32 {
        self.y
    }

    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }
}

// -- Quadrilateral ------------------------------------------------------------

/// A detected page outline in normalized, bottom-left-origin coordinates.
///
/// Corner names are visual: `top_left` is the corner nearest the top-left of
/// the photo, which under the bottom-left convention has the larger `y`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quadrilateral {
    pub top_left: NormalizedPoint,
    pub top_right: NormalizedPoint,
    pub bottom_left: NormalizedPoint,
    pub bottom_right: NormalizedPoint,
    /// Detector score in [0, 1].
    pub confidence: f32,
}

impl Quadrilateral {
    /// Corners in perimeter order: top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [NormalizedPoint; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Corners in top-left-origin pixel coordinates, perimeter order.
    pub fn pixel_corners(&self, size: ImageSize) -> [PixelPoint; 4] {
        self.corners()
            .map(|p| normalized_to_pixel(p, size, OriginConvention::BottomLeft))
    }

    /// Enclosed area as a fraction of the frame (shoelace formula).
    pub fn area(&self) -> f32 {
        let c = self.corners();
        let mut twice = 0.0f32;
        for i in 0..4 {
            let j = (i + 1) % 4;
            twice += c[i].x * c[j].y - c[j].x * c[i].y;
        }
        twice.abs() / 2.0
    }

    /// Near-zero area quads cannot be rectified.
    pub fn is_degenerate(&self, min_area: f32) -> bool {
        !self.area().is_finite() || self.area() < min_area
    }

    /// Tight normalized bounding box.
    pub fn bounds(&self) -> NormalizedRect {
        let c = self.corners();
        let min_x = c.iter().map(|p| p.x).fold(f32::INFINITY, f32::min);
        let max_x = c.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max);
        let min_y = c.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
        let max_y = c.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max);
        NormalizedRect {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        }
    }
}

// -- Pipeline outcome ---------------------------------------------------------

/// Which geometry branch produced the image handed to enhancement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PathTaken {
    RectangleRectified,
    SegmentationCropped,
    /// Cropped below a detected page-bottom edge (opt-in fallback).
    EdgeCropped,
    BandTrimmed,
    Unmodified,
}

/// How a non-quadrilateral crop region was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RegionSource {
    ForegroundMask,
    PageEdge,
}

/// The ordered enhancement stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnhanceStage {
    Upscale,
    Posterize,
    ColorControls,
    Exposure,
    Sharpen,
    UnsharpMask,
    Denoise,
    ToneCurve,
    Gamma,
}

impl EnhanceStage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Upscale => "upscale",
            Self::Posterize => "posterize",
            Self::ColorControls => "color_controls",
            Self::Exposure => "exposure",
            Self::Sharpen => "sharpen",
            Self::UnsharpMask => "unsharp_mask",
            Self::Denoise => "denoise",
            Self::ToneCurve => "tone_curve",
            Self::Gamma => "gamma",
        }
    }
}

impl std::fmt::Display for EnhanceStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A condition the pipeline recovered from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PipelineWarning {
    /// Neither a quadrilateral nor a foreground region was found.
    DetectionMiss,
    /// The detected quadrilateral could not be mapped to a rectangle.
    RectificationSingular,
    /// Segmentation ran but produced no usable foreground.
    EmptyForegroundMask,
    /// An enhancement operator was skipped.
    FilterUnavailable { stage: EnhanceStage, reason: String },
}

/// Wall-clock time spent in one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: String,
    pub millis: f64,
}

/// Diagnostic metadata for one pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub input_size: ImageSize,
    pub output_size: ImageSize,
    pub path_taken: PathTaken,
    pub detected_quadrilateral: Option<Quadrilateral>,
    pub cropped_region: Option<PixelRect>,
    pub region_source: Option<RegionSource>,
    pub warnings: Vec<PipelineWarning>,
    pub skipped_stages: Vec<EnhanceStage>,
    pub timings: Vec<StageTiming>,
}

impl PipelineReport {
    /// Fresh report for an input of the given size; filled in as stages run.
    pub fn new(input_size: ImageSize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            input_size,
            output_size: input_size,
            path_taken: PathTaken::Unmodified,
            detected_quadrilateral: None,
            cropped_region: None,
            region_source: None,
            warnings: Vec::new(),
            skipped_stages: Vec::new(),
            timings: Vec::new(),
        }
    }

    pub fn record_timing(&mut self, stage: impl Into<String>, elapsed: std::time::Duration) {
        self.timings.push(StageTiming {
            stage: stage.into(),
            millis: elapsed.as_secs_f64() * 1000.0,
        });
    }

    /// Total milliseconds across recorded stages.
    pub fn total_millis(&self) -> f64 {
        self.timings.iter().map(|t| t.millis).sum()
    }
}

// -- Text recognition collaborator --------------------------------------------

/// One ranked reading of a text region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextCandidate {
    pub text: String,
    /// Engine confidence in [0, 1].
    pub confidence: f32,
}

/// A region of recognised text with its ranked candidates, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextObservation {
    pub candidates: Vec<TextCandidate>,
    /// Normalized, bottom-left-origin box.
    pub bounding_box: NormalizedRect,
}

impl TextObservation {
    pub fn top_candidate(&self) -> Option<&TextCandidate> {
        self.candidates.first()
    }
}
