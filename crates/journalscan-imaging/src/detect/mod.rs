// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page geometry detection: quadrilateral search, foreground segmentation, and
// the page-bottom contour fallback, tried in that order.

pub mod contour;
pub mod quad;
pub mod segment;

use image::GrayImage;
use image::imageops::FilterType;
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::dilate;
use journalscan_core::{DetectorConfig, ImageSize, PixelRect, Quadrilateral, RegionSource};
use tracing::{debug, info, instrument};

use crate::raster::RasterBuffer;
use segment::MaskOutcome;

/// A crop rectangle found without a quadrilateral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectedRegion {
    /// Region in the source image's pixel coordinates.
    pub rect: PixelRect,
    pub source: RegionSource,
}

/// Result of looking for the page in a photo.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionOutcome {
    Quadrilateral(Quadrilateral),
    Region(DetectedRegion),
    /// Nothing usable. `empty_foreground` is set when segmentation ran but its
    /// mask held no acceptable component.
    NotFound { empty_foreground: bool },
}

/// Downscaled grayscale copy that detection actually runs on.
pub(crate) struct WorkingImage {
    pub gray: GrayImage,
    pub full: ImageSize,
}

impl WorkingImage {
    pub fn new(image: &RasterBuffer, max_side: u32) -> Self {
        let full = image.size();
        let gray = image.luminance_plane();
        let longer = full.width.max(full.height);
        let gray = if longer > max_side {
            let scale = max_side as f64 / longer as f64;
            let width = ((full.width as f64 * scale).round() as u32).max(1);
            let height = ((full.height as f64 * scale).round() as u32).max(1);
            image::imageops::resize(&gray, width, height, FilterType::Triangle)
        } else {
            gray
        };
        Self { gray, full }
    }

    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.gray.width(), self.gray.height())
    }
}

/// Blurred Canny edges, thickened by one pixel so hairline gaps close.
pub(crate) fn edge_map(gray: &GrayImage, config: &DetectorConfig) -> GrayImage {
    let blurred = gaussian_blur_f32(gray, 1.5);
    let edges = canny(&blurred, config.canny_low, config.canny_high);
    dilate(&edges, Norm::LInf, 1)
}

/// Finds the journal page in a photo.
#[derive(Debug, Clone, Default)]
pub struct GeometryDetector {
    config: DetectorConfig,
}

impl GeometryDetector {
    /// Create a detector with the given thresholds.
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Borrow the active thresholds.
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Look for the page: first as a quadrilateral, then as the largest
    /// foreground component, then (if enabled) as a page-bottom edge.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn detect(&self, image: &RasterBuffer) -> DetectionOutcome {
        let working = WorkingImage::new(image, self.config.working_size);
        let edges = edge_map(&working.gray, &self.config);
        debug!(
            work_w = working.gray.width(),
            work_h = working.gray.height(),
            "Working copy prepared"
        );

        if let Some(quad) = quad::find_quadrilateral(&edges, &self.config) {
            info!(confidence = quad.confidence, area = quad.area(), "Page quadrilateral found");
            return DetectionOutcome::Quadrilateral(quad);
        }

        let empty_foreground = match segment::largest_foreground(&working.gray, &self.config) {
            MaskOutcome::Component(rect) => {
                let rect = rect.rescale(working.size(), working.full);
                info!(?rect, "Foreground region found");
                return DetectionOutcome::Region(DetectedRegion {
                    rect,
                    source: RegionSource::ForegroundMask,
                });
            }
            MaskOutcome::Empty => true,
            MaskOutcome::Unavailable => false,
        };

        if self.config.page_edge_fallback {
            if let Some(row) = contour::find_page_bottom(&edges, &self.config) {
                let full_row = ((row as f64 * working.full.height as f64
                    / working.gray.height() as f64)
                    .round() as u32)
                    .min(working.full.height);
                if full_row > 0 {
                    info!(row = full_row, "Page-bottom edge found");
                    return DetectionOutcome::Region(DetectedRegion {
                        rect: PixelRect::new(0, 0, working.full.width, full_row),
                        source: RegionSource::PageEdge,
                    });
                }
            }
        }

        info!(empty_foreground, "No page geometry detected");
        DetectionOutcome::NotFound { empty_foreground }
    }
}
