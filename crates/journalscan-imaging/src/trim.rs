// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bottom-band trimming. When no page outline is found the photo often still
// shows a dark strip of desk below the page; scanning row luminance upward
// from the bottom finds it and crops it away.

use image::imageops::FilterType;
use journalscan_core::{BandTrimConfig, PixelRect};
use tracing::{debug, info, instrument, warn};

use crate::raster::{RasterBuffer, rec709_luma};

/// Result of a trim attempt.
#[derive(Debug, Clone)]
pub struct TrimOutcome {
    pub image: RasterBuffer,
    /// Rows removed from the bottom, in source pixels. Zero means no-op.
    pub removed_rows: u32,
    /// Kept region in the input image's coordinates.
    pub kept: PixelRect,
}

impl TrimOutcome {
    pub fn trimmed(&self) -> bool {
        self.removed_rows > 0
    }
}

/// Removes a uniformly dark band from the bottom of an image.
#[derive(Debug, Clone, Default)]
pub struct BandTrimmer {
    config: BandTrimConfig,
}

impl BandTrimmer {
    /// Create a trimmer with the given scan parameters.
    pub fn new(config: BandTrimConfig) -> Self {
        Self { config }
    }

    /// Borrow the active scan parameters.
    pub fn config(&self) -> &BandTrimConfig {
        &self.config
    }

    /// Mean Rec. 709 luminance of each row, top to bottom.
    pub fn row_luminance(image: &RasterBuffer, scan_width: u32) -> Vec<f32> {
        let src = image.as_rgba();
        let scaled;
        let rows = if src.width() > scan_width {
            let scale = scan_width as f64 / src.width() as f64;
            let height = ((src.height() as f64 * scale).round() as u32).max(1);
            scaled = image::imageops::resize(src, scan_width, height, FilterType::Triangle);
            &scaled
        } else {
            src
        };

        let width = rows.width() as f32;
        (0..rows.height())
            .map(|y| {
                let sum: f32 = (0..rows.width())
                    .map(|x| {
                        let [r, g, b, _] = rows.get_pixel(x, y).0;
                        rec709_luma(r, g, b)
                    })
                    .sum();
                sum / width
            })
            .collect()
    }

    /// Height of the dark bottom band in source rows, before the minimum-size
    /// check. Never exceeds `max_scan_ratio` of the height and never removes
    /// the whole image.
    pub fn band_height(&self, image: &RasterBuffer) -> u32 {
        let rows = Self::row_luminance(image, self.config.scan_width);
        let scan_limit = (self.config.max_scan_ratio * rows.len() as f32).floor() as usize;
        let dark = rows
            .iter()
            .rev()
            .take(scan_limit)
            .take_while(|&&luma| luma < self.config.luminance_threshold)
            .count();
        if dark == 0 {
            return 0;
        }

        let height = image.height();
        let scale = height as f64 / rows.len() as f64;
        let cap = (self.config.max_scan_ratio as f64 * height as f64).floor() as u32;
        ((dark as f64 * scale).round() as u32)
            .min(cap)
            .min(height - 1)
    }

    /// Crop away the dark bottom band, or return the image untouched.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn trim(&self, image: RasterBuffer) -> TrimOutcome {
        let band = self.band_height(&image);
        let min_band = (self.config.min_band_ratio * image.height() as f32).ceil() as u32;

        if band == 0 || band < min_band {
            debug!(band, min_band, "No bottom band to trim");
            return Self::untouched(image);
        }

        let kept = PixelRect::new(0, 0, image.width(), image.height() - band);
        match image.crop(kept) {
            Ok(cropped) => {
                info!(removed_rows = band, "Bottom band trimmed");
                TrimOutcome {
                    image: cropped,
                    removed_rows: band,
                    kept,
                }
            }
            Err(err) => {
                warn!(error = %err, "Band crop failed; keeping image");
                Self::untouched(image)
            }
        }
    }

    fn untouched(image: RasterBuffer) -> TrimOutcome {
        let kept = PixelRect::full(image.size());
        TrimOutcome {
            image,
            removed_rows: 0,
            kept,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use journalscan_core::ImageSize;

    fn banded(width: u32, height: u32, band: u32) -> RasterBuffer {
        let img = RgbaImage::from_fn(width, height, |_, y| {
            if y >= height - band {
                Rgba([10, 10, 12, 255])
            } else {
                Rgba([235, 232, 225, 255])
            }
        });
        RasterBuffer::from_rgba(img).unwrap()
    }

    #[test]
    fn removes_dark_bottom_band() {
        let out = BandTrimmer::default().trim(banded(400, 500, 50));
        assert!(out.trimmed());
        assert_eq!(out.removed_rows, 50);
        assert_eq!(out.image.size(), ImageSize::new(400, 450));
        assert_eq!(out.kept, PixelRect::new(0, 0, 400, 450));
    }

    #[test]
    fn downscaled_scan_maps_back_to_source_rows() {
        // 2048 wide is scanned at 512, so every scanned row is four source rows.
        let out = BandTrimmer::default().trim(banded(2048, 1000, 120));
        let removed = out.removed_rows as i64;
        assert!((removed - 120).abs() <= 4, "removed {removed}");
    }

    #[test]
    fn never_removes_more_than_scan_ratio() {
        // Bottom 60% is dark; only the bottom quarter may go.
        let out = BandTrimmer::default().trim(banded(300, 400, 240));
        assert!(out.removed_rows <= 100, "removed {}", out.removed_rows);
        assert_eq!(out.image.height(), 400 - out.removed_rows);
    }

    #[test]
    fn thin_band_is_left_alone() {
        // 5 rows of 1000 is below the 2% minimum.
        let input = banded(200, 1000, 5);
        let out = BandTrimmer::default().trim(input.clone());
        assert!(!out.trimmed());
        assert_eq!(out.image, input);
    }

    #[test]
    fn bright_image_is_a_pixel_identical_no_op() {
        let input = banded(120, 90, 0);
        let out = BandTrimmer::default().trim(input.clone());
        assert_eq!(out.removed_rows, 0);
        assert_eq!(out.image, input);
        assert_eq!(out.kept, PixelRect::full(input.size()));
    }

    #[test]
    fn fully_dark_image_keeps_most_rows() {
        let img = RgbaImage::from_pixel(50, 40, Rgba([0, 0, 0, 255]));
        let out = BandTrimmer::default()
            .trim(RasterBuffer::from_rgba(img).unwrap());
        assert_eq!(out.removed_rows, 10);
        assert_eq!(out.image.height(), 30);
    }
}
