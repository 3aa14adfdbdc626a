// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective rectification: warp a detected page quadrilateral onto an
// upright rectangle sized from the quad's own edge lengths.

use image::{Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use journalscan_core::{PixelPoint, Quadrilateral};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::raster::RasterBuffer;

/// Quads smaller than this fraction of the frame are treated as degenerate.
pub const MIN_QUAD_AREA: f32 = 1e-4;

/// Fill for output pixels that map outside the source image.
const OUTSIDE_PIXEL: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Why a quadrilateral could not be rectified.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RectifyError {
    #[error("quadrilateral is degenerate (area {area})")]
    Degenerate { area: f32 },

    #[error("no projective transform maps the quadrilateral onto a rectangle")]
    SingularTransform,
}

/// Maps a quadrilateral region of a photo onto an upright rectangle.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rectifier;

impl Rectifier {
    pub fn new() -> Self {
        Self
    }

    /// Output size for a quad given in pixel corners (perimeter order).
    ///
    /// Width is the longer of the top and bottom edges, height the longer of
    /// the left and right edges, so no edge of the page is compressed.
    pub fn output_size(corners: &[PixelPoint; 4]) -> (u32, u32) {
        let [tl, tr, br, bl] = corners;
        let width = tl.distance(tr).max(bl.distance(br));
        let height = tl.distance(bl).max(tr.distance(br));
        (
            (width.round() as u32).max(1),
            (height.round() as u32).max(1),
        )
    }

    /// The projective transform from source pixels to output pixels.
    pub fn projection(
        corners: &[PixelPoint; 4],
        width: u32,
        height: u32,
    ) -> Result<Projection, RectifyError> {
        let src = corners.map(|p| (p.x, p.y));
        let (w, h) = (width as f32, height as f32);
        let dst = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];
        Projection::from_control_points(src, dst).ok_or(RectifyError::SingularTransform)
    }

    /// Warp `quad` out of `image` into a new upright raster.
    ///
    /// The quad's corner to output corner mapping is top-left to (0, 0),
    /// top-right to (w, 0), bottom-right to (w, h) and bottom-left to (0, h).
    #[instrument(skip_all, fields(confidence = quad.confidence))]
    pub fn rectify(
        &self,
        image: &RasterBuffer,
        quad: &Quadrilateral,
    ) -> Result<RasterBuffer, RectifyError> {
        if quad.is_degenerate(MIN_QUAD_AREA) {
            warn!(area = quad.area(), "Degenerate quadrilateral");
            return Err(RectifyError::Degenerate { area: quad.area() });
        }

        let corners = quad.pixel_corners(image.size());
        let (width, height) = Self::output_size(&corners);
        debug!(
            top_left = ?corners[0],
            top_right = ?corners[1],
            bottom_right = ?corners[2],
            bottom_left = ?corners[3],
            width,
            height,
            "Rectifying quadrilateral"
        );

        let projection = Self::projection(&corners, width, height).inspect_err(|_| {
            warn!("Failed to compute projective transform");
        })?;

        let mut output = RgbaImage::new(width, height);
        warp_into(
            image.as_rgba(),
            &projection,
            Interpolation::Bilinear,
            OUTSIDE_PIXEL,
            &mut output,
        );

        info!(width, height, "Perspective rectification applied");
        RasterBuffer::from_rgba(output).map_err(|_| RectifyError::Degenerate { area: quad.area() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use journalscan_core::{ImageSize, NormalizedPoint, OriginConvention, pixel_to_normalized};

    fn quad_from_pixels(size: ImageSize, corners: [(f32, f32); 4]) -> Quadrilateral {
        let n = |(x, y): (f32, f32)| {
            pixel_to_normalized(PixelPoint::new(x, y), size, OriginConvention::BottomLeft)
        };
        Quadrilateral {
            top_left: n(corners[0]),
            top_right: n(corners[1]),
            bottom_right: n(corners[2]),
            bottom_left: n(corners[3]),
            confidence: 1.0,
        }
    }

    #[test]
    fn output_size_uses_longer_opposite_edges() {
        let corners = [
            PixelPoint::new(10.0, 10.0),
            PixelPoint::new(110.0, 20.0),
            PixelPoint::new(120.0, 220.0),
            PixelPoint::new(0.0, 200.0),
        ];
        let (w, h) = Rectifier::output_size(&corners);
        let top = corners[0].distance(&corners[1]);
        let bottom = corners[3].distance(&corners[2]);
        assert_eq!(w, top.max(bottom).round() as u32);
        let left = corners[0].distance(&corners[3]);
        let right = corners[1].distance(&corners[2]);
        assert_eq!(h, left.max(right).round() as u32);
    }

    #[test]
    fn projection_maps_corners_to_output_rectangle() {
        let corners = [
            PixelPoint::new(30.0, 40.0),
            PixelPoint::new(260.0, 25.0),
            PixelPoint::new(280.0, 330.0),
            PixelPoint::new(15.0, 300.0),
        ];
        let projection = Rectifier::projection(&corners, 250, 290).unwrap();
        let expected = [(0.0, 0.0), (250.0, 0.0), (250.0, 290.0), (0.0, 290.0)];
        for (corner, (ex, ey)) in corners.iter().zip(expected) {
            let (x, y) = projection * (corner.x, corner.y);
            assert!((x - ex).abs() < 0.5 && (y - ey).abs() < 0.5, "{x},{y}");
        }
    }

    #[test]
    fn axis_aligned_quad_is_a_crop() {
        // Distinct colours in each quadrant of the region of interest.
        let size = ImageSize::new(200, 200);
        let img = RgbaImage::from_fn(200, 200, |x, y| match (x < 100, y < 100) {
            (true, true) => Rgba([255, 0, 0, 255]),
            (false, true) => Rgba([0, 255, 0, 255]),
            (false, false) => Rgba([0, 0, 255, 255]),
            (true, false) => Rgba([255, 255, 0, 255]),
        });
        let raster = RasterBuffer::from_rgba(img).unwrap();
        let quad = quad_from_pixels(
            size,
            [(50.0, 50.0), (150.0, 50.0), (150.0, 150.0), (50.0, 150.0)],
        );

        let out = Rectifier::new().rectify(&raster, &quad).unwrap();
        assert_eq!(out.size(), ImageSize::new(100, 100));
        let px = |x, y| out.as_rgba().get_pixel(x, y).0;
        assert_eq!(px(10, 10), [255, 0, 0, 255]);
        assert_eq!(px(90, 10), [0, 255, 0, 255]);
        assert_eq!(px(90, 90), [0, 0, 255, 255]);
        assert_eq!(px(10, 90), [255, 255, 0, 255]);
    }

    #[test]
    fn skewed_quad_keeps_corner_orientation() {
        let size = ImageSize::new(300, 300);
        let mut img = RgbaImage::from_pixel(300, 300, Rgba([128, 128, 128, 255]));
        // Red marker near the quad's top-left corner, blue near bottom-right.
        for y in 45..65 {
            for x in 65..85 {
                img.put_pixel(x, y, Rgba([255, 0, 0, 255]));
            }
        }
        for y in 225..245 {
            for x in 215..235 {
                img.put_pixel(x, y, Rgba([0, 0, 255, 255]));
            }
        }
        let raster = RasterBuffer::from_rgba(img).unwrap();
        let quad = quad_from_pixels(
            size,
            [(60.0, 40.0), (250.0, 60.0), (240.0, 250.0), (40.0, 230.0)],
        );

        let out = Rectifier::new().rectify(&raster, &quad).unwrap();
        let (w, h) = (out.width(), out.height());
        let near_tl = out.as_rgba().get_pixel(w / 20, h / 20).0;
        let near_br = out.as_rgba().get_pixel(w - 1 - w / 20, h - 1 - h / 20).0;
        assert!(near_tl[0] > 200 && near_tl[2] < 60, "{near_tl:?}");
        assert!(near_br[2] > 200 && near_br[0] < 60, "{near_br:?}");
    }

    #[test]
    fn collapsed_quad_is_rejected() {
        let raster = RasterBuffer::from_rgba(RgbaImage::new(50, 50)).unwrap();
        let p = NormalizedPoint::new(0.5, 0.5);
        let quad = Quadrilateral {
            top_left: p,
            top_right: p,
            bottom_left: p,
            bottom_right: p,
            confidence: 0.9,
        };
        assert!(matches!(
            Rectifier::new().rectify(&raster, &quad),
            Err(RectifyError::Degenerate { .. })
        ));
    }
}
