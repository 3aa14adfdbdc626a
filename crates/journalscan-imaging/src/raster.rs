// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster buffer: the owned RGBA image handed from stage to stage, plus the
// origin bookkeeping that keeps crops relative to the source photo.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageFormat, Luma, RgbaImage};
use journalscan_core::error::{JournalScanError, Result};
use journalscan_core::{ImageSize, PixelRect};
use tracing::{debug, info, instrument};

/// Rec. 709 luma weights.
pub const REC709: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// Luminance in [0, 1] of an 8-bit RGB sample.
pub fn rec709_luma(r: u8, g: u8, b: u8) -> f32 {
    (REC709[0] * r as f32 + REC709[1] * g as f32 + REC709[2] * b as f32) / 255.0
}

/// An in-memory, interleaved 8-bit RGBA image with non-zero size.
///
/// Stages that may hand their input straight back (band trimming, the
/// enhancement chain, the pipeline itself) take a `RasterBuffer` by value.
/// Stages that only read it or always build a fresh one (detection,
/// rectification, cropping, single enhancement operators) borrow it.
///
/// `origin` is the offset of this buffer's top-left pixel inside the image it
/// was cropped from. Crops accumulate it; resampling stages (rectification,
/// upscaling) start a new coordinate space and reset it to zero.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterBuffer {
    pixels: RgbaImage,
    origin: (u32, u32),
}

impl RasterBuffer {
    // -- Construction ---------------------------------------------------------

    /// Wrap an RGBA image. Zero-sized images are rejected.
    pub fn from_rgba(pixels: RgbaImage) -> Result<Self> {
        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return Err(JournalScanError::EmptyRaster { width, height });
        }
        Ok(Self {
            pixels,
            origin: (0, 0),
        })
    }

    /// Wrap any decoded image, converting it to RGBA8.
    pub fn from_dynamic(image: DynamicImage) -> Result<Self> {
        Self::from_rgba(image.into_rgba8())
    }

    /// Decode raw encoded bytes (JPEG, PNG, TIFF, ...).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn decode(data: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(data)
            .map_err(|err| JournalScanError::Decode(format!("failed to decode image: {}", err)))?;
        debug!(
            width = image.width(),
            height = image.height(),
            "Image decoded from bytes"
        );
        Self::from_dynamic(image)
    }

    /// Load and decode an image file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        let raster = Self::decode(&data).map_err(|err| match err {
            JournalScanError::Decode(detail) => JournalScanError::Decode(format!(
                "{}: {}",
                path.as_ref().display(),
                detail
            )),
            other => other,
        })?;
        info!(
            width = raster.width(),
            height = raster.height(),
            "Image loaded"
        );
        Ok(raster)
    }

    /// Replace the pixels with a same-geometry result, keeping the origin.
    pub(crate) fn with_pixels(&self, pixels: RgbaImage) -> Result<Self> {
        let mut next = Self::from_rgba(pixels)?;
        if next.size() == self.size() {
            next.origin = self.origin;
        }
        Ok(next)
    }

    // -- Accessors ------------------------------------------------------------

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Width and height together.
    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width(), self.height())
    }

    /// Offset of the top-left pixel inside the parent image.
    pub fn origin(&self) -> (u32, u32) {
        self.origin
    }

    /// The rectangle this buffer occupies in its parent's coordinate space.
    pub fn extent(&self) -> PixelRect {
        PixelRect::new(self.origin.0, self.origin.1, self.width(), self.height())
    }

    /// Borrow the pixel data.
    pub fn as_rgba(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Consume the buffer and return the pixel data.
    pub fn into_rgba(self) -> RgbaImage {
        self.pixels
    }

    /// Rec. 709 luminance as an 8-bit grayscale plane.
    pub fn luminance_plane(&self) -> GrayImage {
        GrayImage::from_fn(self.width(), self.height(), |x, y| {
            let [r, g, b, _] = self.pixels.get_pixel(x, y).0;
            Luma([(rec709_luma(r, g, b) * 255.0).round() as u8])
        })
    }

    // -- Geometry -------------------------------------------------------------

    /// Crop to `rect`, given in this buffer's own pixel coordinates.
    ///
    /// The rectangle is clamped to the image; a crop that ends up empty is an
    /// error rather than a zero-sized buffer.
    #[instrument(skip(self), fields(x = rect.x, y = rect.y, width = rect.width, height = rect.height))]
    pub fn crop(&self, rect: PixelRect) -> Result<Self> {
        let x = rect.x.min(self.width());
        let y = rect.y.min(self.height());
        let width = rect.width.min(self.width() - x);
        let height = rect.height.min(self.height() - y);
        if width == 0 || height == 0 {
            return Err(JournalScanError::EmptyRaster { width, height });
        }
        if (x, y, width, height) == (0, 0, self.width(), self.height()) {
            return Ok(self.clone());
        }

        debug!(x, y, width, height, "Cropping raster");
        let pixels = image::imageops::crop_imm(&self.pixels, x, y, width, height).to_image();
        Ok(Self {
            pixels,
            origin: (
                self.origin.0.saturating_add(x),
                self.origin.1.saturating_add(y),
            ),
        })
    }

    /// Resample to exactly `width` x `height` with Lanczos3 filtering.
    pub fn resize_exact(self, width: u32, height: u32) -> Result<Self> {
        if (width, height) == (self.width(), self.height()) {
            return Ok(self);
        }
        let resized = image::imageops::resize(&self.pixels, width, height, FilterType::Lanczos3);
        Self::from_rgba(resized)
    }

    // -- Output ---------------------------------------------------------------

    /// Encode as PNG.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        self.pixels
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|err| JournalScanError::Encode(format!("PNG encoding failed: {}", err)))?;
        Ok(buffer)
    }

    /// Write the image to a file. The format is inferred from the extension.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        self.pixels.save(path.as_ref()).map_err(|err| {
            JournalScanError::Encode(format!(
                "failed to save image to {}: {}",
                path.as_ref().display(),
                err
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(width: u32, height: u32, value: u8) -> RasterBuffer {
        RasterBuffer::from_rgba(RgbaImage::from_pixel(
            width,
            height,
            Rgba([value, value, value, 255]),
        ))
        .unwrap()
    }

    #[test]
    fn zero_sized_raster_rejected() {
        let err = RasterBuffer::from_rgba(RgbaImage::new(0, 10)).unwrap_err();
        assert!(matches!(
            err,
            JournalScanError::EmptyRaster {
                width: 0,
                height: 10
            }
        ));
    }

    #[test]
    fn garbage_bytes_are_decode_failure() {
        let err = RasterBuffer::decode(b"definitely not a photo").unwrap_err();
        assert!(matches!(err, JournalScanError::Decode(_)));
    }

    #[test]
    fn png_round_trip_preserves_pixels() {
        let raster = solid(8, 6, 77);
        let bytes = raster.to_png_bytes().unwrap();
        let decoded = RasterBuffer::decode(&bytes).unwrap();
        assert_eq!(decoded.as_rgba(), raster.as_rgba());
    }

    #[test]
    fn crops_accumulate_origin() {
        let raster = solid(100, 80, 10)
            .crop(PixelRect::new(10, 5, 50, 50))
            .unwrap()
            .crop(PixelRect::new(3, 4, 20, 20))
            .unwrap();
        assert_eq!(raster.origin(), (13, 9));
        assert_eq!(raster.extent(), PixelRect::new(13, 9, 20, 20));
    }

    #[test]
    fn crop_is_clamped_to_bounds() {
        let raster = solid(40, 30, 0).crop(PixelRect::new(30, 20, 100, 100)).unwrap();
        assert_eq!(raster.size(), ImageSize::new(10, 10));
    }

    #[test]
    fn empty_crop_is_an_error() {
        let result = solid(40, 30, 0).crop(PixelRect::new(40, 0, 10, 10));
        assert!(result.is_err());
    }

    #[test]
    fn resize_resets_origin() {
        let raster = solid(100, 100, 0)
            .crop(PixelRect::new(10, 10, 50, 50))
            .unwrap()
            .resize_exact(100, 100)
            .unwrap();
        assert_eq!(raster.origin(), (0, 0));
        assert_eq!(raster.size(), ImageSize::new(100, 100));
    }

    #[test]
    fn luma_uses_rec709_weights() {
        let raster = RasterBuffer::from_rgba(RgbaImage::from_pixel(1, 1, Rgba([0, 255, 0, 255])))
            .unwrap();
        assert_eq!(raster.luminance_plane().get_pixel(0, 0).0[0], 182);
    }

    #[test]
    fn save_writes_png_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        solid(4, 4, 200).save(&path).unwrap();
        let reopened = RasterBuffer::open(&path).unwrap();
        assert_eq!(reopened.size(), ImageSize::new(4, 4));
    }
}
