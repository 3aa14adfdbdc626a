// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Typed enhancement operators. Each variant carries its own parameters and is
// applied through the same `apply` entry point.

use journalscan_core::{EnhanceStage, ImageSize};
use thiserror::Error;

use super::curve::ToneCurve;
use super::filters;
use crate::raster::RasterBuffer;

/// Upscaling refuses to produce more pixels than this.
pub const MAX_OUTPUT_PIXELS: u64 = 250_000_000;

/// Why an operator could not run. The chain treats every variant as
/// "pass the image through unchanged".
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StageFailure {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("output of {width}x{height} exceeds the pixel limit")]
    TooLarge { width: u32, height: u32 },

    #[error("raster error: {0}")]
    Raster(String),
}

/// One enhancement operator with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum EnhanceOp {
    /// Scale uniformly so the shorter side is at least `floor` pixels.
    Upscale { floor: u32 },
    /// Quantise each colour channel to `levels` steps.
    Posterize { levels: u8 },
    ColorControls {
        contrast: f32,
        brightness: f32,
        saturation: f32,
    },
    /// Exposure change in stops.
    Exposure { ev: f32 },
    /// Luminance-domain sharpening.
    SharpenLuminance { strength: f32, radius: f32 },
    UnsharpMask { radius: f32, intensity: f32 },
    NoiseReduction { level: f32, sharpness: f32 },
    ToneCurve { points: Vec<[f32; 2]> },
    Gamma { power: f32 },
}

fn finite(name: &str, values: &[f32]) -> Result<(), StageFailure> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(StageFailure::InvalidParameter(format!("{name} must be finite")))
    }
}

fn positive(name: &str, value: f32) -> Result<(), StageFailure> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(StageFailure::InvalidParameter(format!(
            "{name} must be positive, got {value}"
        )))
    }
}

impl EnhanceOp {
    /// The report name of this operator's stage.
    pub fn stage(&self) -> EnhanceStage {
        match self {
            Self::Upscale { .. } => EnhanceStage::Upscale,
            Self::Posterize { .. } => EnhanceStage::Posterize,
            Self::ColorControls { .. } => EnhanceStage::ColorControls,
            Self::Exposure { .. } => EnhanceStage::Exposure,
            Self::SharpenLuminance { .. } => EnhanceStage::Sharpen,
            Self::UnsharpMask { .. } => EnhanceStage::UnsharpMask,
            Self::NoiseReduction { .. } => EnhanceStage::Denoise,
            Self::ToneCurve { .. } => EnhanceStage::ToneCurve,
            Self::Gamma { .. } => EnhanceStage::Gamma,
        }
    }

    /// Check the parameters against an input of `size` without touching pixels.
    pub fn validate(&self, size: ImageSize) -> Result<(), StageFailure> {
        match self {
            Self::Upscale { floor } => {
                if *floor == 0 {
                    return Err(StageFailure::InvalidParameter(
                        "upscale floor must be non-zero".into(),
                    ));
                }
                if let Some((width, height)) =
                    filters::upscale_dimensions(size.width, size.height, *floor)
                {
                    if width as u64 * height as u64 > MAX_OUTPUT_PIXELS {
                        return Err(StageFailure::TooLarge { width, height });
                    }
                }
                Ok(())
            }
            Self::Posterize { levels } => {
                if *levels < 2 {
                    return Err(StageFailure::InvalidParameter(format!(
                        "posterize needs at least 2 levels, got {levels}"
                    )));
                }
                Ok(())
            }
            Self::ColorControls {
                contrast,
                brightness,
                saturation,
            } => finite("color controls", &[*contrast, *brightness, *saturation]),
            Self::Exposure { ev } => finite("exposure", &[*ev]),
            Self::SharpenLuminance { strength, radius } => {
                finite("sharpen strength", &[*strength])?;
                positive("sharpen radius", *radius)
            }
            Self::UnsharpMask { radius, intensity } => {
                finite("unsharp intensity", &[*intensity])?;
                positive("unsharp radius", *radius)
            }
            Self::NoiseReduction { level, sharpness } => {
                finite("noise sharpness", &[*sharpness])?;
                if !(level.is_finite() && *level >= 0.0) {
                    return Err(StageFailure::InvalidParameter(format!(
                        "noise level must be non-negative, got {level}"
                    )));
                }
                Ok(())
            }
            Self::ToneCurve { points } => ToneCurve::new(points).map(|_| ()).ok_or_else(|| {
                StageFailure::InvalidParameter(
                    "tone curve needs at least two points with increasing x in [0, 1]".into(),
                )
            }),
            Self::Gamma { power } => positive("gamma", *power),
        }
    }

    /// Run the operator. The input is left untouched, so a caller can fall
    /// back to it when this returns an error.
    pub fn apply(&self, image: &RasterBuffer) -> Result<RasterBuffer, StageFailure> {
        self.validate(image.size())?;
        let src = image.as_rgba();

        let pixels = match self {
            Self::Upscale { floor } => {
                match filters::upscale_dimensions(src.width(), src.height(), *floor) {
                    Some((width, height)) => filters::upscale(src, width, height),
                    None => return Ok(image.clone()),
                }
            }
            Self::Posterize { levels } => filters::apply_lut(src, &filters::posterize_lut(*levels)),
            Self::ColorControls {
                contrast,
                brightness,
                saturation,
            } => filters::color_controls(src, *contrast, *brightness, *saturation),
            Self::Exposure { ev } => filters::apply_lut(src, &filters::exposure_lut(*ev)),
            Self::SharpenLuminance { strength, radius } => {
                filters::sharpen_luminance(src, *strength, *radius)
            }
            Self::UnsharpMask { radius, intensity } => {
                filters::unsharp_mask(src, *radius, *intensity)
            }
            Self::NoiseReduction { level, sharpness } => {
                filters::reduce_noise(src, *level, *sharpness)
            }
            Self::ToneCurve { points } => {
                let curve = ToneCurve::new(points).ok_or_else(|| {
                    StageFailure::InvalidParameter("tone curve rejected".into())
                })?;
                filters::apply_lut(src, &curve.to_lut())
            }
            Self::Gamma { power } => filters::apply_lut(src, &filters::gamma_lut(*power)),
        };

        image
            .with_pixels(pixels)
            .map_err(|err| StageFailure::Raster(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use journalscan_core::PixelRect;

    fn raster(width: u32, height: u32) -> RasterBuffer {
        RasterBuffer::from_rgba(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 7 % 256) as u8, (y * 5 % 256) as u8, 90, 255])
        }))
        .unwrap()
    }

    #[test]
    fn stages_map_one_to_one() {
        assert_eq!(
            EnhanceOp::SharpenLuminance {
                strength: 1.0,
                radius: 1.0
            }
            .stage(),
            EnhanceStage::Sharpen
        );
        assert_eq!(
            EnhanceOp::NoiseReduction {
                level: 0.0,
                sharpness: 0.0
            }
            .stage(),
            EnhanceStage::Denoise
        );
    }

    #[test]
    fn upscale_sets_shorter_side_to_floor() {
        let out = EnhanceOp::Upscale { floor: 150 }.apply(&raster(40, 30)).unwrap();
        assert_eq!(out.size(), ImageSize::new(200, 150));
        assert_eq!(out.origin(), (0, 0));
    }

    #[test]
    fn upscale_leaves_large_images_alone() {
        let input = raster(160, 200);
        let out = EnhanceOp::Upscale { floor: 150 }.apply(&input).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn upscale_refuses_absurd_output() {
        let err = EnhanceOp::Upscale { floor: 1500 }
            .validate(ImageSize::new(1, 400_000))
            .unwrap_err();
        assert!(matches!(err, StageFailure::TooLarge { .. }));
    }

    #[test]
    fn pointwise_ops_keep_size_and_origin() {
        let input = raster(60, 60).crop(PixelRect::new(5, 6, 30, 30)).unwrap();
        let out = EnhanceOp::Gamma { power: 0.4 }.apply(&input).unwrap();
        assert_eq!(out.size(), input.size());
        assert_eq!(out.origin(), (5, 6));
    }

    #[test]
    fn bad_parameters_are_reported_not_panicked() {
        let input = raster(10, 10);
        let cases = [
            EnhanceOp::Posterize { levels: 1 },
            EnhanceOp::SharpenLuminance {
                strength: 1.2,
                radius: 0.0,
            },
            EnhanceOp::UnsharpMask {
                radius: -1.0,
                intensity: 0.5,
            },
            EnhanceOp::Gamma { power: f32::NAN },
            EnhanceOp::ToneCurve {
                points: vec![[0.5, 0.5], [0.2, 0.9]],
            },
        ];
        for op in cases {
            assert!(
                matches!(op.apply(&input), Err(StageFailure::InvalidParameter(_))),
                "{op:?}"
            );
        }
    }
}
