// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Enhancement chain: nine ordered operators that push a page photo towards a
// high-contrast, posterised image while keeping ink colours apart.
//
// The order is fixed. Posterize runs before the contrast and tone stages so
// they cannot reintroduce gradients; denoise runs after both sharpeners to
// catch the grain they amplify.

pub mod curve;
pub mod filters;
pub mod ops;

use std::time::{Duration, Instant};

use journalscan_core::{EnhanceStage, EnhancementParameters};
use tracing::{debug, info, instrument, warn};

use crate::raster::RasterBuffer;
pub use ops::{EnhanceOp, StageFailure};

/// A stage that was passed through.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedStage {
    pub stage: EnhanceStage,
    pub reason: String,
}

/// Output of one chain run.
#[derive(Debug, Clone)]
pub struct EnhanceOutcome {
    pub image: RasterBuffer,
    pub skipped: Vec<SkippedStage>,
    pub timings: Vec<(EnhanceStage, Duration)>,
}

/// Applies the enhancement operators in order.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnhancementChain;

impl EnhancementChain {
    pub fn new() -> Self {
        Self
    }

    /// The ordered operator list for `params`.
    pub fn stages(params: &EnhancementParameters) -> Vec<EnhanceOp> {
        vec![
            EnhanceOp::Upscale {
                floor: params.upscale_floor,
            },
            EnhanceOp::Posterize {
                levels: params.posterize_levels,
            },
            EnhanceOp::ColorControls {
                contrast: params.contrast_level,
                brightness: params.brightness,
                saturation: params.saturation,
            },
            EnhanceOp::Exposure {
                ev: params.exposure_ev,
            },
            EnhanceOp::SharpenLuminance {
                strength: params.sharpen_strength,
                radius: params.sharpen_radius,
            },
            EnhanceOp::UnsharpMask {
                radius: params.unsharp_radius,
                intensity: params.unsharp_intensity,
            },
            EnhanceOp::NoiseReduction {
                level: params.denoise_level,
                sharpness: params.denoise_sharpness,
            },
            EnhanceOp::ToneCurve {
                points: params.tone_curve.to_vec(),
            },
            EnhanceOp::Gamma {
                power: params.gamma_level,
            },
        ]
    }

    /// Run every stage. A stage that fails is logged, recorded in
    /// `skipped`, and its input flows on to the next stage.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn run(&self, image: RasterBuffer, params: &EnhancementParameters) -> EnhanceOutcome {
        let mut image = image;
        let mut skipped = Vec::new();
        let mut timings = Vec::new();

        for op in Self::stages(params) {
            let stage = op.stage();
            let started = Instant::now();
            match op.apply(&image) {
                Ok(next) => {
                    debug!(%stage, width = next.width(), height = next.height(), "Stage applied");
                    image = next;
                }
                Err(failure) => {
                    warn!(%stage, reason = %failure, "Stage skipped; passing image through");
                    skipped.push(SkippedStage {
                        stage,
                        reason: failure.to_string(),
                    });
                }
            }
            timings.push((stage, started.elapsed()));
        }

        info!(
            width = image.width(),
            height = image.height(),
            skipped = skipped.len(),
            "Enhancement complete"
        );
        EnhanceOutcome {
            image,
            skipped,
            timings,
        }
    }

    /// Enhance and keep only the image.
    pub fn enhance(&self, image: RasterBuffer, params: &EnhancementParameters) -> RasterBuffer {
        self.run(image, params).image
    }
}
