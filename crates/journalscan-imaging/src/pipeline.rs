// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Preprocessing pipeline: detect the page, straighten or crop it, then run
// the enhancement chain. Everything after decoding degrades gracefully: a
// failed stage is recorded in the report and the untransformed image moves on.

use std::time::Instant;

use journalscan_core::error::Result;
use journalscan_core::{
    EnhancementParameters, PathTaken, PipelineConfig, PipelineReport, PipelineWarning, PixelRect,
    Quadrilateral,
};
use tracing::{info, instrument, warn};

use crate::detect::{DetectedRegion, DetectionOutcome, GeometryDetector};
use crate::enhance::EnhancementChain;
use crate::raster::RasterBuffer;
use crate::rectify::Rectifier;
use crate::trim::BandTrimmer;

/// The enhanced (or normalised) page plus what happened to it.
///
/// Immutable once built; use [`PipelineResult::into_parts`] to take the image.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    image: RasterBuffer,
    report: PipelineReport,
}

impl PipelineResult {
    pub fn image(&self) -> &RasterBuffer {
        &self.image
    }

    pub fn report(&self) -> &PipelineReport {
        &self.report
    }

    pub fn path_taken(&self) -> PathTaken {
        self.report.path_taken
    }

    pub fn detected_quadrilateral(&self) -> Option<&Quadrilateral> {
        self.report.detected_quadrilateral.as_ref()
    }

    pub fn cropped_region(&self) -> Option<PixelRect> {
        self.report.cropped_region
    }

    pub fn into_parts(self) -> (RasterBuffer, PipelineReport) {
        (self.image, self.report)
    }
}

/// Orchestrates detection, rectification or cropping, band trimming and
/// enhancement for one image at a time.
///
/// Holds no mutable state, so one instance can serve concurrent invocations.
#[derive(Debug, Clone, Default)]
pub struct PreprocessingPipeline {
    detector: GeometryDetector,
    rectifier: Rectifier,
    trimmer: BandTrimmer,
    chain: EnhancementChain,
}

impl PreprocessingPipeline {
    /// Assemble a pipeline from an explicit detector and trimmer.
    pub fn new(detector: GeometryDetector, trimmer: BandTrimmer) -> Self {
        Self {
            detector,
            rectifier: Rectifier::new(),
            trimmer,
            chain: EnhancementChain::new(),
        }
    }

    /// Build from a validated configuration. Enhancement parameters are
    /// passed per call, not stored.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(
            GeometryDetector::new(config.detector.clone()),
            BandTrimmer::new(config.band_trim.clone()),
        ))
    }

    /// Borrow the page detector.
    pub fn detector(&self) -> &GeometryDetector {
        &self.detector
    }

    /// Borrow the bottom-band trimmer.
    pub fn trimmer(&self) -> &BandTrimmer {
        &self.trimmer
    }

    // -- Geometry -------------------------------------------------------------

    /// Detect and straighten the page without enhancing it.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn normalize(&self, image: RasterBuffer) -> PipelineResult {
        let mut report = PipelineReport::new(image.size());

        let started = Instant::now();
        let outcome = self.detector.detect(&image);
        report.record_timing("detect", started.elapsed());

        let image = match outcome {
            DetectionOutcome::Quadrilateral(quad) => self.rectify(image, quad, &mut report),
            DetectionOutcome::Region(region) => self.crop_region(image, region, &mut report),
            DetectionOutcome::NotFound { empty_foreground } => {
                report.warnings.push(PipelineWarning::DetectionMiss);
                if empty_foreground {
                    report.warnings.push(PipelineWarning::EmptyForegroundMask);
                }
                self.trim_band(image, &mut report)
            }
        };

        report.output_size = image.size();
        info!(
            path = ?report.path_taken,
            width = image.width(),
            height = image.height(),
            "Page geometry normalised"
        );
        PipelineResult { image, report }
    }

    fn rectify(
        &self,
        image: RasterBuffer,
        quad: Quadrilateral,
        report: &mut PipelineReport,
    ) -> RasterBuffer {
        report.detected_quadrilateral = Some(quad);
        let started = Instant::now();
        let rectified = self.rectifier.rectify(&image, &quad);
        report.record_timing("rectify", started.elapsed());

        match rectified {
            Ok(rectified) => {
                report.path_taken = PathTaken::RectangleRectified;
                rectified
            }
            Err(err) => {
                warn!(error = %err, "Rectification failed; falling back to band trim");
                report.warnings.push(PipelineWarning::RectificationSingular);
                self.trim_band(image, report)
            }
        }
    }

    fn crop_region(
        &self,
        image: RasterBuffer,
        region: DetectedRegion,
        report: &mut PipelineReport,
    ) -> RasterBuffer {
        let started = Instant::now();
        let cropped = image.crop(region.rect);
        report.record_timing("crop", started.elapsed());

        match cropped {
            Ok(cropped) => {
                report.path_taken = match region.source {
                    journalscan_core::RegionSource::ForegroundMask => PathTaken::SegmentationCropped,
                    journalscan_core::RegionSource::PageEdge => PathTaken::EdgeCropped,
                };
                report.cropped_region = Some(cropped.extent());
                report.region_source = Some(region.source);
                cropped
            }
            Err(err) => {
                warn!(error = %err, "Region crop failed; falling back to band trim");
                report.warnings.push(PipelineWarning::EmptyForegroundMask);
                self.trim_band(image, report)
            }
        }
    }

    fn trim_band(&self, image: RasterBuffer, report: &mut PipelineReport) -> RasterBuffer {
        let started = Instant::now();
        let outcome = self.trimmer.trim(image);
        report.record_timing("band_trim", started.elapsed());

        if outcome.trimmed() {
            report.path_taken = PathTaken::BandTrimmed;
            report.cropped_region = Some(outcome.kept);
        } else {
            report.path_taken = PathTaken::Unmodified;
        }
        outcome.image
    }

    // -- Full run -------------------------------------------------------------

    /// Normalise the page geometry, then enhance it.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn process(&self, image: RasterBuffer, params: &EnhancementParameters) -> PipelineResult {
        let (image, mut report) = self.normalize(image).into_parts();

        let enhanced = self.chain.run(image, params);
        for (stage, elapsed) in &enhanced.timings {
            report.record_timing(stage.name(), *elapsed);
        }
        for skipped in &enhanced.skipped {
            report.skipped_stages.push(skipped.stage);
            report.warnings.push(PipelineWarning::FilterUnavailable {
                stage: skipped.stage,
                reason: skipped.reason.clone(),
            });
        }

        let image = enhanced.image;
        report.output_size = image.size();
        info!(
            run_id = %report.run_id,
            path = ?report.path_taken,
            warnings = report.warnings.len(),
            total_ms = report.total_millis(),
            "Pipeline complete"
        );
        PipelineResult { image, report }
    }

    /// Decode and process. Decoding is the only way this can fail.
    pub fn process_bytes(
        &self,
        data: &[u8],
        params: &EnhancementParameters,
    ) -> Result<PipelineResult> {
        let image = RasterBuffer::decode(data)?;
        Ok(self.process(image, params))
    }
}
