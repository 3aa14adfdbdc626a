// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// journalscan-imaging: image preprocessing for photographed journal pages.
//
// Provides the owned raster type, page geometry detection (quadrilateral,
// foreground segmentation, page-bottom edge), perspective rectification,
// bottom-band trimming, the nine-stage enhancement chain, and the pipeline
// that ties them together ahead of text recognition.

pub mod detect;
pub mod enhance;
pub mod ocr;
pub mod pipeline;
pub mod raster;
pub mod rectify;
pub mod trim;

// Re-export the primary types so callers can use `journalscan_imaging::PreprocessingPipeline` etc.
pub use detect::{DetectedRegion, DetectionOutcome, GeometryDetector};
pub use enhance::{EnhanceOp, EnhancementChain, StageFailure};
pub use ocr::TextRecognizer;
pub use pipeline::{PipelineResult, PreprocessingPipeline};
pub use raster::RasterBuffer;
pub use rectify::{RectifyError, Rectifier};
pub use trim::{BandTrimmer, TrimOutcome};

#[cfg(feature = "ocr")]
pub use ocr::OcrsRecognizer;
