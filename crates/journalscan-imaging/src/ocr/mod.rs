// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text recognition seam. The pipeline never calls a recogniser itself; it only
// produces the image one consumes.

#[cfg(feature = "ocr")]
pub mod engine;

use journalscan_core::error::Result;
use journalscan_core::TextObservation;

use crate::raster::RasterBuffer;

#[cfg(feature = "ocr")]
pub use engine::{OcrConfig, OcrsRecognizer};

/// Anything that turns a page image into ranked text observations.
///
/// Implementations must be usable from several threads at once.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &RasterBuffer) -> Result<Vec<TextObservation>>;
}

/// Concatenate the top candidate of every observation, one per line.
pub fn plain_text(observations: &[TextObservation]) -> String {
    observations
        .iter()
        .filter_map(TextObservation::top_candidate)
        .map(|candidate| candidate.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
