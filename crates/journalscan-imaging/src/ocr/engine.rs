// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `ocrs`-backed text recognition, available with the `ocr` feature.
//
// The engine needs two model files, `text-detection.rten` and
// `text-recognition.rten`. Running `ocrs-cli` once downloads them into
// `$XDG_CACHE_HOME/ocrs` (typically `~/.cache/ocrs`), which is where
// `OcrConfig::default()` looks.
//
// `ocrs` and `rten` are very slow in debug builds; the workspace profile
// raises their opt-level.

use std::path::{Path, PathBuf};

use journalscan_core::error::{JournalScanError, Result};
use journalscan_core::{
    ImageSize, NormalizedRect, OriginConvention, PixelPoint, TextCandidate, TextObservation,
    pixel_to_normalized,
};
use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
use rten::Model;
use rten_imageproc::RotatedRect;
use tracing::{debug, info, instrument};

use super::TextRecognizer;
use crate::raster::RasterBuffer;

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// `ocrs` does not score its output, so every line gets this confidence.
const UNSCORED_CONFIDENCE: f32 = 1.0;

fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Where to find the two model files.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrConfig {
    /// Both models inside `dir` under their well-known names.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (kind, path) in [
            ("detection", &self.detection_model_path),
            ("recognition", &self.recognition_model_path),
        ] {
            if !path.exists() {
                return Err(JournalScanError::Ocr(format!(
                    "{kind} model not found at {}; run `ocrs-cli` once to download models",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

fn load_model(kind: &str, path: &Path) -> Result<Model> {
    Model::load_file(path).map_err(|err| {
        JournalScanError::Ocr(format!(
            "failed to load {kind} model from {}: {}",
            path.display(),
            err
        ))
    })
}

/// Union of the axis-aligned bounds of a line's word boxes, normalised with a
/// bottom-left origin.
fn line_bounds(words: &[RotatedRect], size: ImageSize) -> Option<NormalizedRect> {
    let mut left = f32::INFINITY;
    let mut top = f32::INFINITY;
    let mut right = f32::NEG_INFINITY;
    let mut bottom = f32::NEG_INFINITY;
    for word in words {
        let rect = word.bounding_rect();
        left = left.min(rect.left());
        top = top.min(rect.top());
        right = right.max(rect.right());
        bottom = bottom.max(rect.bottom());
    }
    if !left.is_finite() {
        return None;
    }

    let clamp_x = |x: f32| x.clamp(0.0, size.width as f32);
    let clamp_y = |y: f32| y.clamp(0.0, size.height as f32);
    let lower_left = pixel_to_normalized(
        PixelPoint::new(clamp_x(left), clamp_y(bottom)),
        size,
        OriginConvention::BottomLeft,
    );
    let upper_right = pixel_to_normalized(
        PixelPoint::new(clamp_x(right), clamp_y(top)),
        size,
        OriginConvention::BottomLeft,
    );
    Some(NormalizedRect {
        x: lower_left.x,
        y: lower_left.y,
        width: upper_right.x - lower_left.x,
        height: upper_right.y - lower_left.y,
    })
}

/// Line-level recogniser built on the `ocrs` engine.
///
/// Model loading is the expensive part; build one and reuse it.
pub struct OcrsRecognizer {
    engine: OcrEngine,
}

impl OcrsRecognizer {
    #[instrument(skip_all, fields(
        detection = %config.detection_model_path.display(),
        recognition = %config.recognition_model_path.display(),
    ))]
    pub fn new(config: OcrConfig) -> Result<Self> {
        config.validate()?;

        info!("Loading OCR models");
        let detection_model = load_model("detection", &config.detection_model_path)?;
        let recognition_model = load_model("recognition", &config.recognition_model_path)?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| JournalScanError::Ocr(format!("failed to initialise OCR engine: {}", err)))?;

        info!("OCR engine ready");
        Ok(Self { engine })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(OcrConfig::default())
    }
}

impl TextRecognizer for OcrsRecognizer {
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn recognize(&self, image: &RasterBuffer) -> Result<Vec<TextObservation>> {
        let rgb = image::DynamicImage::ImageRgba8(image.as_rgba().clone()).into_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            JournalScanError::Ocr(format!(
                "failed to create image source ({}x{}): {}",
                width, height, err
            ))
        })?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| JournalScanError::Ocr(format!("OCR preprocessing failed: {}", err)))?;

        let words = self
            .engine
            .detect_words(&input)
            .map_err(|err| JournalScanError::Ocr(format!("word detection failed: {}", err)))?;
        let lines = self.engine.find_text_lines(&input, &words);
        let texts = self
            .engine
            .recognize_text(&input, &lines)
            .map_err(|err| JournalScanError::Ocr(format!("line recognition failed: {}", err)))?;
        debug!(words = words.len(), lines = lines.len(), "Text lines located");

        let size = image.size();
        let observations: Vec<TextObservation> = lines
            .iter()
            .zip(texts.iter())
            .filter_map(|(rects, text)| {
                let text = text.as_ref()?.to_string();
                if text.trim().is_empty() {
                    return None;
                }
                Some(TextObservation {
                    candidates: vec![TextCandidate {
                        text,
                        confidence: UNSCORED_CONFIDENCE,
                    }],
                    bounding_box: line_bounds(rects, size)?,
                })
            })
            .collect();

        info!(lines = observations.len(), "OCR complete");
        Ok(observations)
    }
}
