// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Foreground segmentation: an Otsu mask of the bright (paper) class, reduced
// to the bounding box of its largest 4-connected component.

use image::{GrayImage, Luma};
use imageproc::region_labelling::{Connectivity, connected_components};
use journalscan_core::{DetectorConfig, PixelRect};
use tracing::debug;

/// What segmentation produced, in working-image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MaskOutcome {
    /// Tight bounding box of the largest acceptable component (no padding).
    Component(PixelRect),
    /// A mask was built but held no acceptable component.
    Empty,
    /// The image has no foreground/background split worth masking.
    Unavailable,
}

/// Otsu split of a grayscale histogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct OtsuSplit {
    /// Pixels strictly above this value belong to the bright class.
    pub threshold: u8,
    pub dark_mean: f64,
    pub bright_mean: f64,
}

/// Compute the Otsu threshold for a grayscale image.
///
/// Finds the threshold that maximises the between-class variance of the dark
/// and bright pixel groups. Returns `None` when the histogram has only one
/// occupied class.
pub(crate) fn otsu_split(gray: &GrayImage) -> Option<OtsuSplit> {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total_pixels = gray.width() as u64 * gray.height() as u64;
    if total_pixels == 0 {
        return None;
    }

    let sum_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut sum_dark = 0.0f64;
    let mut weight_dark = 0u64;
    let mut max_variance = 0.0f64;
    let mut best: Option<OtsuSplit> = None;

    for (t, &count) in histogram.iter().enumerate() {
        weight_dark += count;
        if weight_dark == 0 {
            continue;
        }
        let weight_bright = total_pixels - weight_dark;
        if weight_bright == 0 {
            break;
        }

        sum_dark += t as f64 * count as f64;
        let dark_mean = sum_dark / weight_dark as f64;
        let bright_mean = (sum_total - sum_dark) / weight_bright as f64;

        let between_variance =
            weight_dark as f64 * weight_bright as f64 * (dark_mean - bright_mean).powi(2);

        if between_variance > max_variance {
            max_variance = between_variance;
            best = Some(OtsuSplit {
                threshold: t as u8,
                dark_mean,
                bright_mean,
            });
        }
    }

    best
}

/// Per-label accumulation while scanning the label image.
#[derive(Debug, Clone, Copy)]
struct ComponentStats {
    count: u64,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
}

impl ComponentStats {
    fn new(x: u32, y: u32) -> Self {
        Self {
            count: 0,
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn add(&mut self, x: u32, y: u32) {
        self.count += 1;
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn rect(&self) -> PixelRect {
        PixelRect::new(
            self.min_x,
            self.min_y,
            self.max_x - self.min_x + 1,
            self.max_y - self.min_y + 1,
        )
    }

    /// How many of the four frame edges the bounding box touches.
    fn touched_edges(&self, width: u32, height: u32) -> u8 {
        [
            self.min_x == 0,
            self.min_y == 0,
            self.max_x + 1 == width,
            self.max_y + 1 == height,
        ]
        .iter()
        .filter(|&&touch| touch)
        .count() as u8
    }
}

/// Binary mask of the bright class: 255 for foreground, 0 for background.
pub(crate) fn foreground_mask(gray: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y).0[0] > threshold {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Segment the page as the largest bright 4-connected component.
///
/// A component touching more than `mask_max_touched_edges` frame edges is the
/// backdrop (the page fills the frame and only a strip of something else is
/// visible); it is rejected like an empty mask.
pub(crate) fn largest_foreground(gray: &GrayImage, config: &DetectorConfig) -> MaskOutcome {
    let Some(split) = otsu_split(gray) else {
        debug!("Single-valued histogram; no foreground mask");
        return MaskOutcome::Unavailable;
    };
    let contrast = (split.bright_mean - split.dark_mean) / 255.0;
    if contrast < config.mask_min_contrast as f64 {
        debug!(contrast, "Foreground contrast too low for a mask");
        return MaskOutcome::Unavailable;
    }

    let mask = foreground_mask(gray, split.threshold);
    let labels = connected_components(&mask, Connectivity::Four, Luma([0u8]));

    let mut stats: Vec<Option<ComponentStats>> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label.0[0] as usize;
        if label == 0 {
            continue;
        }
        if stats.len() <= label {
            stats.resize(label + 1, None);
        }
        stats[label]
            .get_or_insert_with(|| ComponentStats::new(x, y))
            .add(x, y);
    }

    let Some(largest) = stats.iter().flatten().max_by_key(|s| s.count).copied() else {
        debug!(threshold = split.threshold, "Foreground mask is empty");
        return MaskOutcome::Empty;
    };

    let (width, height) = gray.dimensions();
    let frame = width as u64 * height as u64;
    let touched = largest.touched_edges(width, height);
    if (largest.count as f64) < config.mask_min_area as f64 * frame as f64 {
        debug!(pixels = largest.count, "Largest foreground component too small");
        return MaskOutcome::Empty;
    }
    if touched > config.mask_max_touched_edges {
        debug!(touched, "Largest foreground component is backdrop");
        return MaskOutcome::Empty;
    }

    debug!(
        threshold = split.threshold,
        pixels = largest.count,
        touched,
        "Largest foreground component"
    );
    MaskOutcome::Component(largest.rect())
}
