// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end pipeline scenarios on synthetic photos.

use std::collections::HashSet;

use image::{Rgba, RgbaImage};
use journalscan_core::{EnhancementParameters, ImageSize, PathTaken, PipelineWarning};
use journalscan_imaging::{BandTrimmer, EnhancementChain, EnhanceOp, PreprocessingPipeline, RasterBuffer};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const GRAY: Rgba<u8> = Rgba([128, 128, 128, 255]);

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Corners (top-left, top-right, bottom-right, bottom-left) of a `w` x `h`
/// rectangle centred at (`cx`, `cy`) and rotated by `degrees`.
fn rotated_rect(cx: f32, cy: f32, w: f32, h: f32, degrees: f32) -> [(f32, f32); 4] {
    let (sin, cos) = degrees.to_radians().sin_cos();
    [(-w, -h), (w, -h), (w, h), (-w, h)].map(|(dx, dy)| {
        let (dx, dy) = (dx / 2.0, dy / 2.0);
        (cx + dx * cos - dy * sin, cy + dx * sin + dy * cos)
    })
}

/// Signed distance inside a convex polygon given clockwise (image space)
/// corners; negative outside.
fn inset_distance(corners: &[(f32, f32); 4], x: f32, y: f32) -> f32 {
    let mut inside = f32::INFINITY;
    for i in 0..4 {
        let (ax, ay) = corners[i];
        let (bx, by) = corners[(i + 1) % 4];
        let (ex, ey) = (bx - ax, by - ay);
        let len = (ex * ex + ey * ey).sqrt();
        let cross = (ex * (y - ay) - ey * (x - ax)) / len;
        inside = inside.min(cross);
    }
    inside
}

/// White frame with a gray page bordered in black, rotated `degrees`.
fn rotated_page(frame: (u32, u32), page: (f32, f32), border: f32, degrees: f32) -> RasterBuffer {
    let corners = rotated_rect(
        frame.0 as f32 / 2.0,
        frame.1 as f32 / 2.0,
        page.0,
        page.1,
        degrees,
    );
    let img = RgbaImage::from_fn(frame.0, frame.1, |x, y| {
        let d = inset_distance(&corners, x as f32 + 0.5, y as f32 + 0.5);
        if d < 0.0 {
            WHITE
        } else if d < border {
            BLACK
        } else {
            GRAY
        }
    });
    RasterBuffer::from_rgba(img).unwrap()
}

fn within(actual: u32, expected: u32, tolerance: f32) -> bool {
    (actual as f32 - expected as f32).abs() <= expected as f32 * tolerance
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn rotated_page_is_rectified_to_its_own_extent() {
    let input = rotated_page((3000, 4000), (1800.0, 2400.0), 20.0, 15.0);
    let result = PreprocessingPipeline::default().normalize(input);

    assert_eq!(result.path_taken(), PathTaken::RectangleRectified);
    let quad = result.detected_quadrilateral().unwrap();
    assert!(quad.confidence >= 0.3);

    let size = result.image().size();
    assert!(within(size.width, 1800, 0.03), "{size:?}");
    assert!(within(size.height, 2400, 0.03), "{size:?}");
    assert_eq!(result.report().output_size, size);
}

#[test]
fn rotated_page_is_rectified_and_enhanced() {
    let input = rotated_page((750, 1000), (450.0, 600.0), 6.0, 15.0);
    let params = EnhancementParameters {
        upscale_floor: 500,
        ..Default::default()
    };
    let result = PreprocessingPipeline::default().process(input, &params);

    assert_eq!(result.path_taken(), PathTaken::RectangleRectified);
    let size = result.image().size();
    assert_eq!(size.shorter_side(), 500);
    assert!(within(size.height, 667, 0.04), "{size:?}");
    assert!(result.report().skipped_stages.is_empty());
}

#[test]
fn small_gray_image_is_unmodified_and_upscaled() {
    let input = RasterBuffer::from_rgba(RgbaImage::from_pixel(400, 300, GRAY)).unwrap();
    let result = PreprocessingPipeline::default().process(input, &EnhancementParameters::default());

    assert_eq!(result.path_taken(), PathTaken::Unmodified);
    assert_eq!(result.image().size(), ImageSize::new(2000, 1500));
    assert!(result.report().warnings.contains(&PipelineWarning::DetectionMiss));
}

#[test]
fn black_bottom_band_is_trimmed() {
    let (width, height) = (1600u32, 2000u32);
    let img = RgbaImage::from_fn(width, height, |_, y| {
        if y >= height - height / 10 {
            BLACK
        } else {
            WHITE
        }
    });
    let input = RasterBuffer::from_rgba(img).unwrap();
    let result = PreprocessingPipeline::default().normalize(input);

    assert_eq!(result.path_taken(), PathTaken::BandTrimmed);
    assert!(within(result.image().height(), 1800, 0.01), "{:?}", result.image().size());
    assert_eq!(result.image().width(), width);
}

#[test]
fn undetectable_image_comes_back_unchanged() {
    let img = RgbaImage::from_fn(320, 240, |x, y| {
        let v = 120 + ((x / 40 + y / 40) % 2) as u8 * 6;
        Rgba([v, v, v, 255])
    });
    let input = RasterBuffer::from_rgba(img).unwrap();
    let trimmed = BandTrimmer::default().trim(input.clone()).image;

    let result = PreprocessingPipeline::default().normalize(input.clone());
    assert!(!result.image().as_rgba().is_empty());
    assert!(result.image() == &trimmed || result.image() == &input);
    assert_eq!(result.path_taken(), PathTaken::Unmodified);
}

#[test]
fn posterize_operator_stays_within_palette_and_is_stable() {
    let img = RgbaImage::from_fn(256, 256, |x, y| Rgba([x as u8, y as u8, (x ^ y) as u8, 255]));
    let input = RasterBuffer::from_rgba(img).unwrap();
    let op = EnhanceOp::Posterize { levels: 3 };

    let once = op.apply(&input).unwrap();
    assert!(palette(&once).len() <= 27);
    assert_eq!(op.apply(&once).unwrap(), once);
}

/// Every distinct RGB triple in `image`.
fn palette(image: &RasterBuffer) -> HashSet<[u8; 3]> {
    image
        .as_rgba()
        .pixels()
        .map(|p| [p.0[0], p.0[1], p.0[2]])
        .collect()
}

/// The channel values an `levels`-step posterize can produce.
fn posterize_lattice(levels: u8) -> HashSet<u8> {
    let steps = (levels - 1) as f32;
    (0..levels)
        .map(|k| (k as f32 / steps * 255.0).round() as u8)
        .collect()
}

#[test]
fn rerunning_the_chain_keeps_the_posterized_palette() {
    let params = EnhancementParameters {
        upscale_floor: 200,
        ..Default::default()
    };
    let img = RgbaImage::from_fn(300, 200, |x, y| {
        if (x / 7 + y / 11) % 4 == 0 {
            Rgba([35, 45, 140, 255])
        } else {
            Rgba([(200 + x % 40) as u8, (190 + y % 50) as u8, 180, 255])
        }
    });
    let input = RasterBuffer::from_rgba(img).unwrap();

    let chain = EnhancementChain::new();
    let stages = EnhancementChain::stages(&params);
    let (upscale, posterize) = (&stages[0], &stages[1]);
    let posterized = |image: &RasterBuffer| {
        posterize
            .apply(&upscale.apply(image).unwrap())
            .unwrap()
    };

    let first_run = chain.enhance(input.clone(), &params);
    let second_run = chain.enhance(first_run.clone(), &params);
    assert_eq!(second_run.size(), first_run.size());

    let lattice = posterize_lattice(params.posterize_levels);
    let max_colors = (params.posterize_levels as usize).pow(3);
    for stage_output in [posterized(&input), posterized(&first_run)] {
        let colors = palette(&stage_output);
        assert!(colors.len() <= max_colors, "{} colours", colors.len());
        assert!(colors.iter().flatten().all(|c| lattice.contains(c)));
        assert_eq!(posterize.apply(&stage_output).unwrap(), stage_output);
    }
}

#[test]
fn enhancement_does_not_upscale_large_pages() {
    let input = RasterBuffer::from_rgba(RgbaImage::from_pixel(1500, 1600, WHITE)).unwrap();
    let out = EnhancementChain::new().enhance(input, &EnhancementParameters::default());
    assert_eq!(out.size(), ImageSize::new(1500, 1600));
}
