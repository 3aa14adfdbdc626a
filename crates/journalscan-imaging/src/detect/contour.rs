// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page-bottom fallback: a long, thin, roughly horizontal edge contour in the
// lower half of the frame is taken as the bottom edge of the page.

use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use journalscan_core::DetectorConfig;
use tracing::debug;

/// A contour taller than this fraction of its width is not an edge line.
const MAX_THICKNESS_RATIO: f32 = 0.1;

/// Copy of `edges` inside a one-pixel black frame. The contour tracer drops
/// runs that touch both side borders, which is exactly how a page-bottom edge
/// spanning the whole photo looks.
fn framed(edges: &GrayImage) -> GrayImage {
    let (width, height) = edges.dimensions();
    let mut out = GrayImage::new(width + 2, height + 2);
    image::imageops::replace(&mut out, edges, 1, 1);
    out
}

/// Working-image row of the page's bottom edge, if one stands out.
///
/// Candidates must span at least `page_edge_min_width` of the frame width and
/// start in the lower half of the frame. The widest candidate wins; its row is
/// the mean y of its contour points.
pub(crate) fn find_page_bottom(edges: &GrayImage, config: &DetectorConfig) -> Option<u32> {
    let (width, height) = edges.dimensions();
    let min_width = config.page_edge_min_width * width as f32;

    let mut best: Option<(u32, u32)> = None; // (span, row)
    // Points come back in framed coordinates, one pixel right of and below
    // their position in `edges`.
    for contour in find_contours::<i32>(&framed(edges)) {
        if contour.border_type != BorderType::Outer || contour.points.is_empty() {
            continue;
        }

        let (mut min_x, mut max_x) = (i32::MAX, i32::MIN);
        let (mut min_y, mut max_y) = (i32::MAX, i32::MIN);
        let mut sum_y = 0i64;
        for p in &contour.points {
            let (x, y) = (p.x - 1, p.y - 1);
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
            sum_y += y as i64;
        }

        let span = (max_x - min_x + 1) as u32;
        let thickness = (max_y - min_y + 1) as u32;
        if (span as f32) < min_width
            || thickness as f32 > span as f32 * MAX_THICKNESS_RATIO
            || (min_y as u32) < height / 2
        {
            continue;
        }

        let row = (sum_y as f64 / contour.points.len() as f64).round() as u32;
        if best.is_none_or(|(best_span, _)| span > best_span) {
            best = Some((span, row));
        }
    }

    if let Some((span, row)) = best {
        debug!(span, row, "Page-bottom contour");
    }
    best.map(|(_, row)| row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn with_rows(width: u32, height: u32, rows: std::ops::Range<u32>, from_x: u32, to_x: u32) -> GrayImage {
        let mut img = GrayImage::new(width, height);
        for y in rows {
            for x in from_x..to_x {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        img
    }

    #[test]
    fn finds_wide_line_in_lower_half() {
        let edges = with_rows(400, 400, 300..303, 10, 390);
        assert_eq!(find_page_bottom(&edges, &DetectorConfig::default()), Some(301));
    }

    #[test]
    fn finds_line_spanning_the_full_width() {
        let edges = with_rows(400, 400, 329..332, 0, 400);
        assert_eq!(find_page_bottom(&edges, &DetectorConfig::default()), Some(330));
    }

    #[test]
    fn full_width_line_after_edge_map_is_found() {
        let mut gray = GrayImage::from_pixel(400, 400, Luma([250]));
        for y in 330..400 {
            for x in 0..400 {
                gray.put_pixel(x, y, Luma([20]));
            }
        }
        let edges = crate::detect::edge_map(&gray, &DetectorConfig::default());
        let row = find_page_bottom(&edges, &DetectorConfig::default()).unwrap();
        assert!((326..=334).contains(&row), "{row}");
    }

    #[test]
    fn ignores_lines_in_upper_half() {
        let edges = with_rows(400, 400, 100..103, 10, 390);
        assert_eq!(find_page_bottom(&edges, &DetectorConfig::default()), None);
    }

    #[test]
    fn ignores_short_lines() {
        let edges = with_rows(400, 400, 300..303, 10, 150);
        assert_eq!(find_page_bottom(&edges, &DetectorConfig::default()), None);
    }

    #[test]
    fn ignores_thick_blobs() {
        let edges = with_rows(400, 400, 220..380, 10, 390);
        assert_eq!(find_page_bottom(&edges, &DetectorConfig::default()), None);
    }

    #[test]
    fn widest_candidate_wins() {
        let mut edges = with_rows(400, 400, 250..252, 50, 300);
        for x in 5..395 {
            for y in 340..342 {
                edges.put_pixel(x, y, Luma([255]));
            }
        }
        let row = find_page_bottom(&edges, &DetectorConfig::default()).unwrap();
        assert!((340..=341).contains(&row));
    }
}
