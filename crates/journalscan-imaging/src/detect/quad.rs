// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Quadrilateral search over closed edge contours.

use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;
use journalscan_core::{
    DetectorConfig, ImageSize, OriginConvention, PixelPoint, Quadrilateral, pixel_to_normalized,
};
use tracing::debug;

/// Shortest contour worth simplifying, in points.
const MIN_CONTOUR_POINTS: usize = 16;

/// A candidate that passed every filter, with its ranking score.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    quad: Quadrilateral,
    score: f32,
}

/// Search an edge map for the best page-shaped quadrilateral.
///
/// Every outer contour is simplified to a polygon; four-cornered convex ones
/// are scored by `area - (1 - max_y) * position_bias`, where `max_y` is the
/// candidate's top edge in bottom-left-origin normalized space. Shapes whose
/// top sits lower in the frame lose a little score.
pub(crate) fn find_quadrilateral(edges: &GrayImage, config: &DetectorConfig) -> Option<Quadrilateral> {
    let size = ImageSize::new(edges.width(), edges.height());
    let contours = find_contours::<i32>(edges);

    let mut best: Option<Candidate> = None;
    let mut considered = 0usize;
    for contour in contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer && c.points.len() >= MIN_CONTOUR_POINTS)
    {
        let Some(corners) = simplify_to_quad(&contour.points, config.polygon_epsilon) else {
            continue;
        };
        considered += 1;

        let quad_area = shoelace_area(&corners);
        let outline_area = shoelace_area(&to_pixel_points(&contour.points));
        let quad = to_quadrilateral(&corners, size, fill_confidence(outline_area, quad_area));

        if let Some(score) = score_candidate(&quad, &corners, config) {
            if best.is_none_or(|b| score > b.score) {
                best = Some(Candidate { quad, score });
            }
        }
    }

    debug!(
        contours = contours.len(),
        quads = considered,
        best_score = best.map(|b| b.score),
        "Quadrilateral search complete"
    );
    best.map(|b| b.quad)
}

/// Apply the size, confidence, and aspect filters; return the ranking score.
fn score_candidate(
    quad: &Quadrilateral,
    corners: &[PixelPoint; 4],
    config: &DetectorConfig,
) -> Option<f32> {
    let area = quad.area();
    if quad.confidence < config.min_confidence || area < config.min_size {
        return None;
    }

    let [tl, tr, br, bl] = corners;
    let width = (tl.distance(tr) + bl.distance(br)) / 2.0;
    let height = (tl.distance(bl) + tr.distance(br)) / 2.0;
    let aspect = width.min(height) / width.max(height);
    if !aspect.is_finite() || aspect < config.min_aspect || aspect > config.max_aspect {
        return None;
    }

    Some(area - (1.0 - quad.bounds().max_y()) * config.position_bias)
}

/// Simplify a closed contour and keep it only if four convex corners remain.
/// Returned order: top-left, top-right, bottom-right, bottom-left (pixel space).
fn simplify_to_quad(points: &[Point<i32>], epsilon_ratio: f32) -> Option<[PixelPoint; 4]> {
    let perimeter = arc_length(points, true);
    let epsilon = perimeter * epsilon_ratio as f64;
    if epsilon <= 0.0 {
        return None;
    }
    let polygon = approximate_polygon_dp(points, epsilon, true);
    let vertices = drop_redundant_vertices(&to_pixel_points(&polygon), epsilon as f32);
    if vertices.len() != 4 {
        return None;
    }
    let ordered = order_corners(&vertices)?;
    is_convex(&ordered).then_some(ordered)
}

fn to_pixel_points(points: &[Point<i32>]) -> Vec<PixelPoint> {
    points
        .iter()
        .map(|p| PixelPoint::new(p.x as f32, p.y as f32))
        .collect()
}

/// Remove repeated closing points and vertices lying on the segment between
/// their neighbours (within `tolerance`).
fn drop_redundant_vertices(polygon: &[PixelPoint], tolerance: f32) -> Vec<PixelPoint> {
    let mut vertices: Vec<PixelPoint> = Vec::with_capacity(polygon.len());
    for p in polygon {
        if vertices.last().is_none_or(|last| last.distance(p) > 1.0) {
            vertices.push(*p);
        }
    }
    while vertices.len() > 1 && vertices[0].distance(&vertices[vertices.len() - 1]) <= 1.0 {
        vertices.pop();
    }

    let mut changed = true;
    while changed && vertices.len() > 3 {
        changed = false;
        for i in 0..vertices.len() {
            let prev = vertices[(i + vertices.len() - 1) % vertices.len()];
            let next = vertices[(i + 1) % vertices.len()];
            if distance_to_segment(&vertices[i], &prev, &next) <= tolerance {
                vertices.remove(i);
                changed = true;
                break;
            }
        }
    }
    vertices
}

fn distance_to_segment(p: &PixelPoint, a: &PixelPoint, b: &PixelPoint) -> f32 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance(&PixelPoint::new(a.x + t * dx, a.y + t * dy))
}

/// Assign visual corners: top-left has the smallest `x + y`, bottom-right the
/// largest, top-right the largest `x - y`, bottom-left the smallest.
fn order_corners(vertices: &[PixelPoint]) -> Option<[PixelPoint; 4]> {
    let by = |key: fn(&PixelPoint) -> f32, max: bool| {
        let iter = vertices.iter().enumerate();
        let pick = if max {
            iter.max_by(|a, b| key(a.1).total_cmp(&key(b.1)))
        } else {
            iter.min_by(|a, b| key(a.1).total_cmp(&key(b.1)))
        };
        pick.map(|(i, _)| i)
    };
    let tl = by(|p| p.x + p.y, false)?;
    let br = by(|p| p.x + p.y, true)?;
    let tr = by(|p| p.x - p.y, true)?;
    let bl = by(|p| p.x - p.y, false)?;

    let mut seen = [tl, tr, br, bl];
    seen.sort_unstable();
    if seen.windows(2).any(|w| w[0] == w[1]) {
        return None;
    }
    Some([vertices[tl], vertices[tr], vertices[br], vertices[bl]])
}

fn is_convex(corners: &[PixelPoint; 4]) -> bool {
    let mut sign = 0.0f32;
    for i in 0..4 {
        let a = corners[i];
        let b = corners[(i + 1) % 4];
        let c = corners[(i + 2) % 4];
        let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
        if cross.abs() < f32::EPSILON {
            return false;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}

/// Area of a polygon by the shoelace formula. Vertices in order (CW or CCW).
pub(crate) fn shoelace_area(points: &[PixelPoint]) -> f32 {
    let n = points.len();
    let mut area = 0.0f64;
    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x as f64 * points[j].y as f64;
        area -= points[j].x as f64 * points[i].y as f64;
    }
    (area.abs() / 2.0) as f32
}

/// How completely the traced outline fills its simplified quad, in [0, 1].
/// A closed page outline scores near 1; an open edge (a "U" or a line)
/// encloses almost nothing and scores near 0.
fn fill_confidence(outline_area: f32, quad_area: f32) -> f32 {
    if quad_area <= 0.0 || outline_area <= 0.0 {
        return 0.0;
    }
    (outline_area.min(quad_area) / outline_area.max(quad_area)).clamp(0.0, 1.0)
}

fn to_quadrilateral(corners: &[PixelPoint; 4], size: ImageSize, confidence: f32) -> Quadrilateral {
    let norm = |p: PixelPoint| pixel_to_normalized(p, size, OriginConvention::BottomLeft);
    let [tl, tr, br, bl] = *corners;
    Quadrilateral {
        top_left: norm(tl),
        top_right: norm(tr),
        bottom_left: norm(bl),
        bottom_right: norm(br),
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::draw_hollow_rect_mut;
    use imageproc::rect::Rect;

    fn outline(width: u32, height: u32, rect: Rect) -> GrayImage {
        let mut img = GrayImage::new(width, height);
        draw_hollow_rect_mut(&mut img, rect, Luma([255u8]));
        img
    }

    #[test]
    fn shoelace_area_rectangle() {
        let corners = [
            PixelPoint::new(0.0, 0.0),
            PixelPoint::new(10.0, 0.0),
            PixelPoint::new(10.0, 5.0),
            PixelPoint::new(0.0, 5.0),
        ];
        let area = shoelace_area(&corners);
        assert!((area - 50.0).abs() < 1e-3, "Expected 50.0, got {}", area);
    }

    #[test]
    fn order_corners_by_position() {
        let shuffled = [
            PixelPoint::new(90.0, 95.0),
            PixelPoint::new(10.0, 5.0),
            PixelPoint::new(5.0, 90.0),
            PixelPoint::new(95.0, 10.0),
        ];
        let [tl, tr, br, bl] = order_corners(&shuffled).unwrap();
        assert_eq!(tl, PixelPoint::new(10.0, 5.0));
        assert_eq!(tr, PixelPoint::new(95.0, 10.0));
        assert_eq!(br, PixelPoint::new(90.0, 95.0));
        assert_eq!(bl, PixelPoint::new(5.0, 90.0));
    }

    #[test]
    fn bow_tie_is_not_convex() {
        let crossed = [
            PixelPoint::new(0.0, 0.0),
            PixelPoint::new(10.0, 10.0),
            PixelPoint::new(10.0, 0.0),
            PixelPoint::new(0.0, 10.0),
        ];
        assert!(!is_convex(&crossed));
    }

    #[test]
    fn collinear_vertices_are_dropped() {
        let polygon = [
            PixelPoint::new(0.0, 0.0),
            PixelPoint::new(50.0, 0.5),
            PixelPoint::new(100.0, 0.0),
            PixelPoint::new(100.0, 100.0),
            PixelPoint::new(0.0, 100.0),
            PixelPoint::new(0.0, 0.0),
        ];
        assert_eq!(drop_redundant_vertices(&polygon, 2.0).len(), 4);
    }

    #[test]
    fn closed_outline_is_found() {
        let edges = outline(400, 500, Rect::at(50, 60).of_size(300, 380));
        let quad = find_quadrilateral(&edges, &DetectorConfig::default()).expect("quad");
        assert!(quad.confidence > 0.9, "confidence {}", quad.confidence);
        let corners = quad.pixel_corners(ImageSize::new(400, 500));
        assert!((corners[0].x - 50.0).abs() <= 2.0 && (corners[0].y - 60.0).abs() <= 2.0);
        assert!((corners[2].x - 349.0).abs() <= 2.0 && (corners[2].y - 439.0).abs() <= 2.0);
    }

    #[test]
    fn small_outline_is_rejected() {
        let edges = outline(400, 400, Rect::at(10, 10).of_size(60, 60));
        assert!(find_quadrilateral(&edges, &DetectorConfig::default()).is_none());
    }

    #[test]
    fn extreme_aspect_is_rejected() {
        // A long thin strip: area passes, aspect does not.
        let edges = outline(1000, 1000, Rect::at(0, 300).of_size(999, 250));
        assert!(find_quadrilateral(&edges, &DetectorConfig::default()).is_none());
    }

    #[test]
    fn higher_candidate_wins_tie() {
        // Two equal outlines; the one nearer the top of the frame ranks first.
        let mut edges = GrayImage::new(600, 1000);
        draw_hollow_rect_mut(&mut edges, Rect::at(100, 20).of_size(400, 460), Luma([255u8]));
        draw_hollow_rect_mut(&mut edges, Rect::at(100, 520).of_size(400, 460), Luma([255u8]));
        let quad = find_quadrilateral(&edges, &DetectorConfig::default()).expect("quad");
        assert!(quad.bounds().max_y() > 0.9, "{:?}", quad.bounds());
    }
}
