// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pixel-level enhancement filters on RGBA8 images. Alpha is never modified.

use image::imageops::FilterType;
use image::{ImageBuffer, Luma, Rgba, RgbaImage};
use imageproc::filter::gaussian_blur_f32;

use super::curve::{Lut, lut_from_fn};
use crate::raster::{REC709, rec709_luma};

/// Float planes keep blur results unrounded, so flat regions stay exactly flat.
type LumaPlane = ImageBuffer<Luma<f32>, Vec<f32>>;
type RgbaPlane = ImageBuffer<Rgba<f32>, Vec<f32>>;

#[inline]
fn to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Rec. 709 luminance in 0..=255, unrounded.
fn luminance_plane(image: &RgbaImage) -> LumaPlane {
    LumaPlane::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, _] = image.get_pixel(x, y).0;
        Luma([rec709_luma(r, g, b) * 255.0])
    })
}

fn blurred_rgba(image: &RgbaImage, sigma: f32) -> RgbaPlane {
    let plane = RgbaPlane::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        Rgba([r as f32, g as f32, b as f32, a as f32])
    });
    gaussian_blur_f32(&plane, sigma)
}

/// Apply a per-channel lookup table to R, G and B.
pub fn apply_lut(image: &RgbaImage, lut: &Lut) -> RgbaImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        *pixel = Rgba([lut[r as usize], lut[g as usize], lut[b as usize], a]);
    }
    out
}

/// Dimensions that bring the shorter side up to exactly `floor`, or `None`
/// when the image is already large enough.
pub fn upscale_dimensions(width: u32, height: u32, floor: u32) -> Option<(u32, u32)> {
    let shorter = width.min(height);
    if shorter >= floor {
        return None;
    }
    let scale = floor as f64 / shorter as f64;
    let grow = |side: u32| {
        if side == shorter {
            floor
        } else {
            ((side as f64 * scale).round() as u32).max(floor)
        }
    };
    Some((grow(width), grow(height)))
}

pub fn upscale(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    image::imageops::resize(image, width, height, FilterType::Lanczos3)
}

/// Lookup table quantising a channel to `levels` evenly spaced values.
pub fn posterize_lut(levels: u8) -> Lut {
    let steps = (levels.max(2) - 1) as f32;
    lut_from_fn(|x| (x * steps).round() / steps)
}

/// Saturation, then brightness offset, then contrast around mid-grey.
pub fn color_controls(image: &RgbaImage, contrast: f32, brightness: f32, saturation: f32) -> RgbaImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let luma = rec709_luma(r, g, b);
        let adjust = |c: u8| {
            let c = c as f32 / 255.0;
            let c = luma + (c - luma) * saturation;
            let c = c + brightness;
            let c = (c - 0.5) * contrast + 0.5;
            to_u8(c * 255.0)
        };
        *pixel = Rgba([adjust(r), adjust(g), adjust(b), a]);
    }
    out
}

/// Linear-light gain of `2^ev`.
pub fn exposure_lut(ev: f32) -> Lut {
    let gain = 2f32.powf(ev);
    lut_from_fn(|x| x * gain)
}

/// Power-law remap `out = in^power`.
pub fn gamma_lut(power: f32) -> Lut {
    lut_from_fn(|x| x.powf(power))
}

/// Luminance-domain sharpening: the high-pass of the luminance plane, scaled
/// by `strength`, is added equally to every colour channel so hues do not
/// fringe.
pub fn sharpen_luminance(image: &RgbaImage, strength: f32, radius: f32) -> RgbaImage {
    let luma = luminance_plane(image);
    let blurred = gaussian_blur_f32(&luma, radius);

    let mut out = image.clone();
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let detail = luma.get_pixel(x, y).0[0] - blurred.get_pixel(x, y).0[0];
        let boost = strength * detail;
        let [r, g, b, a] = pixel.0;
        *pixel = Rgba([
            to_u8(r as f32 + boost),
            to_u8(g as f32 + boost),
            to_u8(b as f32 + boost),
            a,
        ]);
    }
    out
}

/// Classic unsharp mask: `c + intensity * (c - blur(c))` per channel.
pub fn unsharp_mask(image: &RgbaImage, radius: f32, intensity: f32) -> RgbaImage {
    let blurred = blurred_rgba(image, radius);
    let mut out = image.clone();
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let soft = blurred.get_pixel(x, y).0;
        let [r, g, b, a] = pixel.0;
        let lift = |c: u8, s: f32| to_u8(c as f32 + intensity * (c as f32 - s));
        *pixel = Rgba([lift(r, soft[0]), lift(g, soft[1]), lift(b, soft[2]), a]);
    }
    out
}

/// Blur sigma used to estimate the noise-free signal.
const DENOISE_SIGMA: f32 = 1.0;

/// Edge-preserving noise reduction.
///
/// Pixels whose luminance is within `level` of their blurred neighbourhood
/// are treated as noise and replaced by the blurred value. Everything else is
/// an edge and is pushed away from the blur by `sharpness`.
pub fn reduce_noise(image: &RgbaImage, level: f32, sharpness: f32) -> RgbaImage {
    let blurred = blurred_rgba(image, DENOISE_SIGMA);
    let mut out = image.clone();
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let soft = blurred.get_pixel(x, y).0;
        let soft_luma = (REC709[0] * soft[0] + REC709[1] * soft[1] + REC709[2] * soft[2]) / 255.0;
        let delta = rec709_luma(r, g, b) - soft_luma;
        *pixel = if delta.abs() <= level {
            Rgba([to_u8(soft[0]), to_u8(soft[1]), to_u8(soft[2]), a])
        } else {
            let push = |c: u8, s: f32| to_u8(c as f32 + sharpness * (c as f32 - s));
            Rgba([push(r, soft[0]), push(g, soft[1]), push(b, soft[2]), a])
        };
    }
    out
}
