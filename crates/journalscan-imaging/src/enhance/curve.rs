// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Monotone cubic tone curves and 8-bit lookup tables.

/// 256-entry channel lookup table.
pub type Lut = [u8; 256];

/// Build a lookup table from a function on [0, 1].
pub fn lut_from_fn(f: impl Fn(f32) -> f32) -> Lut {
    let mut lut = [0u8; 256];
    for (i, entry) in lut.iter_mut().enumerate() {
        let y = f(i as f32 / 255.0);
        *entry = (y.clamp(0.0, 1.0) * 255.0).round() as u8;
    }
    lut
}

/// A curve through control points, interpolated with Fritsch-Carlson
/// monotone cubic Hermite splines so it never overshoots between points.
#[derive(Debug, Clone, PartialEq)]
pub struct ToneCurve {
    xs: Vec<f32>,
    ys: Vec<f32>,
    tangents: Vec<f32>,
}

impl ToneCurve {
    /// Returns `None` unless there are at least two points with strictly
    /// increasing x inside [0, 1].
    pub fn new(points: &[[f32; 2]]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let in_unit = |v: f32| (0.0..=1.0).contains(&v);
        if !points.iter().all(|[x, y]| in_unit(*x) && in_unit(*y)) {
            return None;
        }
        if points.windows(2).any(|w| w[1][0] <= w[0][0]) {
            return None;
        }

        let xs: Vec<f32> = points.iter().map(|p| p[0]).collect();
        let ys: Vec<f32> = points.iter().map(|p| p[1]).collect();
        let n = xs.len();

        let secants: Vec<f32> = (0..n - 1)
            .map(|k| (ys[k + 1] - ys[k]) / (xs[k + 1] - xs[k]))
            .collect();

        let mut tangents = vec![0.0f32; n];
        tangents[0] = secants[0];
        tangents[n - 1] = secants[n - 2];
        for k in 1..n - 1 {
            tangents[k] = if secants[k - 1] * secants[k] <= 0.0 {
                0.0
            } else {
                (secants[k - 1] + secants[k]) / 2.0
            };
        }

        for k in 0..n - 1 {
            if secants[k] == 0.0 {
                tangents[k] = 0.0;
                tangents[k + 1] = 0.0;
                continue;
            }
            let a = tangents[k] / secants[k];
            let b = tangents[k + 1] / secants[k];
            let norm = a * a + b * b;
            if norm > 9.0 {
                let t = 3.0 / norm.sqrt();
                tangents[k] = t * a * secants[k];
                tangents[k + 1] = t * b * secants[k];
            }
        }

        Some(Self { xs, ys, tangents })
    }

    /// Evaluate at `x`. Values outside the first/last control point are held
    /// at the end values.
    pub fn eval(&self, x: f32) -> f32 {
        let n = self.xs.len();
        if x <= self.xs[0] {
            return self.ys[0];
        }
        if x >= self.xs[n - 1] {
            return self.ys[n - 1];
        }

        let k = self.xs.partition_point(|&xk| xk <= x) - 1;
        let h = self.xs[k + 1] - self.xs[k];
        let t = (x - self.xs[k]) / h;
        let (t2, t3) = (t * t, t * t * t);

        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;

        h00 * self.ys[k]
            + h10 * h * self.tangents[k]
            + h01 * self.ys[k + 1]
            + h11 * h * self.tangents[k + 1]
    }

    pub fn to_lut(&self) -> Lut {
        lut_from_fn(|x| self.eval(x))
    }
}
