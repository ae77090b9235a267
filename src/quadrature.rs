//! Quadrature rules for the reference segment and the reference triangle.
//!
//! Rules are indexed by their *strength*, the highest polynomial degree they integrate exactly.
use fenris_quadrature::{polyquad, tensor, univariate};
use log::warn;
use nalgebra::Point2;

/// The highest quadrature strength used by the reference assembler.
pub const MAX_QUADRATURE_STRENGTH: usize = 24;

/// Weights and points of a rule in one dimension.
pub type QuadraturePair1d = (Vec<f64>, Vec<f64>);
/// Weights and points of a rule in two dimensions.
pub type QuadraturePair2d = (Vec<f64>, Vec<Point2<f64>>);

/// Gauss-Legendre rule with `num_points` points on `[-1, 1]`, exact for degree `2 n - 1`.
///
/// # Panics
///
/// Panics if zero points are requested.
pub fn gauss(num_points: usize) -> QuadraturePair1d {
    let (weights, points) = univariate::gauss(num_points);
    let points = points.into_iter().map(|[x]| x).collect();
    (weights, points)
}

/// Rule on the reference segment `[-1, 1]` of the given strength.
pub fn segment(strength: usize) -> QuadraturePair1d {
    gauss(strength / 2 + 1)
}

/// Maps a rule on the triangle with vertices `(-1, -1)`, `(1, -1)` and `(-1, 1)` onto the unit
/// reference triangle.
fn convert_rule_from_biunit_triangle(rule: fenris_quadrature::Rule<2>) -> QuadraturePair2d {
    let (weights, points) = rule;
    let weights = weights.into_iter().map(|w| 0.25 * w).collect();
    let points = points
        .into_iter()
        .map(|[x, y]| Point2::new(0.5 * (x + 1.0), 0.5 * (y + 1.0)))
        .collect();
    (weights, points)
}

/// Collapsed Gauss rule, obtained by mapping the unit square onto the triangle with
/// `(s, t) -> (s (1 - t), t)`.
///
/// The determinant `1 - t` raises the degree in `t` by one, hence `(strength + 3) / 2` points
/// per direction.
fn collapsed_triangle(strength: usize) -> QuadraturePair2d {
    let (quad_weights, quad_points) = tensor::quadrilateral_gauss((strength + 3) / 2);
    let mut weights = Vec::with_capacity(quad_weights.len());
    let mut points = Vec::with_capacity(quad_points.len());
    for (w, [u, v]) in quad_weights.into_iter().zip(quad_points) {
        let s = 0.5 * (u + 1.0);
        let t = 0.5 * (v + 1.0);
        weights.push(0.25 * w * (1.0 - t));
        points.push(Point2::new(s * (1.0 - t), t));
    }
    (weights, points)
}

/// Rule on the reference triangle with vertices `(0, 0)`, `(1, 0)` and `(0, 1)` of the given
/// strength.
///
/// Uses the polyquad rules where available and a collapsed Gauss rule for higher strengths.
pub fn triangle(strength: usize) -> QuadraturePair2d {
    match polyquad::triangle(strength) {
        Ok(rule) => convert_rule_from_biunit_triangle(rule),
        Err(_) => collapsed_triangle(strength),
    }
}

/// Clamps a requested strength to `max_strength`, warning if the request had to be reduced.
pub fn clamp_strength(requested: usize, max_strength: usize) -> usize {
    if requested > max_strength {
        warn!(
            "Requested quadrature strength {} exceeds maximum {}, integration may be inexact",
            requested, max_strength
        );
        max_strength
    } else {
        requested
    }
}

/// Precomputed segment and triangle rules for every strength up to a maximum.
#[derive(Debug, Clone)]
pub struct QuadratureTable {
    segments: Vec<QuadraturePair1d>,
    triangles: Vec<QuadraturePair2d>,
}

impl QuadratureTable {
    pub fn new(max_strength: usize) -> Self {
        Self {
            segments: (0..=max_strength).map(segment).collect(),
            triangles: (0..=max_strength).map(triangle).collect(),
        }
    }

    pub fn max_strength(&self) -> usize {
        self.triangles.len() - 1
    }

    /// The segment rule of the given strength, clamped to the maximum strength.
    pub fn segment(&self, strength: usize) -> &QuadraturePair1d {
        &self.segments[clamp_strength(strength, self.max_strength())]
    }

    /// The triangle rule of the given strength, clamped to the maximum strength.
    pub fn triangle(&self, strength: usize) -> &QuadraturePair2d {
        &self.triangles[clamp_strength(strength, self.max_strength())]
    }
}

impl Default for QuadratureTable {
    fn default() -> Self {
        Self::new(MAX_QUADRATURE_STRENGTH)
    }
}
