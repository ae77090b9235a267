//! Spline coefficients, i.e. scalar functions of the solution value.
use crate::function::SplineFunction;
use crate::order::Order;
use eyre::{ensure, eyre};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Boundary condition imposed at one end of a cubic spline.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum SplineEnd {
    /// Vanishing second derivative.
    Natural,
    /// Prescribed first derivative.
    Clamped(f64),
}

/// How a spline is continued outside the interval spanned by its knots.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Extrapolation {
    /// The value at the nearest end point.
    Constant,
    /// The tangent line at the nearest end point.
    Linear,
}

#[derive(Debug, Clone, PartialEq)]
enum Representation {
    Constant(f64),
    Piecewise {
        knots: Vec<f64>,
        values: Vec<f64>,
        // Second derivatives at the knots
        moments: Vec<f64>,
    },
}

/// An interpolating cubic spline through tabulated points.
#[derive(Debug, Clone, PartialEq)]
pub struct CubicSpline {
    representation: Representation,
    extrapolation: Extrapolation,
}

impl CubicSpline {
    /// A spline that is constant everywhere.
    pub fn constant(value: f64) -> Self {
        Self {
            representation: Representation::Constant(value),
            extrapolation: Extrapolation::Constant,
        }
    }

    /// Interpolates `values` at the strictly increasing `knots`.
    ///
    /// Extrapolation defaults to [`Extrapolation::Linear`].
    pub fn new(knots: Vec<f64>, values: Vec<f64>, left: SplineEnd, right: SplineEnd) -> eyre::Result<Self> {
        ensure!(
            knots.len() == values.len(),
            "number of knots ({}) must match number of values ({})",
            knots.len(),
            values.len()
        );
        ensure!(knots.len() >= 2, "a cubic spline needs at least two knots");
        ensure!(
            knots.windows(2).all(|pair| pair[0] < pair[1]),
            "spline knots must be strictly increasing"
        );
        ensure!(
            knots.iter().chain(&values).all(|x| x.is_finite()),
            "spline knots and values must be finite"
        );

        let moments = solve_moments(&knots, &values, left, right)?;
        Ok(Self {
            representation: Representation::Piecewise { knots, values, moments },
            extrapolation: Extrapolation::Linear,
        })
    }

    /// Natural spline, i.e. vanishing second derivatives at both ends.
    pub fn natural(knots: Vec<f64>, values: Vec<f64>) -> eyre::Result<Self> {
        Self::new(knots, values, SplineEnd::Natural, SplineEnd::Natural)
    }

    pub fn with_extrapolation(self, extrapolation: Extrapolation) -> Self {
        Self { extrapolation, ..self }
    }

    pub fn extrapolation(&self) -> Extrapolation {
        self.extrapolation
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.representation, Representation::Constant(_))
    }

    /// Value and derivative at `u`.
    pub fn evaluate(&self, u: f64) -> (f64, f64) {
        match &self.representation {
            Representation::Constant(c) => (*c, 0.0),
            Representation::Piecewise { knots, values, moments } => {
                let n = knots.len();
                let (first, last) = (knots[0], knots[n - 1]);
                if u < first || u > last {
                    let (end, idx) = if u < first { (first, 0) } else { (last, n - 2) };
                    let (value, slope) = evaluate_segment(knots, values, moments, idx, end);
                    return match self.extrapolation {
                        Extrapolation::Constant => (value, 0.0),
                        Extrapolation::Linear => (value + slope * (u - end), slope),
                    };
                }
                // Index of the segment [knots[k], knots[k + 1]] containing u
                let k = knots
                    .partition_point(|&knot| knot <= u)
                    .saturating_sub(1)
                    .min(n - 2);
                evaluate_segment(knots, values, moments, k, u)
            }
        }
    }
}

fn evaluate_segment(knots: &[f64], values: &[f64], moments: &[f64], k: usize, u: f64) -> (f64, f64) {
    let h = knots[k + 1] - knots[k];
    let a = knots[k + 1] - u;
    let b = u - knots[k];
    let (m0, m1) = (moments[k], moments[k + 1]);
    let c0 = values[k] - m0 * h * h / 6.0;
    let c1 = values[k + 1] - m1 * h * h / 6.0;

    let value = (m0 * a * a * a + m1 * b * b * b) / (6.0 * h) + (c0 * a + c1 * b) / h;
    let derivative = (m1 * b * b - m0 * a * a) / (2.0 * h) + (c1 - c0) / h;
    (value, derivative)
}

/// Solves for the second derivatives of the interpolant at the knots.
fn solve_moments(knots: &[f64], values: &[f64], left: SplineEnd, right: SplineEnd) -> eyre::Result<Vec<f64>> {
    let n = knots.len();
    let h = |k: usize| knots[k + 1] - knots[k];
    let slope = |k: usize| (values[k + 1] - values[k]) / h(k);

    let mut matrix = DMatrix::<f64>::zeros(n, n);
    let mut rhs = DVector::<f64>::zeros(n);

    match left {
        SplineEnd::Natural => matrix[(0, 0)] = 1.0,
        SplineEnd::Clamped(d) => {
            matrix[(0, 0)] = 2.0 * h(0);
            matrix[(0, 1)] = h(0);
            rhs[0] = 6.0 * (slope(0) - d);
        }
    }

    for k in 1..n - 1 {
        matrix[(k, k - 1)] = h(k - 1);
        matrix[(k, k)] = 2.0 * (h(k - 1) + h(k));
        matrix[(k, k + 1)] = h(k);
        rhs[k] = 6.0 * (slope(k) - slope(k - 1));
    }

    match right {
        SplineEnd::Natural => matrix[(n - 1, n - 1)] = 1.0,
        SplineEnd::Clamped(d) => {
            matrix[(n - 1, n - 2)] = h(n - 2);
            matrix[(n - 1, n - 1)] = 2.0 * h(n - 2);
            rhs[n - 1] = 6.0 * (d - slope(n - 2));
        }
    }

    let moments = matrix
        .lu()
        .solve(&rhs)
        .ok_or_else(|| eyre!("spline system is singular"))?;
    Ok(moments.as_slice().to_vec())
}

impl SplineFunction for CubicSpline {
    fn value(&self, u: f64) -> f64 {
        self.evaluate(u).0
    }

    fn derivative(&self, u: f64) -> f64 {
        self.evaluate(u).1
    }

    fn order(&self, u: Order) -> Order {
        if self.is_constant() {
            Order::new(0)
        } else {
            u * u * u
        }
    }

    fn derivative_order(&self, u: Order) -> Order {
        if self.is_constant() {
            Order::new(0)
        } else {
            u * u
        }
    }
}

/// A spline given in closed form by its value and derivative, with a declared polynomial degree.
#[derive(Clone)]
pub struct AnalyticSpline {
    value: Arc<dyn Fn(f64) -> f64 + Send + Sync>,
    derivative: Arc<dyn Fn(f64) -> f64 + Send + Sync>,
    degree: u32,
}

impl AnalyticSpline {
    pub fn new(
        degree: u32,
        value: impl Fn(f64) -> f64 + Send + Sync + 'static,
        derivative: impl Fn(f64) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            value: Arc::new(value),
            derivative: Arc::new(derivative),
            degree,
        }
    }

    pub fn degree(&self) -> u32 {
        self.degree
    }
}

impl Debug for AnalyticSpline {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticSpline")
            .field("degree", &self.degree)
            .finish_non_exhaustive()
    }
}

impl SplineFunction for AnalyticSpline {
    fn value(&self, u: f64) -> f64 {
        (self.value)(u)
    }

    fn derivative(&self, u: f64) -> f64 {
        (self.derivative)(u)
    }

    fn order(&self, u: Order) -> Order {
        u.pow(self.degree)
    }

    fn derivative_order(&self, u: Order) -> Order {
        u.pow(self.degree.saturating_sub(1))
    }
}
