//! Polynomial order tokens and the scalar algebra shared by numeric and order evaluation.
use crate::function::{ScalarFunction, SplineFunction};
use nalgebra::Scalar;
use num::Zero;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::ops::{Add, AddAssign, Mul, MulAssign};

/// The polynomial degree of an expression.
///
/// `Order` is not a number: it stands in for one. Adding two expressions gives an expression whose
/// degree is the maximum of the two degrees, and multiplying them sums the degrees. Constants have
/// degree zero. Evaluating a form's integrand with `Order` operands in place of numbers therefore
/// yields an upper bound on the polynomial degree of the integrand.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Order(u32);

impl Order {
    pub const fn new(degree: u32) -> Self {
        Self(degree)
    }

    pub const fn degree(&self) -> u32 {
        self.0
    }

    /// The order of `self` multiplied with itself `exponent` times.
    pub fn pow(self, exponent: u32) -> Self {
        Self(self.0.saturating_mul(exponent))
    }
}

impl Display for Order {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Order({})", self.0)
    }
}

impl Add for Order {
    type Output = Order;

    fn add(self, rhs: Self) -> Self::Output {
        Order(u32::max(self.0, rhs.0))
    }
}

impl AddAssign for Order {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Mul for Order {
    type Output = Order;

    fn mul(self, rhs: Self) -> Self::Output {
        Order(self.0.saturating_add(rhs.0))
    }
}

impl MulAssign for Order {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl Zero for Order {
    fn zero() -> Self {
        Order(0)
    }

    fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

/// A scalar type in which form integrands can be evaluated.
///
/// Implemented for `f64` (the actual quadrature sum) and for [`Order`] (the degree estimate used to
/// choose the quadrature rule). Every concrete form writes its integrand once, generically over
/// this trait, so both evaluations follow the same formula.
pub trait FormScalar: Scalar + Copy + Zero + Add<Output = Self> + Mul<Output = Self> + Send + Sync {
    /// Lifts a numeric constant (quadrature weight, scalar coefficient) into the algebra.
    fn constant(value: f64) -> Self;

    fn eval_function(function: &dyn ScalarFunction, x: Self, y: Self) -> Self;

    fn eval_spline(spline: &dyn SplineFunction, u: Self) -> Self;

    fn eval_spline_derivative(spline: &dyn SplineFunction, u: Self) -> Self;
}

impl FormScalar for f64 {
    fn constant(value: f64) -> Self {
        value
    }

    fn eval_function(function: &dyn ScalarFunction, x: Self, y: Self) -> Self {
        function.value(x, y)
    }

    fn eval_spline(spline: &dyn SplineFunction, u: Self) -> Self {
        spline.value(u)
    }

    fn eval_spline_derivative(spline: &dyn SplineFunction, u: Self) -> Self {
        spline.derivative(u)
    }
}

impl FormScalar for Order {
    fn constant(_value: f64) -> Self {
        Order::zero()
    }

    fn eval_function(function: &dyn ScalarFunction, x: Self, y: Self) -> Self {
        function.order(x, y)
    }

    fn eval_spline(spline: &dyn SplineFunction, u: Self) -> Self {
        spline.order(u)
    }

    fn eval_spline_derivative(spline: &dyn SplineFunction, u: Self) -> Self {
        spline.derivative_order(u)
    }
}
