//! Coefficient functions used to parametrize forms.
use crate::order::{FormScalar, Order};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// A scalar function of the physical coordinates.
///
/// Functions are evaluated concurrently for many quadrature points and must not mutate
/// themselves when queried.
pub trait ScalarFunction: ScalarFunctionClone + Debug + Send + Sync {
    fn value(&self, x: f64, y: f64) -> f64;

    /// An upper bound on the polynomial order of the function, given the orders of the
    /// coordinates.
    fn order(&self, x: Order, y: Order) -> Order;
}

/// Deep copy of boxed scalar functions.
///
/// Implemented automatically for every `ScalarFunction` that is `Clone`.
pub trait ScalarFunctionClone {
    fn clone_boxed(&self) -> Box<dyn ScalarFunction>;
}

impl<F> ScalarFunctionClone for F
where
    F: 'static + ScalarFunction + Clone,
{
    fn clone_boxed(&self) -> Box<dyn ScalarFunction> {
        Box::new(self.clone())
    }
}

/// A scalar function of the solution value, typically a tabulated material coefficient.
pub trait SplineFunction: SplineFunctionClone + Debug + Send + Sync {
    fn value(&self, u: f64) -> f64;

    fn derivative(&self, u: f64) -> f64;

    /// An upper bound on the polynomial order of `value`, given the order of `u`.
    fn order(&self, u: Order) -> Order;

    /// An upper bound on the polynomial order of `derivative`, given the order of `u`.
    fn derivative_order(&self, u: Order) -> Order;
}

/// Deep copy of boxed spline functions.
pub trait SplineFunctionClone {
    fn clone_boxed(&self) -> Box<dyn SplineFunction>;
}

impl<F> SplineFunctionClone for F
where
    F: 'static + SplineFunction + Clone,
{
    fn clone_boxed(&self) -> Box<dyn SplineFunction> {
        Box::new(self.clone())
    }
}

/// A coefficient function held by a form, together with how the form holds it.
///
/// The ownership of the function is explicit:
///
/// - `Unit` is the constant function `1.0`. Nothing is allocated and nothing is released.
/// - `Owned` functions belong to the form. Cloning the form clones the function, and the function
///   is released exactly once together with the form that owns it.
/// - `Shared` functions are kept alive by the caller. Forms only hold a reference count and
///   never release the function on their own.
#[derive(Debug)]
pub enum Coefficient<F: ?Sized> {
    Unit,
    Owned(Box<F>),
    Shared(Arc<F>),
}

impl<F: ?Sized> Default for Coefficient<F> {
    fn default() -> Self {
        Coefficient::Unit
    }
}

impl<F: ?Sized> Coefficient<F> {
    pub fn is_unit(&self) -> bool {
        matches!(self, Coefficient::Unit)
    }

    /// Returns the held function, or `None` for the unit function.
    pub fn get(&self) -> Option<&F> {
        match self {
            Coefficient::Unit => None,
            Coefficient::Owned(function) => Some(function.as_ref()),
            Coefficient::Shared(function) => Some(function.as_ref()),
        }
    }
}

impl Coefficient<dyn ScalarFunction> {
    pub fn owned(function: impl ScalarFunction + 'static) -> Self {
        Coefficient::Owned(Box::new(function))
    }

    pub fn shared(function: Arc<dyn ScalarFunction>) -> Self {
        Coefficient::Shared(function)
    }

    pub fn evaluate<A: FormScalar>(&self, x: A, y: A) -> A {
        match self.get() {
            None => A::constant(1.0),
            Some(function) => A::eval_function(function, x, y),
        }
    }
}

impl Clone for Coefficient<dyn ScalarFunction> {
    fn clone(&self) -> Self {
        match self {
            Coefficient::Unit => Coefficient::Unit,
            Coefficient::Owned(function) => Coefficient::Owned(function.clone_boxed()),
            Coefficient::Shared(function) => Coefficient::Shared(Arc::clone(function)),
        }
    }
}

impl Coefficient<dyn SplineFunction> {
    pub fn owned(spline: impl SplineFunction + 'static) -> Self {
        Coefficient::Owned(Box::new(spline))
    }

    pub fn shared(spline: Arc<dyn SplineFunction>) -> Self {
        Coefficient::Shared(spline)
    }

    pub fn evaluate<A: FormScalar>(&self, u: A) -> A {
        match self.get() {
            None => A::constant(1.0),
            Some(spline) => A::eval_spline(spline, u),
        }
    }

    pub fn evaluate_derivative<A: FormScalar>(&self, u: A) -> A {
        match self.get() {
            None => A::constant(0.0),
            Some(spline) => A::eval_spline_derivative(spline, u),
        }
    }
}

impl Clone for Coefficient<dyn SplineFunction> {
    fn clone(&self) -> Self {
        match self {
            Coefficient::Unit => Coefficient::Unit,
            Coefficient::Owned(spline) => Coefficient::Owned(spline.clone_boxed()),
            Coefficient::Shared(spline) => Coefficient::Shared(Arc::clone(spline)),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ConstantFunction(pub f64);

impl ScalarFunction for ConstantFunction {
    fn value(&self, _x: f64, _y: f64) -> f64 {
        self.0
    }

    fn order(&self, _x: Order, _y: Order) -> Order {
        Order::new(0)
    }
}

/// A function given by a closure together with its total polynomial degree.
///
/// For non-polynomial functions the degree is the one used to choose quadrature.
#[derive(Clone)]
pub struct AnalyticFunction {
    function: Arc<dyn Fn(f64, f64) -> f64 + Send + Sync>,
    degree: u32,
}

impl AnalyticFunction {
    pub fn new(degree: u32, function: impl Fn(f64, f64) -> f64 + Send + Sync + 'static) -> Self {
        Self {
            function: Arc::new(function),
            degree,
        }
    }

    pub fn degree(&self) -> u32 {
        self.degree
    }
}

impl Debug for AnalyticFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticFunction")
            .field("degree", &self.degree)
            .finish_non_exhaustive()
    }
}

impl ScalarFunction for AnalyticFunction {
    fn value(&self, x: f64, y: f64) -> f64 {
        (self.function)(x, y)
    }

    fn order(&self, x: Order, y: Order) -> Order {
        (x + y).pow(self.degree)
    }
}

pub type FunctionCoefficient = Coefficient<dyn ScalarFunction>;
pub type SplineCoefficient = Coefficient<dyn SplineFunction>;
