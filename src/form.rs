//! Bilinear and linear forms evaluated at the quadrature points of a single element.
//!
//! Every concrete form writes its integrand once, generically over [`FormScalar`]. The blanket
//! implementations of [`MatrixForm`] and [`VectorForm`] evaluate that integrand with `f64` for the
//! numeric contribution and with [`Order`] for the polynomial degree used to choose quadrature.
use crate::order::{FormScalar, Order};
use itertools::izip;
use nalgebra::{Point2, Scalar, Vector2};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

/// Builder methods shared by forms holding a [`MatrixTarget`] in the field `target`.
macro_rules! impl_matrix_target_builders {
    ($form:ty) => {
        impl $form {
            pub fn with_area(mut self, area: $crate::form::Area) -> Self {
                self.target.area = area;
                self
            }

            pub fn with_symmetry(mut self, symmetry: $crate::form::Symmetry) -> Self {
                self.target.symmetry = symmetry;
                self
            }

            pub fn with_geometry(mut self, geometry: $crate::form::GeomType) -> Self {
                self.target.geometry = geometry;
                self
            }
        }
    };
}

/// Builder methods shared by forms holding a [`VectorTarget`] in the field `target`.
macro_rules! impl_vector_target_builders {
    ($form:ty) => {
        impl $form {
            pub fn with_area(mut self, area: $crate::form::Area) -> Self {
                self.target.area = area;
                self
            }

            pub fn with_geometry(mut self, geometry: $crate::form::GeomType) -> Self {
                self.target.geometry = geometry;
                self
            }
        }
    };
}

mod advection;
mod diffusion;
mod reaction;
mod source;
mod surface;

pub use advection::*;
pub use diffusion::*;
pub use reaction::*;
pub use source::*;
pub use surface::*;

/// The interpretation of the planar coordinates.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GeomType {
    #[default]
    Planar,
    /// Cross section of a body of revolution about the x-axis. The radius is `y`.
    AxisymX,
    /// Cross section of a body of revolution about the y-axis. The radius is `x`.
    AxisymY,
}

impl GeomType {
    /// The factor multiplying the quadrature weight at the given physical point.
    pub fn factor<A: FormScalar>(&self, point: &Point2<A>) -> A {
        match self {
            GeomType::Planar => A::constant(1.0),
            GeomType::AxisymX => point.y,
            GeomType::AxisymY => point.x,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Symmetry {
    #[default]
    NonSymmetric,
    /// Only the upper triangle of diagonal blocks is evaluated. Off-diagonal blocks `(i, j)` are
    /// also added transposed to block `(j, i)`.
    Symmetric,
    /// Like `Symmetric`, but the transposed contribution is negated.
    AntiSymmetric,
}

/// The part of the domain (or boundary) a form is integrated over.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Area {
    #[default]
    Any,
    Markers(Vec<String>),
}

impl Area {
    pub fn marker(name: impl Into<String>) -> Self {
        Area::Markers(vec![name.into()])
    }

    pub fn markers<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Area::Markers(names.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, marker: &str) -> bool {
        match self {
            Area::Any => true,
            Area::Markers(markers) => markers.iter().any(|m| m == marker),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    /// Element interiors.
    Volume,
    /// Boundary edges.
    Surface,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    /// The form is only defined for planar geometry.
    UnsupportedGeometry { form: &'static str, geometry: GeomType },
}

impl Display for FormError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FormError::UnsupportedGeometry { form, geometry } => {
                write!(f, "{form} is only defined for planar geometry, got {geometry:?}")
            }
        }
    }
}

impl Error for FormError {}

/// Value and partial derivatives of a field at a single point.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FieldValue<A> {
    pub val: A,
    pub dx: A,
    pub dy: A,
}

impl<A: FormScalar> FieldValue<A> {
    pub fn grad_dot(&self, other: &FieldValue<A>) -> A {
        self.dx * other.dx + self.dy * other.dy
    }
}

/// Values and gradients of a field at every quadrature point of an element.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSample<A: Scalar> {
    values: Vec<A>,
    gradients: Vec<Vector2<A>>,
}

impl<A: FormScalar> FieldSample<A> {
    /// # Panics
    ///
    /// Panics if the number of values and gradients differ.
    pub fn new(values: Vec<A>, gradients: Vec<Vector2<A>>) -> Self {
        assert_eq!(
            values.len(),
            gradients.len(),
            "Field sample must have one gradient per value"
        );
        Self { values, gradients }
    }

    /// A field sample with vanishing gradients, e.g. for surface integrals.
    pub fn from_values(values: Vec<A>) -> Self {
        let gradients = vec![Vector2::zeros(); values.len()];
        Self { values, gradients }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[A] {
        &self.values
    }

    pub fn gradients(&self) -> &[Vector2<A>] {
        &self.gradients
    }

    pub fn at(&self, point: usize) -> FieldValue<A> {
        let grad = &self.gradients[point];
        FieldValue {
            val: self.values[point],
            dx: grad.x,
            dy: grad.y,
        }
    }
}

/// The quadrature data of one element (or boundary edge) shared by all forms evaluated on it.
///
/// Weights already include the determinant of the reference-to-physical map. `u_ext` holds one
/// field sample per solution component, evaluated for the previous Newton iterate.
#[derive(Debug, Copy, Clone)]
pub struct ElementSample<'a, A: Scalar> {
    weights: &'a [f64],
    points: &'a [Point2<A>],
    u_ext: &'a [FieldSample<A>],
}

impl<'a, A: FormScalar> ElementSample<'a, A> {
    /// # Panics
    ///
    /// Panics if the number of points or the length of any previous-iterate sample differs from the
    /// number of weights.
    pub fn new(weights: &'a [f64], points: &'a [Point2<A>], u_ext: &'a [FieldSample<A>]) -> Self {
        assert_eq!(weights.len(), points.len(), "Number of weights and points must agree");
        for (k, sample) in u_ext.iter().enumerate() {
            assert_eq!(
                sample.len(),
                weights.len(),
                "Previous iterate of component {k} must be sampled at every quadrature point"
            );
        }
        Self { weights, points, u_ext }
    }

    pub fn num_points(&self) -> usize {
        self.weights.len()
    }

    pub fn weights(&self) -> &'a [f64] {
        self.weights
    }

    pub fn points(&self) -> &'a [Point2<A>] {
        self.points
    }

    /// The previous iterate of the given solution component.
    ///
    /// # Panics
    ///
    /// Panics if the component has not been sampled.
    pub fn u_ext(&self, component: usize) -> &'a FieldSample<A> {
        self.u_ext.get(component).unwrap_or_else(|| {
            panic!(
                "Previous iterate of component {component} requested, but only {} components were sampled",
                self.u_ext.len()
            )
        })
    }
}

/// Computes `sum_i w_i * g(x_i) * integrand(i)` over the quadrature points of the element, where
/// `g` is the geometry factor.
pub fn integrate<A, F>(geometry: GeomType, element: &ElementSample<A>, mut integrand: F) -> A
where
    A: FormScalar,
    F: FnMut(usize) -> A,
{
    let mut sum = A::zero();
    for (i, w, x) in izip!(0.., element.weights(), element.points()) {
        sum = sum + A::constant(*w) * geometry.factor(x) * integrand(i);
    }
    sum
}

/// A bilinear form contributing to the `(i, j)` block of the Jacobian.
pub trait MatrixForm: Debug + Send + Sync {
    fn i(&self) -> usize;
    fn j(&self) -> usize;
    fn area(&self) -> &Area;
    fn symmetry(&self) -> Symmetry;
    fn domain(&self) -> Domain;

    fn value(&self, element: &ElementSample<f64>, u: &FieldSample<f64>, v: &FieldSample<f64>) -> f64;

    /// An upper bound on the polynomial degree of the integrand.
    fn order(&self, element: &ElementSample<Order>, u: &FieldSample<Order>, v: &FieldSample<Order>) -> Order;

    fn clone_form(&self) -> Box<dyn MatrixForm>;
}

/// A linear form contributing to the `i`-th block of the residual.
pub trait VectorForm: Debug + Send + Sync {
    fn i(&self) -> usize;
    fn area(&self) -> &Area;
    fn domain(&self) -> Domain;

    fn value(&self, element: &ElementSample<f64>, v: &FieldSample<f64>) -> f64;

    /// An upper bound on the polynomial degree of the integrand.
    fn order(&self, element: &ElementSample<Order>, v: &FieldSample<Order>) -> Order;

    fn clone_form(&self) -> Box<dyn VectorForm>;
}

/// A linear form contributing the same test function integral to several residual blocks.
pub trait MultiComponentVectorForm: Debug + Send + Sync {
    /// The residual blocks the form contributes to.
    fn components(&self) -> &[usize];
    fn area(&self) -> &Area;
    fn domain(&self) -> Domain;

    /// Writes one value per component into `result`.
    fn value(&self, element: &ElementSample<f64>, v: &FieldSample<f64>, result: &mut [f64]);

    fn order(&self, element: &ElementSample<Order>, v: &FieldSample<Order>) -> Order;

    fn clone_form(&self) -> Box<dyn MultiComponentVectorForm>;
}

impl Clone for Box<dyn MatrixForm> {
    fn clone(&self) -> Self {
        self.clone_form()
    }
}

impl Clone for Box<dyn VectorForm> {
    fn clone(&self) -> Self {
        self.clone_form()
    }
}

impl Clone for Box<dyn MultiComponentVectorForm> {
    fn clone(&self) -> Self {
        self.clone_form()
    }
}

/// Where a bilinear form is assembled.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatrixTarget {
    pub i: usize,
    pub j: usize,
    pub area: Area,
    pub symmetry: Symmetry,
    pub geometry: GeomType,
}

impl MatrixTarget {
    pub fn new(i: usize, j: usize) -> Self {
        Self {
            i,
            j,
            ..Default::default()
        }
    }
}

/// Where a linear form is assembled.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VectorTarget {
    pub i: usize,
    pub area: Area,
    pub geometry: GeomType,
}

impl VectorTarget {
    pub fn new(i: usize) -> Self {
        Self { i, ..Default::default() }
    }
}

/// The integrand of a bilinear form, written once for both numeric and order evaluation.
pub trait BilinearIntegrand: Clone + Debug + Send + Sync + 'static {
    const DOMAIN: Domain;

    fn target(&self) -> &MatrixTarget;

    /// Constant factor applied to the integral.
    fn scale(&self) -> f64;

    fn integrand<A: FormScalar>(&self, element: &ElementSample<A>, point: usize, u: FieldValue<A>, v: FieldValue<A>)
        -> A;
}

/// The integrand of a linear form, written once for both numeric and order evaluation.
pub trait LinearIntegrand: Clone + Debug + Send + Sync + 'static {
    const DOMAIN: Domain;

    fn target(&self) -> &VectorTarget;

    /// Constant factor applied to the integral.
    fn scale(&self) -> f64;

    fn integrand<A: FormScalar>(&self, element: &ElementSample<A>, point: usize, v: FieldValue<A>) -> A;
}

fn integrate_bilinear<K, A>(form: &K, element: &ElementSample<A>, u: &FieldSample<A>, v: &FieldSample<A>) -> A
where
    K: BilinearIntegrand,
    A: FormScalar,
{
    assert_eq!(u.len(), element.num_points(), "Trial function must be sampled at every point");
    assert_eq!(v.len(), element.num_points(), "Test function must be sampled at every point");
    let geometry = form.target().geometry;
    let sum = integrate(geometry, element, |p| form.integrand(element, p, u.at(p), v.at(p)));
    A::constant(form.scale()) * sum
}

fn integrate_linear<K, A>(form: &K, element: &ElementSample<A>, v: &FieldSample<A>) -> A
where
    K: LinearIntegrand,
    A: FormScalar,
{
    assert_eq!(v.len(), element.num_points(), "Test function must be sampled at every point");
    let geometry = form.target().geometry;
    let sum = integrate(geometry, element, |p| form.integrand(element, p, v.at(p)));
    A::constant(form.scale()) * sum
}

impl<K: BilinearIntegrand> MatrixForm for K {
    fn i(&self) -> usize {
        self.target().i
    }

    fn j(&self) -> usize {
        self.target().j
    }

    fn area(&self) -> &Area {
        &self.target().area
    }

    fn symmetry(&self) -> Symmetry {
        self.target().symmetry
    }

    fn domain(&self) -> Domain {
        K::DOMAIN
    }

    fn value(&self, element: &ElementSample<f64>, u: &FieldSample<f64>, v: &FieldSample<f64>) -> f64 {
        integrate_bilinear(self, element, u, v)
    }

    fn order(&self, element: &ElementSample<Order>, u: &FieldSample<Order>, v: &FieldSample<Order>) -> Order {
        integrate_bilinear(self, element, u, v)
    }

    fn clone_form(&self) -> Box<dyn MatrixForm> {
        Box::new(self.clone())
    }
}

impl<K: LinearIntegrand> VectorForm for K {
    fn i(&self) -> usize {
        self.target().i
    }

    fn area(&self) -> &Area {
        &self.target().area
    }

    fn domain(&self) -> Domain {
        K::DOMAIN
    }

    fn value(&self, element: &ElementSample<f64>, v: &FieldSample<f64>) -> f64 {
        integrate_linear(self, element, v)
    }

    fn order(&self, element: &ElementSample<Order>, v: &FieldSample<Order>) -> Order {
        integrate_linear(self, element, v)
    }

    fn clone_form(&self) -> Box<dyn VectorForm> {
        Box::new(self.clone())
    }
}
