use crate::form::{
    integrate, Area, BilinearIntegrand, Domain, ElementSample, FieldSample, FieldValue, GeomType, LinearIntegrand,
    MatrixTarget, MultiComponentVectorForm, VectorTarget,
};
use crate::function::{FunctionCoefficient, SplineCoefficient};
use crate::order::{FormScalar, Order};

/// Boundary mass matrix `c * f(x, y) * u * v`.
#[derive(Debug, Clone)]
pub struct MatrixFormSurf {
    target: MatrixTarget,
    coeff: f64,
    function: FunctionCoefficient,
}

impl MatrixFormSurf {
    pub fn new(i: usize, j: usize) -> Self {
        Self {
            target: MatrixTarget::new(i, j),
            coeff: 1.0,
            function: FunctionCoefficient::Unit,
        }
    }

    pub fn with_const_coeff(self, coeff: f64) -> Self {
        Self { coeff, ..self }
    }

    pub fn with_function(self, function: FunctionCoefficient) -> Self {
        Self { function, ..self }
    }
}

impl_matrix_target_builders!(MatrixFormSurf);

impl BilinearIntegrand for MatrixFormSurf {
    const DOMAIN: Domain = Domain::Surface;

    fn target(&self) -> &MatrixTarget {
        &self.target
    }

    fn scale(&self) -> f64 {
        self.coeff
    }

    fn integrand<A: FormScalar>(&self, element: &ElementSample<A>, point: usize, u: FieldValue<A>, v: FieldValue<A>) -> A {
        let x = &element.points()[point];
        self.function.evaluate(x.x, x.y) * u.val * v.val
    }
}

/// Jacobian of the nonlinear boundary term `c * s(u) * u * v`.
///
/// The integrand is `(s'(u_prev) * u_prev + s(u_prev)) * u * v`, where `u_prev` is the previous
/// iterate of component `j`.
#[derive(Debug, Clone)]
pub struct JacobianFormSurf {
    target: MatrixTarget,
    coeff: f64,
    spline: SplineCoefficient,
}

impl JacobianFormSurf {
    pub fn new(i: usize, j: usize) -> Self {
        Self {
            target: MatrixTarget::new(i, j),
            coeff: 1.0,
            spline: SplineCoefficient::Unit,
        }
    }

    pub fn with_const_coeff(self, coeff: f64) -> Self {
        Self { coeff, ..self }
    }

    pub fn with_spline(self, spline: SplineCoefficient) -> Self {
        Self { spline, ..self }
    }
}

impl_matrix_target_builders!(JacobianFormSurf);

impl BilinearIntegrand for JacobianFormSurf {
    const DOMAIN: Domain = Domain::Surface;

    fn target(&self) -> &MatrixTarget {
        &self.target
    }

    fn scale(&self) -> f64 {
        self.coeff
    }

    fn integrand<A: FormScalar>(&self, element: &ElementSample<A>, point: usize, u: FieldValue<A>, v: FieldValue<A>) -> A {
        let u_prev = element.u_ext(self.target.j).at(point);
        let linearized = self.spline.evaluate_derivative(u_prev.val) * u_prev.val + self.spline.evaluate(u_prev.val);
        linearized * u.val * v.val
    }
}

/// Boundary load vector `c * f(x, y) * v`, e.g. a prescribed flux.
#[derive(Debug, Clone)]
pub struct VectorFormSurf {
    target: VectorTarget,
    coeff: f64,
    function: FunctionCoefficient,
}

impl VectorFormSurf {
    pub fn new(i: usize) -> Self {
        Self {
            target: VectorTarget::new(i),
            coeff: 1.0,
            function: FunctionCoefficient::Unit,
        }
    }

    pub fn with_const_coeff(self, coeff: f64) -> Self {
        Self { coeff, ..self }
    }

    pub fn with_function(self, function: FunctionCoefficient) -> Self {
        Self { function, ..self }
    }
}

impl_vector_target_builders!(VectorFormSurf);

impl LinearIntegrand for VectorFormSurf {
    const DOMAIN: Domain = Domain::Surface;

    fn target(&self) -> &VectorTarget {
        &self.target
    }

    fn scale(&self) -> f64 {
        self.coeff
    }

    fn integrand<A: FormScalar>(&self, element: &ElementSample<A>, point: usize, v: FieldValue<A>) -> A {
        let x = &element.points()[point];
        self.function.evaluate(x.x, x.y) * v.val
    }
}

/// Residual of the boundary mass matrix, `c * f(x, y) * u_prev * v` with `u_prev` the previous
/// iterate of component `i`.
#[derive(Debug, Clone)]
pub struct ResidualSurf {
    target: VectorTarget,
    coeff: f64,
    function: FunctionCoefficient,
}

impl ResidualSurf {
    pub fn new(i: usize) -> Self {
        Self {
            target: VectorTarget::new(i),
            coeff: 1.0,
            function: FunctionCoefficient::Unit,
        }
    }

    pub fn with_const_coeff(self, coeff: f64) -> Self {
        Self { coeff, ..self }
    }

    pub fn with_function(self, function: FunctionCoefficient) -> Self {
        Self { function, ..self }
    }
}

impl_vector_target_builders!(ResidualSurf);

impl LinearIntegrand for ResidualSurf {
    const DOMAIN: Domain = Domain::Surface;

    fn target(&self) -> &VectorTarget {
        &self.target
    }

    fn scale(&self) -> f64 {
        self.coeff
    }

    fn integrand<A: FormScalar>(&self, element: &ElementSample<A>, point: usize, v: FieldValue<A>) -> A {
        let x = &element.points()[point];
        let u_prev = element.u_ext(self.target.i).at(point);
        self.function.evaluate(x.x, x.y) * u_prev.val * v.val
    }
}

/// Boundary integral of the test function, contributed to several components with one
/// coefficient each.
#[derive(Debug, Clone)]
pub struct MultiComponentVectorFormSurf {
    components: Vec<usize>,
    coeffs: Vec<f64>,
    area: Area,
    geometry: GeomType,
}

impl MultiComponentVectorFormSurf {
    /// # Panics
    ///
    /// Panics if the number of components and coefficients differ.
    pub fn new(components: Vec<usize>, coeffs: Vec<f64>) -> Self {
        assert_eq!(
            components.len(),
            coeffs.len(),
            "Each target component needs exactly one coefficient"
        );
        Self {
            components,
            coeffs,
            area: Area::Any,
            geometry: GeomType::Planar,
        }
    }

    pub fn with_area(self, area: Area) -> Self {
        Self { area, ..self }
    }

    pub fn with_geometry(self, geometry: GeomType) -> Self {
        Self { geometry, ..self }
    }

    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }
}

impl MultiComponentVectorForm for MultiComponentVectorFormSurf {
    fn components(&self) -> &[usize] {
        &self.components
    }

    fn area(&self) -> &Area {
        &self.area
    }

    fn domain(&self) -> Domain {
        Domain::Surface
    }

    fn value(&self, element: &ElementSample<f64>, v: &FieldSample<f64>, result: &mut [f64]) {
        assert_eq!(result.len(), self.components.len(), "One result entry per component required");
        let integral = integrate(self.geometry, element, |p| v.at(p).val);
        for (r, c) in result.iter_mut().zip(&self.coeffs) {
            *r = c * integral;
        }
    }

    fn order(&self, element: &ElementSample<Order>, v: &FieldSample<Order>) -> Order {
        integrate(self.geometry, element, |p| v.at(p).val)
    }

    fn clone_form(&self) -> Box<dyn MultiComponentVectorForm> {
        Box::new(self.clone())
    }
}
