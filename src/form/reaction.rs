use crate::form::{BilinearIntegrand, Domain, ElementSample, FieldValue, LinearIntegrand, MatrixTarget, VectorTarget};
use crate::function::FunctionCoefficient;
use crate::order::FormScalar;

/// Volumetric mass (reaction) matrix `c * f(x, y) * u * v`.
#[derive(Debug, Clone)]
pub struct MatrixFormVol {
    target: MatrixTarget,
    coeff: f64,
    function: FunctionCoefficient,
}

impl MatrixFormVol {
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

impl_matrix_target_builders!(MatrixFormVol);

impl BilinearIntegrand for MatrixFormVol {
    const DOMAIN: Domain = Domain::Volume;

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

/// Residual of the mass matrix, `c * f(x, y) * u_prev * v` with `u_prev` the previous iterate of
/// component `i`.
#[derive(Debug, Clone)]
pub struct ResidualVol {
    target: VectorTarget,
    coeff: f64,
    function: FunctionCoefficient,
}

impl ResidualVol {
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

impl_vector_target_builders!(ResidualVol);

impl LinearIntegrand for ResidualVol {
    const DOMAIN: Domain = Domain::Volume;

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
