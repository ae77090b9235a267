use crate::form::{BilinearIntegrand, Domain, ElementSample, FieldValue, LinearIntegrand, MatrixTarget, VectorTarget};
use crate::function::SplineCoefficient;
use crate::order::FormScalar;

/// Jacobian of the nonlinear diffusion term `-div(c * s(u) * grad u)`.
///
/// The integrand is `s'(u_prev) * u * (grad u_prev . grad v) + s(u_prev) * (grad u . grad v)`,
/// where `u_prev` is the previous iterate of component `j`.
#[derive(Debug, Clone)]
pub struct JacobianDiffusion {
    target: MatrixTarget,
    coeff: f64,
    spline: SplineCoefficient,
}

impl JacobianDiffusion {
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

impl_matrix_target_builders!(JacobianDiffusion);

impl BilinearIntegrand for JacobianDiffusion {
    const DOMAIN: Domain = Domain::Volume;

    fn target(&self) -> &MatrixTarget {
        &self.target
    }

    fn scale(&self) -> f64 {
        self.coeff
    }

    fn integrand<A: FormScalar>(&self, element: &ElementSample<A>, point: usize, u: FieldValue<A>, v: FieldValue<A>) -> A {
        let u_prev = element.u_ext(self.target.j).at(point);
        self.spline.evaluate_derivative(u_prev.val) * u.val * u_prev.grad_dot(&v)
            + self.spline.evaluate(u_prev.val) * u.grad_dot(&v)
    }
}

/// Residual of the nonlinear diffusion term, `c * s(u_prev) * (grad u_prev . grad v)` with `u_prev`
/// the previous iterate of component `i`.
#[derive(Debug, Clone)]
pub struct ResidualDiffusion {
    target: VectorTarget,
    coeff: f64,
    spline: SplineCoefficient,
}

impl ResidualDiffusion {
    pub fn new(i: usize) -> Self {
        Self {
            target: VectorTarget::new(i),
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

impl_vector_target_builders!(ResidualDiffusion);

impl LinearIntegrand for ResidualDiffusion {
    const DOMAIN: Domain = Domain::Volume;

    fn target(&self) -> &VectorTarget {
        &self.target
    }

    fn scale(&self) -> f64 {
        self.coeff
    }

    fn integrand<A: FormScalar>(&self, element: &ElementSample<A>, point: usize, v: FieldValue<A>) -> A {
        let u_prev = element.u_ext(self.target.i).at(point);
        self.spline.evaluate(u_prev.val) * u_prev.grad_dot(&v)
    }
}
