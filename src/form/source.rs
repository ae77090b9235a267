use crate::form::{Domain, ElementSample, FieldValue, LinearIntegrand, VectorTarget};
use crate::function::FunctionCoefficient;
use crate::order::FormScalar;

/// Volumetric source (load) vector `c * f(x, y) * v`.
#[derive(Debug, Clone)]
pub struct VectorFormVol {
    target: VectorTarget,
    coeff: f64,
    function: FunctionCoefficient,
}

impl VectorFormVol {
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

impl_vector_target_builders!(VectorFormVol);

impl LinearIntegrand for VectorFormVol {
    const DOMAIN: Domain = Domain::Volume;

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
