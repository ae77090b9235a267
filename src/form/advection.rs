use crate::form::{
    Area, BilinearIntegrand, Domain, ElementSample, FieldValue, FormError, GeomType, LinearIntegrand, MatrixTarget,
    VectorTarget,
};
use crate::function::SplineCoefficient;
use crate::order::FormScalar;

fn check_planar(form: &'static str, geometry: GeomType) -> Result<(), FormError> {
    match geometry {
        GeomType::Planar => Ok(()),
        geometry => Err(FormError::UnsupportedGeometry { form, geometry }),
    }
}

/// Jacobian of the nonlinear advection term `c_x * ds_x(u)/dx + c_y * ds_y(u)/dy`.
///
/// Only defined for planar geometry. The integrand is
/// `sum_k c_k * (s_k'(u_prev) * u * d_k u_prev + s_k(u_prev) * d_k u) * v`, where `u_prev` is the
/// previous iterate of component `j`.
#[derive(Debug, Clone)]
pub struct JacobianAdvection {
    target: MatrixTarget,
    coeffs: [f64; 2],
    splines: [SplineCoefficient; 2],
}

impl JacobianAdvection {
    pub fn try_new(i: usize, j: usize, coeff_x: f64, coeff_y: f64, geometry: GeomType) -> Result<Self, FormError> {
        check_planar("JacobianAdvection", geometry)?;
        Ok(Self {
            target: MatrixTarget::new(i, j),
            coeffs: [coeff_x, coeff_y],
            splines: Default::default(),
        })
    }

    pub fn with_splines(self, spline_x: SplineCoefficient, spline_y: SplineCoefficient) -> Self {
        Self {
            splines: [spline_x, spline_y],
            ..self
        }
    }

    pub fn with_area(mut self, area: Area) -> Self {
        self.target.area = area;
        self
    }
}

impl BilinearIntegrand for JacobianAdvection {
    const DOMAIN: Domain = Domain::Volume;

    fn target(&self) -> &MatrixTarget {
        &self.target
    }

    fn scale(&self) -> f64 {
        1.0
    }

    fn integrand<A: FormScalar>(&self, element: &ElementSample<A>, point: usize, u: FieldValue<A>, v: FieldValue<A>) -> A {
        let u_prev = element.u_ext(self.target.j).at(point);
        let [c_x, c_y] = self.coeffs.map(A::constant);
        let [s_x, s_y] = &self.splines;
        let x_term = s_x.evaluate_derivative(u_prev.val) * u.val * u_prev.dx + s_x.evaluate(u_prev.val) * u.dx;
        let y_term = s_y.evaluate_derivative(u_prev.val) * u.val * u_prev.dy + s_y.evaluate(u_prev.val) * u.dy;
        (c_x * x_term + c_y * y_term) * v.val
    }
}

/// Residual of the nonlinear advection term,
/// `sum_k c_k * s_k(u_prev) * d_k u_prev * v` with `u_prev` the previous iterate of component `i`.
///
/// Only defined for planar geometry.
#[derive(Debug, Clone)]
pub struct ResidualAdvection {
    target: VectorTarget,
    coeffs: [f64; 2],
    splines: [SplineCoefficient; 2],
}

impl ResidualAdvection {
    pub fn try_new(i: usize, coeff_x: f64, coeff_y: f64, geometry: GeomType) -> Result<Self, FormError> {
        check_planar("ResidualAdvection", geometry)?;
        Ok(Self {
            target: VectorTarget::new(i),
            coeffs: [coeff_x, coeff_y],
            splines: Default::default(),
        })
    }

    pub fn with_splines(self, spline_x: SplineCoefficient, spline_y: SplineCoefficient) -> Self {
        Self {
            splines: [spline_x, spline_y],
            ..self
        }
    }

    pub fn with_area(mut self, area: Area) -> Self {
        self.target.area = area;
        self
    }
}

impl LinearIntegrand for ResidualAdvection {
    const DOMAIN: Domain = Domain::Volume;

    fn target(&self) -> &VectorTarget {
        &self.target
    }

    fn scale(&self) -> f64 {
        1.0
    }

    fn integrand<A: FormScalar>(&self, element: &ElementSample<A>, point: usize, v: FieldValue<A>) -> A {
        let u_prev = element.u_ext(self.target.i).at(point);
        let [c_x, c_y] = self.coeffs.map(A::constant);
        let [s_x, s_y] = &self.splines;
        (c_x * s_x.evaluate(u_prev.val) * u_prev.dx + c_y * s_y.evaluate(u_prev.val) * u_prev.dy) * v.val
    }
}
