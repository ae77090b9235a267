//! Collections of forms describing a complete (possibly nonlinear) problem.
use crate::form::{
    GeomType, JacobianDiffusion, MatrixForm, MatrixFormVol, MultiComponentVectorForm, ResidualDiffusion, ResidualVol,
    Symmetry, VectorForm, VectorFormVol,
};
use crate::function::{FunctionCoefficient, SplineCoefficient};

/// The Jacobian forms and residual forms of a system with `num_components` solution components.
///
/// Residual forms are written such that the discrete problem reads `F(u) = 0`, and matrix forms
/// are the derivatives of the residual forms with respect to the solution.
#[derive(Debug, Clone)]
pub struct WeakForm {
    num_components: usize,
    matrix_forms: Vec<Box<dyn MatrixForm>>,
    vector_forms: Vec<Box<dyn VectorForm>>,
    multi_component_forms: Vec<Box<dyn MultiComponentVectorForm>>,
}

impl WeakForm {
    pub fn new(num_components: usize) -> Self {
        Self {
            num_components,
            matrix_forms: Vec::new(),
            vector_forms: Vec::new(),
            multi_component_forms: Vec::new(),
        }
    }

    pub fn num_components(&self) -> usize {
        self.num_components
    }

    fn check_component(&self, component: usize) {
        assert!(
            component < self.num_components,
            "Form targets component {component}, but the weak form only has {} components",
            self.num_components
        );
    }

    /// # Panics
    ///
    /// Panics if the block indices of the form exceed the number of components.
    pub fn add_matrix_form(&mut self, form: impl MatrixForm + 'static) {
        self.add_boxed_matrix_form(Box::new(form));
    }

    pub fn add_boxed_matrix_form(&mut self, form: Box<dyn MatrixForm>) {
        self.check_component(form.i());
        self.check_component(form.j());
        self.matrix_forms.push(form);
    }

    /// # Panics
    ///
    /// Panics if the block index of the form exceeds the number of components.
    pub fn add_vector_form(&mut self, form: impl VectorForm + 'static) {
        self.add_boxed_vector_form(Box::new(form));
    }

    pub fn add_boxed_vector_form(&mut self, form: Box<dyn VectorForm>) {
        self.check_component(form.i());
        self.vector_forms.push(form);
    }

    pub fn add_multi_component_vector_form(&mut self, form: impl MultiComponentVectorForm + 'static) {
        for &component in form.components() {
            self.check_component(component);
        }
        self.multi_component_forms.push(Box::new(form));
    }

    pub fn with_matrix_form(mut self, form: impl MatrixForm + 'static) -> Self {
        self.add_matrix_form(form);
        self
    }

    pub fn with_vector_form(mut self, form: impl VectorForm + 'static) -> Self {
        self.add_vector_form(form);
        self
    }

    pub fn with_multi_component_vector_form(mut self, form: impl MultiComponentVectorForm + 'static) -> Self {
        self.add_multi_component_vector_form(form);
        self
    }

    pub fn matrix_forms(&self) -> impl Iterator<Item = &dyn MatrixForm> {
        self.matrix_forms.iter().map(AsRef::as_ref)
    }

    pub fn vector_forms(&self) -> impl Iterator<Item = &dyn VectorForm> {
        self.vector_forms.iter().map(AsRef::as_ref)
    }

    pub fn multi_component_vector_forms(&self) -> impl Iterator<Item = &dyn MultiComponentVectorForm> {
        self.multi_component_forms.iter().map(AsRef::as_ref)
    }

    /// The nonlinear Laplace problem `-div(c * s(u) * grad u) = 0`.
    pub fn laplace(parameters: DiffusionParameters) -> Self {
        let DiffusionParameters {
            coeff,
            spline,
            geometry,
        } = parameters;
        Self::new(1)
            .with_matrix_form(
                JacobianDiffusion::new(0, 0)
                    .with_const_coeff(coeff)
                    .with_spline(spline.clone())
                    .with_symmetry(Symmetry::Symmetric)
                    .with_geometry(geometry),
            )
            .with_vector_form(
                ResidualDiffusion::new(0)
                    .with_const_coeff(coeff)
                    .with_spline(spline)
                    .with_geometry(geometry),
            )
    }

    /// The nonlinear Poisson problem `-div(c * s(u) * grad u) = f`.
    pub fn poisson(rhs: FunctionCoefficient, parameters: DiffusionParameters) -> Self {
        let DiffusionParameters {
            coeff,
            spline,
            geometry,
        } = parameters;
        Self::new(1)
            .with_matrix_form(
                JacobianDiffusion::new(0, 0)
                    .with_const_coeff(coeff)
                    .with_spline(spline.clone())
                    .with_geometry(geometry),
            )
            .with_vector_form(
                ResidualDiffusion::new(0)
                    .with_const_coeff(coeff)
                    .with_spline(spline)
                    .with_geometry(geometry),
            )
            .with_vector_form(
                VectorFormVol::new(0)
                    .with_const_coeff(-1.0)
                    .with_function(rhs)
                    .with_geometry(geometry),
            )
    }

    /// The L2 projection of `function`, i.e. `u = f` in the weak sense.
    pub fn l2_projection(function: FunctionCoefficient) -> Self {
        Self::new(1)
            .with_matrix_form(MatrixFormVol::new(0, 0).with_symmetry(Symmetry::Symmetric))
            .with_vector_form(ResidualVol::new(0))
            .with_vector_form(VectorFormVol::new(0).with_const_coeff(-1.0).with_function(function))
    }
}

/// The diffusion coefficient `c * s(u)` shared by [`WeakForm::laplace`] and
/// [`WeakForm::poisson`].
#[derive(Debug, Clone)]
pub struct DiffusionParameters {
    pub coeff: f64,
    pub spline: SplineCoefficient,
    pub geometry: GeomType,
}

impl Default for DiffusionParameters {
    fn default() -> Self {
        Self {
            coeff: 1.0,
            spline: SplineCoefficient::Unit,
            geometry: GeomType::Planar,
        }
    }
}

impl DiffusionParameters {
    pub fn with_const_coeff(self, coeff: f64) -> Self {
        Self { coeff, ..self }
    }

    pub fn with_spline(self, spline: SplineCoefficient) -> Self {
        Self { spline, ..self }
    }

    pub fn with_geometry(self, geometry: GeomType) -> Self {
        Self { geometry, ..self }
    }
}
