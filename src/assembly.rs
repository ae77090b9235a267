//! Dense reference assembly of weak forms with linear triangle elements.
use crate::form::{Area, Domain, ElementSample, FieldSample, MatrixForm, MultiComponentVectorForm, Symmetry, VectorForm};
use crate::function::FunctionCoefficient;
use crate::mesh::TriangleMesh;
use crate::optimize::newton::{CollaboratorError, DenseLuSolver, JacobianSystem, LinearSolver};
use crate::order::Order;
use crate::quadrature::{clamp_strength, QuadraturePair1d, QuadraturePair2d, QuadratureTable, MAX_QUADRATURE_STRENGTH};
use crate::weakform::WeakForm;
use eyre::{ensure, eyre};
use log::debug;
use nalgebra::{DMatrix, DVector, DVectorView, DVectorViewMut, Matrix2, Point2, Vector2};
use rayon::iter::{IntoParallelIterator, IntoParallelRefIterator, ParallelIterator};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Linear Lagrange triangle with straight edges.
#[derive(Debug, Clone, PartialEq)]
pub struct P1Element {
    vertices: [Point2<f64>; 3],
    jacobian: Matrix2<f64>,
    inverse_jacobian: Matrix2<f64>,
}

impl P1Element {
    pub fn from_vertices(vertices: [Point2<f64>; 3]) -> eyre::Result<Self> {
        let [a, b, c] = vertices;
        let jacobian = Matrix2::from_columns(&[b - a, c - a]);
        let det = jacobian.determinant();
        let scale = (b - a).norm() * (c - a).norm();
        ensure!(
            det.abs() > 1e-14 * scale && scale > 0.0,
            "Degenerate triangle with vertices {:?}",
            vertices
        );
        let inverse_jacobian = jacobian
            .try_inverse()
            .ok_or_else(|| eyre!("Triangle map is not invertible"))?;
        Ok(Self {
            vertices,
            jacobian,
            inverse_jacobian,
        })
    }

    pub fn vertices(&self) -> &[Point2<f64>; 3] {
        &self.vertices
    }

    pub fn reference_jacobian(&self) -> &Matrix2<f64> {
        &self.jacobian
    }

    pub fn area(&self) -> f64 {
        0.5 * self.jacobian.determinant().abs()
    }

    pub fn map_reference_coords(&self, xi: &Point2<f64>) -> Point2<f64> {
        self.vertices[0] + self.jacobian * xi.coords
    }

    pub fn map_physical_coords(&self, x: &Point2<f64>) -> Point2<f64> {
        Point2::from(self.inverse_jacobian * (x - self.vertices[0]))
    }

    /// Values of the three basis functions at the given reference coordinates.
    pub fn basis_values(xi: &Point2<f64>) -> [f64; 3] {
        [1.0 - xi.x - xi.y, xi.x, xi.y]
    }

    /// Physical gradients of the three basis functions, which are constant on the element.
    pub fn basis_gradients(&self) -> [Vector2<f64>; 3] {
        let reference = [Vector2::new(-1.0, -1.0), Vector2::new(1.0, 0.0), Vector2::new(0.0, 1.0)];
        reference.map(|g| self.inverse_jacobian.transpose() * g)
    }

    /// Maps a reference triangle rule to physical weights and points.
    pub fn volume_quadrature(&self, rule: &QuadraturePair2d) -> (Vec<f64>, Vec<Point2<f64>>) {
        let det = self.jacobian.determinant().abs();
        let (weights, points) = rule;
        let weights = weights.iter().map(|w| w * det).collect();
        let points = points.iter().map(|xi| self.map_reference_coords(xi)).collect();
        (weights, points)
    }

    /// Maps a rule on `[-1, 1]` to the straight edge between the physical points `a` and `b`.
    pub fn edge_quadrature(a: &Point2<f64>, b: &Point2<f64>, rule: &QuadraturePair1d) -> (Vec<f64>, Vec<Point2<f64>>) {
        let half_length = 0.5 * (b - a).norm();
        let (weights, points) = rule;
        let weights = weights.iter().map(|w| w * half_length).collect();
        let points = points
            .iter()
            .map(|s| a + (b - a) * (0.5 * (s + 1.0)))
            .collect();
        (weights, points)
    }

    /// Samples the three basis functions at the given physical points.
    pub fn basis_samples(&self, points: &[Point2<f64>]) -> [FieldSample<f64>; 3] {
        let gradients = self.basis_gradients();
        let values: Vec<[f64; 3]> = points
            .iter()
            .map(|x| Self::basis_values(&self.map_physical_coords(x)))
            .collect();
        [0, 1, 2].map(|k| {
            FieldSample::new(
                values.iter().map(|phi| phi[k]).collect(),
                vec![gradients[k]; points.len()],
            )
        })
    }

    /// Samples the field with the given nodal coefficients at the given physical points.
    pub fn interpolate(&self, coefficients: &[f64; 3], points: &[Point2<f64>]) -> FieldSample<f64> {
        let gradient = self
            .basis_gradients()
            .iter()
            .zip(coefficients)
            .map(|(g, u)| g * *u)
            .sum::<Vector2<f64>>();
        let values: Vec<f64> = points
            .iter()
            .map(|x| {
                let phi = Self::basis_values(&self.map_physical_coords(x));
                phi.iter().zip(coefficients).map(|(p, u)| p * u).sum::<f64>()
            })
            .collect();
        FieldSample::new(values, vec![gradient; points.len()])
    }

    /// The order of any field in the space: linear values, constant gradients.
    pub fn order_sample() -> FieldSample<Order> {
        FieldSample::new(vec![Order::new(1)], vec![Vector2::new(Order::new(0), Order::new(0))])
    }
}

/// A Dirichlet condition prescribing a constant value on marked boundary edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirichletBoundary {
    pub component: usize,
    pub area: Area,
    pub value: f64,
}

impl DirichletBoundary {
    pub fn zero(component: usize, area: Area) -> Self {
        Self::constant(component, area, 0.0)
    }

    pub fn constant(component: usize, area: Area, value: f64) -> Self {
        Self { component, area, value }
    }
}

/// Quadrature data and field samples on one element or boundary edge.
struct CellSample {
    weights: Vec<f64>,
    points: Vec<Point2<f64>>,
    basis: [FieldSample<f64>; 3],
    u_ext: Vec<FieldSample<f64>>,
}

impl CellSample {
    fn element_sample(&self) -> ElementSample<f64> {
        ElementSample::new(&self.weights, &self.points, &self.u_ext)
    }
}

/// Element matrix and vector, with local dof `3 * component + local_vertex`.
struct LocalSystem {
    element: usize,
    matrix: DMatrix<f64>,
    vector: DVector<f64>,
}

/// Polynomial orders of the forms of a weak form, in the order they were added.
#[derive(Debug, Clone, Default)]
struct FormOrders {
    matrix: Vec<usize>,
    vector: Vec<usize>,
    multi: Vec<usize>,
}

impl FormOrders {
    fn compute(weak_form: &WeakForm) -> Self {
        let sample = P1Element::order_sample();
        let u_ext = vec![sample.clone(); weak_form.num_components()];
        let weights = [1.0];
        let points = [Point2::new(Order::new(1), Order::new(1))];
        let element = ElementSample::new(&weights, &points, &u_ext);

        let degree = |order: Order| order.degree() as usize;
        Self {
            matrix: weak_form
                .matrix_forms()
                .map(|form| degree(form.order(&element, &sample, &sample)))
                .collect(),
            vector: weak_form
                .vector_forms()
                .map(|form| degree(form.order(&element, &sample)))
                .collect(),
            multi: weak_form
                .multi_component_vector_forms()
                .map(|form| degree(form.order(&element, &sample)))
                .collect(),
        }
    }

    fn clamped(&self, max_strength: usize) -> Self {
        let clamp = |orders: &[usize]| {
            orders
                .iter()
                .map(|&order| clamp_strength(order, max_strength))
                .collect()
        };
        Self {
            matrix: clamp(&self.matrix),
            vector: clamp(&self.vector),
            multi: clamp(&self.multi),
        }
    }
}

/// The nonlinear algebraic system obtained by discretizing a weak form with linear elements.
///
/// Component `c` at vertex `v` has the global dof `c * num_vertices + v`.
#[derive(Debug)]
pub struct DiscreteProblem<'a> {
    mesh: &'a TriangleMesh,
    weak_form: &'a WeakForm,
    elements: Vec<P1Element>,
    dirichlet: Vec<DirichletBoundary>,
    orders: FormOrders,
    quadrature: QuadratureTable,
}

impl<'a> DiscreteProblem<'a> {
    pub fn new(mesh: &'a TriangleMesh, weak_form: &'a WeakForm) -> eyre::Result<Self> {
        let elements = (0..mesh.num_elements())
            .map(|e| P1Element::from_vertices(mesh.element_vertices(e)))
            .collect::<eyre::Result<Vec<_>>>()?;
        Ok(Self {
            mesh,
            weak_form,
            elements,
            dirichlet: Vec::new(),
            orders: FormOrders::compute(weak_form),
            quadrature: QuadratureTable::new(MAX_QUADRATURE_STRENGTH),
        })
    }

    /// # Panics
    ///
    /// Panics if the condition refers to a component the weak form does not have.
    pub fn with_dirichlet(mut self, condition: DirichletBoundary) -> Self {
        assert!(
            condition.component < self.weak_form.num_components(),
            "Dirichlet condition for nonexistent component {}",
            condition.component
        );
        self.dirichlet.push(condition);
        self
    }

    pub fn with_max_quadrature_strength(self, max_strength: usize) -> Self {
        Self {
            quadrature: QuadratureTable::new(max_strength),
            ..self
        }
    }

    pub fn num_components(&self) -> usize {
        self.weak_form.num_components()
    }

    pub fn ndof(&self) -> usize {
        self.num_components() * self.mesh.vertices().len()
    }

    fn global_dof(&self, component: usize, vertex: usize) -> usize {
        component * self.mesh.vertices().len() + vertex
    }

    /// Dofs constrained by Dirichlet conditions and their values, sorted by dof. Later conditions
    /// take precedence.
    pub fn dirichlet_dofs(&self) -> Vec<(usize, f64)> {
        let mut values = FxHashMap::default();
        for condition in &self.dirichlet {
            for edge in self.mesh.boundary_edges() {
                if condition.area.contains(&edge.marker) {
                    for &v in &edge.vertices {
                        values.insert(self.global_dof(condition.component, v), condition.value);
                    }
                }
            }
        }
        let mut dofs: Vec<_> = values.into_iter().collect();
        dofs.sort_unstable_by_key(|(dof, _)| *dof);
        dofs
    }

    /// Assembles the Jacobian and residual at the coefficient vector `x`.
    pub fn assemble_system(&self, x: DVectorView<f64>) -> eyre::Result<(DMatrix<f64>, DVector<f64>)> {
        let ndof = self.ndof();
        ensure!(
            x.len() == ndof,
            "Coefficient vector has length {}, but the problem has {} dofs",
            x.len(),
            ndof
        );
        let coefficients: Vec<f64> = x.iter().copied().collect();
        let strengths = self.orders.clamped(self.quadrature.max_strength());

        let volume: Vec<LocalSystem> = (0..self.elements.len())
            .into_par_iter()
            .map(|e| self.assemble_element(e, &coefficients, &strengths))
            .collect();
        let surface: Vec<LocalSystem> = self
            .mesh
            .boundary_edges()
            .par_iter()
            .map(|edge| {
                let [a, b] = edge.vertices;
                self.assemble_edge(edge.element, [a, b], &edge.marker, &coefficients, &strengths)
            })
            .collect();

        let mut jacobian = DMatrix::zeros(ndof, ndof);
        let mut residual = DVector::zeros(ndof);
        for local in volume.iter().chain(&surface) {
            let dofs = self.local_dofs(local.element);
            for (li, &gi) in dofs.iter().enumerate() {
                residual[gi] += local.vector[li];
                for (lj, &gj) in dofs.iter().enumerate() {
                    jacobian[(gi, gj)] += local.matrix[(li, lj)];
                }
            }
        }

        let dirichlet = self.dirichlet_dofs();
        for &(dof, value) in &dirichlet {
            jacobian.row_mut(dof).fill(0.0);
            jacobian[(dof, dof)] = 1.0;
            residual[dof] = coefficients[dof] - value;
        }

        debug!(
            "Assembled {} elements, {} boundary edges, {} Dirichlet dofs, ndof {}",
            volume.len(),
            surface.len(),
            dirichlet.len(),
            ndof
        );
        Ok((jacobian, residual))
    }

    fn local_dofs(&self, element: usize) -> Vec<usize> {
        let connectivity = &self.mesh.connectivity()[element];
        (0..self.num_components())
            .flat_map(|c| connectivity.iter().map(move |&v| (c, v)))
            .map(|(c, v)| self.global_dof(c, v))
            .collect()
    }

    fn local_coefficients(&self, element: usize, coefficients: &[f64]) -> Vec<[f64; 3]> {
        let connectivity = &self.mesh.connectivity()[element];
        (0..self.num_components())
            .map(|c| connectivity.map(|v| coefficients[self.global_dof(c, v)]))
            .collect()
    }

    fn cell_sample(&self, element: usize, quadrature: (Vec<f64>, Vec<Point2<f64>>), u_local: &[[f64; 3]]) -> CellSample {
        let p1 = &self.elements[element];
        let (weights, points) = quadrature;
        let basis = p1.basis_samples(&points);
        let u_ext = u_local
            .iter()
            .map(|coefficients| p1.interpolate(coefficients, &points))
            .collect();
        CellSample {
            weights,
            points,
            basis,
            u_ext,
        }
    }

    fn assemble_element(&self, element: usize, coefficients: &[f64], strengths: &FormOrders) -> LocalSystem {
        let u_local = self.local_coefficients(element, coefficients);
        let p1 = &self.elements[element];
        let marker = self.mesh.element_marker(element);
        self.assemble_cell(element, Domain::Volume, marker, strengths, |strength| {
            let quadrature = p1.volume_quadrature(self.quadrature.triangle(strength));
            self.cell_sample(element, quadrature, &u_local)
        })
    }

    fn assemble_edge(
        &self,
        element: usize,
        edge: [usize; 2],
        marker: &str,
        coefficients: &[f64],
        strengths: &FormOrders,
    ) -> LocalSystem {
        let u_local = self.local_coefficients(element, coefficients);
        let [a, b] = edge.map(|v| self.mesh.vertices()[v]);
        self.assemble_cell(element, Domain::Surface, marker, strengths, |strength| {
            let quadrature = P1Element::edge_quadrature(&a, &b, self.quadrature.segment(strength));
            self.cell_sample(element, quadrature, &u_local)
        })
    }

    /// Evaluates all forms of the given domain whose area contains `marker`.
    ///
    /// Field samples are created once per distinct quadrature strength.
    fn assemble_cell(
        &self,
        element: usize,
        domain: Domain,
        marker: &str,
        strengths: &FormOrders,
        make_cell: impl Fn(usize) -> CellSample,
    ) -> LocalSystem {
        let applies = |form_domain: Domain, area: &Area| form_domain == domain && area.contains(marker);
        let matrix_forms: Vec<(&dyn MatrixForm, usize)> = self
            .weak_form
            .matrix_forms()
            .zip(strengths.matrix.iter().copied())
            .filter(|(form, _)| applies(form.domain(), form.area()))
            .collect();
        let vector_forms: Vec<(&dyn VectorForm, usize)> = self
            .weak_form
            .vector_forms()
            .zip(strengths.vector.iter().copied())
            .filter(|(form, _)| applies(form.domain(), form.area()))
            .collect();
        let multi_forms: Vec<(&dyn MultiComponentVectorForm, usize)> = self
            .weak_form
            .multi_component_vector_forms()
            .zip(strengths.multi.iter().copied())
            .filter(|(form, _)| applies(form.domain(), form.area()))
            .collect();

        let mut cells = FxHashMap::default();
        let required = matrix_forms
            .iter()
            .map(|(_, s)| *s)
            .chain(vector_forms.iter().map(|(_, s)| *s))
            .chain(multi_forms.iter().map(|(_, s)| *s));
        for strength in required {
            cells
                .entry(strength)
                .or_insert_with(|| make_cell(strength));
        }

        let n = 3 * self.num_components();
        let mut local = LocalSystem {
            element,
            matrix: DMatrix::zeros(n, n),
            vector: DVector::zeros(n),
        };

        for (form, strength) in matrix_forms {
            add_matrix_form(&mut local.matrix, form, &cells[&strength]);
        }

        for (form, strength) in vector_forms {
            let sample = &cells[&strength];
            let element_sample = sample.element_sample();
            for (a, v) in sample.basis.iter().enumerate() {
                local.vector[3 * form.i() + a] += form.value(&element_sample, v);
            }
        }

        for (form, strength) in multi_forms {
            add_multi_component_form(&mut local.vector, form, &cells[&strength]);
        }

        local
    }
}

fn add_matrix_form(matrix: &mut DMatrix<f64>, form: &dyn MatrixForm, sample: &CellSample) {
    let element_sample = sample.element_sample();
    let (i, j) = (form.i(), form.j());
    let mirror_sign = match form.symmetry() {
        Symmetry::NonSymmetric => None,
        Symmetry::Symmetric => Some(1.0),
        Symmetry::AntiSymmetric => Some(-1.0),
    };

    for (a, v) in sample.basis.iter().enumerate() {
        for (b, u) in sample.basis.iter().enumerate() {
            // Diagonal blocks of (anti)symmetric forms are evaluated on the upper triangle only
            if i == j && mirror_sign.is_some() && b < a {
                continue;
            }
            let value = form.value(&element_sample, u, v);
            matrix[(3 * i + a, 3 * j + b)] += value;
            if let Some(sign) = mirror_sign {
                if i != j || a != b {
                    matrix[(3 * j + b, 3 * i + a)] += sign * value;
                }
            }
        }
    }
}

fn add_multi_component_form(vector: &mut DVector<f64>, form: &dyn MultiComponentVectorForm, sample: &CellSample) {
    let element_sample = sample.element_sample();
    let mut result = vec![0.0; form.components().len()];
    for (a, v) in sample.basis.iter().enumerate() {
        form.value(&element_sample, v, &mut result);
        for (&component, value) in form.components().iter().zip(&result) {
            vector[3 * component + a] += value;
        }
    }
}

impl JacobianSystem<f64> for DiscreteProblem<'_> {
    type Jacobian = DMatrix<f64>;

    fn dimension(&self) -> usize {
        self.ndof()
    }

    fn assemble(&mut self, x: DVectorView<f64>, mut residual: DVectorViewMut<f64>) -> Result<DMatrix<f64>, CollaboratorError> {
        let (jacobian, r) = self.assemble_system(x)?;
        residual.copy_from(&r);
        Ok(jacobian)
    }
}

/// Computes the L2 projection of `function` onto the linear elements of the mesh.
///
/// Typically used for the initial coefficient vector of a Newton iteration.
pub fn project_l2(mesh: &TriangleMesh, function: FunctionCoefficient) -> eyre::Result<DVector<f64>> {
    let weak_form = WeakForm::l2_projection(function);
    let problem = DiscreteProblem::new(mesh, &weak_form)?;
    let zero = DVector::zeros(problem.ndof());
    let (mass, residual) = problem.assemble_system(DVectorView::from(&zero))?;

    // The system is linear, so a single correction from zero is exact
    let rhs = -residual;
    let mut projection = DVector::zeros(problem.ndof());
    DenseLuSolver
        .solve(&mass, DVectorView::from(&rhs), DVectorViewMut::from(&mut projection))
        .map_err(|err| eyre!("L2 projection failed: {}", err))?;
    Ok(projection)
}
