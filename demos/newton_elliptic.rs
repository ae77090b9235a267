//! Solves the nonlinear elliptic problem
//!
//!   -div(lambda(u) grad u) = f,   lambda(u) = 1 + u^4,
//!
//! on the unit square with homogeneous Dirichlet conditions, using Newton's method started from
//! the projection of a constant initial condition.
use weakforms::assembly::{project_l2, DirichletBoundary, DiscreteProblem};
use weakforms::form::Area;
use weakforms::function::{ConstantFunction, FunctionCoefficient, SplineCoefficient};
use weakforms::mesh::create_unit_square_uniform_tri_mesh_2d;
use weakforms::optimize::newton::{DenseLuSolver, NewtonDriver, NewtonSettings};
use weakforms::spline::AnalyticSpline;
use weakforms::weakform::{DiffusionParameters, WeakForm};

const INIT_COND_CONST: f64 = 3.0;
const NEWTON_TOL: f64 = 1e-6;
const NEWTON_MAX_ITER: usize = 100;

fn main() -> eyre::Result<()> {
    let mesh = create_unit_square_uniform_tri_mesh_2d(8);

    let lambda = AnalyticSpline::new(4, |u| 1.0 + u.powi(4), |u| 4.0 * u.powi(3));
    let parameters = DiffusionParameters::default().with_spline(SplineCoefficient::owned(lambda));
    let rhs = FunctionCoefficient::owned(ConstantFunction(1.0));
    let weak_form = WeakForm::poisson(rhs, parameters);

    let mut problem = DiscreteProblem::new(&mesh, &weak_form)?.with_dirichlet(DirichletBoundary::zero(0, Area::Any));
    println!("ndof: {}", problem.ndof());

    let initial = project_l2(&mesh, FunctionCoefficient::owned(ConstantFunction(INIT_COND_CONST)))?;

    let settings = NewtonSettings {
        max_iterations: NEWTON_MAX_ITER,
        tolerance: NEWTON_TOL,
    };
    let mut driver = NewtonDriver::new(settings);
    let result = driver.solve(&mut problem, &mut DenseLuSolver, initial)?;

    println!(
        "Newton converged in {} iterations, residual norm {:e} ({:?})",
        result.iterations,
        result.residual_norm,
        driver.state()
    );
    println!("max(u) = {}", result.solution.max());
    Ok(())
}
