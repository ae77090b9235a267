use log::{debug, info};
use nalgebra::{DMatrix, DVector, DVectorView, DVectorViewMut, RealField, Scalar};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::fmt::Display;

/// Error type reported by the collaborators of the Newton driver.
pub type CollaboratorError = Box<dyn Error + Send + Sync>;

/// A nonlinear system `F(x) = 0` that can assemble its residual and Jacobian at a given iterate.
pub trait JacobianSystem<T: Scalar> {
    /// Storage used for the Jacobian matrix. Opaque to the driver, it is only handed to the
    /// linear solver.
    type Jacobian;

    /// The number of unknowns.
    fn dimension(&self) -> usize;

    /// Assembles the residual `F(x)` into `residual` and returns the Jacobian `J(x)`.
    fn assemble(&mut self, x: DVectorView<T>, residual: DVectorViewMut<T>) -> Result<Self::Jacobian, CollaboratorError>;
}

/// Solves the linear system `J * solution = rhs`.
pub trait LinearSolver<T: Scalar, J> {
    fn solve(&mut self, jacobian: &J, rhs: DVectorView<T>, solution: DVectorViewMut<T>) -> Result<(), CollaboratorError>;
}

impl<T, J, F> LinearSolver<T, J> for F
where
    T: Scalar,
    F: FnMut(&J, DVectorView<T>, DVectorViewMut<T>) -> Result<(), CollaboratorError>,
{
    fn solve(&mut self, jacobian: &J, rhs: DVectorView<T>, solution: DVectorViewMut<T>) -> Result<(), CollaboratorError> {
        self(jacobian, rhs, solution)
    }
}

/// Direct solver for dense Jacobians based on the LU decomposition in `nalgebra`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenseLuSolver;

impl<T> LinearSolver<T, DMatrix<T>> for DenseLuSolver
where
    T: RealField + Copy,
{
    fn solve(
        &mut self,
        jacobian: &DMatrix<T>,
        rhs: DVectorView<T>,
        mut solution: DVectorViewMut<T>,
    ) -> Result<(), CollaboratorError> {
        if !jacobian.is_square() || jacobian.nrows() != rhs.len() {
            return Err(Box::from(format!(
                "Jacobian of size {}x{} is incompatible with right-hand side of length {}",
                jacobian.nrows(),
                jacobian.ncols(),
                rhs.len()
            )));
        }
        let x = jacobian
            .clone()
            .lu()
            .solve(&rhs)
            .ok_or_else(|| CollaboratorError::from("Jacobian matrix is singular"))?;
        solution.copy_from(&x);
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewtonSettings<T> {
    /// The maximum number of corrections applied before giving up.
    pub max_iterations: usize,
    /// The iteration has converged once `|F(x)|_2 < tolerance`.
    pub tolerance: T,
}

impl<T: RealField> Default for NewtonSettings<T> {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: nalgebra::convert(1e-6),
        }
    }
}

/// The states of the Newton iteration.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NewtonState {
    Initializing,
    Assembling,
    SolvingLinearSystem,
    Converged,
    MaxIterExceeded,
    LinearSolveFailed,
    AssemblyFailed,
}

impl NewtonState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NewtonState::Converged
                | NewtonState::MaxIterExceeded
                | NewtonState::LinearSolveFailed
                | NewtonState::AssemblyFailed
        )
    }
}

#[derive(Debug, Clone)]
pub struct NewtonResult<T>
where
    T: Scalar,
{
    pub solution: DVector<T>,
    /// The number of corrections applied.
    pub iterations: usize,
    pub residual_norm: T,
}

#[derive(Debug)]
pub enum NewtonError {
    /// The residual was still above the tolerance after the maximum number of corrections.
    MaximumIterationsReached(usize),
    /// The linear solver failed to solve the Jacobian system.
    LinearSolveFailed { iteration: usize, source: CollaboratorError },
    /// The Jacobian or residual could not be assembled.
    AssemblyFailed { iteration: usize, source: CollaboratorError },
}

impl NewtonError {
    /// The terminal state the driver ended in.
    pub fn state(&self) -> NewtonState {
        match self {
            NewtonError::MaximumIterationsReached(_) => NewtonState::MaxIterExceeded,
            NewtonError::LinearSolveFailed { .. } => NewtonState::LinearSolveFailed,
            NewtonError::AssemblyFailed { .. } => NewtonState::AssemblyFailed,
        }
    }
}

impl Display for NewtonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            NewtonError::MaximumIterationsReached(maxit) => {
                write!(f, "Newton method did not converge within {} iterations.", maxit)
            }
            NewtonError::LinearSolveFailed { iteration, source } => {
                write!(f, "Matrix solver failed in Newton iteration {}. Error: {}", iteration, source)
            }
            NewtonError::AssemblyFailed { iteration, source } => {
                write!(f, "Assembly failed in Newton iteration {}. Error: {}", iteration, source)
            }
        }
    }
}

impl Error for NewtonError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            NewtonError::MaximumIterationsReached(_) => None,
            NewtonError::LinearSolveFailed { source, .. } | NewtonError::AssemblyFailed { source, .. } => {
                Some(source.as_ref() as &(dyn Error + 'static))
            }
        }
    }
}

/// Newton-Raphson driver for `F(x) = 0`.
///
/// Each iteration assembles `J(x)` and `F(x)`, solves `J dx = -F` and applies `x <- x + dx`.
/// The iteration stops successfully as soon as `|F(x)|_2 < tolerance`. It fails once
/// `max_iterations` corrections have been applied without convergence, so a residual below the
/// tolerance has to be reached within `max_iterations - 1` corrections. It also fails if the
/// assembly or the linear solver fails.
#[derive(Debug, Clone)]
pub struct NewtonDriver<T> {
    settings: NewtonSettings<T>,
    state: NewtonState,
    iterations: usize,
}

impl<T> NewtonDriver<T>
where
    T: RealField + Copy,
{
    pub fn new(settings: NewtonSettings<T>) -> Self {
        Self {
            settings,
            state: NewtonState::Initializing,
            iterations: 0,
        }
    }

    pub fn settings(&self) -> &NewtonSettings<T> {
        &self.settings
    }

    /// The current state, or the terminal state of the last run.
    pub fn state(&self) -> NewtonState {
        self.state
    }

    /// The number of corrections applied so far in the current (or last) run.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    fn transition(&mut self, next: NewtonState) {
        debug!("Newton state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Runs the Newton iteration starting from the given initial coefficient vector.
    ///
    /// # Panics
    ///
    /// Panics if the length of `initial` differs from the dimension of the system.
    pub fn solve<S, L>(
        &mut self,
        system: &mut S,
        solver: &mut L,
        initial: DVector<T>,
    ) -> Result<NewtonResult<T>, NewtonError>
    where
        S: JacobianSystem<T>,
        L: LinearSolver<T, S::Jacobian>,
    {
        self.transition(NewtonState::Initializing);
        self.iterations = 0;

        let n = system.dimension();
        assert_eq!(initial.len(), n, "Initial coefficient vector must match system dimension");

        let mut x = initial;
        let mut residual = DVector::zeros(n);
        let mut correction = DVector::zeros(n);

        loop {
            self.transition(NewtonState::Assembling);
            let jacobian = match system.assemble(DVectorView::from(&x), DVectorViewMut::from(&mut residual)) {
                Ok(jacobian) => jacobian,
                Err(source) => {
                    self.transition(NewtonState::AssemblyFailed);
                    return Err(NewtonError::AssemblyFailed {
                        iteration: self.iterations,
                        source,
                    });
                }
            };

            // The correction solves J dx = -F
            residual.neg_mut();
            let residual_norm = residual.norm();
            info!(
                "Newton iter {}, ndof {}, res. l2 norm {}",
                self.iterations, n, residual_norm
            );

            if residual_norm < self.settings.tolerance {
                self.transition(NewtonState::Converged);
                return Ok(NewtonResult {
                    solution: x,
                    iterations: self.iterations,
                    residual_norm,
                });
            }

            self.transition(NewtonState::SolvingLinearSystem);
            correction.fill(T::zero());
            let solve_result = solver.solve(
                &jacobian,
                DVectorView::from(&residual),
                DVectorViewMut::from(&mut correction),
            );
            if let Err(source) = solve_result {
                self.transition(NewtonState::LinearSolveFailed);
                return Err(NewtonError::LinearSolveFailed {
                    iteration: self.iterations,
                    source,
                });
            }

            x += &correction;
            self.iterations += 1;

            // The residual after the last permitted correction is never assembled
            if self.iterations >= self.settings.max_iterations {
                self.transition(NewtonState::MaxIterExceeded);
                return Err(NewtonError::MaximumIterationsReached(self.iterations));
            }
        }
    }
}

/// Attempts to solve the nonlinear equation `F(x) = 0` starting from `initial`.
///
/// Convenience wrapper around [`NewtonDriver`] for callers that do not need to inspect the
/// driver state afterwards.
pub fn newton<T, S, L>(
    system: &mut S,
    solver: &mut L,
    initial: DVector<T>,
    settings: NewtonSettings<T>,
) -> Result<NewtonResult<T>, NewtonError>
where
    T: RealField + Copy,
    S: JacobianSystem<T>,
    L: LinearSolver<T, S::Jacobian>,
{
    NewtonDriver::new(settings).solve(system, solver, initial)
}
