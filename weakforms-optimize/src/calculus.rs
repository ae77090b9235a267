use nalgebra::{DMatrix, DMatrixViewMut, DVector, DVectorView, DVectorViewMut, RealField};
use numeric_literals::replace_float_literals;

/// Approximates the derivative of the scalar function `f: R -> R` at `x` with central finite
/// differences of step size `h`.
#[replace_float_literals(T::from_f64(literal).unwrap())]
pub fn approximate_derivative_fd<T>(mut f: impl FnMut(T) -> T, x: T, h: T) -> T
where
    T: RealField + Copy,
{
    (f(x + h) - f(x - h)) / (2.0 * h)
}

/// Approximates the Jacobian of the function $f: \mathbb{R}^n \rightarrow \mathbb{R}^m$
/// with central finite differences.
///
/// The Jacobian matrix is the $m \times n$ matrix whose entries are given by
/// $$ J_{ij} := \pd{f_i}{x_j}.$$
///
/// The vector `x` is used as scratch space, but its content is restored before returning.
pub fn approximate_jacobian_fd<'a, T>(
    m: usize,
    f: impl FnMut(DVectorView<T>, DVectorViewMut<T>),
    x: impl Into<DVectorViewMut<'a, T>>,
    h: T,
) -> DMatrix<T>
where
    T: RealField + Copy,
{
    let x = x.into();
    let mut jacobian = DMatrix::zeros(m, x.len());
    approximate_jacobian_fd_into(DMatrixViewMut::from(&mut jacobian), f, x, h);
    jacobian
}

#[replace_float_literals(T::from_f64(literal).unwrap())]
fn approximate_jacobian_fd_into<T>(
    mut jacobian: DMatrixViewMut<T>,
    mut f: impl FnMut(DVectorView<T>, DVectorViewMut<T>),
    mut x: DVectorViewMut<T>,
    h: T,
) where
    T: RealField + Copy,
{
    let m = jacobian.nrows();
    assert_eq!(x.len(), jacobian.ncols());

    let mut f_plus = DVector::zeros(m);
    let mut f_minus = DVector::zeros(m);

    for j in 0..x.len() {
        let x_j = x[j];
        x[j] = x_j + h;
        f(DVectorView::from(&x), DVectorViewMut::from(&mut f_plus));
        x[j] = x_j - h;
        f(DVectorView::from(&x), DVectorViewMut::from(&mut f_minus));
        x[j] = x_j;

        let mut column = jacobian.column_mut(j);
        column.copy_from(&f_plus);
        column -= &f_minus;
        column /= 2.0 * h;
    }
}
