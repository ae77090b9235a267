use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{DMatrix, DVector, DVectorView, DVectorViewMut};
use weakforms_optimize::calculus::{approximate_derivative_fd, approximate_jacobian_fd};

#[test]
fn approximate_derivative_of_cubic() {
    let f = |x: f64| x * x * x - 2.0 * x;
    let df = approximate_derivative_fd(f, 2.0, 1e-5);
    assert_scalar_eq!(df, 10.0, comp = abs, tol = 1e-8);
}

#[test]
fn approximate_jacobian_simple_function() {
    let f = |x: DVectorView<f64>, mut out: DVectorViewMut<f64>| {
        let x1 = x[0];
        let x2 = x[1];
        out[0] = x1 * x2 + 3.0;
        out[1] = x1 * x1 + x2 * x2 + x1 + 5.0;
        out[2] = x2;
    };

    let mut x = DVector::from_column_slice(&[3.0, 4.0]);
    let j = approximate_jacobian_fd(3, f, &mut x, 1e-6);

    // J = [   x2           x1 ]
    //     [ 2*x1 + 1     2*x2 ]
    //     [   0            1  ]
    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(3, 2,
                                           &[4.0, 3.0,
                                             7.0, 8.0,
                                             0.0, 1.0]);

    assert_matrix_eq!(j, expected, comp = abs, tol = 1e-6);
    // The evaluation point is restored
    assert_eq!(x, DVector::from_column_slice(&[3.0, 4.0]));
}
