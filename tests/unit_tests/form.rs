use crate::unit_tests::{skewed_element, ElementData, OrderData};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{DMatrix, DVector, DVectorView, DVectorViewMut, Point2};
use proptest::prelude::*;
use weakforms::assembly::P1Element;
use weakforms::form::{
    integrate, Area, Domain, ElementSample, FieldSample, FormError, GeomType, JacobianAdvection, JacobianDiffusion,
    JacobianFormSurf, MatrixForm, MatrixFormSurf, MatrixFormVol, MultiComponentVectorForm, MultiComponentVectorFormSurf,
    ResidualAdvection, ResidualDiffusion, ResidualSurf, ResidualVol, Symmetry, VectorForm, VectorFormSurf,
    VectorFormVol,
};
use weakforms::function::{AnalyticFunction, ConstantFunction, FunctionCoefficient, SplineCoefficient};
use weakforms::optimize::calculus::approximate_jacobian_fd;
use weakforms::order::Order;
use weakforms::proptest::{geom_type, nodal_coefficients};
use weakforms::quadrature::{segment, MAX_QUADRATURE_STRENGTH};
use weakforms::spline::{AnalyticSpline, CubicSpline};

const FD_STRENGTH: usize = 10;

fn material_spline() -> CubicSpline {
    CubicSpline::natural(vec![-3.0, -1.0, 0.0, 1.5, 3.0], vec![2.0, 1.2, 1.0, 1.7, 3.1]).unwrap()
}

fn ones(n: usize) -> FieldSample<f64> {
    FieldSample::from_values(vec![1.0; n])
}

/// Element matrix of a form on component block `(0, 0)`, with rows indexed by test functions.
fn element_matrix(form: &dyn MatrixForm, data: &ElementData) -> DMatrix<f64> {
    let sample = data.sample();
    DMatrix::from_fn(3, 3, |a, b| form.value(&sample, &data.basis[b], &data.basis[a]))
}

/// Finite difference Jacobian of `residual` with respect to the nodal coefficients of component 0.
fn fd_jacobian(element: &P1Element, u: [f64; 3], residual: impl Fn(&ElementData, usize) -> f64) -> DMatrix<f64> {
    let mut x = DVector::from_column_slice(&u);
    approximate_jacobian_fd(
        3,
        |x: DVectorView<f64>, mut r: DVectorViewMut<f64>| {
            let data = ElementData::new(element, FD_STRENGTH, &[[x[0], x[1], x[2]]]);
            for a in 0..3 {
                r[a] = residual(&data, a);
            }
        },
        &mut x,
        1e-6,
    )
}

#[test]
fn area_contains_markers() {
    assert!(Area::Any.contains("anything"));
    let area = Area::markers(["left", "right"]);
    assert!(area.contains("left"));
    assert!(area.contains("right"));
    assert!(!area.contains("top"));
    assert_eq!(Area::marker("top"), Area::Markers(vec!["top".to_string()]));
}

#[test]
fn geometry_factors() {
    let point = Point2::new(2.0, 3.0);
    assert_eq!(GeomType::Planar.factor(&point), 1.0);
    assert_eq!(GeomType::AxisymX.factor(&point), 3.0);
    assert_eq!(GeomType::AxisymY.factor(&point), 2.0);

    let orders = Point2::new(Order::new(1), Order::new(1));
    assert_eq!(GeomType::Planar.factor(&orders), Order::new(0));
    assert_eq!(GeomType::AxisymX.factor(&orders), Order::new(1));
}

#[test]
fn builders_are_reflected_by_form_accessors() {
    let form = MatrixFormVol::new(1, 0)
        .with_area(Area::marker("core"))
        .with_symmetry(Symmetry::AntiSymmetric);
    assert_eq!(form.i(), 1);
    assert_eq!(form.j(), 0);
    assert_eq!(form.area(), &Area::marker("core"));
    assert_eq!(form.symmetry(), Symmetry::AntiSymmetric);
    assert_eq!(form.domain(), Domain::Volume);

    assert_eq!(JacobianFormSurf::new(0, 0).domain(), Domain::Surface);
    assert_eq!(VectorFormSurf::new(2).i(), 2);
    assert_eq!(VectorForm::domain(&VectorFormSurf::new(2)), Domain::Surface);
    assert_eq!(VectorForm::domain(&ResidualVol::new(0)), Domain::Volume);
}

#[test]
fn mass_form_with_unit_fields_sums_weights() {
    let element = skewed_element();
    let data = ElementData::new(&element, 2, &[]);
    let n = data.weights.len();
    let form = MatrixFormVol::new(0, 0).with_const_coeff(2.0);
    let value = form.value(&data.sample(), &ones(n), &ones(n));
    let weight_sum: f64 = data.weights.iter().sum();
    assert_scalar_eq!(value, 2.0 * weight_sum, comp = abs, tol = 1e-14);
    assert_scalar_eq!(weight_sum, element.area(), comp = abs, tol = 1e-14);
}

#[test]
fn geometry_factor_enters_volume_integrals() {
    let element = skewed_element();
    let data = ElementData::new(&element, 4, &[]);
    let n = data.weights.len();
    let [a, b, c] = *element.vertices();
    let centroid = Point2::from((a.coords + b.coords + c.coords) / 3.0);

    let integral = |geometry| VectorFormVol::new(0).with_geometry(geometry).value(&data.sample(), &ones(n));
    assert_scalar_eq!(integral(GeomType::Planar), element.area(), comp = abs, tol = 1e-13);
    assert_scalar_eq!(integral(GeomType::AxisymX), element.area() * centroid.y, comp = abs, tol = 1e-13);
    assert_scalar_eq!(integral(GeomType::AxisymY), element.area() * centroid.x, comp = abs, tol = 1e-13);

    let direct = integrate(GeomType::AxisymY, &data.sample(), |_| 1.0);
    assert_scalar_eq!(direct, integral(GeomType::AxisymY), comp = abs, tol = 1e-15);
}

#[test]
fn source_form_integrates_function() {
    let element = skewed_element();
    let data = ElementData::new(&element, 4, &[]);
    let n = data.weights.len();
    let form = VectorFormVol::new(0)
        .with_const_coeff(-0.5)
        .with_function(FunctionCoefficient::owned(ConstantFunction(4.0)));
    assert_scalar_eq!(
        form.value(&data.sample(), &ones(n)),
        -2.0 * element.area(),
        comp = abs,
        tol = 1e-13
    );
}

#[test]
fn advection_requires_planar_geometry() {
    assert!(JacobianAdvection::try_new(0, 0, 1.0, 1.0, GeomType::Planar).is_ok());
    assert!(ResidualAdvection::try_new(0, 1.0, 1.0, GeomType::Planar).is_ok());

    for geometry in [GeomType::AxisymX, GeomType::AxisymY] {
        let error = JacobianAdvection::try_new(0, 0, 1.0, 1.0, geometry).unwrap_err();
        assert_eq!(
            error,
            FormError::UnsupportedGeometry {
                form: "JacobianAdvection",
                geometry
            }
        );
        assert!(error.to_string().contains("planar"));
        assert!(ResidualAdvection::try_new(0, 1.0, 1.0, geometry).is_err());
    }
}

#[test]
fn orders_of_linear_forms() {
    let data = OrderData::new(1);
    let field = &data.field;
    let sample = data.sample();

    let mass = MatrixFormVol::new(0, 0);
    assert_eq!(mass.order(&sample, field, field), Order::new(2));
    let mass = mass.with_geometry(GeomType::AxisymX);
    assert_eq!(mass.order(&sample, field, field), Order::new(3));

    // The unit spline has a vanishing derivative, leaving the degree of u * (grad u_prev . grad v)
    let diffusion = JacobianDiffusion::new(0, 0);
    assert_eq!(diffusion.order(&sample, field, field), Order::new(1));
    let cubic = JacobianDiffusion::new(0, 0).with_spline(SplineCoefficient::owned(material_spline()));
    assert_eq!(cubic.order(&sample, field, field), Order::new(3));

    assert_eq!(ResidualDiffusion::new(0).order(&sample, field), Order::new(0));
    assert_eq!(
        ResidualDiffusion::new(0)
            .with_geometry(GeomType::AxisymY)
            .order(&sample, field),
        Order::new(1)
    );

    let source = VectorFormVol::new(0).with_function(FunctionCoefficient::owned(AnalyticFunction::new(3, |x, _| x)));
    assert_eq!(source.order(&sample, field), Order::new(4));

    let multi = MultiComponentVectorFormSurf::new(vec![0], vec![1.0]);
    assert_eq!(multi.order(&sample, field), Order::new(1));
    let multi = multi.with_geometry(GeomType::AxisymX);
    assert_eq!(multi.order(&sample, field), Order::new(2));
}

#[test]
fn diffusion_jacobian_matches_finite_differences() {
    let element = skewed_element();
    let u = [0.4, -1.1, 2.3];
    let spline = SplineCoefficient::owned(material_spline());
    let residual = ResidualDiffusion::new(0)
        .with_const_coeff(1.5)
        .with_spline(spline.clone());
    let jacobian = JacobianDiffusion::new(0, 0)
        .with_const_coeff(1.5)
        .with_spline(spline);

    let data = ElementData::new(&element, FD_STRENGTH, &[u]);
    let expected = fd_jacobian(&element, u, |data, a| residual.value(&data.sample(), &data.basis[a]));
    assert_matrix_eq!(element_matrix(&jacobian, &data), expected, comp = abs, tol = 1e-7);
}

#[test]
fn advection_jacobian_matches_finite_differences() {
    let element = skewed_element();
    let u = [0.9, 0.1, -0.7];
    let splines = || {
        (
            SplineCoefficient::owned(material_spline()),
            SplineCoefficient::owned(AnalyticSpline::new(2, |u| u * u, |u| 2.0 * u)),
        )
    };
    let (s_x, s_y) = splines();
    let residual = ResidualAdvection::try_new(0, 2.0, -0.5, GeomType::Planar)
        .unwrap()
        .with_splines(s_x, s_y);
    let (s_x, s_y) = splines();
    let jacobian = JacobianAdvection::try_new(0, 0, 2.0, -0.5, GeomType::Planar)
        .unwrap()
        .with_splines(s_x, s_y);

    let data = ElementData::new(&element, FD_STRENGTH, &[u]);
    let expected = fd_jacobian(&element, u, |data, a| residual.value(&data.sample(), &data.basis[a]));
    assert_matrix_eq!(element_matrix(&jacobian, &data), expected, comp = abs, tol = 1e-7);
}

#[test]
fn reaction_jacobian_matches_finite_differences() {
    let element = skewed_element();
    let u = [1.0, 2.0, -3.0];
    let function = || FunctionCoefficient::owned(AnalyticFunction::new(2, |x, y| 1.0 + x * y));
    let residual = ResidualVol::new(0).with_const_coeff(3.0).with_function(function());
    let jacobian = MatrixFormVol::new(0, 0)
        .with_const_coeff(3.0)
        .with_function(function());

    let data = ElementData::new(&element, FD_STRENGTH, &[u]);
    let expected = fd_jacobian(&element, u, |data, a| residual.value(&data.sample(), &data.basis[a]));
    assert_matrix_eq!(element_matrix(&jacobian, &data), expected, comp = abs, tol = 1e-7);
}

/// Quadrature data on the edge between the first two vertices of the element.
fn edge_data(element: &P1Element, u: [f64; 3]) -> ElementData {
    edge_data_with_strength(element, FD_STRENGTH, u)
}

fn edge_data_with_strength(element: &P1Element, strength: usize, u: [f64; 3]) -> ElementData {
    let [a, b, _] = element.vertices();
    let (weights, points) = P1Element::edge_quadrature(a, b, &segment(strength));
    ElementData {
        basis: element.basis_samples(&points),
        u_ext: vec![element.interpolate(&u, &points)],
        weights,
        points,
    }
}

#[test]
fn edge_weights_sum_to_edge_length() {
    let element = skewed_element();
    let data = edge_data(&element, [0.0; 3]);
    let [a, b, c] = element.vertices();
    let weight_sum: f64 = data.weights.iter().sum();
    assert_scalar_eq!(weight_sum, (b - a).norm(), comp = abs, tol = 1e-14);
    // The basis function of the opposite vertex vanishes on the edge
    assert!(data.basis[2].values().iter().all(|phi| phi.abs() < 1e-14));
    assert!(data.points.iter().all(|x| (x - c).norm() > 1e-3));
}

#[test]
fn surface_jacobian_matches_finite_differences() {
    let element = skewed_element();
    let u = [0.5, -0.8, 1.2];
    let coeff = 0.7;
    let spline = material_spline();
    let jacobian = JacobianFormSurf::new(0, 0)
        .with_const_coeff(coeff)
        .with_spline(SplineCoefficient::owned(spline.clone()));

    // Residual of c * s(u) * u * v on the edge
    let mut x = DVector::from_column_slice(&u);
    let expected = approximate_jacobian_fd(
        3,
        |x: DVectorView<f64>, mut r: DVectorViewMut<f64>| {
            let data = edge_data(&element, [x[0], x[1], x[2]]);
            let sample = data.sample();
            let u_prev = sample.u_ext(0);
            for a in 0..3 {
                r[a] = coeff
                    * integrate(GeomType::Planar, &sample, |p| {
                        let u = u_prev.values()[p];
                        spline.evaluate(u).0 * u * data.basis[a].values()[p]
                    });
            }
        },
        &mut x,
        1e-6,
    );

    let data = edge_data(&element, u);
    assert_matrix_eq!(element_matrix(&jacobian, &data), expected, comp = abs, tol = 1e-7);
}

#[test]
fn surface_forms_without_spline_are_consistent() {
    let element = skewed_element();
    let u = [0.5, -0.8, 1.2];
    let data = edge_data(&element, u);
    let sample = data.sample();

    let jacobian = element_matrix(&JacobianFormSurf::new(0, 0).with_const_coeff(2.0), &data);
    let mass = element_matrix(&MatrixFormSurf::new(0, 0).with_const_coeff(2.0), &data);
    assert_matrix_eq!(jacobian, mass, comp = abs, tol = 1e-14);

    // The residual of the boundary mass matrix is linear in u
    let residual = ResidualSurf::new(0).with_const_coeff(2.0);
    let r = DVector::from_fn(3, |a, _| residual.value(&sample, &data.basis[a]));
    assert_matrix_eq!(r, &mass * DVector::from_column_slice(&u), comp = abs, tol = 1e-13);
}

#[test]
fn multi_component_surface_form_scales_test_integral() {
    let element = skewed_element();
    let data = edge_data(&element, [0.0; 3]);
    let n = data.weights.len();
    let length = data.weights.iter().sum::<f64>();

    let form = MultiComponentVectorFormSurf::new(vec![0, 2], vec![2.0, -3.0]).with_area(Area::marker("inlet"));
    assert_eq!(form.components(), &[0, 2]);
    assert_eq!(form.coeffs(), &[2.0, -3.0]);
    assert_eq!(form.area(), &Area::marker("inlet"));
    assert_eq!(form.domain(), Domain::Surface);

    let mut result = [0.0; 2];
    form.value(&data.sample(), &ones(n), &mut result);
    assert_scalar_eq!(result[0], 2.0 * length, comp = abs, tol = 1e-13);
    assert_scalar_eq!(result[1], -3.0 * length, comp = abs, tol = 1e-13);

    let cloned = form.clone_form();
    let mut cloned_result = [0.0; 2];
    cloned.value(&data.sample(), &ones(n), &mut cloned_result);
    assert_eq!(result, cloned_result);
}

#[test]
#[should_panic]
fn multi_component_form_requires_one_coefficient_per_component() {
    MultiComponentVectorFormSurf::new(vec![0, 1], vec![1.0]);
}

#[test]
#[should_panic]
fn missing_previous_iterate_panics() {
    let element = skewed_element();
    let data = ElementData::new(&element, 2, &[[0.0; 3]]);
    ResidualDiffusion::new(1).value(&data.sample(), &data.basis[0]);
}

#[test]
#[should_panic]
fn element_sample_rejects_mismatched_lengths() {
    let weights = [0.5, 0.5];
    let points = [Point2::new(0.0, 0.0)];
    ElementSample::new(&weights, &points, &[]);
}

/// Asserts that evaluating at the strength given by `order` agrees with the highest strength.
fn assert_order_suffices_with(
    order: Order,
    data_at: impl Fn(usize) -> ElementData,
    evaluate: impl Fn(&ElementData) -> f64,
) -> Result<(), TestCaseError> {
    let strength = order.degree() as usize;
    prop_assert!(strength <= MAX_QUADRATURE_STRENGTH);
    let approx = evaluate(&data_at(strength));
    let exact = evaluate(&data_at(MAX_QUADRATURE_STRENGTH));
    prop_assert!(
        (approx - exact).abs() <= 1e-9 * (1.0 + exact.abs()),
        "strength {}: {} vs {}",
        strength,
        approx,
        exact
    );
    Ok(())
}

fn assert_order_suffices(
    element: &P1Element,
    u: [f64; 3],
    order: Order,
    evaluate: impl Fn(&ElementData) -> f64,
) -> Result<(), TestCaseError> {
    assert_order_suffices_with(order, |strength| ElementData::new(element, strength, &[u]), evaluate)
}

/// Same as [`assert_order_suffices`], integrating over the edge between the first two vertices.
fn assert_edge_order_suffices(
    element: &P1Element,
    u: [f64; 3],
    order: Order,
    evaluate: impl Fn(&ElementData) -> f64,
) -> Result<(), TestCaseError> {
    assert_order_suffices_with(order, |strength| edge_data_with_strength(element, strength, u), evaluate)
}

fn polynomial_spline(degree: u32) -> SplineCoefficient {
    let p = degree as i32;
    SplineCoefficient::owned(AnalyticSpline::new(
        degree,
        move |u| 0.5 + u.powi(p),
        move |u| p as f64 * u.powi(p - 1),
    ))
}

fn polynomial_function(degree: u32) -> FunctionCoefficient {
    let p = degree as i32;
    FunctionCoefficient::owned(AnalyticFunction::new(degree, move |x, y| x.powi(p) - 2.0 * y + 1.0))
}

proptest! {
    #[test]
    fn order_suffices_for_polynomial_data(
        element in any::<P1Element>(),
        geometry in geom_type(),
        u in nodal_coefficients(),
        degree in 1u32..=4,
    ) {
        let spline = polynomial_spline(degree);
        let function = polynomial_function(degree);

        let jacobian = JacobianDiffusion::new(0, 0).with_spline(spline.clone()).with_geometry(geometry);
        let residual = ResidualDiffusion::new(0).with_spline(spline).with_geometry(geometry);
        let mass = MatrixFormVol::new(0, 0).with_function(function.clone()).with_geometry(geometry);
        let source = VectorFormVol::new(0).with_function(function).with_geometry(geometry);

        let order_data = OrderData::new(1);
        let field = &order_data.field;
        let sample = order_data.sample();

        for a in 0..3 {
            for b in 0..3 {
                assert_order_suffices(&element, u, jacobian.order(&sample, field, field), |data| {
                    jacobian.value(&data.sample(), &data.basis[b], &data.basis[a])
                })?;
                assert_order_suffices(&element, u, mass.order(&sample, field, field), |data| {
                    mass.value(&data.sample(), &data.basis[b], &data.basis[a])
                })?;
            }
            assert_order_suffices(&element, u, residual.order(&sample, field), |data| {
                residual.value(&data.sample(), &data.basis[a])
            })?;
            assert_order_suffices(&element, u, source.order(&sample, field), |data| {
                source.value(&data.sample(), &data.basis[a])
            })?;
        }
    }

    #[test]
    fn advection_order_suffices_for_polynomial_splines(
        element in any::<P1Element>(),
        u in nodal_coefficients(),
        degree_x in 1u32..=4,
        degree_y in 1u32..=4,
        coeff_x in -2.0..2.0,
        coeff_y in -2.0..2.0,
    ) {
        let jacobian = JacobianAdvection::try_new(0, 0, coeff_x, coeff_y, GeomType::Planar)
            .unwrap()
            .with_splines(polynomial_spline(degree_x), polynomial_spline(degree_y));
        let residual = ResidualAdvection::try_new(0, coeff_x, coeff_y, GeomType::Planar)
            .unwrap()
            .with_splines(polynomial_spline(degree_x), polynomial_spline(degree_y));

        let order_data = OrderData::new(1);
        let field = &order_data.field;
        let sample = order_data.sample();

        for a in 0..3 {
            for b in 0..3 {
                assert_order_suffices(&element, u, jacobian.order(&sample, field, field), |data| {
                    jacobian.value(&data.sample(), &data.basis[b], &data.basis[a])
                })?;
            }
            assert_order_suffices(&element, u, residual.order(&sample, field), |data| {
                residual.value(&data.sample(), &data.basis[a])
            })?;
        }
    }

    #[test]
    fn surface_order_suffices_for_polynomial_data(
        element in any::<P1Element>(),
        geometry in geom_type(),
        u in nodal_coefficients(),
        degree in 1u32..=4,
    ) {
        let spline = polynomial_spline(degree);
        let function = polynomial_function(degree);

        let mass = MatrixFormSurf::new(0, 0).with_function(function.clone()).with_geometry(geometry);
        let jacobian = JacobianFormSurf::new(0, 0).with_spline(spline).with_geometry(geometry);
        let source = VectorFormSurf::new(0).with_function(function.clone()).with_geometry(geometry);
        let residual = ResidualSurf::new(0).with_function(function).with_geometry(geometry);
        let multi = MultiComponentVectorFormSurf::new(vec![0], vec![1.5]).with_geometry(geometry);

        let order_data = OrderData::new(1);
        let field = &order_data.field;
        let sample = order_data.sample();

        for a in 0..3 {
            for b in 0..3 {
                assert_edge_order_suffices(&element, u, mass.order(&sample, field, field), |data| {
                    mass.value(&data.sample(), &data.basis[b], &data.basis[a])
                })?;
                assert_edge_order_suffices(&element, u, jacobian.order(&sample, field, field), |data| {
                    jacobian.value(&data.sample(), &data.basis[b], &data.basis[a])
                })?;
            }
            assert_edge_order_suffices(&element, u, source.order(&sample, field), |data| {
                source.value(&data.sample(), &data.basis[a])
            })?;
            assert_edge_order_suffices(&element, u, residual.order(&sample, field), |data| {
                residual.value(&data.sample(), &data.basis[a])
            })?;
            assert_edge_order_suffices(&element, u, multi.order(&sample, field), |data| {
                let mut result = [0.0];
                multi.value(&data.sample(), &data.basis[a], &mut result);
                result[0]
            })?;
        }
    }
}
