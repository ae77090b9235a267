use nalgebra::Point2;
use weakforms::assembly::P1Element;
use weakforms::form::{ElementSample, FieldSample};
use weakforms::order::Order;
use weakforms::quadrature::triangle;

mod form;

/// A triangle in the positive quadrant, so that both axisymmetric radii are positive.
pub fn skewed_element() -> P1Element {
    P1Element::from_vertices([Point2::new(0.1, 0.2), Point2::new(1.3, 0.4), Point2::new(0.5, 1.5)]).unwrap()
}

/// Quadrature data, basis samples and interpolated previous iterates on a P1 element.
pub struct ElementData {
    pub weights: Vec<f64>,
    pub points: Vec<Point2<f64>>,
    pub basis: [FieldSample<f64>; 3],
    pub u_ext: Vec<FieldSample<f64>>,
}

impl ElementData {
    pub fn new(element: &P1Element, strength: usize, u_nodal: &[[f64; 3]]) -> Self {
        let (weights, points) = element.volume_quadrature(&triangle(strength));
        let basis = element.basis_samples(&points);
        let u_ext = u_nodal
            .iter()
            .map(|coefficients| element.interpolate(coefficients, &points))
            .collect();
        Self {
            weights,
            points,
            basis,
            u_ext,
        }
    }

    pub fn sample(&self) -> ElementSample<f64> {
        ElementSample::new(&self.weights, &self.points, &self.u_ext)
    }
}

/// Order samples of linear fields, for evaluating `order` of forms.
pub struct OrderData {
    weights: [f64; 1],
    points: [Point2<Order>; 1],
    u_ext: Vec<FieldSample<Order>>,
    pub field: FieldSample<Order>,
}

impl OrderData {
    pub fn new(num_components: usize) -> Self {
        let field = P1Element::order_sample();
        Self {
            weights: [1.0],
            points: [Point2::new(Order::new(1), Order::new(1))],
            u_ext: vec![field.clone(); num_components],
            field,
        }
    }

    pub fn sample(&self) -> ElementSample<Order> {
        ElementSample::new(&self.weights, &self.points, &self.u_ext)
    }
}
