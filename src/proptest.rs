use crate::assembly::P1Element;
use crate::form::GeomType;
use ::proptest::prelude::*;
use nalgebra::Point2;

pub fn point2() -> impl Strategy<Value = Point2<f64>> {
    // Moderate coordinates keep polynomial integrands well within floating point range
    let range = -2.0..2.0;
    [range.clone(), range].prop_map(|[x, y]| Point2::new(x, y))
}

pub fn geom_type() -> impl Strategy<Value = GeomType> {
    prop_oneof![
        Just(GeomType::Planar),
        Just(GeomType::AxisymX),
        Just(GeomType::AxisymY)
    ]
}

/// Nodal coefficients of a linear field on a triangle.
pub fn nodal_coefficients() -> impl Strategy<Value = [f64; 3]> {
    let range = -2.0..2.0;
    [range.clone(), range.clone(), range]
}

impl Arbitrary for P1Element {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        [point2(), point2(), point2()]
            .prop_filter_map("triangle must be reasonably shaped", |[a, b, c]| {
                let twice_area = (b - a).perp(&(c - a));
                // Counter-clockwise orientation
                let vertices = if twice_area > 0.0 { [a, b, c] } else { [a, c, b] };
                let longest_side = [b - a, c - b, a - c]
                    .iter()
                    .map(|side| side.norm())
                    .fold(0.0, f64::max);
                (twice_area.abs() > 0.1 * longest_side * longest_side)
                    .then(|| P1Element::from_vertices(vertices).ok())
                    .flatten()
            })
            .boxed()
    }
}
