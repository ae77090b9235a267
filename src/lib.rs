pub mod assembly;
pub mod form;
pub mod function;
pub mod mesh;
pub mod order;
pub mod quadrature;
pub mod spline;
pub mod weakform;

pub mod optimize {
    pub use weakforms_optimize::*;
}

#[cfg(feature = "proptest")]
pub mod proptest;

pub extern crate nalgebra;
