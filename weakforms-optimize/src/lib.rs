/// Finite difference approximations of derivatives
pub mod calculus;
/// The Newton-Raphson driver and its linear solver abstraction
pub mod newton;
