//! Concrete stage models and control parametrizations.
//!
//! - [`lqr`]: a time-invariant linear-quadratic stage model with analytic
//!   derivatives
//! - [`poly_two_rk4`]: a quadratic Lagrange control parametrization whose
//!   nodes line up with the stages of a classical Runge-Kutta 4 step

pub mod lqr;
pub mod poly_two_rk4;

pub use lqr::{LqrModel, LqrParams};
pub use poly_two_rk4::PolyTwoRk4;
