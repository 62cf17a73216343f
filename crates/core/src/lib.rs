//! Core contracts for shooting-based optimal control.
//!
//! This crate defines the abstractions a trajectory optimizer consumes at
//! every timestep:
//!
//! - [`StageModel`]: dynamics and cost of one timestep, with analytic
//!   first and second derivatives written into a reusable [`StageData`]
//! - [`ControlParametrization`]: maps reduced control parameters to the
//!   instantaneous control used by a sub-step integrator, writing into a
//!   reusable [`ControlData`]
//! - [`StateVector`]: the flat Euclidean state space the models live on
//! - [`InvalidArgument`]: the single error raised when an argument has the
//!   wrong shape or violates a model invariant

mod assign;
mod control;
mod error;
mod stage;
mod state;

pub use assign::AssignmentOp;
pub use control::{
    ControlData, ControlParametrization, check_control_inputs, check_jacobian_product,
    check_jacobian_transpose_product,
};
pub use error::{InvalidArgument, Reason, Shape, check_matrix, check_vector};
pub use stage::{ModelTag, Scratch, StageData, StageModel};
pub use state::StateVector;
