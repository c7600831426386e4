//! Finite-difference machinery for backward PDE pricing.
//!
//! Operators are the spatial generators L of the backward equation
//! V_t + L V = 0 on a discretized grid; evolvers advance the value array
//! one step back in time; step conditions are applied in place after each
//! step; [`model::FiniteDifferenceModel`] drives the rollback.

pub mod boundary;
pub mod bsm_operator;
pub mod dispatch;
pub mod evolver;
pub mod model;
pub mod step_condition;
pub mod tridiagonal;

pub use boundary::{BoundaryCondition, BoundaryKind};
pub use bsm_operator::{bsm_log_grid, BsmOperator};
pub use dispatch::{DispatchableAssetCondition, OutputLevel};
pub use evolver::{CrankNicolson, Evolver, ExplicitEuler, Hundsdorfer, ImplicitEuler, MixedScheme};
pub use model::FiniteDifferenceModel;
pub use step_condition::{
    AmericanExercise, BarrierKnockOut, DividendDrop, ShoutCondition, StepCondition,
};
pub use tridiagonal::TridiagonalOperator;
