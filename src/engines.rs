//! Pricing engines: glue between instruments and the numerical kernels,
//! consuming market data through handles.

pub mod fd_vanilla;
pub mod gaussian1d;
pub mod mc_vanilla;

pub use fd_vanilla::FdVanillaEngine;
pub use gaussian1d::{Gaussian1dCapFloorEngine, Gaussian1dSwaptionEngine};
pub use mc_vanilla::McEuropeanEngine;
