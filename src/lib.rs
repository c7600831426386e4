// === Public Modules (The Canonical Paths) ===
pub mod calibration;
pub mod common;
pub mod engines;
pub mod error;
pub mod handle;
pub mod history;
pub mod instrument;
pub mod instruments;
pub mod math;
pub mod models;
pub mod montecarlo;
pub mod observer;
pub mod pde;
pub mod process;
pub mod random;
pub mod settings;
pub mod solver;
pub mod termstructure;
pub mod time;
pub mod volatility;

// === Private Implementation Details ===
mod macros;

// === Facades (Re-exporting internals) ===
// The types almost every consumer touches.
pub use crate::common::{DiscountFactor, Null, Rate, Real, Time, Volatility};
pub use crate::error::{PricingError, PricingResult};
pub use crate::handle::Handle;
pub use crate::settings::{EvaluationDateGuard, Settings};
pub use crate::time::{Date, DayCount, Period, TimeGrid, TimeUnit};
