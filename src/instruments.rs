pub mod capfloor;
pub mod option;
pub mod swaption;

pub use capfloor::{CapFloor, CapFloorKind};
pub use option::{ExerciseKind, VanillaEngine, VanillaOption, VanillaPayoff};
pub use swaption::{Swaption, SwapKind};
