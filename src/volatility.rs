//! Volatility structures: smile sections at a fixed expiry, and the
//! swaption / optionlet surfaces that produce them.

pub mod kahale;
pub mod optionlet;
pub mod sabr;
pub mod smile;
pub mod swaption;

pub use kahale::KahaleSmileSection;
pub use optionlet::{
    ConstantOptionletVolatility, OptionletVolatilityCurve, OptionletVolatilityStructure,
};
pub use sabr::{sabr_volatility, SabrParameters, SabrSmileSection};
pub use smile::{FlatSmileSection, InterpolatedSmileSection, SmileSection};
pub use swaption::{
    ConstantSwaptionVolatility, CubeInterpolation, SwaptionVolatilityCube,
    SwaptionVolatilityMatrix, SwaptionVolatilityStructure,
};
