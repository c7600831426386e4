pub mod gaussian1d;
pub mod markov_functional;
pub mod mf_state_process;

pub use gaussian1d::Gaussian1dModel;
pub use markov_functional::{
    Adjustments, CalibrationBasket, MarkovFunctional, ModelOutputs, ModelSettings,
};
pub use mf_state_process::MfStateProcess;
