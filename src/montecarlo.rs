pub mod brownian_bridge;
pub mod path;
pub mod path_generator;

pub use brownian_bridge::BrownianBridge;
pub use path::{MultiPath, Path};
pub use path_generator::{MultiPathGenerator, PathGenerator, ProcessPathGenerator};
