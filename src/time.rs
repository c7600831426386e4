pub mod date;
pub mod daycount;
pub mod grid;

pub use date::{Date, Period, TimeUnit};
pub use daycount::DayCount;
pub use grid::TimeGrid;
