//! Forward projection of the total views under named scenarios.

pub mod scenario;
pub mod trend;
