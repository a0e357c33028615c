//! Inventory pipeline: normalization, emissions, aggregation and comparison.

pub mod aggregate;
pub mod compare;
pub mod emission;
pub mod fleet;
pub mod normalize;
pub mod snapshot;
/// Records, fuels, units and sectors.
pub mod types;
