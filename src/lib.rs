//! Municipal energy and CO2 inventory: per-year snapshots, year-over-year
//! comparison and scenario projection.

pub mod config;
pub mod error;
pub mod inventory;
/// CSV loaders and CSV/JSON exporters.
pub mod io;
pub mod projection;
pub mod reference;
pub mod report;
pub mod runner;
