/// CSV and JSON writers for snapshots and projections.
pub mod export;
pub mod load;
