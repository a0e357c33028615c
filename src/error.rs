//! Error taxonomy for the inventory pipeline.
//!
//! Every variant is fatal for the operation that raised it: a snapshot build
//! aborts on the first error, a projection aborts only itself. Missing numeric
//! cells in input records are not errors and never reach this type.

use thiserror::Error;

use crate::inventory::types::{Fuel, Unit};

/// Errors raised while normalizing, aggregating, comparing or projecting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InventoryError {
    /// A fuel code has no entry in the reference conversion table.
    #[error("unknown fuel `{0}`: no conversion factor registered")]
    UnknownFuel(String),

    /// The fuel is registered but has no conversion factor for this unit.
    #[error("fuel `{fuel}` has no conversion factor for unit `{unit}`")]
    UnsupportedUnit { fuel: Fuel, unit: Unit },

    /// A grouping key is missing from a canonical ordering table.
    #[error("unknown category `{key}` in {context}")]
    UnknownCategory { context: String, key: String },

    /// No emission factor for the fuel in that year.
    #[error("no emission factor for `{fuel}` in {year}")]
    MissingFactor { fuel: Fuel, year: i32 },

    /// A ratio's denominator is zero where zero has no defined convention.
    #[error("zero denominator while computing {0}")]
    DivisionBasis(String),

    /// A record quantity is negative.
    #[error("negative quantity {value} for `{category}` ({fuel})")]
    NegativeQuantity {
        category: String,
        fuel: Fuel,
        value: f64,
    },

    /// A fleet row reports a negative number of vehicles.
    #[error("negative vehicle count {value} for `{category}`")]
    NegativeCount { category: String, value: f64 },

    /// A record belongs to a different reporting year than the snapshot.
    #[error("record for {found} passed to the {expected} snapshot")]
    YearMismatch { expected: i32, found: i32 },

    /// Survey table lookup for a key that is not registered.
    #[error("unknown survey key `{0}`")]
    UnknownSurveyKey(String),

    /// Too few historical points to fit the electricity factor trend.
    #[error("trend fit needs at least {required} distinct years, got {points}")]
    InsufficientTrendData { points: usize, required: usize },
}

impl InventoryError {
    pub(crate) fn unknown_category(context: &str, key: impl Into<String>) -> Self {
        Self::UnknownCategory {
            context: context.to_string(),
            key: key.into(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, InventoryError>;
