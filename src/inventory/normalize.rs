//! Record normalization: raw quantities to MWh.

use crate::error::{InventoryError, Result};
use crate::reference::ReferenceData;

use super::types::{ConsumptionRecord, EnergyRecord};

/// Converts a raw record to final energy in MWh.
///
/// A missing quantity counts as zero. The conversion factor comes from the
/// reference table even for kWh records, so an unregistered fuel is rejected
/// regardless of unit.
///
/// # Errors
///
/// `UnknownFuel` / `UnsupportedUnit` from the reference lookup, and
/// `NegativeQuantity` for quantities below zero.
pub fn normalize(record: &ConsumptionRecord, reference: &ReferenceData) -> Result<EnergyRecord> {
    let factor = reference.energy_factor(record.fuel, record.unit)?;
    let quantity = record.quantity.unwrap_or(0.0);
    if quantity < 0.0 {
        return Err(InventoryError::NegativeQuantity {
            category: record.category.clone(),
            fuel: record.fuel,
            value: quantity,
        });
    }

    Ok(EnergyRecord {
        sector: record.sector,
        category: record.category.clone(),
        super_category: record.super_category.clone(),
        fuel: record.fuel,
        year: record.year,
        energy_mwh: quantity * factor,
    })
}

/// Normalizes a batch, stopping at the first failure.
pub fn normalize_all(
    records: &[ConsumptionRecord],
    reference: &ReferenceData,
) -> Result<Vec<EnergyRecord>> {
    records.iter().map(|r| normalize(r, reference)).collect()
}
