//! Emission calculation: MWh to t CO2 with the record year's factor.

use crate::error::Result;
use crate::reference::ReferenceData;

use super::types::{EnergyRecord, NormalizedRecord};

/// Emissions (t CO2) of `energy_mwh` of `record.fuel` in `record.year`.
///
/// # Errors
///
/// `MissingFactor` if the reference table has no factor for the pair.
pub fn emissions_t(record: &EnergyRecord, reference: &ReferenceData) -> Result<f64> {
    let factor = reference.emission_factor(record.fuel, record.year)?;
    Ok(record.energy_mwh * factor)
}

/// Attaches emissions to an energy record.
pub fn attach_emissions(
    record: EnergyRecord,
    reference: &ReferenceData,
) -> Result<NormalizedRecord> {
    let emissions_t = emissions_t(&record, reference)?;
    Ok(NormalizedRecord {
        sector: record.sector,
        category: record.category,
        super_category: record.super_category,
        fuel: record.fuel,
        year: record.year,
        energy_mwh: record.energy_mwh,
        emissions_t,
    })
}

/// Attaches emissions to a batch, stopping at the first failure.
pub fn attach_all(
    records: Vec<EnergyRecord>,
    reference: &ReferenceData,
) -> Result<Vec<NormalizedRecord>> {
    records
        .into_iter()
        .map(|r| attach_emissions(r, reference))
        .collect()
}
