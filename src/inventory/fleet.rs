//! Vehicle fuel re-estimation and category harmonization.
//!
//! Older surveys under-report vehicle fuel. Re-estimation keeps each class's
//! recorded fuel split but rescales the masses from vehicle counts, annual
//! mileage and specific consumption taken from the survey table.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{InventoryError, Result};
use crate::reference::ReferenceData;

use super::types::{ConsumptionRecord, Fuel, VehicleClassRow};

/// Labels of the vehicle classes that get re-estimated.
#[derive(Debug, Clone, PartialEq)]
pub struct FleetLabels {
    pub passenger_cars: String,
    pub trucks: String,
    pub mopeds: String,
}

impl Default for FleetLabels {
    fn default() -> Self {
        Self {
            passenger_cars: "passenger cars".to_string(),
            trucks: "trucks".to_string(),
            mopeds: "mopeds and motorcycles".to_string(),
        }
    }
}

/// Survey constants, resolved once per call.
struct Consumption {
    car_diesel_km: f64,
    car_petrol_km: f64,
    car_lpg_km: f64,
    heavy_km: f64,
    moped_km: f64,
    diesel_l_per_km: f64,
    petrol_l_per_km: f64,
    lpg_petrol_index: f64,
    diesel_t_per_l: f64,
    petrol_t_per_l: f64,
    lpg_t_per_l: f64,
}

impl Consumption {
    fn lookup(reference: &ReferenceData) -> Result<Self> {
        let c = |key: &str| reference.survey_constant(key);
        Ok(Self {
            car_diesel_km: c("car_diesel_km_per_year")?,
            car_petrol_km: c("car_petrol_km_per_year")?,
            car_lpg_km: c("car_lpg_km_per_year")?,
            heavy_km: c("heavy_km_per_year")?,
            moped_km: c("moped_km_per_year")?,
            diesel_l_per_km: c("diesel_l_per_km")?,
            petrol_l_per_km: c("petrol_l_per_km")?,
            lpg_petrol_index: c("lpg_petrol_index")?,
            diesel_t_per_l: reference.tonnes_per_litre(Fuel::Diesel)?,
            petrol_t_per_l: reference.tonnes_per_litre(Fuel::Petrol)?,
            lpg_t_per_l: reference.tonnes_per_litre(Fuel::Lpg)?,
        })
    }

    /// How many litres of petrol a car burns per litre of diesel, per km.
    fn petrol_index(&self) -> f64 {
        self.petrol_l_per_km / self.diesel_l_per_km
    }
}

/// Fractions of each fuel in a class's recorded consumption, weighted to
/// diesel-equivalent volume.
fn fuel_split(row: &VehicleClassRow, petrol_index: f64, with_lpg: bool) -> Result<(f64, f64, f64)> {
    let diesel = row.diesel_t.unwrap_or(0.0);
    let petrol = row.petrol_t.unwrap_or(0.0) / petrol_index;
    let lpg = if with_lpg {
        row.lpg_t.unwrap_or(0.0) / petrol_index
    } else {
        0.0
    };
    let total = diesel + petrol + lpg;
    if total == 0.0 {
        return Err(InventoryError::DivisionBasis(format!(
            "fuel split of `{}`",
            row.category
        )));
    }
    Ok((diesel / total, petrol / total, lpg / total))
}

/// Recomputes fuel masses of passenger cars, trucks and mopeds from fleet counts.
///
/// Other classes pass through untouched. A class with no vehicles gets zero
/// fuel.
///
/// # Errors
///
/// `UnknownSurveyKey` / `UnsupportedUnit` for missing constants, and
/// `DivisionBasis` for a class with vehicles but no recorded fuel to split by.
pub fn reestimate_fuel(
    rows: &[VehicleClassRow],
    reference: &ReferenceData,
    labels: &FleetLabels,
) -> Result<Vec<VehicleClassRow>> {
    let k = Consumption::lookup(reference)?;
    let index = k.petrol_index();

    rows.iter()
        .map(|row| {
            let count = row.count.unwrap_or(0.0);
            let mut out = row.clone();
            if row.category == labels.passenger_cars {
                let (d, p, l) = if count > 0.0 {
                    fuel_split(row, index, true)?
                } else {
                    (0.0, 0.0, 0.0)
                };
                out.diesel_t =
                    Some(d * count * k.car_diesel_km * k.diesel_l_per_km * k.diesel_t_per_l);
                out.petrol_t =
                    Some(p * count * k.car_petrol_km * k.petrol_l_per_km * k.petrol_t_per_l);
                out.lpg_t = Some(
                    l * count
                        * k.car_lpg_km
                        * k.petrol_l_per_km
                        * k.lpg_petrol_index
                        * k.lpg_t_per_l,
                );
            } else if row.category == labels.trucks {
                let (d, p, _) = if count > 0.0 {
                    fuel_split(row, index, false)?
                } else {
                    (0.0, 0.0, 0.0)
                };
                out.diesel_t = Some(d * count * k.heavy_km * k.diesel_l_per_km * k.diesel_t_per_l);
                out.petrol_t = Some(p * count * k.heavy_km * k.petrol_l_per_km * k.petrol_t_per_l);
            } else if row.category == labels.mopeds {
                out.petrol_t = Some(count * k.moped_km * k.petrol_l_per_km * k.petrol_t_per_l);
            } else {
                return Ok(out);
            }
            debug!(
                category = %row.category,
                diesel_t = out.diesel_t,
                petrol_t = out.petrol_t,
                lpg_t = out.lpg_t,
                "re-estimated vehicle fuel"
            );
            Ok(out)
        })
        .collect()
}

/// Renames record categories through `aliases` (old label → new label).
pub fn harmonize_categories(
    records: Vec<ConsumptionRecord>,
    aliases: &BTreeMap<String, String>,
) -> Vec<ConsumptionRecord> {
    if aliases.is_empty() {
        return records;
    }
    records
        .into_iter()
        .map(|mut r| {
            if let Some(to) = aliases.get(&r.category) {
                r.category = to.clone();
            }
            r
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::types::{Sector, Unit};

    fn row(category: &str, count: f64, diesel: f64, petrol: f64, lpg: f64) -> VehicleClassRow {
        VehicleClassRow {
            category: category.into(),
            count: Some(count),
            diesel_t: Some(diesel),
            petrol_t: Some(petrol),
            lpg_t: Some(lpg),
            diesel_l: None,
        }
    }

    #[test]
    fn diesel_only_cars_use_diesel_mileage() {
        let data = ReferenceData::builtin();
        let rows = vec![row("passenger cars", 1000.0, 50.0, 0.0, 0.0)];
        let out = reestimate_fuel(&rows, data, &FleetLabels::default()).unwrap_or_default();
        let expected = 1000.0 * 14800.0 * 0.068 * 0.000845;
        assert!(out[0].diesel_t.is_some_and(|t| (t - expected).abs() < 1e-9));
        assert_eq!(out[0].petrol_t, Some(0.0));
        assert_eq!(out[0].lpg_t, Some(0.0));
    }

    #[test]
    fn split_weights_petrol_by_consumption_index() {
        let data = ReferenceData::builtin();
        let index: f64 = 0.082 / 0.068;
        // Equal diesel-equivalent volumes give an even split.
        let rows = vec![row("trucks", 10.0, 5.0, 5.0 * index, 0.0)];
        let out = reestimate_fuel(&rows, data, &FleetLabels::default()).unwrap_or_default();
        let diesel = 0.5 * 10.0 * 22000.0 * 0.068 * 0.000845;
        let petrol = 0.5 * 10.0 * 22000.0 * 0.082 * 0.000745;
        assert!(out[0].diesel_t.is_some_and(|t| (t - diesel).abs() < 1e-9));
        assert!(out[0].petrol_t.is_some_and(|t| (t - petrol).abs() < 1e-9));
    }

    #[test]
    fn mopeds_are_all_petrol() {
        let data = ReferenceData::builtin();
        let rows = vec![row("mopeds and motorcycles", 200.0, 0.0, 1.0, 0.0)];
        let out = reestimate_fuel(&rows, data, &FleetLabels::default()).unwrap_or_default();
        let expected = 200.0 * 3200.0 * 0.082 * 0.000745;
        assert!(out[0].petrol_t.is_some_and(|t| (t - expected).abs() < 1e-9));
    }

    #[test]
    fn other_classes_pass_through() {
        let data = ReferenceData::builtin();
        let rows = vec![row("buses", 12.0, 300.0, 0.0, 0.0)];
        let out = reestimate_fuel(&rows, data, &FleetLabels::default()).unwrap_or_default();
        assert_eq!(out, rows);
    }

    #[test]
    fn vehicles_without_fuel_basis_fail() {
        let data = ReferenceData::builtin();
        let rows = vec![row("passenger cars", 1000.0, 0.0, 0.0, 0.0)];
        let err = reestimate_fuel(&rows, data, &FleetLabels::default()).err();
        assert!(matches!(err, Some(InventoryError::DivisionBasis(_))));
    }

    #[test]
    fn aliases_fold_old_categories() {
        let mut aliases = BTreeMap::new();
        aliases.insert("administration".to_string(), "offices".to_string());
        let records = vec![
            ConsumptionRecord::new(
                Sector::Electricity,
                "administration",
                Fuel::Electricity,
                Some(1.0),
                Unit::Kwh,
                2011,
            ),
            ConsumptionRecord::new(
                Sector::Electricity,
                "schools",
                Fuel::Electricity,
                Some(1.0),
                Unit::Kwh,
                2011,
            ),
        ];
        let out = harmonize_categories(records, &aliases);
        assert_eq!(out[0].category, "offices");
        assert_eq!(out[1].category, "schools");
    }
}
