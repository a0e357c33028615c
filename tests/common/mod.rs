//! Shared test fixtures for integration tests.

use ghg_inventory::config::InventoryConfig;
use ghg_inventory::inventory::snapshot::{BuildOptions, InventoryInput};
use ghg_inventory::inventory::types::{
    ConsumptionRecord, Fuel, PublicLighting, Sector, Unit, VehicleClassRow,
};
use ghg_inventory::runner::{InventoryRun, run_inventory};

/// Absolute tolerance for sums of MWh / t values.
pub const EPS: f64 = 1e-6;

/// Full pipeline run over the demo data.
pub fn demo_run() -> InventoryRun {
    run_inventory(&InventoryConfig::demo()).unwrap_or_else(|e| panic!("demo run failed: {e}"))
}

/// Default build options (2 % merge threshold, "other", "taxi").
pub fn default_options() -> BuildOptions {
    BuildOptions::default()
}

/// Heat record in kWh.
pub fn heat(category: &str, super_category: &str, fuel: Fuel, kwh: f64, year: i32) -> ConsumptionRecord {
    ConsumptionRecord::new(Sector::ResidentialHeat, category, fuel, Some(kwh), Unit::Kwh, year)
        .with_super_category(super_category)
}

/// Electricity record in kWh.
pub fn electricity(category: &str, super_category: &str, kwh: f64, year: i32) -> ConsumptionRecord {
    ConsumptionRecord::new(
        Sector::Electricity,
        category,
        Fuel::Electricity,
        Some(kwh),
        Unit::Kwh,
        year,
    )
    .with_super_category(super_category)
}

/// Vehicle class with fuel masses in tonnes.
pub fn vehicles(category: &str, count: f64, diesel_t: f64, petrol_t: f64) -> VehicleClassRow {
    VehicleClassRow {
        category: category.to_string(),
        count: Some(count),
        diesel_t: Some(diesel_t),
        petrol_t: Some(petrol_t),
        lpg_t: None,
        diesel_l: None,
    }
}

/// Small two-sector town: one school, housing, cars and a taxi fleet.
///
/// `scale` multiplies every quantity so two years can differ.
pub fn town(year: i32, scale: f64) -> InventoryInput {
    InventoryInput {
        year,
        heat: vec![
            heat("schools", "public", Fuel::NaturalGas, 500_000.0 * scale, year),
            heat("housing", "households", Fuel::NaturalGas, 4_000_000.0 * scale, year),
            heat("housing", "households", Fuel::Wood, 1_000_000.0 * scale, year),
            heat("housing", "households", Fuel::Electricity, 200_000.0 * scale, year),
        ],
        electricity: vec![
            electricity("schools", "public", 100_000.0 * scale, year),
            electricity("housing", "households", 2_000_000.0 * scale, year),
        ],
        fleet: vec![
            vehicles("passenger cars", 1000.0, 300.0 * scale, 200.0 * scale),
            VehicleClassRow {
                category: "taxi".to_string(),
                count: Some(10.0),
                diesel_t: None,
                petrol_t: None,
                lpg_t: None,
                diesel_l: Some(20_000.0 * scale),
            },
        ],
        public_lighting: PublicLighting {
            energy_mwh: 100.0 * scale,
            co2_t: None,
        },
    }
}
