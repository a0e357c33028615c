//! One reporting year's inventory: the eight named views and share breakdowns.

use std::fmt;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::{InventoryError, Result};
use crate::reference::ReferenceData;

use super::aggregate::{
    self, Breakdown, ColumnLayout, DEFAULT_MERGE_THRESHOLD, Quantity, Table,
};
use super::emission::attach_all;
use super::normalize::normalize_all;
use super::types::{
    ConsumptionRecord, Fuel, NormalizedRecord, PublicLighting, Sector, Unit, VehicleClassRow,
};

/// Row label of building heat and electricity in the total views.
pub const BUILDINGS: &str = "buildings";
/// Row label of street lighting in the total views.
pub const PUBLIC_LIGHTING: &str = "public lighting";
/// Row label of private vehicle fuel in the total views.
pub const TRANSPORT: &str = "transport";
/// Rows of the total views, in presentation order.
pub const TOTAL_ROWS: [&str; 3] = [BUILDINGS, PUBLIC_LIGHTING, TRANSPORT];

/// Grouping policy of the snapshot builder.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    /// Share below which a transport category joins the catch-all bucket.
    pub merge_threshold: f64,
    /// Catch-all label.
    pub catch_all: String,
    /// Transport class that only counts towards the by-fuel breakdowns.
    pub taxi: String,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            merge_threshold: DEFAULT_MERGE_THRESHOLD,
            catch_all: "other".to_string(),
            taxi: "taxi".to_string(),
        }
    }
}

/// Raw inputs of one reporting year.
#[derive(Debug, Clone, Default)]
pub struct InventoryInput {
    pub year: i32,
    pub heat: Vec<ConsumptionRecord>,
    pub electricity: Vec<ConsumptionRecord>,
    pub fleet: Vec<VehicleClassRow>,
    pub public_lighting: PublicLighting,
}

/// Names of the eight snapshot views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKey {
    Heat,
    HeatCo2,
    Electricity,
    ElectricityCo2,
    Transport,
    TransportCo2,
    Total,
    TotalCo2,
}

impl ViewKey {
    pub const ALL: [ViewKey; 8] = [
        ViewKey::Heat,
        ViewKey::HeatCo2,
        ViewKey::Electricity,
        ViewKey::ElectricityCo2,
        ViewKey::Transport,
        ViewKey::TransportCo2,
        ViewKey::Total,
        ViewKey::TotalCo2,
    ];

    pub fn as_str(self) -> &'static str {
        self.layout().name
    }

    /// Column layout the view is built with.
    pub fn layout(self) -> &'static ColumnLayout {
        match self {
            ViewKey::Heat => &aggregate::HEAT,
            ViewKey::HeatCo2 => &aggregate::HEAT_CO2,
            ViewKey::Electricity => &aggregate::ELECTRICITY,
            ViewKey::ElectricityCo2 => &aggregate::ELECTRICITY_CO2,
            ViewKey::Transport => &aggregate::TRANSPORT,
            ViewKey::TransportCo2 => &aggregate::TRANSPORT_CO2,
            ViewKey::Total => &aggregate::TOTAL,
            ViewKey::TotalCo2 => &aggregate::TOTAL_CO2,
        }
    }
}

impl fmt::Display for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-level share groupings of one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdowns {
    pub heat_by_fuel: Breakdown,
    /// Wood omitted.
    pub heat_co2_by_fuel: Breakdown,
    pub heat_by_super_category: Breakdown,
    pub heat_co2_by_super_category: Breakdown,
    /// Catch-all category omitted.
    pub electricity_by_super_category: Breakdown,
    /// Catch-all category omitted.
    pub electricity_co2_by_super_category: Breakdown,
    /// Small categories merged into the catch-all bucket.
    pub transport_by_category: Breakdown,
    /// Small categories merged into the catch-all bucket.
    pub transport_co2_by_category: Breakdown,
    /// Taxi diesel included.
    pub transport_by_fuel: Breakdown,
    /// Taxi diesel included.
    pub transport_co2_by_fuel: Breakdown,
    pub total_by_sector: Breakdown,
    pub total_co2_by_sector: Breakdown,
    pub total_by_fuel: Breakdown,
    /// Wood omitted.
    pub total_co2_by_fuel: Breakdown,
}

impl Breakdowns {
    /// All breakdowns with their names.
    pub fn named(&self) -> [(&'static str, &Breakdown); 14] {
        [
            ("heat_by_fuel", &self.heat_by_fuel),
            ("heat_co2_by_fuel", &self.heat_co2_by_fuel),
            ("heat_by_super_category", &self.heat_by_super_category),
            ("heat_co2_by_super_category", &self.heat_co2_by_super_category),
            ("electricity_by_super_category", &self.electricity_by_super_category),
            (
                "electricity_co2_by_super_category",
                &self.electricity_co2_by_super_category,
            ),
            ("transport_by_category", &self.transport_by_category),
            ("transport_co2_by_category", &self.transport_co2_by_category),
            ("transport_by_fuel", &self.transport_by_fuel),
            ("transport_co2_by_fuel", &self.transport_co2_by_fuel),
            ("total_by_sector", &self.total_by_sector),
            ("total_co2_by_sector", &self.total_co2_by_sector),
            ("total_by_fuel", &self.total_by_fuel),
            ("total_co2_by_fuel", &self.total_co2_by_fuel),
        ]
    }
}

/// Complete inventory of one reporting year. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventorySnapshot {
    pub year: i32,
    pub heat: Table,
    pub heat_co2: Table,
    pub electricity: Table,
    pub electricity_co2: Table,
    pub transport: Table,
    pub transport_co2: Table,
    pub total: Table,
    pub total_co2: Table,
    pub breakdowns: Breakdowns,
    /// Private vehicles, taxis excluded.
    pub vehicle_count: f64,
}

impl InventorySnapshot {
    pub fn view(&self, key: ViewKey) -> &Table {
        match key {
            ViewKey::Heat => &self.heat,
            ViewKey::HeatCo2 => &self.heat_co2,
            ViewKey::Electricity => &self.electricity,
            ViewKey::ElectricityCo2 => &self.electricity_co2,
            ViewKey::Transport => &self.transport,
            ViewKey::TransportCo2 => &self.transport_co2,
            ViewKey::Total => &self.total,
            ViewKey::TotalCo2 => &self.total_co2,
        }
    }
}

/// Builds snapshots against one reference table.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder<'a> {
    reference: &'a ReferenceData,
    options: BuildOptions,
}

impl<'a> SnapshotBuilder<'a> {
    pub fn new(reference: &'a ReferenceData, options: BuildOptions) -> Self {
        Self { reference, options }
    }

    /// Normalizes, attaches emissions and aggregates one year's records.
    ///
    /// Nothing is returned unless every record resolves.
    ///
    /// # Errors
    ///
    /// `YearMismatch` for records of another year, plus any normalization,
    /// emission or aggregation error.
    #[instrument(skip_all, fields(year = input.year))]
    pub fn build(&self, input: &InventoryInput) -> Result<InventorySnapshot> {
        let year = input.year;
        if let Some(r) = input
            .heat
            .iter()
            .chain(&input.electricity)
            .find(|r| r.year != year)
        {
            return Err(InventoryError::YearMismatch {
                expected: year,
                found: r.year,
            });
        }

        if let Some((row, count)) = input
            .fleet
            .iter()
            .find_map(|r| r.count.filter(|c| *c < 0.0).map(|c| (r, c)))
        {
            return Err(InventoryError::NegativeCount {
                category: row.category.clone(),
                value: count,
            });
        }

        let (private, taxi) = self.fleet_records(&input.fleet, year);
        let heat = self.resolve(&input.heat)?;
        let electricity = self.resolve(&input.electricity)?;
        let transport = self.resolve(&private)?;
        let taxi = self.resolve(&taxi)?;
        let lighting = self.lighting_record(input.public_lighting, year)?;

        let category_table = |records: &[NormalizedRecord], key: ViewKey, q: Quantity| {
            Table::pivot(
                records.iter().map(|r| (r.category.as_str(), r)),
                key.layout(),
                q,
            )
            .map(Table::sorted_by_total)
        };

        let heat_t = category_table(&heat, ViewKey::Heat, Quantity::EnergyMwh)?;
        let heat_co2_t = category_table(&heat, ViewKey::HeatCo2, Quantity::Co2Tonnes)?;
        let electricity_t = category_table(&electricity, ViewKey::Electricity, Quantity::EnergyMwh)?;
        let electricity_co2_t =
            category_table(&electricity, ViewKey::ElectricityCo2, Quantity::Co2Tonnes)?;
        let transport_t = category_table(&transport, ViewKey::Transport, Quantity::EnergyMwh)?;
        let transport_co2_t =
            category_table(&transport, ViewKey::TransportCo2, Quantity::Co2Tonnes)?;

        // Electric heating is already metered in the electricity records.
        let total_entries: Vec<(&str, &NormalizedRecord)> = heat
            .iter()
            .filter(|r| r.fuel != Fuel::Electricity)
            .chain(&electricity)
            .map(|r| (BUILDINGS, r))
            .chain(std::iter::once((PUBLIC_LIGHTING, &lighting)))
            .chain(transport.iter().map(|r| (TRANSPORT, r)))
            .collect();
        let total_table = |key: ViewKey, q: Quantity| {
            Table::pivot(total_entries.iter().copied(), key.layout(), q)
                .and_then(|t| t.with_row_order(&TOTAL_ROWS, key.as_str()))
        };
        let total_t = total_table(ViewKey::Total, Quantity::EnergyMwh)?;
        let total_co2_t = total_table(ViewKey::TotalCo2, Quantity::Co2Tonnes)?;

        let opts = &self.options;
        let taxi_energy: f64 = taxi.iter().map(|r| r.energy_mwh).sum();
        let taxi_co2: f64 = taxi.iter().map(|r| r.emissions_t).sum();
        let breakdowns = Breakdowns {
            heat_by_fuel: heat_t.column_totals(),
            heat_co2_by_fuel: heat_co2_t.column_totals(),
            heat_by_super_category: Breakdown::from_records(
                &heat,
                Quantity::EnergyMwh,
                NormalizedRecord::group_label,
            ),
            heat_co2_by_super_category: Breakdown::from_records(
                &heat,
                Quantity::Co2Tonnes,
                NormalizedRecord::group_label,
            ),
            electricity_by_super_category: Breakdown::from_records(
                &electricity,
                Quantity::EnergyMwh,
                NormalizedRecord::group_label,
            )
            .without(&opts.catch_all),
            electricity_co2_by_super_category: Breakdown::from_records(
                &electricity,
                Quantity::Co2Tonnes,
                NormalizedRecord::group_label,
            )
            .without(&opts.catch_all),
            transport_by_category: transport_t
                .row_totals()
                .merge_small(opts.merge_threshold, &opts.catch_all),
            transport_co2_by_category: transport_co2_t
                .row_totals()
                .merge_small(opts.merge_threshold, &opts.catch_all),
            transport_by_fuel: transport_t
                .column_totals()
                .with_added(Fuel::Diesel.code(), taxi_energy),
            transport_co2_by_fuel: transport_co2_t
                .column_totals()
                .with_added(Fuel::Diesel.code(), taxi_co2),
            total_by_sector: total_t.row_totals(),
            total_co2_by_sector: total_co2_t.row_totals(),
            total_by_fuel: total_t.column_totals(),
            total_co2_by_fuel: total_co2_t.column_totals(),
        };

        let vehicle_count = input
            .fleet
            .iter()
            .filter(|r| r.category != opts.taxi)
            .filter_map(|r| r.count)
            .sum();

        let snapshot = InventorySnapshot {
            year,
            heat: heat_t,
            heat_co2: heat_co2_t,
            electricity: electricity_t,
            electricity_co2: electricity_co2_t,
            transport: transport_t,
            transport_co2: transport_co2_t,
            total: total_t,
            total_co2: total_co2_t,
            breakdowns,
            vehicle_count,
        };
        for key in ViewKey::ALL {
            let table = snapshot.view(key);
            debug!(
                view = key.as_str(),
                rows = table.rows().len(),
                total = table.total(),
                "built view"
            );
        }
        Ok(snapshot)
    }

    fn resolve(&self, records: &[ConsumptionRecord]) -> Result<Vec<NormalizedRecord>> {
        attach_all(normalize_all(records, self.reference)?, self.reference)
    }

    /// Splits fleet rows into private-vehicle records and taxi records.
    fn fleet_records(
        &self,
        rows: &[VehicleClassRow],
        year: i32,
    ) -> (Vec<ConsumptionRecord>, Vec<ConsumptionRecord>) {
        let mut private = Vec::new();
        let mut taxi = Vec::new();
        for row in rows {
            let record = |fuel: Fuel, quantity: Option<f64>, unit: Unit| {
                ConsumptionRecord::new(Sector::Transport, row.category.clone(), fuel, quantity, unit, year)
            };
            if row.category == self.options.taxi {
                taxi.push(record(Fuel::Diesel, row.diesel_l, Unit::Litre));
            } else {
                private.push(record(Fuel::Diesel, row.diesel_t, Unit::Tonne));
                private.push(record(Fuel::Petrol, row.petrol_t, Unit::Tonne));
                private.push(record(Fuel::Lpg, row.lpg_t, Unit::Tonne));
            }
        }
        (private, taxi)
    }

    fn lighting_record(&self, lighting: PublicLighting, year: i32) -> Result<NormalizedRecord> {
        if lighting.energy_mwh < 0.0 {
            return Err(InventoryError::NegativeQuantity {
                category: PUBLIC_LIGHTING.to_string(),
                fuel: Fuel::Electricity,
                value: lighting.energy_mwh,
            });
        }
        let emissions_t = match lighting.co2_t {
            Some(t) => t,
            None => lighting.energy_mwh * self.reference.emission_factor(Fuel::Electricity, year)?,
        };
        Ok(NormalizedRecord {
            sector: Sector::Electricity,
            category: PUBLIC_LIGHTING.to_string(),
            super_category: None,
            fuel: Fuel::Electricity,
            year,
            energy_mwh: lighting.energy_mwh,
            emissions_t,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heat(category: &str, fuel: Fuel, kwh: f64) -> ConsumptionRecord {
        ConsumptionRecord::new(Sector::ResidentialHeat, category, fuel, Some(kwh), Unit::Kwh, 2019)
            .with_super_category("public")
    }

    fn electricity(super_category: &str, category: &str, kwh: f64) -> ConsumptionRecord {
        ConsumptionRecord::new(
            Sector::Electricity,
            category,
            Fuel::Electricity,
            Some(kwh),
            Unit::Kwh,
            2019,
        )
        .with_super_category(super_category)
    }

    fn vehicles(category: &str, count: f64, diesel_t: f64, petrol_t: f64) -> VehicleClassRow {
        VehicleClassRow {
            category: category.into(),
            count: Some(count),
            diesel_t: Some(diesel_t),
            petrol_t: Some(petrol_t),
            lpg_t: None,
            diesel_l: None,
        }
    }

    fn input() -> InventoryInput {
        InventoryInput {
            year: 2019,
            heat: vec![
                heat("schools", Fuel::NaturalGas, 400_000.0),
                heat("schools", Fuel::Wood, 100_000.0),
                heat("housing", Fuel::HeatingOil, 900_000.0),
                heat("housing", Fuel::Electricity, 50_000.0),
            ],
            electricity: vec![
                electricity("public", "schools", 200_000.0),
                electricity("other", "other", 10_000.0),
            ],
            fleet: vec![
                vehicles("passenger cars", 900.0, 500.0, 400.0),
                vehicles("buses", 4.0, 3.0, 0.0),
                VehicleClassRow {
                    category: "taxi".into(),
                    count: Some(20.0),
                    diesel_l: Some(10_000.0),
                    ..VehicleClassRow::default()
                },
            ],
            public_lighting: PublicLighting {
                energy_mwh: 100.0,
                co2_t: None,
            },
        }
    }

    fn build(input: &InventoryInput) -> Result<InventorySnapshot> {
        SnapshotBuilder::new(ReferenceData::builtin(), BuildOptions::default()).build(input)
    }

    #[test]
    fn total_rows_are_fixed() {
        let snap = build(&input()).unwrap_or_else(|e| panic!("{e}"));
        let rows: Vec<&str> = snap.total.row_labels().collect();
        assert_eq!(rows, TOTAL_ROWS.to_vec());
    }

    #[test]
    fn heat_electricity_stays_out_of_total() {
        let snap = build(&input()).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(snap.heat.get("housing", Fuel::Electricity), Some(50.0));
        // 200 + 10 MWh metered, electric heating not added again.
        assert!(
            snap.total
                .get(BUILDINGS, Fuel::Electricity)
                .is_some_and(|v| (v - 210.0).abs() < 1e-9)
        );
    }

    #[test]
    fn lighting_co2_uses_year_factor() {
        let snap = build(&input()).unwrap_or_else(|e| panic!("{e}"));
        assert!(
            snap.total_co2
                .get(PUBLIC_LIGHTING, Fuel::Electricity)
                .is_some_and(|v| (v - 100.0 * 0.234).abs() < 1e-9)
        );
    }

    #[test]
    fn wood_is_in_energy_but_not_co2() {
        let snap = build(&input()).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(snap.total.get(BUILDINGS, Fuel::Wood), Some(100.0));
        assert_eq!(snap.total_co2.get(BUILDINGS, Fuel::Wood), None);
        let without_wood: f64 = input()
            .heat
            .iter()
            .filter(|r| r.fuel != Fuel::Wood)
            .filter_map(|r| {
                let mwh = r.quantity? / 1000.0;
                ReferenceData::builtin()
                    .emission_factor(r.fuel, 2019)
                    .ok()
                    .map(|f| mwh * f)
            })
            .sum();
        assert!((snap.heat_co2.total() - without_wood).abs() < 1e-6);
        assert!(snap.breakdowns.heat_co2_by_fuel.get("wood").is_none());
    }

    #[test]
    fn taxi_only_reaches_fuel_breakdown() {
        let snap = build(&input()).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(snap.transport.row_total("taxi"), None);
        let taxi_mwh = 10_000.0 * 0.000845 * 11.9;
        let diesel_view = snap.transport.column_total(Fuel::Diesel).unwrap_or(0.0);
        let diesel_pie = snap.breakdowns.transport_by_fuel.get("diesel").unwrap_or(0.0);
        assert!((diesel_pie - diesel_view - taxi_mwh).abs() < 1e-9);
        assert_eq!(snap.vehicle_count, 904.0);
        let transport_row = snap.total.row_total(TRANSPORT).unwrap_or(0.0);
        assert!((transport_row - snap.transport.total()).abs() < 1e-9);
    }

    #[test]
    fn small_transport_categories_merge() {
        let snap = build(&input()).unwrap_or_else(|e| panic!("{e}"));
        let pie = &snap.breakdowns.transport_by_category;
        assert!(pie.get("buses").is_none());
        assert!(pie.get("other").is_some());
        assert!((pie.total() - snap.transport.total()).abs() < 1e-9);
    }

    #[test]
    fn catch_all_dropped_from_electricity_shares_only() {
        let snap = build(&input()).unwrap_or_else(|e| panic!("{e}"));
        assert!(snap.breakdowns.electricity_by_super_category.get("other").is_none());
        assert!(snap.electricity.row_total("other").is_some());
    }

    #[test]
    fn category_rows_sorted_ascending() {
        let snap = build(&input()).unwrap_or_else(|e| panic!("{e}"));
        let totals: Vec<f64> = snap.heat.rows().iter().map(|r| r.total()).collect();
        assert!(totals.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn wrong_year_aborts_build() {
        let mut inp = input();
        inp.heat[0].year = 2011;
        assert_eq!(
            build(&inp).err(),
            Some(InventoryError::YearMismatch {
                expected: 2019,
                found: 2011
            })
        );
    }

    #[test]
    fn missing_factor_aborts_build() {
        let mut inp = input();
        inp.year = 2031;
        for r in inp.heat.iter_mut().chain(inp.electricity.iter_mut()) {
            r.year = 2031;
        }
        assert!(matches!(
            build(&inp),
            Err(InventoryError::MissingFactor { .. })
        ));
    }

    #[test]
    fn negative_vehicle_count_aborts_build() {
        let mut inp = input();
        inp.fleet[1].count = Some(-4.0);
        assert_eq!(
            build(&inp).err(),
            Some(InventoryError::NegativeCount {
                category: "buses".into(),
                value: -4.0
            })
        );
    }

    #[test]
    fn wood_only_category_keeps_its_co2_row() {
        let mut inp = input();
        inp.heat.push(heat("cabins", Fuel::Wood, 30_000.0));
        let snap = build(&inp).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(snap.heat.row_total("cabins"), Some(30.0));
        assert_eq!(snap.heat_co2.row_total("cabins"), Some(0.0));
        assert_eq!(snap.heat.rows().len(), snap.heat_co2.rows().len());
    }
}
