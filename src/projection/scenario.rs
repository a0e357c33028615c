//! Business-as-usual and accelerated-transition projections of the total views.
//!
//! Each sector of the `total` view grows linearly at the rate observed between
//! the base and recent snapshots. Transport is then replaced by a fleet
//! substitution (electrified vehicles drop out at the recent average energy
//! per vehicle). Emissions follow energy through each sector's recent CO2
//! intensity, after the electricity slice is rescaled to the target year's
//! grid factor. The accelerated scenario additionally subtracts mitigation
//! savings, all of which are parameters.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::{InventoryError, Result};
use crate::inventory::aggregate::{Breakdown, Quantity, Table};
use crate::inventory::compare::percent_difference;
use crate::inventory::snapshot::{BUILDINGS, InventorySnapshot, PUBLIC_LIGHTING, TOTAL_ROWS, TRANSPORT};
use crate::inventory::types::Fuel;
use crate::reference::ReferenceData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioKind {
    /// Trend growth plus the official electrification share.
    BusinessAsUsual,
    /// Business-as-usual base with a higher electrification share and
    /// mitigation savings subtracted.
    AcceleratedTransition,
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScenarioKind::BusinessAsUsual => "business-as-usual",
            ScenarioKind::AcceleratedTransition => "accelerated-transition",
        })
    }
}

/// Absolute per-sector savings (MWh or t CO2).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SectorOffsets {
    pub buildings: f64,
    pub public_lighting: f64,
    pub transport: f64,
}

impl SectorOffsets {
    pub fn values(&self) -> [f64; 3] {
        [self.buildings, self.public_lighting, self.transport]
    }

    /// Reads the per-sector savings stored under `<measure>_<unit>` keys.
    ///
    /// # Errors
    ///
    /// `UnknownSurveyKey` if a saving is not in the reference table.
    pub fn from_reference(reference: &ReferenceData, unit: &str) -> Result<Self> {
        let saving = |measure: &str| reference.survey_saving(&format!("{measure}_{unit}"));
        Ok(Self {
            buildings: saving("buildings_retrofit")?,
            public_lighting: saving("public_lighting_upgrade")?,
            transport: saving("transport_measures")?,
        })
    }

    /// Offset of a total-view row; unknown rows get none.
    pub fn for_sector(&self, sector: &str) -> f64 {
        match sector {
            BUILDINGS => self.buildings,
            PUBLIC_LIGHTING => self.public_lighting,
            TRANSPORT => self.transport,
            _ => 0.0,
        }
    }
}

/// Named scenario literals. Scenarios are data: nothing here is hard-coded
/// into the projection arithmetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioParams {
    pub name: String,
    pub kind: ScenarioKind,
    /// Fraction of the vehicle fleet electrified by the target year.
    pub electrification_share: f64,
    /// Fraction of recent transport energy/CO2 saved by eco-driving.
    #[serde(default)]
    pub eco_driving_share: f64,
    /// Fraction of recent transport energy/CO2 saved by cycling.
    #[serde(default)]
    pub bike_substitution_share: f64,
    #[serde(default)]
    pub energy_offsets_mwh: SectorOffsets,
    #[serde(default)]
    pub co2_offsets_t: SectorOffsets,
}

impl ScenarioParams {
    /// Trend growth with the national strategy's electrification share.
    ///
    /// # Errors
    ///
    /// `UnknownSurveyKey` if the share is not in the reference table.
    pub fn business_as_usual(reference: &ReferenceData) -> Result<Self> {
        Ok(Self {
            name: "business_as_usual".to_string(),
            kind: ScenarioKind::BusinessAsUsual,
            electrification_share: reference.survey_share("ev_share_strategy_2030")?,
            eco_driving_share: 0.0,
            bike_substitution_share: 0.0,
            energy_offsets_mwh: SectorOffsets::default(),
            co2_offsets_t: SectorOffsets::default(),
        })
    }

    /// Mitigation programme: faster electrification, eco-driving, cycling,
    /// building retrofits and lighting upgrades.
    ///
    /// # Errors
    ///
    /// `UnknownSurveyKey` if a share or saving is not in the reference table.
    pub fn accelerated_transition(reference: &ReferenceData) -> Result<Self> {
        Ok(Self {
            name: "accelerated_transition".to_string(),
            kind: ScenarioKind::AcceleratedTransition,
            electrification_share: reference.survey_share("ev_share_accelerated_2030")?,
            eco_driving_share: reference.survey_share("eco_driving_saving")?,
            bike_substitution_share: reference.survey_share("bike_substitution_saving")?,
            energy_offsets_mwh: SectorOffsets::from_reference(reference, "mwh")?,
            co2_offsets_t: SectorOffsets::from_reference(reference, "co2_t")?,
        })
    }

    /// Whether any accelerated-transition-only parameter is set.
    pub fn has_mitigation(&self) -> bool {
        self.eco_driving_share != 0.0
            || self.bike_substitution_share != 0.0
            || self
                .energy_offsets_mwh
                .values()
                .iter()
                .chain(&self.co2_offsets_t.values())
                .any(|v| *v != 0.0)
    }
}

/// Linear growth of one sector between two years, extrapolated forward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SectorGrowth {
    /// Percent per year.
    pub change_per_year: f64,
    /// Fractional change from the recent year to the target year.
    pub change_until_target: f64,
}

impl SectorGrowth {
    pub fn new(base: f64, recent: f64, years_between: f64, years_to_target: f64) -> Self {
        let change_per_year = percent_difference(base, recent) / years_between;
        Self {
            change_per_year,
            change_until_target: change_per_year * years_to_target / 100.0,
        }
    }

    pub fn apply(&self, recent: f64) -> f64 {
        recent * (1.0 + self.change_until_target)
    }
}

/// A scenario bound to two snapshots, ready to project once.
#[derive(Debug, Clone)]
pub struct ProjectionScenario {
    params: ScenarioParams,
    recent_year: i32,
    target_year: i32,
    growth: Vec<(String, SectorGrowth)>,
    recent_energy: Breakdown,
    recent_co2: Table,
    vehicle_count: f64,
    factor_recent: f64,
    factor_target: f64,
}

impl ProjectionScenario {
    /// Derives per-sector growth from `base` → `recent` and binds the grid
    /// factors of the recent and target years.
    ///
    /// # Errors
    ///
    /// `DivisionBasis` if both snapshots have the same year, `MissingFactor`
    /// if the recent year has no electricity factor.
    pub fn from_snapshots(
        base: &InventorySnapshot,
        recent: &InventorySnapshot,
        params: ScenarioParams,
        target_year: i32,
        factor_target: f64,
        reference: &ReferenceData,
    ) -> Result<Self> {
        if recent.year == base.year {
            return Err(InventoryError::DivisionBasis(
                "years between base and recent snapshot".to_string(),
            ));
        }
        let years_between = f64::from(recent.year - base.year);
        let years_to_target = f64::from(target_year - recent.year);
        let base_energy = base.total.row_totals();
        let recent_energy = recent.total.row_totals();
        let growth = TOTAL_ROWS
            .iter()
            .map(|sector| {
                let g = SectorGrowth::new(
                    base_energy.get(sector).unwrap_or(0.0),
                    recent_energy.get(sector).unwrap_or(0.0),
                    years_between,
                    years_to_target,
                );
                (sector.to_string(), g)
            })
            .collect();

        Ok(Self {
            params,
            recent_year: recent.year,
            target_year,
            growth,
            recent_energy,
            recent_co2: recent.total_co2.clone(),
            vehicle_count: recent.vehicle_count,
            factor_recent: reference.emission_factor(Fuel::Electricity, recent.year)?,
            factor_target,
        })
    }

    pub fn params(&self) -> &ScenarioParams {
        &self.params
    }

    /// Growth rates per total-view sector.
    pub fn growth(&self) -> &[(String, SectorGrowth)] {
        &self.growth
    }

    /// Runs the scenario.
    ///
    /// # Errors
    ///
    /// `DivisionBasis` for zero vehicles, a zero recent grid factor or a
    /// sector with zero recent energy.
    #[instrument(skip_all, fields(scenario = %self.params.name))]
    pub fn project(self) -> Result<Projection> {
        let p = &self.params;
        let recent = |sector: &str| self.recent_energy.get(sector).unwrap_or(0.0);
        let recent_co2 = self.recent_co2.row_totals();

        let baseline: Vec<(&str, f64)> = self
            .growth
            .iter()
            .map(|(sector, g)| (sector.as_str(), g.apply(recent(sector.as_str()))))
            .collect();

        if self.vehicle_count == 0.0 {
            return Err(InventoryError::DivisionBasis(
                "energy per vehicle".to_string(),
            ));
        }
        let per_vehicle = recent(TRANSPORT) / self.vehicle_count;
        let remaining = self.vehicle_count - self.vehicle_count * p.electrification_share;
        let mut energy: Vec<(&str, f64)> = baseline
            .iter()
            .map(|&(sector, value)| {
                if sector == TRANSPORT {
                    (sector, remaining * per_vehicle)
                } else {
                    (sector, value)
                }
            })
            .collect();

        if self.factor_recent == 0.0 {
            return Err(InventoryError::DivisionBasis(
                "electricity factor ratio".to_string(),
            ));
        }
        let ratio = self.factor_target / self.factor_recent;
        let adjusted = self.recent_co2.scale_column(Fuel::Electricity, ratio).row_totals();
        let mut co2 = Vec::with_capacity(energy.len());
        for &(sector, value) in &energy {
            let denominator = recent(sector);
            if denominator == 0.0 {
                return Err(InventoryError::DivisionBasis(format!(
                    "CO2 intensity of `{sector}`"
                )));
            }
            let scaling = adjusted.get(sector).unwrap_or(0.0) / denominator;
            co2.push((sector, value * scaling));
        }
        debug!(ratio, per_vehicle, remaining, "business-as-usual base");

        if p.kind == ScenarioKind::AcceleratedTransition {
            let saved = p.eco_driving_share + p.bike_substitution_share;
            let recent_transport_co2 = recent_co2.get(TRANSPORT).unwrap_or(0.0);
            for (sector, value) in &mut energy {
                if *sector == TRANSPORT {
                    *value -= saved * recent(TRANSPORT);
                }
                *value -= p.energy_offsets_mwh.for_sector(sector);
            }
            for (sector, value) in &mut co2 {
                if *sector == TRANSPORT {
                    *value -= saved * recent_transport_co2;
                }
                *value -= p.co2_offsets_t.for_sector(sector);
            }
        }
        for (sector, value) in energy.iter().chain(&co2) {
            if *value < 0.0 {
                warn!(sector, value, "projected value is negative");
            }
        }

        Ok(Projection {
            scenario: p.name.clone(),
            kind: p.kind,
            recent_year: self.recent_year,
            target_year: self.target_year,
            electricity_factor: self.factor_target,
            recent_energy: self.recent_energy.clone(),
            recent_co2,
            baseline_energy: Breakdown::group(baseline, Quantity::EnergyMwh),
            energy: Breakdown::group(energy, Quantity::EnergyMwh),
            co2: Breakdown::group(co2, Quantity::Co2Tonnes),
        })
    }
}

/// Projected total views of one scenario, per sector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    pub scenario: String,
    pub kind: ScenarioKind,
    pub recent_year: i32,
    pub target_year: i32,
    /// Grid factor used for the target year (t CO2/MWh).
    pub electricity_factor: f64,
    pub recent_energy: Breakdown,
    pub recent_co2: Breakdown,
    /// Trend growth only, before the fleet substitution.
    pub baseline_energy: Breakdown,
    pub energy: Breakdown,
    pub co2: Breakdown,
}

impl Projection {
    /// Percent change of total energy, recent → target.
    pub fn energy_change_percent(&self) -> f64 {
        percent_difference(self.recent_energy.total(), self.energy.total())
    }

    /// Percent change of total emissions, recent → target.
    pub fn co2_change_percent(&self) -> f64 {
        percent_difference(self.recent_co2.total(), self.co2.total())
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Projection: {} ({}) ---", self.scenario, self.kind)?;
        writeln!(
            f,
            "Grid factor {}:      {:.4} t CO2/MWh",
            self.target_year, self.electricity_factor
        )?;
        for (sector, value) in self.energy.entries() {
            let before = self.recent_energy.get(sector).unwrap_or(0.0);
            writeln!(
                f,
                "{sector:<20} {before:>12.1} -> {value:>12.1} MWh",
            )?;
        }
        writeln!(
            f,
            "Energy {}:           {:.1} MWh ({:+.2}%)",
            self.target_year,
            self.energy.total(),
            self.energy_change_percent()
        )?;
        write!(
            f,
            "CO2 {}:              {:.1} t ({:+.2}%)",
            self.target_year,
            self.co2.total(),
            self.co2_change_percent()
        )
    }
}
