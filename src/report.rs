//! Headline figures of a run, printed after the detailed tables.

use std::fmt;

use serde::Serialize;

use crate::inventory::compare::{Paired, percent_difference};
use crate::inventory::snapshot::{BUILDINGS, InventorySnapshot};
use crate::runner::{InventoryRun, ScenarioOutcome};

/// Target-year totals of one scenario, or why there are none.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioSummary {
    pub name: String,
    pub energy_mwh: Option<f64>,
    pub co2_t: Option<f64>,
    /// Change of total emissions against the recent year (%).
    pub co2_change_pct: Option<f64>,
    pub error: Option<String>,
}

/// Key figures derived from an [`InventoryRun`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryReport {
    pub base_year: i32,
    pub recent_year: i32,
    pub target_year: i32,
    /// Total energy (MWh).
    pub energy: Paired,
    /// Total emissions (t CO2).
    pub co2: Paired,
    /// Buildings' share of total energy in the recent year (%).
    pub buildings_share_pct: f64,
    /// Emission intensity of the recent year (t CO2/MWh).
    pub co2_intensity: f64,
    pub vehicles: Paired,
    pub scenarios: Vec<ScenarioSummary>,
}

fn buildings_share(snapshot: &InventorySnapshot) -> f64 {
    let totals = snapshot.total.row_totals();
    totals.share(BUILDINGS).map_or(0.0, |s| s * 100.0)
}

impl InventoryReport {
    /// Computes all headline figures from a completed run.
    pub fn from_run(run: &InventoryRun) -> Self {
        let (base, recent) = (&run.base, &run.recent);
        let energy = Paired::new(base.total.total(), recent.total.total());
        let co2 = Paired::new(base.total_co2.total(), recent.total_co2.total());
        let co2_intensity = if energy.comparison > 0.0 {
            co2.comparison / energy.comparison
        } else {
            0.0
        };

        let scenarios = run
            .outcomes
            .iter()
            .map(|outcome| match outcome {
                ScenarioOutcome::Projected(p) => ScenarioSummary {
                    name: p.scenario.clone(),
                    energy_mwh: Some(p.energy.total()),
                    co2_t: Some(p.co2.total()),
                    co2_change_pct: Some(percent_difference(co2.comparison, p.co2.total())),
                    error: None,
                },
                ScenarioOutcome::Failed { scenario, error } => ScenarioSummary {
                    name: scenario.clone(),
                    energy_mwh: None,
                    co2_t: None,
                    co2_change_pct: None,
                    error: Some(error.to_string()),
                },
            })
            .collect();

        Self {
            base_year: base.year,
            recent_year: recent.year,
            target_year: run.target_year,
            energy,
            co2,
            buildings_share_pct: buildings_share(recent),
            co2_intensity,
            vehicles: Paired::new(base.vehicle_count, recent.vehicle_count),
            scenarios,
        }
    }
}

impl fmt::Display for InventoryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (b, r) = (self.base_year, self.recent_year);
        writeln!(f, "--- Inventory Report ---")?;
        writeln!(f, "Total energy {b}:     {:.1} MWh", self.energy.base)?;
        writeln!(
            f,
            "Total energy {r}:     {:.1} MWh ({:+.2}%)",
            self.energy.comparison, self.energy.percent
        )?;
        writeln!(f, "Total CO2 {b}:        {:.1} t", self.co2.base)?;
        writeln!(
            f,
            "Total CO2 {r}:        {:.1} t ({:+.2}%)",
            self.co2.comparison, self.co2.percent
        )?;
        writeln!(f, "CO2 intensity {r}:    {:.4} t/MWh", self.co2_intensity)?;
        writeln!(f, "Buildings share {r}:  {:.1}%", self.buildings_share_pct)?;
        write!(
            f,
            "Private vehicles:      {:.0} -> {:.0}",
            self.vehicles.base, self.vehicles.comparison
        )?;
        for s in &self.scenarios {
            match (s.energy_mwh, s.co2_t, s.co2_change_pct) {
                (Some(e), Some(c), Some(pct)) => {
                    write!(
                        f,
                        "\nScenario {} {}:  {e:.1} MWh, {c:.1} t ({pct:+.2}%)",
                        s.name, self.target_year
                    )?;
                }
                _ => {
                    write!(
                        f,
                        "\nScenario {} {}:  failed: {}",
                        s.name,
                        self.target_year,
                        s.error.as_deref().unwrap_or("unknown error")
                    )?;
                }
            }
        }
        Ok(())
    }
}
