//! End-to-end pipeline: load both years, build snapshots, compare, project.

use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::{ConfigError, InventoryConfig, YearInput};
use crate::error::InventoryError;
use crate::inventory::compare::{Comparison, compare_snapshots};
use crate::inventory::fleet::{harmonize_categories, reestimate_fuel};
use crate::inventory::snapshot::{InventoryInput, InventorySnapshot, SnapshotBuilder};
use crate::io::load::{LoadError, load_electricity, load_heat, load_transport};
use crate::projection::scenario::{Projection, ProjectionScenario};
use crate::projection::trend::ElectricityTrend;
use crate::reference::ReferenceData;

/// Failure that stops a run before any comparison exists.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("{}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Config(Vec<ConfigError>),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("{year} inventory: {source}")]
    Fleet {
        year: i32,
        #[source]
        source: InventoryError,
    },

    #[error("{year} inventory: {source}")]
    Snapshot {
        year: i32,
        #[source]
        source: InventoryError,
    },

    #[error("comparison: {0}")]
    Compare(#[source] InventoryError),
}

impl From<ConfigError> for RunError {
    fn from(e: ConfigError) -> Self {
        RunError::Config(vec![e])
    }
}

/// Result of one scenario. A failed projection does not fail the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScenarioOutcome {
    Projected(Projection),
    Failed {
        scenario: String,
        #[serde(serialize_with = "display")]
        error: InventoryError,
    },
}

fn display<S: Serializer>(e: &InventoryError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(e)
}

impl ScenarioOutcome {
    pub fn projection(&self) -> Option<&Projection> {
        match self {
            ScenarioOutcome::Projected(p) => Some(p),
            ScenarioOutcome::Failed { .. } => None,
        }
    }
}

/// Everything one run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryRun {
    pub base: InventorySnapshot,
    pub recent: InventorySnapshot,
    /// One per view, in [`ViewKey::ALL`](crate::inventory::snapshot::ViewKey::ALL) order.
    pub comparisons: Vec<Comparison>,
    pub target_year: i32,
    pub outcomes: Vec<ScenarioOutcome>,
}

impl InventoryRun {
    /// Successful projections, in scenario order.
    pub fn projections(&self) -> impl Iterator<Item = &Projection> {
        self.outcomes.iter().filter_map(ScenarioOutcome::projection)
    }
}

/// Reads one year's CSV inputs and applies aliases and fleet re-estimation.
///
/// # Errors
///
/// `Load` for unreadable files, `Fleet` if re-estimation fails.
pub fn load_year(
    config: &InventoryConfig,
    input: &YearInput,
    reference: &ReferenceData,
) -> Result<InventoryInput, RunError> {
    let aliases = &config.categories.aliases;
    let heat = match &input.heat {
        Some(path) => harmonize_categories(load_heat(&config.resolve(path), input.year)?, aliases),
        None => Vec::new(),
    };
    let electricity = match &input.electricity {
        Some(path) => harmonize_categories(
            load_electricity(&config.resolve(path), input.year)?,
            aliases,
        ),
        None => Vec::new(),
    };
    let mut fleet = match &input.transport {
        Some(path) => load_transport(&config.resolve(path))?,
        None => Vec::new(),
    };
    if input.reestimate_fleet {
        fleet = reestimate_fuel(&fleet, reference, &config.categories.fleet_labels()).map_err(
            |source| RunError::Fleet {
                year: input.year,
                source,
            },
        )?;
    }

    Ok(InventoryInput {
        year: input.year,
        heat,
        electricity,
        fleet,
        public_lighting: input.public_lighting,
    })
}

/// Runs every configured scenario against the two snapshots.
///
/// Trend and scenario failures become [`ScenarioOutcome::Failed`] entries.
pub fn project_all(
    config: &InventoryConfig,
    reference: &ReferenceData,
    base: &InventorySnapshot,
    recent: &InventorySnapshot,
) -> Vec<ScenarioOutcome> {
    let target_year = config.projection.target_year;
    let scenarios = match config.scenarios(reference) {
        Ok(s) => s,
        Err(error) => {
            warn!(%error, "no scenarios to project");
            return vec![ScenarioOutcome::Failed {
                scenario: "default scenarios".to_string(),
                error,
            }];
        }
    };
    let factor = ElectricityTrend::from_reference(
        reference,
        config.projection.trend_degree,
        config.projection.min_trend_points,
    )
    .map(|trend| trend.factor_at(target_year));

    scenarios
        .into_iter()
        .map(|params| {
            let name = params.name.clone();
            let projected = factor.clone().and_then(|f| {
                ProjectionScenario::from_snapshots(base, recent, params, target_year, f, reference)?
                    .project()
            });
            match projected {
                Ok(p) => ScenarioOutcome::Projected(p),
                Err(error) => {
                    warn!(scenario = %name, %error, "projection failed");
                    ScenarioOutcome::Failed {
                        scenario: name,
                        error,
                    }
                }
            }
        })
        .collect()
}

/// Runs the full pipeline for a validated configuration.
///
/// # Errors
///
/// Stops at the first configuration, load, snapshot or comparison failure.
/// Projection failures are reported in [`InventoryRun::outcomes`] instead.
#[instrument(skip_all, fields(base = config.base.year, recent = config.recent.year))]
pub fn run_inventory(config: &InventoryConfig) -> Result<InventoryRun, RunError> {
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(RunError::Config(errors));
    }
    let reference = config.reference_data()?;
    let reference_errors = reference.validate();
    if !reference_errors.is_empty() {
        return Err(RunError::Config(reference_errors));
    }

    let builder = SnapshotBuilder::new(&reference, config.categories.build_options());
    let build = |input: &YearInput| -> Result<InventorySnapshot, RunError> {
        let loaded = load_year(config, input, &reference)?;
        builder.build(&loaded).map_err(|source| RunError::Snapshot {
            year: input.year,
            source,
        })
    };
    let base = build(&config.base)?;
    let recent = build(&config.recent)?;
    let comparisons = compare_snapshots(&base, &recent).map_err(RunError::Compare)?;
    info!(
        base_total = base.total.total(),
        recent_total = recent.total.total(),
        "inventories built"
    );

    let outcomes = project_all(config, &reference, &base, &recent);
    info!(
        projected = outcomes.iter().filter(|o| o.projection().is_some()).count(),
        scenarios = outcomes.len(),
        "projections done"
    );

    Ok(InventoryRun {
        base,
        recent,
        comparisons,
        target_year: config.projection.target_year,
        outcomes,
    })
}
