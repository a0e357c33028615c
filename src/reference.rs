//! Reference data provider: conversion factors, emission factors and survey values.
//!
//! A [`ReferenceData`] is constructed once (from TOML) and then only read.
//! Pipeline stages take it by reference; there is no global mutable state.
//! The table shipped with the crate is available through
//! [`ReferenceData::builtin`], which parses it on first use.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use serde::Deserialize;

use crate::config::ConfigError;
use crate::error::{InventoryError, Result};
use crate::inventory::types::{Fuel, Unit};

const BUILTIN_TOML: &str = include_str!("../data/reference.toml");

static BUILTIN: LazyLock<ReferenceData> = LazyLock::new(|| {
    ReferenceData::from_toml_str(BUILTIN_TOML)
        .unwrap_or_else(|e| panic!("built-in reference table is invalid: {e}"))
});

/// Per-fuel conversion and emission constants.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FuelProperties {
    pub fuel: Fuel,
    /// Energy content (MWh/t).
    pub mwh_per_tonne: Option<f64>,
    /// Density (t/l).
    pub tonnes_per_litre: Option<f64>,
    /// Energy content (MWh/m3).
    pub mwh_per_cubic_metre: Option<f64>,
    /// Fixed emission factor (t CO2/MWh). Absent for electricity.
    pub co2_t_per_mwh: Option<f64>,
}

/// National electricity emission factor for one year.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElectricityFactor {
    pub year: i32,
    pub co2_t_per_mwh: f64,
}

/// Survey-derived shares (fractions), consumption constants and absolute
/// mitigation savings (MWh or t CO2 per year).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SurveyTable {
    pub shares: BTreeMap<String, f64>,
    pub constants: BTreeMap<String, f64>,
    pub savings: BTreeMap<String, f64>,
}

/// Immutable lookup tables consumed by every pipeline stage.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferenceData {
    #[serde(default, rename = "fuel")]
    fuels: Vec<FuelProperties>,
    #[serde(default)]
    electricity: Vec<ElectricityFactor>,
    #[serde(default)]
    survey: SurveyTable,
}

impl ReferenceData {
    /// The table bundled with the crate, parsed once per process.
    pub fn builtin() -> &'static ReferenceData {
        &BUILTIN
    }

    /// Parses and validates a reference table from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read, does not parse,
    /// or fails validation.
    pub fn from_toml_file(path: &Path) -> std::result::Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "reference".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates a reference table from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns the first validation problem as a `ConfigError`.
    pub fn from_toml_str(s: &str) -> std::result::Result<Self, ConfigError> {
        let mut data: ReferenceData = toml::from_str(s).map_err(|e| ConfigError {
            field: "reference".to_string(),
            message: e.to_string(),
        })?;
        data.electricity.sort_by_key(|f| f.year);
        match data.validate().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(data),
        }
    }

    /// Checks factor signs and duplicate keys.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let mut seen = BTreeSet::new();
        for props in &self.fuels {
            let field = format!("fuel.{}", props.fuel);
            if !seen.insert(props.fuel) {
                errors.push(ConfigError::new(&field, "listed more than once"));
            }
            for (name, value) in [
                ("mwh_per_tonne", props.mwh_per_tonne),
                ("tonnes_per_litre", props.tonnes_per_litre),
                ("mwh_per_cubic_metre", props.mwh_per_cubic_metre),
            ] {
                if value.is_some_and(|v| !is_positive(v)) {
                    errors.push(ConfigError::new(&format!("{field}.{name}"), "must be > 0"));
                }
            }
            if props.co2_t_per_mwh.is_some_and(|v| !is_non_negative(v)) {
                errors.push(ConfigError::new(
                    &format!("{field}.co2_t_per_mwh"),
                    "must be >= 0",
                ));
            }
        }

        let mut years = BTreeSet::new();
        for factor in &self.electricity {
            if !years.insert(factor.year) {
                errors.push(ConfigError::new(
                    &format!("electricity.{}", factor.year),
                    "year listed more than once",
                ));
            }
            if !is_non_negative(factor.co2_t_per_mwh) {
                errors.push(ConfigError::new(
                    &format!("electricity.{}", factor.year),
                    "must be >= 0",
                ));
            }
        }

        for (key, share) in &self.survey.shares {
            if !(0.0..=1.0).contains(share) {
                errors.push(ConfigError::new(
                    &format!("survey.shares.{key}"),
                    "must be in [0.0, 1.0]",
                ));
            }
        }
        for (key, value) in &self.survey.constants {
            if !is_positive(*value) {
                errors.push(ConfigError::new(
                    &format!("survey.constants.{key}"),
                    "must be > 0",
                ));
            }
        }
        for (key, value) in &self.survey.savings {
            if !is_non_negative(*value) {
                errors.push(ConfigError::new(
                    &format!("survey.savings.{key}"),
                    "must be >= 0",
                ));
            }
        }

        errors
    }

    fn fuel(&self, fuel: Fuel) -> Result<&FuelProperties> {
        self.fuels
            .iter()
            .find(|p| p.fuel == fuel)
            .ok_or_else(|| InventoryError::UnknownFuel(fuel.to_string()))
    }

    /// Fuels registered in the table.
    pub fn fuels(&self) -> impl Iterator<Item = Fuel> + '_ {
        self.fuels.iter().map(|p| p.fuel)
    }

    /// MWh per one `unit` of `fuel`.
    ///
    /// # Errors
    ///
    /// `UnknownFuel` when the fuel is not registered, `UnsupportedUnit` when
    /// the fuel lacks the factor that unit needs.
    pub fn energy_factor(&self, fuel: Fuel, unit: Unit) -> Result<f64> {
        let props = self.fuel(fuel)?;
        let factor = match unit {
            Unit::Kwh => Some(0.001),
            Unit::Mwh => Some(1.0),
            Unit::Tonne => props.mwh_per_tonne,
            Unit::Litre => props
                .tonnes_per_litre
                .zip(props.mwh_per_tonne)
                .map(|(density, content)| density * content),
            Unit::CubicMetre => props.mwh_per_cubic_metre,
        };
        factor.ok_or(InventoryError::UnsupportedUnit { fuel, unit })
    }

    /// Density of a liquid fuel (t/l).
    pub fn tonnes_per_litre(&self, fuel: Fuel) -> Result<f64> {
        self.fuel(fuel)?
            .tonnes_per_litre
            .ok_or(InventoryError::UnsupportedUnit {
                fuel,
                unit: Unit::Litre,
            })
    }

    /// Emission factor (t CO2/MWh) of `fuel` in `year`.
    ///
    /// Electricity is resolved against the yearly series; every other fuel
    /// has a fixed factor.
    ///
    /// # Errors
    ///
    /// `MissingFactor` when no factor exists for the combination.
    pub fn emission_factor(&self, fuel: Fuel, year: i32) -> Result<f64> {
        let missing = InventoryError::MissingFactor { fuel, year };
        if fuel == Fuel::Electricity {
            return self
                .electricity
                .iter()
                .find(|f| f.year == year)
                .map(|f| f.co2_t_per_mwh)
                .ok_or(missing);
        }
        self.fuel(fuel)
            .map_err(|_| missing.clone())?
            .co2_t_per_mwh
            .ok_or(missing)
    }

    /// Historical `(year, t CO2/MWh)` pairs of the electricity factor, ascending.
    pub fn electricity_history(&self) -> Vec<(i32, f64)> {
        self.electricity
            .iter()
            .map(|f| (f.year, f.co2_t_per_mwh))
            .collect()
    }

    /// Survey-derived fraction.
    ///
    /// # Errors
    ///
    /// `UnknownSurveyKey` for unregistered keys.
    pub fn survey_share(&self, key: &str) -> Result<f64> {
        self.survey
            .shares
            .get(key)
            .copied()
            .ok_or_else(|| InventoryError::UnknownSurveyKey(key.to_string()))
    }

    /// Survey-derived consumption constant (mileage, specific consumption).
    ///
    /// # Errors
    ///
    /// `UnknownSurveyKey` for unregistered keys.
    pub fn survey_constant(&self, key: &str) -> Result<f64> {
        self.survey
            .constants
            .get(key)
            .copied()
            .ok_or_else(|| InventoryError::UnknownSurveyKey(key.to_string()))
    }

    /// Absolute saving of a mitigation measure by the target year.
    ///
    /// # Errors
    ///
    /// `UnknownSurveyKey` for unregistered keys.
    pub fn survey_saving(&self, key: &str) -> Result<f64> {
        self.survey
            .savings
            .get(key)
            .copied()
            .ok_or_else(|| InventoryError::UnknownSurveyKey(key.to_string()))
    }
}

pub(crate) fn is_positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

pub(crate) fn is_non_negative(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}
