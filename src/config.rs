//! TOML-based inventory configuration and preset definitions.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::error::InventoryError;
use crate::inventory::fleet::FleetLabels;
use crate::inventory::snapshot::BuildOptions;
use crate::inventory::types::PublicLighting;
use crate::projection::scenario::{ScenarioKind, ScenarioParams};
use crate::reference::{ReferenceData, is_non_negative};

const DEMO_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data/demo");

/// Top-level configuration parsed from TOML.
///
/// Every section has defaults. Load with [`InventoryConfig::from_toml_file`]
/// or start from a preset such as [`InventoryConfig::demo`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InventoryConfig {
    /// Reference table override.
    #[serde(default)]
    pub reference: ReferenceConfig,
    /// Inputs of the earlier reporting year.
    #[serde(default = "YearInput::default_base")]
    pub base: YearInput,
    /// Inputs of the most recent reporting year.
    #[serde(default = "YearInput::default_recent")]
    pub recent: YearInput,
    /// Category labels and grouping policy.
    #[serde(default)]
    pub categories: CategoryConfig,
    /// Projection horizon and trend fit settings.
    #[serde(default)]
    pub projection: ProjectionConfig,
    /// Scenarios to project; the two standard scenarios when empty.
    #[serde(default, rename = "scenario")]
    pub scenarios: Vec<ScenarioParams>,
    /// Directory relative input paths are resolved against.
    #[serde(skip)]
    root: PathBuf,
}

/// Optional path to a reference table replacing the built-in one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReferenceConfig {
    pub path: Option<PathBuf>,
}

/// Record sources of one reporting year.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct YearInput {
    /// Reporting year.
    pub year: i32,
    /// Heat CSV (`super_category,category,fuel,energy_kwh`).
    pub heat: Option<PathBuf>,
    /// Electricity CSV (`super_category,category,energy_kwh`).
    pub electricity: Option<PathBuf>,
    /// Transport CSV (`category,count,diesel_t,petrol_t,lpg_t,diesel_l`).
    pub transport: Option<PathBuf>,
    /// Street lighting literal.
    pub public_lighting: PublicLighting,
    /// Re-estimate vehicle fuel from fleet counts before aggregation.
    pub reestimate_fleet: bool,
}

impl YearInput {
    fn default_base() -> Self {
        Self {
            year: 2011,
            ..Self::default()
        }
    }

    fn default_recent() -> Self {
        Self {
            year: 2019,
            ..Self::default()
        }
    }
}

/// Category labels and grouping policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CategoryConfig {
    /// Share below which a category joins the catch-all bucket (0.0-1.0).
    pub merge_threshold: f64,
    /// Catch-all label, for merged categories and unassigned electricity use.
    pub catch_all: String,
    /// Transport class routed only into the by-fuel breakdowns.
    pub taxi: String,
    /// Passenger car class, for fleet fuel re-estimation.
    pub passenger_cars: String,
    /// Truck and work vehicle class, for fleet fuel re-estimation.
    pub trucks: String,
    /// Moped and motorcycle class, for fleet fuel re-estimation.
    pub mopeds: String,
    /// Category renames applied before aggregation (old → new).
    pub aliases: BTreeMap<String, String>,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            merge_threshold: 0.02,
            catch_all: "other".to_string(),
            taxi: "taxi".to_string(),
            passenger_cars: "passenger cars".to_string(),
            trucks: "trucks".to_string(),
            mopeds: "mopeds and motorcycles".to_string(),
            aliases: BTreeMap::new(),
        }
    }
}

impl CategoryConfig {
    /// Snapshot builder options derived from this section.
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            merge_threshold: self.merge_threshold,
            catch_all: self.catch_all.clone(),
            taxi: self.taxi.clone(),
        }
    }

    /// Vehicle class labels used by fleet re-estimation.
    pub fn fleet_labels(&self) -> FleetLabels {
        FleetLabels {
            passenger_cars: self.passenger_cars.clone(),
            trucks: self.trucks.clone(),
            mopeds: self.mopeds.clone(),
        }
    }
}

/// Projection horizon and electricity factor trend settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectionConfig {
    /// Year to project to (must be after the recent year).
    pub target_year: i32,
    /// Polynomial degree of the electricity factor trend.
    pub trend_degree: usize,
    /// Minimum distinct historical years the trend fit accepts.
    pub min_trend_points: usize,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            target_year: 2030,
            trend_degree: 3,
            min_trend_points: 5,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field} - {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"projection.target_year"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

impl InventoryConfig {
    /// Demo inventory shipped under `data/demo`, with 2011 fleet re-estimation.
    pub fn demo() -> Self {
        let dir = PathBuf::from(DEMO_DIR);
        let input = |year: i32, mwh: f64, co2: Option<f64>, reestimate: bool| YearInput {
            year,
            heat: Some(dir.join(year.to_string()).join("heat.csv")),
            electricity: Some(dir.join(year.to_string()).join("electricity.csv")),
            transport: Some(dir.join(year.to_string()).join("transport.csv")),
            public_lighting: PublicLighting {
                energy_mwh: mwh,
                co2_t: co2,
            },
            reestimate_fleet: reestimate,
        };
        let mut aliases = BTreeMap::new();
        aliases.insert(
            "municipal company offices".to_string(),
            "administration and company offices".to_string(),
        );
        aliases.insert(
            "administration".to_string(),
            "administration and company offices".to_string(),
        );
        Self {
            reference: ReferenceConfig::default(),
            base: input(2011, 2922.5, Some(678.0), true),
            recent: input(2019, 2008.656, None, false),
            categories: CategoryConfig {
                aliases,
                ..CategoryConfig::default()
            },
            projection: ProjectionConfig::default(),
            scenarios: Vec::new(),
            root: PathBuf::new(),
        }
    }

    /// Demo inventory with the 2011 fleet fuel used as reported.
    pub fn demo_reported_fleet() -> Self {
        let mut cfg = Self::demo();
        cfg.base.reestimate_fleet = false;
        cfg
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["demo", "demo_reported_fleet"];

    /// Loads a configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "demo" => Ok(Self::demo()),
            "demo_reported_fleet" => Ok(Self::demo_reported_fleet()),
            _ => Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            }),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// Relative input paths are resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "config".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        let mut cfg = Self::from_toml_str(&content)?;
        cfg.root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(cfg)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Resolves an input path against the configuration's directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// The reference table to use: the configured file, else the built-in one.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the configured table cannot be loaded.
    pub fn reference_data(&self) -> Result<ReferenceData, ConfigError> {
        match &self.reference.path {
            Some(path) => ReferenceData::from_toml_file(&self.resolve(path)),
            None => Ok(ReferenceData::builtin().clone()),
        }
    }

    /// Configured scenarios, or the two standard ones when none are listed.
    ///
    /// # Errors
    ///
    /// `UnknownSurveyKey` if a standard scenario's share is missing from the table.
    pub fn scenarios(&self, reference: &ReferenceData) -> Result<Vec<ScenarioParams>, InventoryError> {
        if !self.scenarios.is_empty() {
            return Ok(self.scenarios.clone());
        }
        Ok(vec![
            ScenarioParams::business_as_usual(reference)?,
            ScenarioParams::accelerated_transition(reference)?,
        ])
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.base.year >= self.recent.year {
            errors.push(ConfigError::new("base.year", "must be < recent.year"));
        }
        for (name, input) in [("base", &self.base), ("recent", &self.recent)] {
            let lighting = &input.public_lighting;
            if !is_non_negative(lighting.energy_mwh) {
                errors.push(ConfigError::new(
                    &format!("{name}.public_lighting.energy_mwh"),
                    "must be >= 0",
                ));
            }
            if lighting.co2_t.is_some_and(|v| !is_non_negative(v)) {
                errors.push(ConfigError::new(
                    &format!("{name}.public_lighting.co2_t"),
                    "must be >= 0",
                ));
            }
        }

        let cat = &self.categories;
        if !(0.0..1.0).contains(&cat.merge_threshold) {
            errors.push(ConfigError::new(
                "categories.merge_threshold",
                "must be in [0.0, 1.0)",
            ));
        }
        for (field, label) in [
            ("categories.catch_all", &cat.catch_all),
            ("categories.taxi", &cat.taxi),
            ("categories.passenger_cars", &cat.passenger_cars),
            ("categories.trucks", &cat.trucks),
            ("categories.mopeds", &cat.mopeds),
        ] {
            if label.trim().is_empty() {
                errors.push(ConfigError::new(field, "must not be empty"));
            }
        }
        for (from, to) in &cat.aliases {
            if cat.aliases.contains_key(to) {
                errors.push(ConfigError {
                    field: format!("categories.aliases.{from}"),
                    message: format!("target \"{to}\" is itself aliased"),
                });
            }
        }

        let proj = &self.projection;
        if proj.target_year <= self.recent.year {
            errors.push(ConfigError::new(
                "projection.target_year",
                "must be > recent.year",
            ));
        }
        if proj.trend_degree == 0 {
            errors.push(ConfigError::new("projection.trend_degree", "must be > 0"));
        }
        if proj.min_trend_points <= proj.trend_degree {
            errors.push(ConfigError::new(
                "projection.min_trend_points",
                "must be > projection.trend_degree",
            ));
        }

        let mut names = BTreeSet::new();
        for (i, s) in self.scenarios.iter().enumerate() {
            let prefix = format!("scenario[{i}]");
            if s.name.trim().is_empty() {
                errors.push(ConfigError::new(&format!("{prefix}.name"), "must not be empty"));
            } else if !names.insert(s.name.as_str()) {
                errors.push(ConfigError {
                    field: format!("{prefix}.name"),
                    message: format!("duplicate scenario \"{}\"", s.name),
                });
            }
            for (name, share) in [
                ("electrification_share", s.electrification_share),
                ("eco_driving_share", s.eco_driving_share),
                ("bike_substitution_share", s.bike_substitution_share),
            ] {
                if !(0.0..=1.0).contains(&share) {
                    errors.push(ConfigError::new(
                        &format!("{prefix}.{name}"),
                        "must be in [0.0, 1.0]",
                    ));
                }
            }
            let energy = s.energy_offsets_mwh.values();
            let co2 = s.co2_offsets_t.values();
            if energy.iter().chain(&co2).any(|v| !is_non_negative(*v)) {
                errors.push(ConfigError::new(
                    &format!("{prefix}.offsets"),
                    "must be >= 0",
                ));
            }
            if s.kind == ScenarioKind::BusinessAsUsual && s.has_mitigation() {
                errors.push(ConfigError::new(
                    &format!("{prefix}.kind"),
                    "mitigation shares and offsets need kind = \"accelerated-transition\"",
                ));
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_preset_valid() {
        let cfg = InventoryConfig::demo();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "demo should be valid: {errors:?}");
    }

    #[test]
    fn from_preset_unknown() {
        let err = InventoryConfig::from_preset("nonexistent");
        assert!(err.is_err());
        let e = err.unwrap_err();
        assert!(e.message.contains("unknown preset"));
    }

    #[test]
    fn all_presets_are_valid() {
        for name in InventoryConfig::PRESETS {
            let cfg = InventoryConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset \"{name}\" should load");
            let errors = cfg.as_ref().map(|c| c.validate()).unwrap_or_default();
            assert!(
                errors.is_empty(),
                "preset \"{name}\" should be valid: {errors:?}"
            );
        }
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[base]
year = 2011
heat = "2011/heat.csv"
reestimate_fleet = true
public_lighting = { energy_mwh = 2922.5, co2_t = 678.0 }

[recent]
year = 2019
transport = "2019/transport.csv"
public_lighting = { energy_mwh = 2008.656 }

[categories]
merge_threshold = 0.03
aliases = { "administration" = "administration and company offices" }

[projection]
target_year = 2030

[[scenario]]
name = "bau"
kind = "business-as-usual"
electrification_share = 0.025

[[scenario]]
name = "com"
kind = "accelerated-transition"
electrification_share = 0.045
eco_driving_share = 0.075
bike_substitution_share = 0.05
energy_offsets_mwh = { buildings = 71899.84, public_lighting = 365.568, transport = 2398.9 }
co2_offsets_t = { buildings = 14654.86, transport = 566.21 }
"#;
        let cfg = InventoryConfig::from_toml_str(toml);
        assert!(cfg.is_ok(), "valid TOML should parse: {:?}", cfg.err());
        let cfg = cfg.ok();
        assert_eq!(cfg.as_ref().map(|c| c.base.reestimate_fleet), Some(true));
        assert_eq!(
            cfg.as_ref().and_then(|c| c.recent.public_lighting.co2_t),
            None
        );
        assert_eq!(cfg.as_ref().map(|c| c.scenarios.len()), Some(2));
        assert_eq!(
            cfg.as_ref().map(|c| c.categories.catch_all.as_str()),
            Some("other")
        );
        assert!(cfg.is_some_and(|c| c.validate().is_empty()));
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[projection]
target_year = 2030
bogus_field = true
"#;
        assert!(InventoryConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml = r#"
[projection]
target_year = 2040
"#;
        let cfg = InventoryConfig::from_toml_str(toml).ok();
        assert_eq!(cfg.as_ref().map(|c| c.projection.target_year), Some(2040));
        assert_eq!(cfg.as_ref().map(|c| c.projection.trend_degree), Some(3));
        assert_eq!(cfg.as_ref().map(|c| c.base.year), Some(2011));
        assert_eq!(cfg.as_ref().map(|c| c.recent.year), Some(2019));
    }

    #[test]
    fn validation_catches_year_order() {
        let mut cfg = InventoryConfig::demo();
        cfg.base.year = 2019;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "base.year"));
    }

    #[test]
    fn validation_catches_target_before_recent() {
        let mut cfg = InventoryConfig::demo();
        cfg.projection.target_year = 2015;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "projection.target_year"));
    }

    #[test]
    fn validation_catches_underdetermined_trend() {
        let mut cfg = InventoryConfig::demo();
        cfg.projection.min_trend_points = 3;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "projection.min_trend_points"));
    }

    #[test]
    fn validation_catches_bad_share() {
        let mut cfg = InventoryConfig::demo();
        let mut s = ScenarioParams::business_as_usual(ReferenceData::builtin())
            .unwrap_or_else(|e| panic!("{e}"));
        s.electrification_share = 1.5;
        cfg.scenarios.push(s);
        let errors = cfg.validate();
        assert!(
            errors
                .iter()
                .any(|e| e.field == "scenario[0].electrification_share")
        );
    }

    #[test]
    fn validation_rejects_mitigation_in_business_as_usual() {
        let mut cfg = InventoryConfig::demo();
        let mut s = ScenarioParams::business_as_usual(ReferenceData::builtin())
            .unwrap_or_else(|e| panic!("{e}"));
        s.eco_driving_share = 0.1;
        cfg.scenarios.push(s);
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "scenario[0].kind"));
    }

    #[test]
    fn default_scenarios_come_from_survey_table() {
        let cfg = InventoryConfig::demo();
        let scenarios = cfg.scenarios(ReferenceData::builtin()).unwrap_or_default();
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[0].electrification_share, 0.025);
        assert_eq!(scenarios[1].electrification_share, 0.045);
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let dir = std::env::temp_dir().join("ghg_inventory_config_test");
        let _ = fs::create_dir_all(&dir);
        let path = dir.join("inventory.toml");
        let _ = fs::write(&path, "[base]\nyear = 2011\nheat = \"in/heat.csv\"\n");
        let cfg = InventoryConfig::from_toml_file(&path).ok();
        let heat = cfg
            .as_ref()
            .and_then(|c| c.base.heat.as_deref().map(|p| c.resolve(p)));
        assert_eq!(heat, Some(dir.join("in/heat.csv")));
        let _ = fs::remove_file(&path);
    }
}
