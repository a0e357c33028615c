//! Core inventory types: sectors, fuels, units, and the record stages.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InventoryError;

/// Top-level activity domain a raw record comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Sector {
    /// Building heat (space heating and hot water).
    ResidentialHeat,
    /// Metered electricity use in buildings.
    Electricity,
    /// Private and commercial vehicle fuel.
    Transport,
}

/// Energy carrier.
///
/// The declaration order is only used for map ordering; presentation order
/// always comes from a [`ColumnLayout`](crate::inventory::aggregate::ColumnLayout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Fuel {
    Diesel,
    Petrol,
    Lpg,
    NaturalGas,
    Wood,
    HeatingOil,
    Electricity,
}

impl Fuel {
    /// All fuels known to the engine.
    pub const ALL: [Fuel; 7] = [
        Fuel::Diesel,
        Fuel::Petrol,
        Fuel::Lpg,
        Fuel::NaturalGas,
        Fuel::Wood,
        Fuel::HeatingOil,
        Fuel::Electricity,
    ];

    /// Canonical code, as used in CSV inputs and exports.
    pub fn code(self) -> &'static str {
        match self {
            Fuel::Diesel => "diesel",
            Fuel::Petrol => "petrol",
            Fuel::Lpg => "lpg",
            Fuel::NaturalGas => "natural-gas",
            Fuel::Wood => "wood",
            Fuel::HeatingOil => "heating-oil",
            Fuel::Electricity => "electricity",
        }
    }
}

impl fmt::Display for Fuel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Fuel {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        Fuel::ALL
            .into_iter()
            .find(|fuel| fuel.code() == code)
            .ok_or_else(|| InventoryError::UnknownFuel(s.to_string()))
    }
}

/// Unit of a raw record quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Unit {
    Kwh,
    Mwh,
    Litre,
    Tonne,
    CubicMetre,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Unit::Kwh => "kWh",
            Unit::Mwh => "MWh",
            Unit::Litre => "l",
            Unit::Tonne => "t",
            Unit::CubicMetre => "m3",
        };
        f.write_str(s)
    }
}

/// One raw activity entry as delivered by a loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionRecord {
    /// Sector the record was reported under.
    pub sector: Sector,
    /// Building-use class or vehicle class.
    pub category: String,
    /// Coarser grouping of `category`, when the source provides one.
    pub super_category: Option<String>,
    /// Energy carrier.
    pub fuel: Fuel,
    /// Reported quantity; `None` for unreported survey cells.
    pub quantity: Option<f64>,
    /// Unit of `quantity`.
    pub unit: Unit,
    /// Reporting year.
    pub year: i32,
}

impl ConsumptionRecord {
    /// Builds a record with no super-category.
    pub fn new(
        sector: Sector,
        category: impl Into<String>,
        fuel: Fuel,
        quantity: Option<f64>,
        unit: Unit,
        year: i32,
    ) -> Self {
        Self {
            sector,
            category: category.into(),
            super_category: None,
            fuel,
            quantity,
            unit,
            year,
        }
    }

    /// Sets the super-category.
    pub fn with_super_category(mut self, super_category: impl Into<String>) -> Self {
        self.super_category = Some(super_category.into());
        self
    }
}

/// A record whose quantity has been converted to MWh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyRecord {
    pub sector: Sector,
    pub category: String,
    pub super_category: Option<String>,
    pub fuel: Fuel,
    pub year: i32,
    /// Final energy (MWh).
    pub energy_mwh: f64,
}

/// An energy record with its CO2 emissions attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    pub sector: Sector,
    pub category: String,
    pub super_category: Option<String>,
    pub fuel: Fuel,
    pub year: i32,
    /// Final energy (MWh).
    pub energy_mwh: f64,
    /// Emissions (t CO2).
    pub emissions_t: f64,
}

impl NormalizedRecord {
    /// Label used for super-category groupings, falling back to the category.
    pub fn group_label(&self) -> &str {
        self.super_category.as_deref().unwrap_or(&self.category)
    }
}

/// Vehicle-class row of the private transport survey.
///
/// Each class reports its vehicle count and the estimated fuel mass burnt per
/// fuel type. The taxi class reports diesel in litres instead.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VehicleClassRow {
    pub category: String,
    pub count: Option<f64>,
    pub diesel_t: Option<f64>,
    pub petrol_t: Option<f64>,
    pub lpg_t: Option<f64>,
    pub diesel_l: Option<f64>,
}

/// Street-lighting consumption asserted as a literal for one year.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublicLighting {
    /// Electricity consumed (MWh).
    pub energy_mwh: f64,
    /// Emissions (t CO2); derived from the year's electricity factor when absent.
    pub co2_t: Option<f64>,
}
