//! Hierarchical aggregation into fuel-column tables and single-level breakdowns.
//!
//! Fuel columns never follow alphabetical order: each view has a fixed
//! [`ColumnLayout`]. A fuel that is neither a column nor explicitly dropped by
//! the layout means the layout table is incomplete, and is reported as
//! `UnknownCategory` instead of being silently discarded.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::{InventoryError, Result};

use super::types::{Fuel, NormalizedRecord};

/// Default share below which a category is folded into the catch-all bucket.
pub const DEFAULT_MERGE_THRESHOLD: f64 = 0.02;

/// Which record value a table sums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    /// Final energy (MWh).
    EnergyMwh,
    /// Emissions (t CO2).
    Co2Tonnes,
}

impl Quantity {
    /// Value of this quantity carried by a record.
    pub fn of(self, record: &NormalizedRecord) -> f64 {
        match self {
            Quantity::EnergyMwh => record.energy_mwh,
            Quantity::Co2Tonnes => record.emissions_t,
        }
    }

    /// Short unit label.
    pub fn unit(self) -> &'static str {
        match self {
            Quantity::EnergyMwh => "MWh",
            Quantity::Co2Tonnes => "t CO2",
        }
    }
}

/// Canonical column order of one view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    /// View name, used in error messages.
    pub name: &'static str,
    /// Fuel columns, in presentation order.
    pub columns: &'static [Fuel],
    /// Fuels deliberately left out of the view.
    pub dropped: &'static [Fuel],
}

impl ColumnLayout {
    fn position(&self, fuel: Fuel) -> Option<usize> {
        self.columns.iter().position(|f| *f == fuel)
    }

    /// Column index for `fuel`, `None` if the layout drops it.
    ///
    /// # Errors
    ///
    /// `UnknownCategory` when the layout neither lists nor drops the fuel.
    pub fn column_of(&self, fuel: Fuel) -> Result<Option<usize>> {
        match self.position(fuel) {
            Some(i) => Ok(Some(i)),
            None if self.dropped.contains(&fuel) => Ok(None),
            None => Err(InventoryError::unknown_category(self.name, fuel.code())),
        }
    }
}

pub const HEAT: ColumnLayout = ColumnLayout {
    name: "heat",
    columns: &[Fuel::NaturalGas, Fuel::HeatingOil, Fuel::Wood, Fuel::Electricity],
    dropped: &[],
};

/// Wood burns carbon-neutral and is left out of every CO2-by-fuel view.
pub const HEAT_CO2: ColumnLayout = ColumnLayout {
    name: "heat_co2",
    columns: &[Fuel::NaturalGas, Fuel::HeatingOil, Fuel::Electricity],
    dropped: &[Fuel::Wood],
};

pub const ELECTRICITY: ColumnLayout = ColumnLayout {
    name: "electricity",
    columns: &[Fuel::Electricity],
    dropped: &[],
};

pub const ELECTRICITY_CO2: ColumnLayout = ColumnLayout {
    name: "electricity_co2",
    columns: &[Fuel::Electricity],
    dropped: &[],
};

pub const TRANSPORT: ColumnLayout = ColumnLayout {
    name: "transport",
    columns: &[Fuel::Diesel, Fuel::Petrol, Fuel::Lpg],
    dropped: &[],
};

pub const TRANSPORT_CO2: ColumnLayout = ColumnLayout {
    name: "transport_co2",
    columns: &[Fuel::Petrol, Fuel::Diesel, Fuel::Lpg],
    dropped: &[],
};

pub const TOTAL: ColumnLayout = ColumnLayout {
    name: "total",
    columns: &[
        Fuel::Electricity,
        Fuel::Diesel,
        Fuel::Lpg,
        Fuel::Petrol,
        Fuel::HeatingOil,
        Fuel::Wood,
        Fuel::NaturalGas,
    ],
    dropped: &[],
};

pub const TOTAL_CO2: ColumnLayout = ColumnLayout {
    name: "total_co2",
    columns: &[
        Fuel::Electricity,
        Fuel::Diesel,
        Fuel::Lpg,
        Fuel::Petrol,
        Fuel::HeatingOil,
        Fuel::NaturalGas,
    ],
    dropped: &[Fuel::Wood],
};

/// One labelled row of a [`Table`], values aligned with the table's columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub label: String,
    pub values: Vec<f64>,
}

impl TableRow {
    fn zeros(label: &str, width: usize) -> Self {
        Self {
            label: label.to_string(),
            values: vec![0.0; width],
        }
    }

    /// Sum across all fuel columns.
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }
}

/// Rows × fuel columns summary of one quantity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    quantity: Quantity,
    columns: Vec<Fuel>,
    rows: Vec<TableRow>,
}

impl Table {
    /// Table with the layout's columns and no rows.
    pub fn empty(layout: &ColumnLayout, quantity: Quantity) -> Self {
        Self {
            quantity,
            columns: layout.columns.to_vec(),
            rows: Vec::new(),
        }
    }

    /// Sums `quantity` of every `(row label, record)` pair into a table.
    ///
    /// Rows appear in first-seen order. Records of a dropped fuel add nothing
    /// but still create their row, so a category keeps the same rows in every
    /// view built from the same records.
    ///
    /// # Errors
    ///
    /// `UnknownCategory` for a fuel the layout does not know.
    pub fn pivot<'a, I>(entries: I, layout: &ColumnLayout, quantity: Quantity) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a NormalizedRecord)>,
    {
        let mut table = Self::empty(layout, quantity);
        let mut index: BTreeMap<String, usize> = BTreeMap::new();
        for (label, record) in entries {
            let col = layout.column_of(record.fuel)?;
            let row = match index.get(label) {
                Some(&i) => i,
                None => {
                    table.rows.push(TableRow::zeros(label, table.columns.len()));
                    index.insert(label.to_string(), table.rows.len() - 1);
                    table.rows.len() - 1
                }
            };
            let Some(col) = col else {
                continue;
            };
            table.rows[row].values[col] += quantity.of(record);
        }
        Ok(table)
    }

    /// Sorts rows ascending by row total; ties keep their order.
    pub fn sorted_by_total(mut self) -> Self {
        self.rows.sort_by(|a, b| a.total().total_cmp(&b.total()));
        self
    }

    /// Reorders rows to `order`, adding zero rows for labels without data.
    ///
    /// # Errors
    ///
    /// `UnknownCategory` if a row label is absent from `order`.
    pub fn with_row_order(self, order: &[&str], context: &str) -> Result<Self> {
        if let Some(row) = self.rows.iter().find(|r| !order.contains(&r.label.as_str())) {
            return Err(InventoryError::unknown_category(context, row.label.clone()));
        }
        let width = self.columns.len();
        let rows = order
            .iter()
            .map(|label| {
                self.rows
                    .iter()
                    .find(|r| r.label == *label)
                    .cloned()
                    .unwrap_or_else(|| TableRow::zeros(label, width))
            })
            .collect();
        Ok(Self { rows, ..self })
    }

    /// Multiplies one fuel column by `factor`; a missing column is left as is.
    pub fn scale_column(&self, fuel: Fuel, factor: f64) -> Self {
        let mut out = self.clone();
        if let Some(col) = out.columns.iter().position(|f| *f == fuel) {
            for row in &mut out.rows {
                row.values[col] *= factor;
            }
        }
        out
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn columns(&self) -> &[Fuel] {
        &self.columns
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    /// Row labels in table order.
    pub fn row_labels(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.label.as_str())
    }

    fn row(&self, label: &str) -> Option<&TableRow> {
        self.rows.iter().find(|r| r.label == label)
    }

    /// Cell value, `None` if the row or column does not exist.
    pub fn get(&self, row: &str, fuel: Fuel) -> Option<f64> {
        let col = self.columns.iter().position(|f| *f == fuel)?;
        self.row(row).map(|r| r.values[col])
    }

    pub fn row_total(&self, row: &str) -> Option<f64> {
        self.row(row).map(TableRow::total)
    }

    pub fn column_total(&self, fuel: Fuel) -> Option<f64> {
        let col = self.columns.iter().position(|f| *f == fuel)?;
        Some(self.rows.iter().map(|r| r.values[col]).sum())
    }

    /// Grand total over all cells.
    pub fn total(&self) -> f64 {
        self.rows.iter().map(TableRow::total).sum()
    }

    /// Row totals as a breakdown, in row order.
    pub fn row_totals(&self) -> Breakdown {
        Breakdown::group(
            self.rows.iter().map(|r| (r.label.as_str(), r.total())),
            self.quantity,
        )
    }

    /// Column totals as a breakdown, in column order.
    pub fn column_totals(&self) -> Breakdown {
        Breakdown::group(
            self.columns.iter().enumerate().map(|(i, fuel)| {
                (fuel.code(), self.rows.iter().map(|r| r.values[i]).sum())
            }),
            self.quantity,
        )
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label_width = self
            .rows
            .iter()
            .map(|r| r.label.chars().count())
            .max()
            .unwrap_or(0)
            .max(8);
        write!(f, "{:<label_width$}", self.quantity.unit())?;
        for fuel in &self.columns {
            write!(f, " {:>12}", fuel.code())?;
        }
        writeln!(f, " {:>12}", "total")?;
        for row in &self.rows {
            write!(f, "{:<label_width$}", row.label)?;
            for v in &row.values {
                write!(f, " {v:>12.1}")?;
            }
            writeln!(f, " {:>12.1}", row.total())?;
        }
        write!(f, "{:<label_width$}", "total")?;
        for i in 0..self.columns.len() {
            let col: f64 = self.rows.iter().map(|r| r.values[i]).sum();
            write!(f, " {col:>12.1}")?;
        }
        write!(f, " {:>12.1}", self.total())
    }
}

/// Single-level grouping (label → value), the data behind share charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdown {
    quantity: Quantity,
    entries: Vec<(String, f64)>,
}

impl Breakdown {
    /// Sums values per label, keeping first-seen label order.
    pub fn group<'a, I>(items: I, quantity: Quantity) -> Self
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut entries: Vec<(String, f64)> = Vec::new();
        for (label, value) in items {
            match entries.iter_mut().find(|(l, _)| l == label) {
                Some((_, v)) => *v += value,
                None => entries.push((label.to_string(), value)),
            }
        }
        Self { quantity, entries }
    }

    /// Groups records by a label function.
    pub fn from_records<'a, I, F>(records: I, quantity: Quantity, label: F) -> Self
    where
        I: IntoIterator<Item = &'a NormalizedRecord>,
        F: Fn(&'a NormalizedRecord) -> &'a str,
    {
        Self::group(records.into_iter().map(|r| (label(r), quantity.of(r))), quantity)
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn entries(&self) -> &[(String, f64)] {
        &self.entries
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| *v)
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, v)| v).sum()
    }

    /// Fraction of the total held by `label`; `None` for unknown labels or a zero total.
    pub fn share(&self, label: &str) -> Option<f64> {
        let total = self.total();
        if total == 0.0 {
            return None;
        }
        self.get(label).map(|v| v / total)
    }

    /// Copy without `label`.
    pub fn without(&self, label: &str) -> Self {
        Self {
            quantity: self.quantity,
            entries: self
                .entries
                .iter()
                .filter(|(l, _)| l != label)
                .cloned()
                .collect(),
        }
    }

    /// Copy with `value` added to `label` (appended if new).
    pub fn with_added(&self, label: &str, value: f64) -> Self {
        Self::group(
            self.entries
                .iter()
                .map(|(l, v)| (l.as_str(), *v))
                .chain(std::iter::once((label, value))),
            self.quantity,
        )
    }

    /// Folds every label whose share is below `threshold` into `other_label`.
    ///
    /// Labels are relabelled first and the breakdown is then regrouped, so
    /// the merged bucket's share is computed against the unchanged total.
    /// Applying the merge twice gives the same result as applying it once.
    pub fn merge_small(&self, threshold: f64, other_label: &str) -> Self {
        let total = self.total();
        if total <= 0.0 {
            return self.clone();
        }
        Self::group(
            self.entries.iter().map(|(label, value)| {
                if value / total < threshold {
                    (other_label, *value)
                } else {
                    (label.as_str(), *value)
                }
            }),
            self.quantity,
        )
    }
}

impl fmt::Display for Breakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.total();
        let width = self
            .entries
            .iter()
            .map(|(l, _)| l.chars().count())
            .max()
            .unwrap_or(0);
        for (i, (label, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let pct = if total > 0.0 { 100.0 * value / total } else { 0.0 };
            write!(
                f,
                "{label:<width$}  {value:>12.1} {}  ({pct:>5.1}%)",
                self.quantity.unit()
            )?;
        }
        Ok(())
    }
}
