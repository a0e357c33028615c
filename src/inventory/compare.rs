//! Year-over-year comparison of two snapshots.

use std::fmt;

use serde::Serialize;

use crate::error::{InventoryError, Result};

use super::aggregate::{Quantity, Table, TableRow};
use super::snapshot::{InventorySnapshot, ViewKey};
use super::types::Fuel;

/// Relative change from `a` to `b`, in percent.
///
/// A zero base counts as a full 100 % increase instead of dividing by zero.
pub fn percent_difference(a: f64, b: f64) -> f64 {
    if a == 0.0 {
        return 100.0;
    }
    (b - a) / a * 100.0
}

/// One value in both years.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Paired {
    pub base: f64,
    pub comparison: f64,
    /// `comparison - base`.
    pub difference: f64,
    /// [`percent_difference`] of the pair.
    pub percent: f64,
}

impl Paired {
    pub fn new(base: f64, comparison: f64) -> Self {
        Self {
            base,
            comparison,
            difference: comparison - base,
            percent: percent_difference(base, comparison),
        }
    }
}

/// One table row in both years.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowComparison {
    pub label: String,
    /// Cells in column order.
    pub cells: Vec<(Fuel, Paired)>,
    pub total: Paired,
}

/// Side-by-side view of one table in two years.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub view: ViewKey,
    pub base_year: i32,
    pub comparison_year: i32,
    pub quantity: Quantity,
    pub columns: Vec<Fuel>,
    /// Rows in the base table's order.
    pub rows: Vec<RowComparison>,
    pub total: Paired,
}

impl Comparison {
    pub fn row(&self, label: &str) -> Option<&RowComparison> {
        self.rows.iter().find(|r| r.label == label)
    }
}

/// Pairs every cell of two tables with the same row and column universe.
///
/// # Errors
///
/// `UnknownCategory` naming the first fuel column or row label that only one
/// of the tables has. Keys are never reconciled here.
pub fn compare_tables(base: &Table, comparison: &Table, context: &str) -> Result<Vec<RowComparison>> {
    if base.columns() != comparison.columns() {
        let odd = base
            .columns()
            .iter()
            .find(|f| !comparison.columns().contains(f))
            .or_else(|| comparison.columns().iter().find(|f| !base.columns().contains(f)))
            .map_or_else(|| "column order".to_string(), |f| f.code().to_string());
        return Err(InventoryError::unknown_category(context, odd));
    }
    if let Some(label) = comparison
        .row_labels()
        .find(|l| base.row_total(l).is_none())
        .or_else(|| base.row_labels().find(|l| comparison.row_total(l).is_none()))
    {
        return Err(InventoryError::unknown_category(context, label));
    }

    let rows = base
        .rows()
        .iter()
        .map(|row| {
            let other: Option<&TableRow> = comparison.rows().iter().find(|r| r.label == row.label);
            let other_values = other.map_or(&[][..], |r| r.values.as_slice());
            let cells = base
                .columns()
                .iter()
                .zip(&row.values)
                .zip(other_values)
                .map(|((fuel, a), b)| (*fuel, Paired::new(*a, *b)))
                .collect();
            RowComparison {
                label: row.label.clone(),
                cells,
                total: Paired::new(row.total(), other.map_or(0.0, TableRow::total)),
            }
        })
        .collect();
    Ok(rows)
}

/// Compares one view of two snapshots.
///
/// # Errors
///
/// `UnknownCategory` when the views' rows or columns differ.
pub fn compare(base: &InventorySnapshot, comparison: &InventorySnapshot, view: ViewKey) -> Result<Comparison> {
    let a = base.view(view);
    let b = comparison.view(view);
    let rows = compare_tables(a, b, view.as_str())?;
    Ok(Comparison {
        view,
        base_year: base.year,
        comparison_year: comparison.year,
        quantity: a.quantity(),
        columns: a.columns().to_vec(),
        rows,
        total: Paired::new(a.total(), b.total()),
    })
}

/// Compares all eight views, stopping at the first mismatch.
pub fn compare_snapshots(
    base: &InventorySnapshot,
    comparison: &InventorySnapshot,
) -> Result<Vec<Comparison>> {
    ViewKey::ALL
        .into_iter()
        .map(|view| compare(base, comparison, view))
        .collect()
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "--- {} ({} vs {}, {}) ---",
            self.view,
            self.base_year,
            self.comparison_year,
            self.quantity.unit()
        )?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<36} {:>12.1} {:>12.1} {:>+8.1}%",
                row.label, row.total.base, row.total.comparison, row.total.percent
            )?;
        }
        write!(
            f,
            "{:<36} {:>12.1} {:>12.1} {:>+8.1}%",
            "total", self.total.base, self.total.comparison, self.total.percent
        )
    }
}
