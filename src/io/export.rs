//! CSV and JSON export of snapshots and projections.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use crate::inventory::snapshot::{InventorySnapshot, ViewKey};
use crate::projection::scenario::Projection;

/// Column header of the long-format snapshot export.
const SNAPSHOT_HEADER: &str = "year,view,row,fuel,value";

/// Column header of the projection export.
const PROJECTION_HEADER: &str = "scenario,kind,year,sector,energy_mwh,co2_t";

fn create(path: &Path) -> io::Result<io::BufWriter<File>> {
    Ok(io::BufWriter::new(File::create(path)?))
}

/// Exports every view of the given snapshots to a CSV file.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_snapshot_csv(snapshots: &[&InventorySnapshot], path: &Path) -> io::Result<()> {
    write_snapshot_csv(snapshots, create(path)?)
}

/// Writes snapshots in long format, one line per table cell.
///
/// Views follow [`ViewKey::ALL`], rows and columns keep their table order, so
/// identical snapshots give byte-identical output.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_snapshot_csv(snapshots: &[&InventorySnapshot], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(SNAPSHOT_HEADER.split(','))?;

    for snapshot in snapshots {
        let year = snapshot.year.to_string();
        for view in ViewKey::ALL {
            let table = snapshot.view(view);
            for row in table.rows() {
                for (fuel, value) in table.columns().iter().zip(&row.values) {
                    let value = format!("{value:.4}");
                    wtr.write_record([
                        year.as_str(),
                        view.as_str(),
                        row.label.as_str(),
                        fuel.code(),
                        value.as_str(),
                    ])?;
                }
            }
        }
    }

    wtr.flush()?;
    Ok(())
}

/// Exports projections to a CSV file.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_projection_csv(projections: &[&Projection], path: &Path) -> io::Result<()> {
    write_projection_csv(projections, create(path)?)
}

/// Writes each scenario's per-sector energy and CO2 for the recent and the
/// target year.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_projection_csv(projections: &[&Projection], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(PROJECTION_HEADER.split(','))?;

    for p in projections {
        let kind = p.kind.to_string();
        let years = [
            (p.recent_year, &p.recent_energy, &p.recent_co2),
            (p.target_year, &p.energy, &p.co2),
        ];
        for (year, energy, co2) in years {
            let year = year.to_string();
            for (sector, mwh) in energy.entries() {
                let mwh = format!("{mwh:.4}");
                let t = format!("{:.4}", co2.get(sector).unwrap_or(0.0));
                wtr.write_record([
                    p.scenario.as_str(),
                    kind.as_str(),
                    year.as_str(),
                    sector.as_str(),
                    mwh.as_str(),
                    t.as_str(),
                ])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}

/// Exports any serializable result as pretty-printed JSON.
///
/// # Errors
///
/// Returns an `io::Error` if file creation, serialization or writing fails.
pub fn export_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> io::Result<()> {
    write_json(value, create(path)?)
}

/// Writes any serializable result as pretty-printed JSON.
///
/// # Errors
///
/// Returns an `io::Error` if serialization or writing fails.
pub fn write_json<T: Serialize + ?Sized>(value: &T, mut writer: impl Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::aggregate::{Breakdown, Quantity};
    use crate::inventory::snapshot::{BuildOptions, InventoryInput, SnapshotBuilder};
    use crate::inventory::types::{
        ConsumptionRecord, Fuel, PublicLighting, Sector, Unit, VehicleClassRow,
    };
    use crate::projection::scenario::ScenarioKind;
    use crate::reference::ReferenceData;

    fn make_snapshot() -> InventorySnapshot {
        let input = InventoryInput {
            year: 2019,
            heat: vec![
                ConsumptionRecord::new(
                    Sector::ResidentialHeat,
                    "schools",
                    Fuel::NaturalGas,
                    Some(120_000.0),
                    Unit::Kwh,
                    2019,
                )
                .with_super_category("public"),
            ],
            electricity: vec![
                ConsumptionRecord::new(
                    Sector::Electricity,
                    "schools",
                    Fuel::Electricity,
                    Some(40_000.0),
                    Unit::Kwh,
                    2019,
                )
                .with_super_category("public"),
            ],
            fleet: vec![VehicleClassRow {
                category: "passenger cars".into(),
                count: Some(10.0),
                diesel_t: Some(5.0),
                petrol_t: Some(2.0),
                lpg_t: None,
                diesel_l: None,
            }],
            public_lighting: PublicLighting {
                energy_mwh: 10.0,
                co2_t: None,
            },
        };
        SnapshotBuilder::new(ReferenceData::builtin(), BuildOptions::default())
            .build(&input)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    fn make_projection() -> Projection {
        let sectors = |b: f64, l: f64, t: f64, q: Quantity| {
            Breakdown::group(
                [("buildings", b), ("public lighting", l), ("transport", t)],
                q,
            )
        };
        Projection {
            scenario: "bau".into(),
            kind: ScenarioKind::BusinessAsUsual,
            recent_year: 2019,
            target_year: 2030,
            electricity_factor: 0.2,
            recent_energy: sectors(100.0, 10.0, 50.0, Quantity::EnergyMwh),
            recent_co2: sectors(20.0, 2.0, 13.0, Quantity::Co2Tonnes),
            baseline_energy: sectors(110.0, 9.0, 55.0, Quantity::EnergyMwh),
            energy: sectors(110.0, 9.0, 54.0, Quantity::EnergyMwh),
            co2: sectors(21.0, 1.5, 14.0, Quantity::Co2Tonnes),
        }
    }

    fn lines(buf: Vec<u8>) -> Vec<String> {
        String::from_utf8(buf)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn snapshot_header_is_long_format() {
        let snapshot = make_snapshot();
        let mut buf = Vec::new();
        write_snapshot_csv(&[&snapshot], &mut buf).ok();
        assert_eq!(lines(buf).first().map(String::as_str), Some(SNAPSHOT_HEADER));
    }

    #[test]
    fn one_line_per_table_cell() {
        let snapshot = make_snapshot();
        let cells: usize = ViewKey::ALL
            .iter()
            .map(|v| {
                let t = snapshot.view(*v);
                t.rows().len() * t.columns().len()
            })
            .sum();
        let mut buf = Vec::new();
        write_snapshot_csv(&[&snapshot, &snapshot], &mut buf).ok();
        assert_eq!(lines(buf).len(), 1 + 2 * cells);
    }

    #[test]
    fn snapshot_export_is_deterministic() {
        let snapshot = make_snapshot();
        let mut a = Vec::new();
        let mut b = Vec::new();
        write_snapshot_csv(&[&snapshot], &mut a).ok();
        write_snapshot_csv(&[&snapshot], &mut b).ok();
        assert_eq!(a, b);
    }

    #[test]
    fn snapshot_values_parse_back() {
        let snapshot = make_snapshot();
        let mut buf = Vec::new();
        write_snapshot_csv(&[&snapshot], &mut buf).ok();

        let mut rdr = csv::ReaderBuilder::new().from_reader(buf.as_slice());
        let mut heat_total = 0.0;
        for record in rdr.records() {
            let rec = record.unwrap_or_default();
            assert_eq!(rec.len(), 5);
            assert_eq!(&rec[0], "2019");
            let value: f64 = rec[4].parse().unwrap_or(f64::NAN);
            assert!(value.is_finite(), "value column should parse: {rec:?}");
            if &rec[1] == "heat" {
                heat_total += value;
            }
        }
        assert!((heat_total - 120.0).abs() < 1e-3);
    }

    #[test]
    fn projection_rows_cover_both_years() {
        let projection = make_projection();
        let mut buf = Vec::new();
        write_projection_csv(&[&projection], &mut buf).ok();
        let out = lines(buf);
        assert_eq!(out[0], PROJECTION_HEADER);
        assert_eq!(out.len(), 1 + 2 * 3);
        assert_eq!(out[1], "bau,business-as-usual,2019,buildings,100.0000,20.0000");
        assert_eq!(out[6], "bau,business-as-usual,2030,transport,54.0000,14.0000");
    }

    #[test]
    fn json_export_is_valid() {
        let projection = make_projection();
        let mut buf = Vec::new();
        write_json(&projection, &mut buf).ok();
        let value: serde_json::Value =
            serde_json::from_slice(&buf).unwrap_or(serde_json::Value::Null);
        assert_eq!(value["scenario"], "bau");
        assert_eq!(value["kind"], "business-as-usual");
        assert_eq!(value["target_year"], 2030);
    }
}
