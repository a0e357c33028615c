//! CSV record loaders for the heat, electricity and transport surveys.
//!
//! Empty cells load as missing quantities, which the pipeline counts as zero.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::error::InventoryError;
use crate::inventory::types::{ConsumptionRecord, Fuel, Sector, Unit, VehicleClassRow};

/// Failure while reading an input file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read \"{}\": {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{origin}: {source}")]
    Csv {
        origin: String,
        #[source]
        source: csv::Error,
    },

    #[error("{origin}, line {line}: {source}")]
    Record {
        origin: String,
        line: u64,
        #[source]
        source: InventoryError,
    },
}

#[derive(Debug, Deserialize)]
struct HeatRow {
    super_category: Option<String>,
    category: String,
    fuel: String,
    energy_kwh: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ElectricityRow {
    super_category: Option<String>,
    category: String,
    energy_kwh: Option<f64>,
}

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(input)
}

fn rows<T, R>(input: R, origin: &str) -> Result<Vec<(u64, T)>, LoadError>
where
    T: for<'de> Deserialize<'de>,
    R: Read,
{
    let csv_err = |source| LoadError::Csv {
        origin: origin.to_string(),
        source,
    };
    let mut rdr = reader(input);
    let headers = rdr.headers().map_err(csv_err)?.clone();
    let mut record = csv::StringRecord::new();
    let mut out = Vec::new();
    while rdr.read_record(&mut record).map_err(csv_err)? {
        let line = record.position().map_or(0, csv::Position::line);
        let row = record.deserialize(Some(&headers)).map_err(csv_err)?;
        out.push((line, row));
    }
    Ok(out)
}

/// Reads heat records (`super_category,category,fuel,energy_kwh`).
///
/// # Errors
///
/// `Csv` for malformed rows, `Record` for an unknown fuel code.
pub fn read_heat<R: Read>(input: R, year: i32, origin: &str) -> Result<Vec<ConsumptionRecord>, LoadError> {
    rows::<HeatRow, _>(input, origin)?
        .into_iter()
        .map(|(line, row)| {
            let fuel: Fuel = row.fuel.parse().map_err(|source| LoadError::Record {
                origin: origin.to_string(),
                line,
                source,
            })?;
            let record = ConsumptionRecord::new(
                Sector::ResidentialHeat,
                row.category,
                fuel,
                row.energy_kwh,
                Unit::Kwh,
                year,
            );
            Ok(match row.super_category {
                Some(s) => record.with_super_category(s),
                None => record,
            })
        })
        .collect()
}

/// Reads electricity records (`super_category,category,energy_kwh`).
///
/// # Errors
///
/// `Csv` for malformed rows.
pub fn read_electricity<R: Read>(
    input: R,
    year: i32,
    origin: &str,
) -> Result<Vec<ConsumptionRecord>, LoadError> {
    let records = rows::<ElectricityRow, _>(input, origin)?
        .into_iter()
        .map(|(_, row)| {
            let record = ConsumptionRecord::new(
                Sector::Electricity,
                row.category,
                Fuel::Electricity,
                row.energy_kwh,
                Unit::Kwh,
                year,
            );
            match row.super_category {
                Some(s) => record.with_super_category(s),
                None => record,
            }
        })
        .collect();
    Ok(records)
}

/// Reads vehicle class rows (`category,count,diesel_t,petrol_t,lpg_t,diesel_l`).
///
/// # Errors
///
/// `Csv` for malformed rows.
pub fn read_transport<R: Read>(input: R, origin: &str) -> Result<Vec<VehicleClassRow>, LoadError> {
    Ok(rows::<VehicleClassRow, _>(input, origin)?
        .into_iter()
        .map(|(_, row)| row)
        .collect())
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn origin(path: &Path) -> String {
    path.display().to_string()
}

/// Loads a heat CSV file.
pub fn load_heat(path: &Path, year: i32) -> Result<Vec<ConsumptionRecord>, LoadError> {
    read_heat(open(path)?, year, &origin(path))
}

/// Loads an electricity CSV file.
pub fn load_electricity(path: &Path, year: i32) -> Result<Vec<ConsumptionRecord>, LoadError> {
    read_electricity(open(path)?, year, &origin(path))
}

/// Loads a transport CSV file.
pub fn load_transport(path: &Path) -> Result<Vec<VehicleClassRow>, LoadError> {
    read_transport(open(path)?, &origin(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heat_rows_parse_with_missing_cells() {
        let csv = "super_category,category,fuel,energy_kwh\n\
                   public,schools,natural gas,1200.5\n\
                   public,schools,wood,\n\
                   ,housing,heating-oil,300\n";
        let records = read_heat(csv.as_bytes(), 2019, "heat.csv").unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].fuel, Fuel::NaturalGas);
        assert_eq!(records[0].super_category.as_deref(), Some("public"));
        assert_eq!(records[1].quantity, None);
        assert_eq!(records[2].super_category, None);
        assert!(records.iter().all(|r| r.unit == Unit::Kwh && r.year == 2019));
    }

    #[test]
    fn unknown_fuel_reports_line() {
        let csv = "super_category,category,fuel,energy_kwh\n\
                   public,schools,coal,10\n";
        let err = read_heat(csv.as_bytes(), 2019, "heat.csv").err();
        match err {
            Some(LoadError::Record { line, source, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(source, InventoryError::UnknownFuel("coal".into()));
            }
            other => panic!("expected record error, got {other:?}"),
        }
    }

    #[test]
    fn electricity_rows_are_electric() {
        let csv = "super_category,category,energy_kwh\n\
                   public,street,5000\n";
        let records =
            read_electricity(csv.as_bytes(), 2011, "ele.csv").unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(records[0].fuel, Fuel::Electricity);
        assert_eq!(records[0].sector, Sector::Electricity);
        assert_eq!(records[0].quantity, Some(5000.0));
    }

    #[test]
    fn transport_rows_keep_empty_cells() {
        let csv = "category,count,diesel_t,petrol_t,lpg_t,diesel_l\n\
                   passenger cars,1000,400.5,300,12,\n\
                   taxi,20,,,,15000\n";
        let rows = read_transport(csv.as_bytes(), "trans.csv").unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].diesel_l, None);
        assert_eq!(rows[1].diesel_t, None);
        assert_eq!(rows[1].diesel_l, Some(15000.0));
    }

    #[test]
    fn malformed_number_is_a_csv_error() {
        let csv = "category,count,diesel_t,petrol_t,lpg_t,diesel_l\n\
                   buses,many,1,2,3,\n";
        assert!(matches!(
            read_transport(csv.as_bytes(), "trans.csv"),
            Err(LoadError::Csv { .. })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_transport(Path::new("/nonexistent/transport.csv"));
        assert!(matches!(err, Err(LoadError::Io { .. })));
    }
}
