//! Inventory entry point: CLI wiring, pipeline run and report output.

use std::path::Path;
use std::process;

use ghg_inventory::config::InventoryConfig;
use ghg_inventory::io::export::{export_json, export_projection_csv, export_snapshot_csv};
use ghg_inventory::report::InventoryReport;
use ghg_inventory::runner::{InventoryRun, ScenarioOutcome, run_inventory};
use tracing_subscriber::EnvFilter;

/// Parsed CLI arguments.
struct CliArgs {
    config_path: Option<String>,
    preset: Option<String>,
    target_year: Option<i32>,
    snapshot_csv: Option<String>,
    projection_csv: Option<String>,
    json_out: Option<String>,
    summary_only: bool,
}

fn print_help() {
    eprintln!("ghg-inventory: municipal energy and CO2 inventory");
    eprintln!();
    eprintln!("Usage: ghg-inventory [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <path>           Load inventory from TOML config file");
    eprintln!("  --preset <name>           Use a built-in preset (demo, demo_reported_fleet)");
    eprintln!("  --target-year <i32>       Override projection target year");
    eprintln!("  --snapshot-csv <path>     Export both snapshots as long-format CSV");
    eprintln!("  --projection-csv <path>   Export scenario projections as CSV");
    eprintln!("  --json <path>             Export the full run as JSON");
    eprintln!("  --summary                 Print only the headline report");
    eprintln!("  --help                    Show this help message");
    eprintln!();
    eprintln!("If no --config or --preset is given, the demo preset is used.");
    eprintln!("Log verbosity follows RUST_LOG (default: warn).");
}

fn value_of(args: &[String], i: usize, flag: &str, what: &str) -> String {
    match args.get(i) {
        Some(v) => v.clone(),
        None => {
            eprintln!("error: {flag} requires a {what} argument");
            process::exit(1);
        }
    }
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        config_path: None,
        preset: None,
        target_year: None,
        snapshot_csv: None,
        projection_csv: None,
        json_out: None,
        summary_only: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--config" => {
                i += 1;
                cli.config_path = Some(value_of(&args, i, "--config", "path"));
            }
            "--preset" => {
                i += 1;
                cli.preset = Some(value_of(&args, i, "--preset", "name"));
            }
            "--target-year" => {
                i += 1;
                let raw = value_of(&args, i, "--target-year", "year");
                if let Ok(y) = raw.parse::<i32>() {
                    cli.target_year = Some(y);
                } else {
                    eprintln!("error: --target-year value \"{raw}\" is not a valid year");
                    process::exit(1);
                }
            }
            "--snapshot-csv" => {
                i += 1;
                cli.snapshot_csv = Some(value_of(&args, i, "--snapshot-csv", "path"));
            }
            "--projection-csv" => {
                i += 1;
                cli.projection_csv = Some(value_of(&args, i, "--projection-csv", "path"));
            }
            "--json" => {
                i += 1;
                cli.json_out = Some(value_of(&args, i, "--json", "path"));
            }
            "--summary" => {
                cli.summary_only = true;
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_details(run: &InventoryRun) {
    for comparison in &run.comparisons {
        println!("{comparison}\n");
    }
    for outcome in &run.outcomes {
        match outcome {
            ScenarioOutcome::Projected(p) => println!("{p}\n"),
            ScenarioOutcome::Failed { scenario, error } => {
                eprintln!("error: scenario \"{scenario}\" failed: {error}");
            }
        }
    }
}

fn write_exports(cli: &CliArgs, run: &InventoryRun) -> Result<(), String> {
    if let Some(ref path) = cli.snapshot_csv {
        export_snapshot_csv(&[&run.base, &run.recent], Path::new(path))
            .map_err(|e| format!("failed to write {path}: {e}"))?;
        eprintln!("Snapshots written to {path}");
    }
    if let Some(ref path) = cli.projection_csv {
        let projections: Vec<_> = run.projections().collect();
        export_projection_csv(&projections, Path::new(path))
            .map_err(|e| format!("failed to write {path}: {e}"))?;
        eprintln!("Projections written to {path}");
    }
    if let Some(ref path) = cli.json_out {
        export_json(run, Path::new(path)).map_err(|e| format!("failed to write {path}: {e}"))?;
        eprintln!("Run written to {path}");
    }
    Ok(())
}

fn main() {
    init_logging();
    let cli = parse_args();

    // Load config: --config takes priority, then --preset, then the demo
    let loaded = if let Some(ref path) = cli.config_path {
        InventoryConfig::from_toml_file(Path::new(path))
    } else if let Some(ref name) = cli.preset {
        InventoryConfig::from_preset(name)
    } else {
        Ok(InventoryConfig::demo())
    };
    let mut config = loaded.unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    if let Some(year) = cli.target_year {
        config.projection.target_year = year;
    }

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let run = run_inventory(&config).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    });

    if !cli.summary_only {
        print_details(&run);
    }
    println!("{}", InventoryReport::from_run(&run));

    if let Err(e) = write_exports(&cli, &run) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
