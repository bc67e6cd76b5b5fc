// AudSleuth - main.rs
//
// Application entry point. Handles:
// 1. CLI argument parsing
// 2. config.toml loading and logging initialisation
// 3. Merging CLI values over config values into a validated run config
// 4. Running the pipeline and mapping errors to exit codes

use audsleuth::app::run::{self, RunConfig};
use audsleuth::core::discovery::DiscoveryConfig;
use audsleuth::core::export::{ExportConfig, WriteMode};
use audsleuth::core::filter::{FilterCategory, FilterSpec};
use audsleuth::core::projection::ProjectionSpec;
use audsleuth::platform::config::{load_config, AppConfig, PlatformPaths};
use audsleuth::util::{self, constants, error::AudSleuthError};
use clap::Parser;
use std::path::PathBuf;

/// AudSleuth - decoder and exporter for binary SAP security audit logs.
///
/// Point AudSleuth at audit files or directories to filter the decoded
/// records and print them or export them to CSV and xlsx.
#[derive(Parser, Debug)]
#[command(name = "audsleuth", version, about)]
struct Cli {
    /// Audit files or directories to scan.
    #[arg(long = "aud", num_args = 1.., default_value = constants::DEFAULT_INPUT_PATH)]
    paths: Vec<PathBuf>,

    /// Columns to drop: date time client login terminal tcode report typecon
    /// param eventid osid sapid sapidhex termcut sessionid. Given without
    /// keys, every column is kept.
    #[arg(long, num_args = 0..)]
    remove: Option<Vec<String>>,

    /// Terminal or remote host substrings.
    #[arg(long, num_args = 1..)]
    terminal: Vec<String>,

    /// Login substrings.
    #[arg(long, num_args = 1..)]
    login: Vec<String>,

    /// Transaction code substrings (also searched in parameters).
    #[arg(long, num_args = 1..)]
    tcode: Vec<String>,

    /// Report/program substrings.
    #[arg(long, num_args = 1..)]
    report: Vec<String>,

    /// Client substrings.
    #[arg(long, num_args = 1..)]
    client: Vec<String>,

    /// Connection type substrings.
    #[arg(long, num_args = 1..)]
    typecon: Vec<String>,

    /// Emit a header row before the first data row.
    #[arg(long)]
    header: bool,

    /// Print rows to stdout, tab-separated.
    #[arg(long)]
    print: bool,

    /// Export to <export-name>.csv.
    #[arg(long)]
    csv: bool,

    /// Export to <export-name>.xlsx.
    #[arg(long)]
    excel: bool,

    /// Output base name without extension.
    #[arg(long = "export-name")]
    export_name: Option<String>,

    /// Truncate existing exports instead of appending.
    #[arg(long)]
    overwrite: bool,

    /// Do not descend into subdirectories.
    #[arg(long)]
    shallow: bool,

    /// Path to config.toml (default: platform config directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();

    // Config is read before logging exists; its warnings are replayed once
    // the subscriber is installed.
    let (config_path, explicit) = match cli.config.clone() {
        Some(path) => (path, true),
        None => (PlatformPaths::resolve().config_file(), false),
    };
    let loaded = load_config(&config_path, explicit);
    let config_level = loaded
        .as_ref()
        .ok()
        .and_then(|(config, _)| config.log_level.clone());
    util::logging::init(cli.debug, config_level.as_deref());

    tracing::info!(
        version = constants::APP_VERSION,
        debug = cli.debug,
        "{} starting",
        constants::APP_NAME
    );

    let result = loaded
        .map_err(AudSleuthError::from)
        .and_then(|(config, warnings)| {
            for warning in &warnings {
                tracing::warn!(warning = %warning, "Config");
            }
            build_run_config(cli, config)
        })
        .and_then(run::run);

    match result {
        Ok(summary) => {
            println!("Collected rows: {}", summary.total_rows);
        }
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            eprintln!("Error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}

/// Merge CLI values over config values. Column keys and filter categories
/// are resolved here so unknown names fail before any file is opened.
fn build_run_config(cli: Cli, config: AppConfig) -> Result<RunConfig, AudSleuthError> {
    let projection = match cli.remove.as_ref().or(config.remove.as_ref()) {
        Some(keys) => ProjectionSpec::from_keys(keys)?,
        None => ProjectionSpec::default(),
    };

    let mut filters = FilterSpec::default();
    for (key, patterns) in config.filters {
        filters.set(&key, patterns)?;
    }
    let cli_filters = [
        (FilterCategory::ConnectionType, cli.typecon),
        (FilterCategory::Terminal, cli.terminal),
        (FilterCategory::Login, cli.login),
        (FilterCategory::TransactionCode, cli.tcode),
        (FilterCategory::Report, cli.report),
        (FilterCategory::Client, cli.client),
    ];
    for (category, patterns) in cli_filters {
        if !patterns.is_empty() {
            filters.set(category.key(), patterns)?;
        }
    }

    let discovery = DiscoveryConfig {
        marker: config.marker,
        recursive: config.recursive && !cli.shallow,
        max_depth: config.max_depth,
    };

    let export = ExportConfig {
        header: cli.header,
        display: cli.print,
        text: cli.csv,
        spreadsheet: cli.excel,
        export_name: cli.export_name.unwrap_or(config.export_name),
        mode: if cli.overwrite {
            WriteMode::Truncate
        } else {
            WriteMode::Append
        },
        rows_per_sheet: config.rows_per_sheet,
        sheet_prefix: config.sheet_prefix,
    };

    Ok(RunConfig {
        inputs: cli.paths,
        discovery,
        filters,
        projection,
        export,
    })
}
