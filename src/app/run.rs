// AudSleuth - app/run.rs
//
// Whole-run orchestration: discovery -> per-file detection -> streaming
// decode -> filter -> projection -> export. Export state is shared by every
// file of the run; the first detection failure aborts the run.

use crate::core::decoder::RecordReader;
use crate::core::detect::detect_layout;
use crate::core::discovery::{discover_inputs, DiscoveryConfig};
use crate::core::export::{ExportConfig, ExportPipeline};
use crate::core::filter::{self, FilterSpec};
use crate::core::model::{FileSummary, Row, RunSummary};
use crate::core::projection::ProjectionSpec;
use crate::util::error::{AudSleuthError, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Everything a run needs, already validated.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Files and/or directories to process.
    pub inputs: Vec<PathBuf>,
    pub discovery: DiscoveryConfig,
    pub filters: FilterSpec,
    pub projection: ProjectionSpec,
    pub export: ExportConfig,
}

/// Execute a run with sinks built from `config.export`.
pub fn run(config: RunConfig) -> Result<RunSummary> {
    let pipeline = ExportPipeline::new(config.export.clone(), config.projection.clone());
    run_with_pipeline(config, pipeline)
}

/// Execute a run writing to a caller-supplied pipeline.
pub fn run_with_pipeline(config: RunConfig, mut pipeline: ExportPipeline) -> Result<RunSummary> {
    let started = Instant::now();

    tracing::info!(
        inputs = ?config.inputs,
        filters = ?config.filters.active_categories().collect::<Vec<_>>(),
        excluded = ?config.projection.excluded().collect::<Vec<_>>(),
        "Run starting"
    );
    if config.projection.retained().is_empty() {
        tracing::warn!("Every column is excluded; exported rows will be empty");
    }
    if !config.export.any_sink() {
        tracing::info!("No output selected; use --csv, --excel or --print to see rows");
    }

    let discovered = discover_inputs(&config.inputs, &config.discovery)?;
    for warning in &discovered.warnings {
        tracing::warn!(warning = %warning, "Discovery");
    }

    let mut summary = RunSummary::default();
    for path in &discovered.files {
        let (file_summary, rows) = scan_file(path, &config.filters, &config.projection)?;
        pipeline.append(&rows)?;
        summary.total_rows += file_summary.rows_kept as u64;
        summary.file_summaries.push(file_summary);
    }

    let outcome = pipeline.finish()?;
    summary.sheets_used = outcome.sheets_used;
    summary.duration = started.elapsed();

    tracing::info!(
        files = summary.files_processed(),
        rows = summary.total_rows,
        sheets = summary.sheets_used,
        elapsed_ms = summary.duration.as_millis() as u64,
        "Run complete"
    );
    Ok(summary)
}

/// Decode one file and return its projected, filtered rows.
pub fn scan_file(
    path: &Path,
    filters: &FilterSpec,
    projection: &ProjectionSpec,
) -> Result<(FileSummary, Vec<Row>)> {
    let file = File::open(path).map_err(|source| AudSleuthError::Io {
        path: path.to_path_buf(),
        operation: "open",
        source,
    })?;
    let mut reader = BufReader::new(file);
    let layout = detect_layout(&mut reader, path)?;

    let mut records = RecordReader::new(reader, layout);
    let mut rows = Vec::new();
    for record in records.by_ref() {
        let record = record.map_err(|source| AudSleuthError::Io {
            path: path.to_path_buf(),
            operation: "read",
            source,
        })?;
        if filter::matches(&record, filters) {
            rows.push(projection.project(Row::from(record)));
        }
    }

    let summary = FileSummary {
        path: path.to_path_buf(),
        layout,
        blocks_decoded: records.blocks_read(),
        rows_kept: rows.len(),
        trailing_bytes: records.trailing_bytes(),
    };
    tracing::info!(
        file = %path.display(),
        layout = %layout,
        blocks = summary.blocks_decoded,
        rows = summary.rows_kept,
        trailing_bytes = summary.trailing_bytes,
        "File decoded"
    );
    Ok((summary, rows))
}
