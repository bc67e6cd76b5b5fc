// AudSleuth - core/export.rs
//
// Export sinks for projected rows:
//   - delimited text (`;`-joined, trailing delimiter, no quoting)
//   - paginated spreadsheet (fixed per-sheet row cap, state carried across
//     input files, optional resume from an existing workbook)
//   - direct display (tab-separated on stdout)
//
// Sinks are opened lazily on the first append and released by `finish`.
// The spreadsheet sink also saves on drop so an aborted run still leaves
// the rows written so far on disk.

use crate::core::model::Row;
use crate::core::projection::ProjectionSpec;
use crate::util::constants;
use crate::util::error::ExportError;
use calamine::{open_workbook, Data, Reader, Xlsx};
use rust_xlsxwriter::{Workbook, Worksheet};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

// =============================================================================
// Configuration
// =============================================================================

/// How existing export files are treated when a run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Continue after existing content.
    #[default]
    Append,
    /// Start from an empty file.
    Truncate,
}

/// Run-level export settings. Each sink is independently enabled.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Inject a header row once, before the first file's rows.
    pub header: bool,
    /// Write rows tab-separated to stdout.
    pub display: bool,
    /// Write `<export_name>.csv`.
    pub text: bool,
    /// Write `<export_name>.xlsx`.
    pub spreadsheet: bool,
    /// Output base name (path without extension).
    pub export_name: String,
    /// Append to or truncate existing output files.
    pub mode: WriteMode,
    /// Row cap per worksheet.
    pub rows_per_sheet: u32,
    /// Worksheet name prefix; the sheet index is appended.
    pub sheet_prefix: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            header: false,
            display: false,
            text: false,
            spreadsheet: false,
            export_name: constants::DEFAULT_EXPORT_NAME.to_string(),
            mode: WriteMode::default(),
            rows_per_sheet: constants::DEFAULT_ROWS_PER_SHEET,
            sheet_prefix: constants::DEFAULT_SHEET_PREFIX.to_string(),
        }
    }
}

impl ExportConfig {
    pub fn text_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.{}", self.export_name, constants::TEXT_EXTENSION))
    }

    pub fn sheet_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.{}", self.export_name, constants::SHEET_EXTENSION))
    }

    /// True when at least one sink is enabled.
    pub fn any_sink(&self) -> bool {
        self.display || self.text || self.spreadsheet
    }
}

// =============================================================================
// Delimited-text sink
// =============================================================================

/// Writes each row as `v1;v2;...;vn;\n`. Values are written verbatim; a row
/// with no columns is a bare `\n`.
pub struct TextSink<W: Write> {
    /// Only `None` while an empty row is written straight to the inner writer.
    writer: Option<csv::Writer<W>>,
    path: PathBuf,
}

impl TextSink<File> {
    /// Open `path` once for the whole run, appending or truncating.
    pub fn open(path: &Path, mode: WriteMode) -> Result<Self, ExportError> {
        let mut options = OpenOptions::new();
        options.create(true);
        match mode {
            WriteMode::Append => options.append(true),
            WriteMode::Truncate => options.write(true).truncate(true),
        };
        let file = options.open(path).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), ?mode, "Text export opened");
        Ok(Self::from_writer(file, path))
    }
}

impl<W: Write> TextSink<W> {
    /// Wrap any writer; `path` is only used for error context.
    pub fn from_writer(writer: W, path: &Path) -> Self {
        Self {
            writer: Some(text_writer(writer)),
            path: path.to_path_buf(),
        }
    }

    pub fn write_row(&mut self, row: &Row) -> Result<(), ExportError> {
        if row.is_empty() {
            return self.write_empty_row();
        }
        // The trailing empty field produces the trailing delimiter.
        let fields = row
            .values()
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(""));
        self.writer_mut()?
            .write_record(fields)
            .map_err(|source| ExportError::Csv {
                path: self.path.clone(),
                source,
            })
    }

    /// The csv writer quotes a lone empty record as `""`, so an empty row
    /// bypasses it: flush, write the newline, then rewrap.
    fn write_empty_row(&mut self) -> Result<(), ExportError> {
        let writer = self.writer.take().ok_or_else(|| self.closed_error())?;
        let mut inner = match writer.into_inner() {
            Ok(inner) => inner,
            Err(e) => {
                let source = io::Error::new(e.error().kind(), e.error().to_string());
                self.writer = Some(e.into_inner());
                return Err(ExportError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let written = inner.write_all(b"\n");
        self.writer = Some(text_writer(inner));
        written.map_err(|source| ExportError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn writer_mut(&mut self) -> Result<&mut csv::Writer<W>, ExportError> {
        match self.writer {
            Some(ref mut writer) => Ok(writer),
            None => Err(self.closed_error()),
        }
    }

    fn closed_error(&self) -> ExportError {
        ExportError::Io {
            path: self.path.clone(),
            source: io::Error::new(io::ErrorKind::BrokenPipe, "text sink writer unavailable"),
        }
    }

    /// Flush buffered rows and hand back the underlying writer.
    pub fn finish(mut self) -> Result<W, ExportError> {
        let writer = self.writer.take().ok_or_else(|| self.closed_error())?;
        let path = self.path;
        writer.into_inner().map_err(|e| ExportError::Io {
            path,
            source: io::Error::new(e.error().kind(), e.error().to_string()),
        })
    }
}

fn text_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(constants::TEXT_DELIMITER)
        .quote_style(csv::QuoteStyle::Never)
        .terminator(csv::Terminator::Any(b'\n'))
        .flexible(true)
        .has_headers(false)
        .from_writer(writer)
}

// =============================================================================
// Direct-display sink
// =============================================================================

/// Writes each value followed by a tab, one row per line.
pub struct DisplaySink<W: Write> {
    out: W,
}

impl<W: Write> DisplaySink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn write_row(&mut self, row: &Row) -> io::Result<()> {
        for value in row.values() {
            write!(self.out, "{value}\t")?;
        }
        writeln!(self.out)
    }

    pub fn finish(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

// =============================================================================
// Paginated spreadsheet output
// =============================================================================

/// Destination of paginated rows: append one row of strings at a given
/// position of a named sheet.
pub trait SheetSink {
    /// Write `values` into row `row` (zero-based) of sheet `sheet`,
    /// creating the sheet on first use.
    fn write_row(&mut self, sheet: &str, row: u32, values: &[String]) -> Result<(), ExportError>;

    /// Persist everything written so far.
    fn finish(&mut self) -> Result<(), ExportError>;
}

impl<S: SheetSink + ?Sized> SheetSink for Box<S> {
    fn write_row(&mut self, sheet: &str, row: u32, values: &[String]) -> Result<(), ExportError> {
        (**self).write_row(sheet, row, values)
    }

    fn finish(&mut self) -> Result<(), ExportError> {
        (**self).finish()
    }
}

/// Pagination state carried across every input file of a run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExportState {
    /// Zero-based index of the active sheet.
    pub sheet_index: usize,
    /// Name of the active sheet.
    pub sheet_name: String,
    /// Rows already occupied on the active sheet.
    pub row_offset: u32,
    /// Rows written by this run (header included).
    pub total_rows: u64,
}

/// Splits a row stream over sequentially numbered sheets of at most
/// `rows_per_sheet` rows each.
pub struct SheetExporter<S: SheetSink> {
    sink: S,
    state: ExportState,
    rows_per_sheet: u32,
    prefix: String,
    sheets_touched: usize,
}

impl<S: SheetSink> SheetExporter<S> {
    /// Start on sheet 0 at row 0.
    pub fn new(sink: S, rows_per_sheet: u32, prefix: &str) -> Self {
        let state = ExportState {
            sheet_index: 0,
            sheet_name: sheet_name(prefix, 0),
            row_offset: 0,
            total_rows: 0,
        };
        Self::resume(sink, state, rows_per_sheet, prefix)
    }

    /// Continue from a known position, e.g. the tail of an existing workbook.
    pub fn resume(sink: S, state: ExportState, rows_per_sheet: u32, prefix: &str) -> Self {
        tracing::debug!(
            sheet = %state.sheet_name,
            row_offset = state.row_offset,
            rows_per_sheet,
            "Sheet pagination initialised"
        );
        Self {
            sink,
            state,
            rows_per_sheet: rows_per_sheet.max(1),
            prefix: prefix.to_string(),
            sheets_touched: 0,
        }
    }

    pub fn state(&self) -> &ExportState {
        &self.state
    }

    /// Distinct sheets written to by this exporter.
    pub fn sheets_touched(&self) -> usize {
        self.sheets_touched
    }

    /// Append `rows` in order, rolling over to a fresh sheet whenever the
    /// active one is full. A new sheet is only created when a row needs it.
    pub fn append(&mut self, rows: &[Row]) -> Result<(), ExportError> {
        for row in rows {
            if self.state.row_offset >= self.rows_per_sheet {
                let closed = std::mem::take(&mut self.state.sheet_name);
                self.state.sheet_index += 1;
                self.state.sheet_name = sheet_name(&self.prefix, self.state.sheet_index);
                self.state.row_offset = 0;
                tracing::info!(
                    closed = %closed,
                    next = %self.state.sheet_name,
                    "Sheet row cap reached; continuing on a new sheet"
                );
            }
            if self.state.row_offset == 0 || self.sheets_touched == 0 {
                self.sheets_touched += 1;
            }
            self.sink
                .write_row(&self.state.sheet_name, self.state.row_offset, row.values())?;
            self.state.row_offset += 1;
            self.state.total_rows += 1;
        }
        Ok(())
    }

    /// Persist the sink and return the final state.
    pub fn finish(mut self) -> Result<(ExportState, usize), ExportError> {
        self.sink.finish()?;
        Ok((self.state, self.sheets_touched))
    }
}

/// `<prefix><index>`, e.g. `sheet_0`.
pub fn sheet_name(prefix: &str, index: usize) -> String {
    format!("{prefix}{index}")
}

// =============================================================================
// xlsx workbook sink
// =============================================================================

/// `SheetSink` backed by an xlsx workbook written on `finish`.
pub struct XlsxSink {
    path: PathBuf,
    workbook: Workbook,
    /// Sheet name -> worksheet index in `workbook`.
    sheets: HashMap<String, usize>,
    saved: bool,
}

impl XlsxSink {
    /// Fresh, empty workbook to be written at `path`.
    pub fn create(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            workbook: Workbook::new(),
            sheets: HashMap::new(),
            saved: false,
        }
    }

    /// Open the workbook for a run. In append mode an existing file is read
    /// back and the returned state points at the end of its last sheet;
    /// otherwise a new workbook starts at sheet 0.
    pub fn open(
        path: &Path,
        mode: WriteMode,
        prefix: &str,
    ) -> Result<(Self, Option<ExportState>), ExportError> {
        let mut sink = Self::create(path);
        if mode == WriteMode::Append && path.is_file() {
            let state = sink.load_existing(prefix)?;
            tracing::info!(
                path = %path.display(),
                sheet = %state.sheet_name,
                row_offset = state.row_offset,
                "Appending to existing workbook"
            );
            return Ok((sink, Some(state)));
        }
        tracing::info!(path = %path.display(), ?mode, "Spreadsheet export opened");
        Ok((sink, None))
    }

    /// Copy every sheet of the existing workbook into this one and report
    /// where appending should continue.
    fn load_existing(&mut self, prefix: &str) -> Result<ExportState, ExportError> {
        let read_err = |source| ExportError::WorkbookRead {
            path: self.path.clone(),
            source,
        };
        let mut existing: Xlsx<_> = open_workbook(&self.path).map_err(read_err)?;
        let names = existing.sheet_names();

        let mut last_rows = 0u32;
        for name in &names {
            let range = existing.worksheet_range(name).map_err(|source| {
                ExportError::WorkbookRead {
                    path: self.path.clone(),
                    source,
                }
            })?;
            let (path, worksheet) = (self.path.clone(), self.worksheet(name)?);
            if let Some((row0, col0)) = range.start() {
                for (r, c, cell) in range.used_cells() {
                    let row = row0 + r as u32;
                    let col = (col0 as usize + c) as u16;
                    copy_cell(worksheet, row, col, cell).map_err(|source| ExportError::Xlsx {
                        path: path.clone(),
                        source,
                    })?;
                }
            }
            last_rows = range.end().map(|(row, _)| row + 1).unwrap_or(0);
        }

        Ok(match names.last() {
            Some(last) => ExportState {
                sheet_index: names.len() - 1,
                sheet_name: last.clone(),
                row_offset: last_rows,
                total_rows: 0,
            },
            None => ExportState {
                sheet_name: sheet_name(prefix, 0),
                ..Default::default()
            },
        })
    }

    /// Worksheet named `name`, added on first use.
    fn worksheet(&mut self, name: &str) -> Result<&mut Worksheet, ExportError> {
        let xlsx_err = |path: &Path, source| ExportError::Xlsx {
            path: path.to_path_buf(),
            source,
        };
        let index = match self.sheets.get(name) {
            Some(index) => *index,
            None => {
                if name.chars().count() > constants::MAX_SHEET_NAME_LEN {
                    return Err(ExportError::SheetLimit {
                        sheet: name.to_string(),
                        reason: format!(
                            "name exceeds {} characters",
                            constants::MAX_SHEET_NAME_LEN
                        ),
                    });
                }
                let index = self.sheets.len();
                self.workbook
                    .add_worksheet()
                    .set_name(name)
                    .map_err(|e| xlsx_err(&self.path, e))?;
                self.sheets.insert(name.to_string(), index);
                tracing::debug!(sheet = name, index, "Worksheet created");
                index
            }
        };
        self.workbook
            .worksheet_from_index(index)
            .map_err(|e| xlsx_err(&self.path, e))
    }

    fn save(&mut self) -> Result<(), ExportError> {
        self.workbook
            .save(&self.path)
            .map_err(|source| ExportError::Xlsx {
                path: self.path.clone(),
                source,
            })?;
        self.saved = true;
        tracing::info!(
            path = %self.path.display(),
            sheets = self.sheets.len(),
            "Workbook saved"
        );
        Ok(())
    }
}

impl SheetSink for XlsxSink {
    fn write_row(&mut self, sheet: &str, row: u32, values: &[String]) -> Result<(), ExportError> {
        let path = self.path.clone();
        let worksheet = self.worksheet(sheet)?;
        for (col, value) in values.iter().enumerate() {
            worksheet
                .write_string(row, col as u16, value.as_str())
                .map_err(|source| ExportError::Xlsx {
                    path: path.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ExportError> {
        self.save()
    }
}

impl Drop for XlsxSink {
    fn drop(&mut self) {
        if self.saved || self.sheets.is_empty() {
            return;
        }
        tracing::warn!(
            path = %self.path.display(),
            "Run ended early; saving rows written so far"
        );
        if let Err(e) = self.save() {
            tracing::warn!(error = %e, "Failed to save workbook on early exit");
        }
    }
}

/// Copy one cell read back from an existing workbook, keeping numbers and
/// booleans typed.
fn copy_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &Data,
) -> Result<(), rust_xlsxwriter::XlsxError> {
    match cell {
        Data::Empty => {}
        Data::Float(f) => {
            worksheet.write_number(row, col, *f)?;
        }
        Data::Int(i) => {
            worksheet.write_number(row, col, *i as f64)?;
        }
        Data::Bool(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        other => {
            worksheet.write_string(row, col, other.to_string().as_str())?;
        }
    }
    Ok(())
}

// =============================================================================
// Export pipeline
// =============================================================================

/// Outcome of a finished export.
#[derive(Debug, Clone, Default)]
pub struct ExportOutcome {
    /// Final pagination state, when the spreadsheet sink was used.
    pub sheet_state: Option<ExportState>,
    /// Distinct worksheets written to.
    pub sheets_used: usize,
}

/// Fans projected rows out to every enabled sink and owns the run's
/// pagination state.
pub struct ExportPipeline {
    config: ExportConfig,
    projection: ProjectionSpec,
    text: Option<TextSink<File>>,
    sheets: Option<SheetExporter<Box<dyn SheetSink>>>,
    display: Option<DisplaySink<Box<dyn Write>>>,
    display_out: Option<Box<dyn Write>>,
    opened: bool,
    header_written: bool,
}

impl ExportPipeline {
    /// Nothing is opened until the first `append`.
    pub fn new(config: ExportConfig, projection: ProjectionSpec) -> Self {
        Self {
            config,
            projection,
            text: None,
            sheets: None,
            display: None,
            display_out: None,
            opened: false,
            header_written: false,
        }
    }

    /// Send direct-display output somewhere other than stdout.
    pub fn with_display_writer(mut self, out: Box<dyn Write>) -> Self {
        self.display_out = Some(out);
        self
    }

    /// Use `sink` instead of an xlsx file for spreadsheet output, optionally
    /// resuming from `state`.
    pub fn with_sheet_sink(mut self, sink: Box<dyn SheetSink>, state: Option<ExportState>) -> Self {
        let rows = self.config.rows_per_sheet;
        let prefix = self.config.sheet_prefix.clone();
        self.sheets = Some(match state {
            Some(state) => SheetExporter::resume(sink, state, rows, &prefix),
            None => SheetExporter::new(sink, rows, &prefix),
        });
        self
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    fn ensure_open(&mut self) -> Result<(), ExportError> {
        if self.opened {
            return Ok(());
        }
        if self.config.text {
            self.text = Some(TextSink::open(&self.config.text_path(), self.config.mode)?);
        }
        if self.config.spreadsheet && self.sheets.is_none() {
            let (sink, state) = XlsxSink::open(
                &self.config.sheet_path(),
                self.config.mode,
                &self.config.sheet_prefix,
            )?;
            let rows = self.config.rows_per_sheet;
            let prefix = &self.config.sheet_prefix;
            let sink: Box<dyn SheetSink> = Box::new(sink);
            self.sheets = Some(match state {
                Some(state) => SheetExporter::resume(sink, state, rows, prefix),
                None => SheetExporter::new(sink, rows, prefix),
            });
        }
        if self.config.display {
            let out = self
                .display_out
                .take()
                .unwrap_or_else(|| Box::new(BufWriter::new(io::stdout())) as Box<dyn Write>);
            self.display = Some(DisplaySink::new(out));
        }
        self.opened = true;
        Ok(())
    }

    /// Write one file's projected rows to every enabled sink. The header
    /// row, when enabled, precedes the first batch of the run.
    pub fn append(&mut self, rows: &[Row]) -> Result<(), ExportError> {
        self.ensure_open()?;

        let header = if self.config.header && !self.header_written {
            self.header_written = true;
            Some(self.projection.project(Row::header()))
        } else {
            None
        };
        let batch: Vec<&Row> = header.iter().chain(rows.iter()).collect();

        if let Some(text) = self.text.as_mut() {
            for row in &batch {
                text.write_row(row)?;
            }
        }
        if let Some(sheets) = self.sheets.as_mut() {
            match header {
                Some(ref header) => {
                    sheets.append(std::slice::from_ref(header))?;
                    sheets.append(rows)?;
                }
                None => sheets.append(rows)?,
            }
        }
        if let Some(display) = self.display.as_mut() {
            for row in &batch {
                display.write_row(row).map_err(|source| ExportError::Io {
                    path: PathBuf::from("<stdout>"),
                    source,
                })?;
            }
        }
        Ok(())
    }

    /// Flush and close every sink that was opened.
    pub fn finish(self) -> Result<ExportOutcome, ExportError> {
        let mut outcome = ExportOutcome::default();
        if let Some(text) = self.text {
            let path = self.config.text_path();
            let file = text.finish()?;
            file.sync_all()
                .map_err(|source| ExportError::Io { path, source })?;
        }
        if let Some(sheets) = self.sheets {
            let (state, touched) = sheets.finish()?;
            outcome.sheet_state = Some(state);
            outcome.sheets_used = touched;
        }
        if let Some(display) = self.display {
            display.finish().map_err(|source| ExportError::Io {
                path: PathBuf::from("<stdout>"),
                source,
            })?;
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{FieldId, Record};
    use std::sync::{Arc, Mutex};

    /// Counts rows per sheet without storing values.
    #[derive(Default)]
    struct CountingSink {
        rows: Vec<(String, u32)>,
        last_row: HashMap<String, u32>,
        finished: bool,
    }

    impl CountingSink {
        fn occupied(&self, sheet: &str) -> u32 {
            self.last_row.get(sheet).map(|r| r + 1).unwrap_or(0)
        }
    }

    impl SheetSink for CountingSink {
        fn write_row(&mut self, sheet: &str, row: u32, _values: &[String]) -> Result<(), ExportError> {
            if self.rows.len() < 16 {
                self.rows.push((sheet.to_string(), row));
            }
            match self.last_row.get_mut(sheet) {
                Some(last) => *last = row,
                None => {
                    self.last_row.insert(sheet.to_string(), row);
                }
            }
            Ok(())
        }

        fn finish(&mut self) -> Result<(), ExportError> {
            self.finished = true;
            Ok(())
        }
    }

    /// Shared handle so tests can inspect a sink moved into an exporter.
    #[derive(Default, Clone)]
    struct SharedSink(Arc<Mutex<CountingSink>>);

    impl SheetSink for SharedSink {
        fn write_row(&mut self, sheet: &str, row: u32, values: &[String]) -> Result<(), ExportError> {
            self.0.lock().unwrap().write_row(sheet, row, values)
        }

        fn finish(&mut self) -> Result<(), ExportError> {
            self.0.lock().unwrap().finish()
        }
    }

    /// In-memory `Write` shared with the test body.
    #[derive(Default, Clone)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn make_row(login: &str) -> Row {
        Row::from(Record::from_fields([
            (FieldId::Date, "2024.05.01".to_string()),
            (FieldId::Login, login.to_string()),
        ]))
    }

    fn rows(n: usize) -> Vec<Row> {
        let row = ProjectionSpec::default().project(make_row("U"));
        vec![row; n]
    }

    #[test]
    fn test_text_sink_trailing_delimiter_no_quoting() {
        let mut sink = TextSink::from_writer(Vec::new(), Path::new("out.csv"));
        let row = ProjectionSpec::default().project(make_row("A;B \"C\""));
        sink.write_row(&row).unwrap();
        let out = String::from_utf8(sink.finish().unwrap()).unwrap();
        assert_eq!(out, "2024.05.01;;;A;B \"C\";;;;;;\n");
    }

    #[test]
    fn test_text_sink_empty_row_writes_bare_newline() {
        let mut sink = TextSink::from_writer(Vec::new(), Path::new("out.csv"));
        let projection = ProjectionSpec::excluding(FieldId::ALL);
        sink.write_row(&projection.project(make_row("A"))).unwrap();
        sink.write_row(&ProjectionSpec::default().project(make_row("B")))
            .unwrap();
        sink.write_row(&projection.project(make_row("C"))).unwrap();
        let out = String::from_utf8(sink.finish().unwrap()).unwrap();
        assert_eq!(out, "\n2024.05.01;;;B;;;;;;\n\n");
    }

    #[test]
    fn test_display_sink_tab_separated() {
        let mut sink = DisplaySink::new(Vec::new());
        let row = ProjectionSpec::excluding(FieldId::ALL.into_iter().skip(2)).project(make_row("x"));
        sink.write_row(&row).unwrap();
        let out = String::from_utf8(sink.finish().unwrap()).unwrap();
        assert_eq!(out, "2024.05.01\t\t\n");
    }

    #[test]
    fn test_exactly_cap_rows_fill_one_sheet() {
        let shared = SharedSink::default();
        let mut exporter = SheetExporter::new(shared.clone(), 1_000_000, "sheet_");
        let chunk = rows(10_000);
        for _ in 0..100 {
            exporter.append(&chunk).unwrap();
        }
        {
            let sink = shared.0.lock().unwrap();
            assert_eq!(sink.last_row.len(), 1);
            assert_eq!(sink.occupied("sheet_0"), 1_000_000);
        }

        exporter.append(&rows(1)).unwrap();
        let sink = shared.0.lock().unwrap();
        assert_eq!(sink.occupied("sheet_1"), 1);
        assert_eq!(exporter.state().sheet_index, 1);
        assert_eq!(exporter.state().row_offset, 1);
        assert_eq!(exporter.sheets_touched(), 2);
    }

    #[test]
    fn test_resume_near_cap_spills_to_new_sheet() {
        let shared = SharedSink::default();
        let state = ExportState {
            sheet_index: 0,
            sheet_name: "sheet_0".to_string(),
            row_offset: 999_999,
            total_rows: 0,
        };
        let mut exporter = SheetExporter::resume(shared.clone(), state, 1_000_000, "sheet_");
        exporter.append(&rows(2)).unwrap();
        let sink = shared.0.lock().unwrap();
        assert_eq!(
            sink.rows,
            vec![("sheet_0".to_string(), 999_999), ("sheet_1".to_string(), 0)]
        );
    }

    #[test]
    fn test_state_persists_across_batches() {
        let shared = SharedSink::default();
        let mut exporter = SheetExporter::new(shared.clone(), 3, "p");
        exporter.append(&rows(2)).unwrap();
        exporter.append(&rows(2)).unwrap();
        exporter.append(&rows(3)).unwrap();
        let (state, touched) = exporter.finish().unwrap();
        assert_eq!(state.sheet_index, 2);
        assert_eq!(state.sheet_name, "p2");
        assert_eq!(state.row_offset, 1);
        assert_eq!(state.total_rows, 7);
        assert_eq!(touched, 3);
        let sink = shared.0.lock().unwrap();
        assert!(sink.finished);
        assert_eq!(sink.occupied("p0"), 3);
        assert_eq!(sink.occupied("p1"), 3);
        assert_eq!(sink.occupied("p2"), 1);
    }

    #[test]
    fn test_empty_batch_creates_no_sheet() {
        let shared = SharedSink::default();
        let mut exporter = SheetExporter::new(shared.clone(), 10, "sheet_");
        exporter.append(&[]).unwrap();
        assert!(shared.0.lock().unwrap().last_row.is_empty());
        assert_eq!(exporter.sheets_touched(), 0);
    }

    #[test]
    fn test_pipeline_header_once_and_projected() {
        let shared = SharedSink::default();
        let display = SharedBuf::default();
        let config = ExportConfig {
            header: true,
            display: true,
            spreadsheet: true,
            ..Default::default()
        };
        let mut pipeline = ExportPipeline::new(config, ProjectionSpec::default())
            .with_display_writer(Box::new(display.clone()))
            .with_sheet_sink(Box::new(shared.clone()), None);
        pipeline.append(&rows(2)).unwrap();
        pipeline.append(&rows(1)).unwrap();
        let outcome = pipeline.finish().unwrap();

        let text = String::from_utf8(display.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Date\tTime\tClient\tLogin\tTerminal\t"));
        assert_eq!(lines.iter().filter(|l| l.starts_with("Date\t")).count(), 1);
        assert_eq!(lines[0].matches('\t').count(), 9);

        let state = outcome.sheet_state.unwrap();
        assert_eq!(state.total_rows, 4);
        assert_eq!(shared.0.lock().unwrap().occupied("sheet_0"), 4);
    }

    #[test]
    fn test_sheet_name_format() {
        assert_eq!(sheet_name("sheet_", 0), "sheet_0");
        assert_eq!(sheet_name("sheet_", 12), "sheet_12");
    }
}
