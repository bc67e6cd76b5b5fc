// AudSleuth - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "AudSleuth";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "AudSleuth";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Record layout
// =============================================================================

/// Number of leading raw bytes that carry the layout signature.
pub const SIGNATURE_LEN: usize = 2;

/// Raw block width of the oldest (single-byte, 4.6C era) layout.
pub const BLOCK_WIDTH_CLASSIC: usize = 180;

/// Raw block width of the non-Unicode layout.
pub const BLOCK_WIDTH_NON_UNICODE: usize = 200;

/// Raw block width of the Unicode layout.
pub const BLOCK_WIDTH_UNICODE: usize = 400;

/// Number of logical fields in a decoded record.
pub const FIELD_COUNT: usize = 15;

// =============================================================================
// Discovery
// =============================================================================

/// Case-sensitive marker a file name must contain to be picked up when a
/// directory is given as input.
pub const DEFAULT_FILE_MARKER: &str = ".AUD";

/// Default maximum directory recursion depth.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Hard upper bound on max depth (prevents runaway traversal).
pub const ABSOLUTE_MAX_DEPTH: usize = 64;

/// Input path used when none is given on the command line.
pub const DEFAULT_INPUT_PATH: &str = ".";

// =============================================================================
// Export
// =============================================================================

/// Rows written to a single worksheet before a new one is started.
pub const DEFAULT_ROWS_PER_SHEET: u32 = 1_000_000;

/// Hard upper bound on rows per sheet (xlsx format row limit).
pub const ABSOLUTE_MAX_ROWS_PER_SHEET: u32 = 1_048_576;

/// Worksheet name prefix; the zero-based sheet index is appended.
pub const DEFAULT_SHEET_PREFIX: &str = "sheet_";

/// Maximum worksheet name length accepted by spreadsheet applications.
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Base name for export files when none is given.
pub const DEFAULT_EXPORT_NAME: &str = "results";

/// Field delimiter for the delimited-text sink.
pub const TEXT_DELIMITER: u8 = b';';

/// Extension of the delimited-text export file.
pub const TEXT_EXTENSION: &str = "csv";

/// Extension of the spreadsheet export file.
pub const SHEET_EXTENSION: &str = "xlsx";

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Log levels accepted from config.toml.
pub const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";

// =============================================================================
// Exit codes
// =============================================================================

/// Generic I/O failure.
pub const EXIT_IO: i32 = 1;

/// Unrecognised layout signature in an input file.
pub const EXIT_DETECTION: i32 = 10;

/// Invalid column or filter selection.
pub const EXIT_SELECTION: i32 = 11;

/// Input path discovery failure.
pub const EXIT_DISCOVERY: i32 = 12;

/// Export sink failure.
pub const EXIT_EXPORT: i32 = 13;

/// Configuration failure.
pub const EXIT_CONFIG: i32 = 14;
