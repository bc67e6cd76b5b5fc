// AudSleuth - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// Every subsystem has its own enum; all roll up into AudSleuthError, which
// also decides the process exit status for its category.

use crate::util::constants;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all AudSleuth operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum AudSleuthError {
    /// Layout signature detection failed for an input file.
    Detection(DetectionError),

    /// A column exclusion names an unknown field.
    Projection(ProjectionError),

    /// A filter definition is invalid.
    Filter(FilterError),

    /// Input path discovery failed.
    Discovery(DiscoveryError),

    /// Export operation failed.
    Export(ExportError),

    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl AudSleuthError {
    /// Process exit status for this error category. Always non-zero.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Detection(_) => constants::EXIT_DETECTION,
            Self::Projection(_) | Self::Filter(_) => constants::EXIT_SELECTION,
            Self::Discovery(_) => constants::EXIT_DISCOVERY,
            Self::Export(_) => constants::EXIT_EXPORT,
            Self::Config(_) => constants::EXIT_CONFIG,
            Self::Io { .. } => constants::EXIT_IO,
        }
    }
}

impl fmt::Display for AudSleuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Detection(e) => write!(f, "Layout detection error: {e}"),
            Self::Projection(e) => write!(f, "Column selection error: {e}"),
            Self::Filter(e) => write!(f, "Filter error: {e}"),
            Self::Discovery(e) => write!(f, "Discovery error: {e}"),
            Self::Export(e) => write!(f, "Export error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for AudSleuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Detection(e) => Some(e),
            Self::Projection(e) => Some(e),
            Self::Filter(e) => Some(e),
            Self::Discovery(e) => Some(e),
            Self::Export(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Io { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Detection errors
// ---------------------------------------------------------------------------

/// Errors raised while reading the two-byte layout signature of a file.
/// All of them are fatal for the whole run: without a block width the file
/// cannot be framed into records.
#[derive(Debug)]
pub enum DetectionError {
    /// The leading bytes do not match any known layout.
    UnknownSignature { path: PathBuf, signature: String },

    /// The file is shorter than the signature itself.
    Truncated { path: PathBuf, len: usize },

    /// I/O error while reading or rewinding the file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for DetectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSignature { path, signature } => write!(
                f,
                "'{}': failed to detect block size from signature '{signature}'",
                path.display()
            ),
            Self::Truncated { path, len } => write!(
                f,
                "'{}': file holds {len} byte(s), too short for a layout signature",
                path.display()
            ),
            Self::Io { path, source } => {
                write!(f, "'{}': I/O error: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for DetectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<DetectionError> for AudSleuthError {
    fn from(e: DetectionError) -> Self {
        Self::Detection(e)
    }
}

// ---------------------------------------------------------------------------
// Projection errors
// ---------------------------------------------------------------------------

/// Errors related to column exclusion.
#[derive(Debug)]
pub enum ProjectionError {
    /// The requested field key is not one of the fifteen known fields.
    UnknownField { name: String },
}

impl fmt::Display for ProjectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownField { name } => write!(
                f,
                "unknown column '{name}'. Valid columns: date time client login terminal \
                 tcode report typecon param eventid osid sapid sapidhex termcut sessionid"
            ),
        }
    }
}

impl std::error::Error for ProjectionError {}

impl From<ProjectionError> for AudSleuthError {
    fn from(e: ProjectionError) -> Self {
        Self::Projection(e)
    }
}

// ---------------------------------------------------------------------------
// Filter errors
// ---------------------------------------------------------------------------

/// Errors related to filter definitions.
#[derive(Debug)]
pub enum FilterError {
    /// A filter category name is not recognised.
    UnknownCategory { name: String },
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCategory { name } => write!(
                f,
                "unknown filter '{name}'. Valid filters: typecon terminal login tcode report client"
            ),
        }
    }
}

impl std::error::Error for FilterError {}

impl From<FilterError> for AudSleuthError {
    fn from(e: FilterError) -> Self {
        Self::Filter(e)
    }
}

// ---------------------------------------------------------------------------
// Discovery errors
// ---------------------------------------------------------------------------

/// Errors related to input path discovery.
#[derive(Debug)]
pub enum DiscoveryError {
    /// An input path does not exist or is not accessible.
    PathNotFound { path: PathBuf },

    /// Walkdir traversal error (wraps individual file/dir access failures).
    Traversal {
        path: PathBuf,
        source: walkdir::Error,
    },
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PathNotFound { path } => {
                write!(f, "Input path '{}' does not exist", path.display())
            }
            Self::Traversal { path, source } => {
                write!(f, "Error traversing '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Traversal { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<DiscoveryError> for AudSleuthError {
    fn from(e: DiscoveryError) -> Self {
        Self::Discovery(e)
    }
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

/// Errors related to export sinks.
#[derive(Debug)]
pub enum ExportError {
    /// I/O error opening or writing an export file.
    Io { path: PathBuf, source: io::Error },

    /// Delimited-text serialisation error.
    Csv { path: PathBuf, source: csv::Error },

    /// Workbook write error.
    Xlsx {
        path: PathBuf,
        source: rust_xlsxwriter::XlsxError,
    },

    /// An existing workbook could not be read back for append mode.
    WorkbookRead {
        path: PathBuf,
        source: calamine::XlsxError,
    },

    /// The sheet index or a sheet name left the range the format accepts.
    SheetLimit { sheet: String, reason: String },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Export I/O error '{}': {source}", path.display())
            }
            Self::Csv { path, source } => {
                write!(f, "Text export error '{}': {source}", path.display())
            }
            Self::Xlsx { path, source } => {
                write!(f, "Spreadsheet export error '{}': {source}", path.display())
            }
            Self::WorkbookRead { path, source } => write!(
                f,
                "Cannot read existing workbook '{}' for append: {source}",
                path.display()
            ),
            Self::SheetLimit { sheet, reason } => {
                write!(f, "Cannot create sheet '{sheet}': {reason}")
            }
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv { source, .. } => Some(source),
            Self::Xlsx { source, .. } => Some(source),
            Self::WorkbookRead { source, .. } => Some(source),
            Self::SheetLimit { .. } => None,
        }
    }
}

impl From<ExportError> for AudSleuthError {
    fn from(e: ExportError) -> Self {
        Self::Export(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for AudSleuthError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Convenience type alias for AudSleuth results.
pub type Result<T> = std::result::Result<T, AudSleuthError>;
