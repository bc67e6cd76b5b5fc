// AudSleuth - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no platform
// dependencies. These types are the shared vocabulary across all layers.

use crate::util::constants;
use crate::util::error::ProjectionError;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// =============================================================================
// Field identifiers
// =============================================================================

/// Stable logical identifier for one decoded column.
///
/// Variants are declared in canonical output order, so the derived `Ord`
/// and `column_index` both follow the externally visible column layout
/// rather than raw byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldId {
    Date,
    Time,
    Client,
    Login,
    /// Remote host / terminal name at the tail of the record.
    /// Shown in the "Terminal" column.
    RemoteHost,
    TransactionCode,
    Report,
    ConnectionType,
    Parameters,
    EventId,
    OsProcessId,
    SapProcessId,
    SapProcessIdHex,
    /// Short terminal field at positions 32..40 ("termcut").
    Terminal,
    SessionId,
}

impl FieldId {
    /// All fields in canonical output order.
    pub const ALL: [FieldId; constants::FIELD_COUNT] = [
        FieldId::Date,
        FieldId::Time,
        FieldId::Client,
        FieldId::Login,
        FieldId::RemoteHost,
        FieldId::TransactionCode,
        FieldId::Report,
        FieldId::ConnectionType,
        FieldId::Parameters,
        FieldId::EventId,
        FieldId::OsProcessId,
        FieldId::SapProcessId,
        FieldId::SapProcessIdHex,
        FieldId::Terminal,
        FieldId::SessionId,
    ];

    /// Fields dropped from output when the caller does not choose otherwise.
    pub const DEFAULT_EXCLUDED: [FieldId; 6] = [
        FieldId::EventId,
        FieldId::OsProcessId,
        FieldId::SapProcessId,
        FieldId::SapProcessIdHex,
        FieldId::Terminal,
        FieldId::SessionId,
    ];

    /// Position of this field in the canonical column order.
    pub fn column_index(self) -> usize {
        self as usize
    }

    /// Header label written when header injection is enabled.
    pub fn label(self) -> &'static str {
        match self {
            FieldId::Date => "Date",
            FieldId::Time => "Time",
            FieldId::Client => "Client",
            FieldId::Login => "Login",
            FieldId::RemoteHost => "Terminal",
            FieldId::TransactionCode => "T-Code",
            FieldId::Report => "Report",
            FieldId::ConnectionType => "TypeConn",
            FieldId::Parameters => "Parameters",
            FieldId::EventId => "EventID",
            FieldId::OsProcessId => "OSProcID",
            FieldId::SapProcessId => "SAPProcID",
            FieldId::SapProcessIdHex => "SAPIDHEX",
            FieldId::Terminal => "termcut",
            FieldId::SessionId => "SessionId",
        }
    }

    /// Short key used on the command line and in config.toml.
    pub fn key(self) -> &'static str {
        match self {
            FieldId::Date => "date",
            FieldId::Time => "time",
            FieldId::Client => "client",
            FieldId::Login => "login",
            FieldId::RemoteHost => "terminal",
            FieldId::TransactionCode => "tcode",
            FieldId::Report => "report",
            FieldId::ConnectionType => "typecon",
            FieldId::Parameters => "param",
            FieldId::EventId => "eventid",
            FieldId::OsProcessId => "osid",
            FieldId::SapProcessId => "sapid",
            FieldId::SapProcessIdHex => "sapidhex",
            FieldId::Terminal => "termcut",
            FieldId::SessionId => "sessionid",
        }
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for FieldId {
    type Err = ProjectionError;

    /// Parses a column key. Keys are matched exactly (lowercase), plus the
    /// long alias `remotehost` for the tail terminal field.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "remotehost" {
            return Ok(FieldId::RemoteHost);
        }
        FieldId::ALL
            .iter()
            .copied()
            .find(|f| f.key() == s)
            .ok_or_else(|| ProjectionError::UnknownField {
                name: s.to_string(),
            })
    }
}

// =============================================================================
// Layout variants
// =============================================================================

/// On-disk record layout, selected per file by its two-byte signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutVariant {
    /// 180-byte records, one byte per character (signature `7141`).
    Classic,
    /// 200-byte records (signature `3241`).
    NonUnicode,
    /// 400-byte records (signatures `0032`, `3200`, `0478`).
    Unicode,
}

impl LayoutVariant {
    /// Map raw leading bytes to a layout. `None` for unknown signatures.
    pub fn from_signature(signature: [u8; constants::SIGNATURE_LEN]) -> Option<Self> {
        match signature {
            [0x71, 0x41] => Some(LayoutVariant::Classic),
            [0x32, 0x41] => Some(LayoutVariant::NonUnicode),
            [0x00, 0x32] | [0x32, 0x00] | [0x04, 0x78] => Some(LayoutVariant::Unicode),
            _ => None,
        }
    }

    /// Raw bytes per record.
    pub fn block_width(self) -> usize {
        match self {
            LayoutVariant::Classic => constants::BLOCK_WIDTH_CLASSIC,
            LayoutVariant::NonUnicode => constants::BLOCK_WIDTH_NON_UNICODE,
            LayoutVariant::Unicode => constants::BLOCK_WIDTH_UNICODE,
        }
    }

    /// Raw bytes occupied by one logical character. Wide layouts interleave
    /// a padding byte after every character byte.
    pub fn bytes_per_char(self) -> usize {
        match self {
            LayoutVariant::Classic => 1,
            LayoutVariant::NonUnicode | LayoutVariant::Unicode => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LayoutVariant::Classic => "4.6c",
            LayoutVariant::NonUnicode => "non-unicode",
            LayoutVariant::Unicode => "unicode",
        }
    }
}

impl fmt::Display for LayoutVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.label(), self.block_width())
    }
}

/// Lowercase hex rendering of signature bytes, e.g. `[0x71, 0x41]` -> "7141".
pub fn signature_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// =============================================================================
// Record
// =============================================================================

/// One decoded audit-log entry: a value for every `FieldId`, stored in
/// canonical column order. Never mutated after decoding; projection
/// produces a separate `Row`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    values: [String; constants::FIELD_COUNT],
}

impl Record {
    /// Build a record from `(field, value)` pairs. Fields not given are empty.
    pub fn from_fields<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (FieldId, String)>,
    {
        let mut values: [String; constants::FIELD_COUNT] = Default::default();
        for (field, value) in fields {
            values[field.column_index()] = value;
        }
        Self { values }
    }

    /// Decoded value of `field`.
    pub fn get(&self, field: FieldId) -> &str {
        &self.values[field.column_index()]
    }

    /// All values in canonical column order.
    pub fn values(&self) -> &[String] {
        &self.values
    }
}

// =============================================================================
// Row (projected output unit)
// =============================================================================

/// A row headed for export: values paired with the fields they came from.
///
/// Carrying the column identities lets projection remove fields by identity,
/// so applying the same exclusion twice is a no-op the second time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    columns: Vec<FieldId>,
    values: Vec<String>,
}

impl Row {
    /// Header row with every canonical label.
    pub fn header() -> Self {
        Self {
            columns: FieldId::ALL.to_vec(),
            values: FieldId::ALL.iter().map(|f| f.label().to_string()).collect(),
        }
    }

    pub fn columns(&self) -> &[FieldId] {
        &self.columns
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Remove the column at `index` (both identity and value).
    pub(crate) fn remove_at(&mut self, index: usize) {
        self.columns.remove(index);
        self.values.remove(index);
    }
}

impl From<Record> for Row {
    fn from(record: Record) -> Self {
        Self {
            columns: FieldId::ALL.to_vec(),
            values: record.values.into(),
        }
    }
}

// =============================================================================
// Run summary
// =============================================================================

/// Per-file decode statistics.
#[derive(Debug, Clone)]
pub struct FileSummary {
    /// File path.
    pub path: PathBuf,

    /// Layout detected from the file signature.
    pub layout: LayoutVariant,

    /// Complete blocks decoded.
    pub blocks_decoded: u64,

    /// Rows that passed the filters.
    pub rows_kept: usize,

    /// Bytes of a trailing partial block that were discarded.
    pub trailing_bytes: usize,
}

/// Summary statistics for a completed run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Per-file breakdown, in processing order.
    pub file_summaries: Vec<FileSummary>,

    /// Rows kept across all files (header not counted).
    pub total_rows: u64,

    /// Worksheets written to, when spreadsheet export is enabled.
    pub sheets_used: usize,

    /// Wall-clock run duration.
    pub duration: std::time::Duration,
}

impl RunSummary {
    pub fn files_processed(&self) -> usize {
        self.file_summaries.len()
    }
}
