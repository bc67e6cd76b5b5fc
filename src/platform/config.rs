// AudSleuth - platform/config.rs
//
// Platform config directory resolution and config.toml loading with
// startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Resolved platform paths for AudSleuth configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/audsleuth/ or %APPDATA%\AudSleuth\config\)
    pub config_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            tracing::debug!(config = %config_dir.display(), "Platform paths resolved");
            Self { config_dir }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            Self {
                config_dir: PathBuf::from("."),
            }
        }
    }

    /// Default location of config.toml.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored so newer config files still load.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[logging]` section.
    pub logging: LoggingSection,
    /// `[discovery]` section.
    pub discovery: DiscoverySection,
    /// `[export]` section.
    pub export: ExportSection,
    /// `[columns]` section.
    pub columns: ColumnsSection,
    /// `[filters]` section: category key -> substrings.
    pub filters: BTreeMap<String, Vec<String>>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// `[discovery]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct DiscoverySection {
    /// File-name marker for directory scans.
    pub marker: Option<String>,
    /// Maximum directory recursion depth.
    pub max_depth: Option<usize>,
    /// Descend into subdirectories.
    pub recursive: Option<bool>,
}

/// `[export]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ExportSection {
    /// Output base name without extension.
    pub name: Option<String>,
    /// Worksheet row cap.
    pub rows_per_sheet: Option<u32>,
    /// Worksheet name prefix.
    pub sheet_prefix: Option<String>,
}

/// `[columns]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ColumnsSection {
    /// Field keys to exclude from output.
    pub remove: Option<Vec<String>>,
}

/// Validated application configuration derived from `config.toml`.
///
/// Numeric and naming values are checked here. Column keys and filter
/// categories are kept as text and resolved by the caller, which owns the
/// field and category vocabulary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,

    // -- Discovery --
    pub marker: String,
    pub max_depth: usize,
    pub recursive: bool,

    // -- Export --
    pub export_name: String,
    pub rows_per_sheet: u32,
    pub sheet_prefix: String,

    // -- Selection --
    /// Replaces the default exclusion set when present.
    pub remove: Option<Vec<String>>,
    pub filters: BTreeMap<String, Vec<String>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: None,
            marker: constants::DEFAULT_FILE_MARKER.to_string(),
            max_depth: constants::DEFAULT_MAX_DEPTH,
            recursive: true,
            export_name: constants::DEFAULT_EXPORT_NAME.to_string(),
            rows_per_sheet: constants::DEFAULT_ROWS_PER_SHEET,
            sheet_prefix: constants::DEFAULT_SHEET_PREFIX.to_string(),
            remove: None,
            filters: BTreeMap::new(),
        }
    }
}

/// Load and validate config.toml at `path`.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// A missing or unparseable file at the default location yields defaults and
/// a warning. A file named explicitly with `--config` (`explicit`) must exist
/// and parse, otherwise the error is returned.
pub fn load_config(path: &Path, explicit: bool) -> Result<(AppConfig, Vec<String>), ConfigError> {
    let mut warnings: Vec<String> = Vec::new();

    if !explicit && !path.exists() {
        tracing::debug!(path = %path.display(), "No config.toml found; using defaults");
        return Ok((AppConfig::default(), warnings));
    }

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(source) if explicit => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
        Err(e) => {
            let msg = format!(
                "Could not read config file '{}': {e}. Using defaults.",
                path.display()
            );
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return Ok((AppConfig::default(), warnings));
        }
    };

    let raw: RawConfig = match toml::from_str(&content) {
        Ok(r) => r,
        Err(source) if explicit => {
            return Err(ConfigError::TomlParse {
                path: path.to_path_buf(),
                source,
            })
        }
        Err(e) => {
            let msg = format!(
                "Failed to parse config file '{}': {e}. Using defaults.",
                path.display()
            );
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return Ok((AppConfig::default(), warnings));
        }
    };

    tracing::info!(path = %path.display(), "Loaded config.toml");
    let config = validate(raw, &mut warnings);

    if !warnings.is_empty() {
        tracing::warn!(
            count = warnings.len(),
            "Config validation produced warnings"
        );
    }
    Ok((config, warnings))
}

/// Check every value against named constants, accumulating all problems.
fn validate(raw: RawConfig, warnings: &mut Vec<String>) -> AppConfig {
    let mut config = AppConfig::default();
    let mut out_of_range = |field: &str, value: String, expected: String| {
        warnings.push(format!(
            "{}. Using default.",
            ConfigError::ValueOutOfRange {
                field: field.to_string(),
                value,
                expected,
            }
        ));
    };

    // -- Logging: level --
    if let Some(level) = raw.logging.level {
        if constants::VALID_LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level);
        } else {
            out_of_range(
                "logging.level",
                level,
                constants::VALID_LOG_LEVELS.join(", "),
            );
        }
    }

    // -- Discovery --
    if let Some(marker) = raw.discovery.marker {
        if marker.is_empty() {
            out_of_range("discovery.marker", marker, "a non-empty string".to_string());
        } else {
            config.marker = marker;
        }
    }
    if let Some(depth) = raw.discovery.max_depth {
        if (1..=constants::ABSOLUTE_MAX_DEPTH).contains(&depth) {
            config.max_depth = depth;
        } else {
            out_of_range(
                "discovery.max_depth",
                depth.to_string(),
                format!("1-{}", constants::ABSOLUTE_MAX_DEPTH),
            );
        }
    }
    if let Some(recursive) = raw.discovery.recursive {
        config.recursive = recursive;
    }

    // -- Export --
    if let Some(name) = raw.export.name {
        if name.trim().is_empty() {
            out_of_range("export.name", name, "a non-empty base name".to_string());
        } else {
            config.export_name = name;
        }
    }
    if let Some(rows) = raw.export.rows_per_sheet {
        if (1..=constants::ABSOLUTE_MAX_ROWS_PER_SHEET).contains(&rows) {
            config.rows_per_sheet = rows;
        } else {
            out_of_range(
                "export.rows_per_sheet",
                rows.to_string(),
                format!("1-{}", constants::ABSOLUTE_MAX_ROWS_PER_SHEET),
            );
        }
    }
    if let Some(prefix) = raw.export.sheet_prefix {
        // Room for the numeric suffix within the worksheet name limit.
        let limit = constants::MAX_SHEET_NAME_LEN - 10;
        if prefix.is_empty() || prefix.chars().count() > limit {
            out_of_range(
                "export.sheet_prefix",
                prefix,
                format!("1-{limit} characters"),
            );
        } else {
            config.sheet_prefix = prefix;
        }
    }

    // -- Selection --
    config.remove = raw.columns.remove;
    config.filters = raw.filters;

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_config(body: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(constants::CONFIG_FILE_NAME);
        fs::write(&path, body).unwrap();
        (dir, path)
    }

    #[test]
    fn test_missing_default_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, warnings) =
            load_config(&dir.path().join(constants::CONFIG_FILE_NAME), false).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(config.rows_per_sheet, constants::DEFAULT_ROWS_PER_SHEET);
        assert_eq!(config.marker, ".AUD");
        assert!(config.recursive);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(&dir.path().join("absent.toml"), true);
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_valid_values_applied() {
        let (_dir, path) = write_config(
            r#"
            [logging]
            level = "debug"

            [discovery]
            marker = ".aud"
            max_depth = 3
            recursive = false

            [export]
            name = "audit_q2"
            rows_per_sheet = 500
            sheet_prefix = "part_"

            [columns]
            remove = ["eventid", "sessionid"]

            [filters]
            login = ["ALICE", "BOB"]
            tcode = ["SU01"]
            "#,
        );
        let (config, warnings) = load_config(&path, true).unwrap();
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.marker, ".aud");
        assert_eq!(config.max_depth, 3);
        assert!(!config.recursive);
        assert_eq!(config.export_name, "audit_q2");
        assert_eq!(config.rows_per_sheet, 500);
        assert_eq!(config.sheet_prefix, "part_");
        assert_eq!(
            config.remove,
            Some(vec!["eventid".to_string(), "sessionid".to_string()])
        );
        assert_eq!(config.filters["login"], vec!["ALICE", "BOB"]);
    }

    #[test]
    fn test_out_of_range_values_warn_and_default() {
        let (_dir, path) = write_config(
            r#"
            [logging]
            level = "loud"

            [discovery]
            max_depth = 0

            [export]
            rows_per_sheet = 2000000
            "#,
        );
        let (config, warnings) = load_config(&path, false).unwrap();
        assert_eq!(warnings.len(), 3);
        assert!(config.log_level.is_none());
        assert_eq!(config.max_depth, constants::DEFAULT_MAX_DEPTH);
        assert_eq!(config.rows_per_sheet, constants::DEFAULT_ROWS_PER_SHEET);
    }

    #[test]
    fn test_unparseable_file() {
        let (_dir, path) = write_config("[export\nname = ");
        let (config, warnings) = load_config(&path, false).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(config.export_name, constants::DEFAULT_EXPORT_NAME);
        assert!(matches!(
            load_config(&path, true),
            Err(ConfigError::TomlParse { .. })
        ));
    }
}
