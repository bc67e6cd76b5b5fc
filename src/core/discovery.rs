// AudSleuth - core/discovery.rs
//
// Resolution of the input path list into the ordered set of audit files to
// process. Explicit file paths are taken as given; directories are walked
// with `walkdir` and filtered by a case-sensitive file-name marker.
//
// Only metadata is touched here; file contents belong to the app layer.
//   - A missing input path is fatal.
//   - An unreadable root directory is fatal; unreadable entries below it are
//     collected as warnings.
//   - The result is sorted and de-duplicated so runs are reproducible.

use crate::util::constants;
use crate::util::error::DiscoveryError;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Settings for one discovery pass.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Substring a file name must contain to be picked up from a directory.
    pub marker: String,

    /// Descend into subdirectories.
    pub recursive: bool,

    /// Maximum recursion depth when `recursive` is set.
    pub max_depth: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            marker: constants::DEFAULT_FILE_MARKER.to_string(),
            recursive: true,
            max_depth: constants::DEFAULT_MAX_DEPTH,
        }
    }
}

/// Files selected for a run plus any non-fatal traversal warnings.
#[derive(Debug, Default)]
pub struct Discovered {
    pub files: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

/// Resolve `inputs` into a sorted, de-duplicated list of audit files.
pub fn discover_inputs(
    inputs: &[PathBuf],
    config: &DiscoveryConfig,
) -> Result<Discovered, DiscoveryError> {
    let max_depth = if config.recursive {
        config.max_depth.clamp(1, constants::ABSOLUTE_MAX_DEPTH)
    } else {
        1
    };

    tracing::debug!(
        inputs = inputs.len(),
        marker = %config.marker,
        max_depth,
        "Discovery starting"
    );

    let mut files = BTreeSet::new();
    let mut warnings = Vec::new();

    for input in inputs {
        let metadata = std::fs::metadata(input).map_err(|_| DiscoveryError::PathNotFound {
            path: input.clone(),
        })?;

        if !metadata.is_dir() {
            files.insert(normalise(input));
            continue;
        }

        for entry in walkdir::WalkDir::new(input)
            .min_depth(1)
            .max_depth(max_depth)
            .follow_links(false)
        {
            let entry = match entry {
                Ok(e) => e,
                Err(e) if e.depth() == 0 => {
                    return Err(DiscoveryError::Traversal {
                        path: input.clone(),
                        source: e,
                    });
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "<unknown>".to_string());
                    let msg = format!("Cannot access '{path}': {e}");
                    tracing::debug!(warning = %msg, "Discovery warning");
                    warnings.push(msg);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if !name.contains(config.marker.as_str()) {
                tracing::trace!(file = %name, "Skipped: no marker");
                continue;
            }
            files.insert(normalise(entry.path()));
        }
    }

    let files: Vec<PathBuf> = files.into_iter().collect();
    tracing::info!(
        files = files.len(),
        warnings = warnings.len(),
        "Discovery complete"
    );
    Ok(Discovered { files, warnings })
}

/// Canonical form when available so the same file reached through two
/// inputs is only processed once.
fn normalise(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
