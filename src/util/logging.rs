// AudSleuth - util/logging.rs
//
// tracing subscriber for audit runs. The level comes from RUST_LOG when set,
// otherwise --debug, otherwise `[logging] level` in config.toml, otherwise
// info. --debug also tags each event with its source file and line.
//
// Output: always stderr. Stdout belongs to the direct-display sink and the
// final row count, so log lines never interleave with exported rows.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Call once, before the run starts.
pub fn init(debug_flag: bool, config_level: Option<&str>) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) => EnvFilter::new(fallback_directive(debug_flag, config_level)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(debug_flag)
        .with_line_number(debug_flag)
        .compact()
        .init();

    tracing::debug!(
        app = super::constants::APP_NAME,
        version = super::constants::APP_VERSION,
        "Logging initialised"
    );
}

/// Filter directive used when RUST_LOG is unset.
fn fallback_directive(debug_flag: bool, config_level: Option<&str>) -> &str {
    if debug_flag {
        "debug"
    } else {
        config_level.unwrap_or(super::constants::DEFAULT_LOG_LEVEL)
    }
}
