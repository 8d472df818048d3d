use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "SCOREPAD_LOG";

/// Installs the stderr subscriber. `SCOREPAD_LOG` wins over the flag-derived
/// level when it parses.
pub fn init_tracing(quiet: bool, verbose: bool) -> Result<(), String> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_level(quiet, verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| format!("failed to initialize tracing subscriber: {err}"))
}

fn default_level(quiet: bool, verbose: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    }
}
