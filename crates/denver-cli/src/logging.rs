use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "DENVER_LOG";
const DEFAULT_DIRECTIVE: &str = "warn";

/// Logs go to stderr so status lines on stdout stay parseable.
pub(crate) fn init() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
