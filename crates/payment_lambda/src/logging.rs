use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// JSON lines on stdout without timestamps or colors; CloudWatch records the
/// ingestion time itself.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(false)
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .init();
}
