use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Install the stdout log layer, filtered by `directives` (RUST_LOG syntax).
/// Invalid directives fall back to `info`. Returns false if a subscriber was
/// already installed for this process.
pub fn init(directives: &str) -> bool {
    let filter =
        EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
    let log_layer = fmt::layer().with_target(true).with_filter(filter);

    tracing_subscriber::registry()
        .with(log_layer)
        .try_init()
        .is_ok()
}
