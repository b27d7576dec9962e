//! Log subscriber setup.

use std::str::FromStr;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber.
///
/// `log_level` is either a bare level (`debug`) or a full `EnvFilter`
/// directive string (`info,issuance_core=trace`), used as-is.
pub fn setup_logging(log_level: &str, json_format: bool) {
    let spec = log_level.trim();
    let filter = EnvFilter::from_str(spec).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::registry().with(filter);

    if json_format {
        let json_layer = fmt::layer()
            .json()
            .with_target(false)
            .with_current_span(true);
        subscriber.with(json_layer).init();
    } else {
        let fmt_layer = fmt::layer().with_target(true).compact();
        subscriber.with(fmt_layer).init();
    }

    tracing::debug!(
        filter = spec,
        format = if json_format { "json" } else { "compact" },
        "Logging initialized"
    );
}
