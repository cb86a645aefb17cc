//! Tracing setup for binaries and tests.
//!
//! The library itself only emits `tracing` events. A subscriber is installed by whoever owns
//! the process; the filter comes from `STRUCTER_LOG`, then `RUST_LOG`, then defaults to
//! `warn` so decoding stays quiet unless asked.

use std::sync::Once;
use tracing::info;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const FILTER_VAR: &str = "STRUCTER_LOG";

static INIT: Once = Once::new();

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(FILTER_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

fn install(json: bool) {
    INIT.call_once(|| {
        let base = fmt::layer()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::CLOSE)
            .with_file(true)
            .with_line_number(true);

        // A test harness may already own the global subscriber.
        let installed = if json {
            tracing_subscriber::registry()
                .with(filter())
                .with(base.json().with_current_span(true))
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(filter())
                .with(base.with_target(true))
                .try_init()
        };

        if installed.is_ok() {
            info!(json, "structer tracing initialized");
        }
    });
}

/// Install a human-readable subscriber on stderr. Later calls do nothing.
pub fn init_tracing() {
    install(false);
}

/// Install a subscriber emitting one JSON object per event.
pub fn init_tracing_json() {
    install(true);
}
