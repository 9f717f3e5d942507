//! Tracing configuration.
//!
//! Calling [`init`] installs a global subscriber with compact console
//! logging, filtered by the `GRAPHBIND_LOG` environment variable (same
//! conventions as `RUST_LOG`), defaulting to WARN.

use tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter};

const GRAPHBIND_LOG: &str = "GRAPHBIND_LOG";

pub fn init() {
    let fmt_layer = tracing_subscriber::fmt::layer().compact();
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .with_env_var(GRAPHBIND_LOG)
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
