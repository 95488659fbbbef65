//! Log output for the `nodeflake` binary.
//!
//! Events are written to stderr through `tracing_subscriber::fmt`, leaving
//! stdout for IDs. The level is read from `RUST_LOG` and defaults to `info`.
//! Enabling `debug` shows tolerated clock rollbacks, `trace` shows every
//! `next_id` span and sequence exhaustion.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true),
        )
        .try_init()?;
    Ok(())
}
