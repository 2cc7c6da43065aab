//! Tracing subscriber initialization.
//!
//! The subscriber is installed once per process, before bootstrap runs;
//! the run mode selects the default filter when `RUST_LOG` is unset.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber.
///
/// `dev` run mode defaults to debug-level output; anything else defaults
/// to info. An explicit `RUST_LOG` always wins.
///
/// # Panics
///
/// Panics if a global subscriber is already installed; use [`try_init`]
/// when that is possible (e.g. in tests).
pub fn init(run_mode: &str) {
    registry(run_mode).init();
}

/// Like [`init`], but returns an error instead of panicking when a global
/// subscriber is already installed.
pub fn try_init(run_mode: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    registry(run_mode).try_init()
}

fn registry(
    run_mode: &str,
) -> impl SubscriberInitExt + tracing::Subscriber + Send + Sync {
    let default_directive = if run_mode == "dev" { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
}
