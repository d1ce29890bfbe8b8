//! Structured logging.
//!
//! # Responsibilities
//! - Install the tracing subscriber for binaries and tests
//! - Resolve the log filter: `RUST_LOG` first, then the configured level
//!
//! # Design Decisions
//! - Uses the tracing crate for structured logging
//! - Field names are stable: `request_id`, `href`, `pattern`, `outcome`

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::ObservabilityConfig;

/// Install a global fmt subscriber. Returns false if one was already set.
pub fn init_logging(config: &ObservabilityConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}
