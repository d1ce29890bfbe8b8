//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! routing / guard / navigation produce:
//!     → logging.rs (structured tracing events, request_id per navigation)
//!     → metrics.rs (counters through the `metrics` facade)
//!
//! Consumers:
//!     → whatever subscriber the host installs (init_logging for the CLI)
//!     → whatever metrics recorder the host installs (none by default)
//! ```
//!
//! # Design Decisions
//! - The library never installs a global subscriber or recorder itself
//! - Without a recorder, metric calls are no-ops

pub mod logging;
pub mod metrics;
