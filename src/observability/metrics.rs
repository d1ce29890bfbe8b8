//! Navigation metrics.
//!
//! # Metrics
//! - `router_navigations_total` (counter): settled navigations by `outcome`
//!   (`matched`, `fallback`, `not_found`, `aborted`, `redirect_loop`)
//! - `router_redirects_total` (counter): guard redirects followed
//! - `router_guard_aborts_total` (counter): navigations stopped by a guard
//! - `router_superseded_total` (counter): navigations dropped for a newer one
//!
//! # Design Decisions
//! - Emitted through the `metrics` facade; the host picks the recorder

use metrics::counter;

pub fn record_navigation(outcome: &'static str) {
    counter!("router_navigations_total", "outcome" => outcome).increment(1);
}

pub fn record_redirect() {
    counter!("router_redirects_total").increment(1);
}

pub fn record_guard_abort() {
    counter!("router_guard_aborts_total").increment(1);
}

pub fn record_superseded() {
    counter!("router_superseded_total").increment(1);
}
