//! Navigation engine subsystem.
//!
//! # Data Flow
//! ```text
//! navigate_to / navigate / ExternalListener::next
//!     → request.rs (NavigationRequest with a request id)
//!     → engine.rs
//!         Resolving:  RouteTable::resolve, fallback / not-found policy
//!         Guarding:   guard::Pipeline, redirects re-enter Resolving
//!         Committing: generation re-checked under the commit lock,
//!                     LocationSource written, active snapshot swapped
//!         Settled:    subscribers notified in order, result returned
//! ```
//!
//! # Design Decisions
//! - One `Router` per routing context; clones share the same instance
//! - Last write wins: a newer request supersedes any request still resolving
//! - Navigation never fails with `Err`; every request ends in a `Settled` state
//!   or `Navigation::Superseded`

pub mod engine;
pub mod listener;
pub mod request;
pub mod state;

pub use engine::{Router, RouterOptions};
pub use listener::ExternalListener;
pub use request::{NavigateOptions, NavigationRequest, Trigger};
pub use state::{ActiveMatch, ActiveState, NavPhase, Navigation, NotFoundReason, Settled};
