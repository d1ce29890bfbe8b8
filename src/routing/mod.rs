//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route registration:
//!     RouteSpec / RouteConfig tree
//!     → matcher.rs (compile each pattern, reject malformed ones)
//!     → table.rs (sibling duplicate check, then insert into the arena)
//!
//! Lookup:
//!     Location (path segments, hash, query)
//!     → table.rs (depth-first walk, registration order)
//!     → matcher.rs (segment matching per node)
//!     → MatchResult { chain, params } or the deepest partial prefix
//! ```
//!
//! # Design Decisions
//! - Patterns compiled at registration; lookup never re-parses
//! - Deterministic: same table and location always give the same chain
//! - First match wins (registration order)
//! - Payloads are opaque to the table; loading is the engine's concern

pub mod matcher;
pub mod payload;
pub mod table;

pub use matcher::{InvalidPatternError, Params, PathPattern};
pub use payload::{LoadState, Loader, Payload};
pub use table::{FlatRoute, MatchResult, NodeId, RouteNode, RouteSpec, RouteTable, Unresolved};
