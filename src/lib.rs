//! Client-side navigation router core.
//!
//! Route patterns, a hierarchical route table, history and hash location
//! sources, a guard pipeline and the navigation state machine that ties them
//! together. Rendering is left to the host; it consumes `Settled` results.

pub mod config;
pub mod error;
pub mod guard;
pub mod location;
pub mod navigation;
pub mod observability;
pub mod query;
pub mod routing;

pub use config::schema::RouterConfig;
pub use error::{RouterError, RouterResult};
pub use guard::{guard_async, guard_fn, Guard, GuardContext, GuardOutcome};
pub use location::{HashSource, HistorySource, Location, LocationSource};
pub use navigation::{
    ActiveState, ExternalListener, NavigateOptions, Navigation, NavigationRequest, Router,
    RouterOptions, Settled,
};
pub use query::QueryMap;
pub use routing::{NodeId, Payload, RouteSpec, RouteTable};
