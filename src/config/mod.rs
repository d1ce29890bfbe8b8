//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks, all errors collected)
//!     → RouterConfig (validated, immutable)
//!     → Router::from_config builds the source and the route table
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; a new router is built for new config
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{ObservabilityConfig, RouteConfig, RouterConfig, RoutingMode};
pub use validation::{validate_config, ValidationError};
