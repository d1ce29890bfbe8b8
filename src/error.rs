//! Router error taxonomy.
//!
//! # Design Decisions
//! - Registration errors are returned from registration and are fatal for
//!   that registration only
//! - Navigation never returns these directly; a terminal `Settled` state is
//!   produced instead and `Settled::error()` converts it on demand

use thiserror::Error;

pub use crate::routing::matcher::InvalidPatternError;

/// Errors produced by the routing core.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouterError {
    /// A pattern string could not be compiled.
    #[error(transparent)]
    InvalidPattern(#[from] InvalidPatternError),

    /// A sibling with a structurally identical pattern already exists.
    #[error("duplicate route '{pattern}' conflicts with sibling '{existing}'")]
    DuplicateRoute { pattern: String, existing: String },

    /// Registration referenced a parent id this table never issued.
    #[error("unknown parent route id {0}")]
    UnknownParent(usize),

    /// Fallback routes are leaves.
    #[error("fallback route '{0}' cannot have children")]
    FallbackWithChildren(String),

    /// Guards kept redirecting past the configured bound.
    #[error("redirect loop detected after {limit} redirects: {}", trail.join(" -> "))]
    RedirectLoop { limit: usize, trail: Vec<String> },

    /// A parent route matched but none of its children resolved the rest.
    #[error("Unreachable '{href}'")]
    UnreachableSubpath { href: String, suffix: String },

    /// A guard aborted the navigation.
    #[error("navigation aborted: {0}")]
    GuardAbort(String),
}

/// Result type for router operations.
pub type RouterResult<T> = Result<T, RouterError>;
