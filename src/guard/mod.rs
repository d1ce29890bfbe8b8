//! Middleware (guard) subsystem.
//!
//! # Data Flow
//! ```text
//! MatchResult chain [root, ..., leaf]
//!     → pipeline.rs: for each node root → leaf, for each bound guard in order
//!         → Guard::check(node, params, query) → GuardOutcome
//!         → Continue: next guard
//!         → Redirect / Abort: stop, hand back to the navigation engine
//! ```
//!
//! # Design Decisions
//! - Guards may suspend; the engine races each one against cancellation
//! - No default timeout; `guard_timeout_ms` opts in
//! - Ordering is stable and deterministic (chain order, then bind order)

pub mod builtin;
pub mod pipeline;

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::location::Location;
use crate::query::QueryMap;
use crate::routing::matcher::Params;
use crate::routing::table::RouteNode;

pub use builtin::{ConditionGuard, Otherwise, RedirectGuard};
pub use pipeline::{Cancellation, Pipeline, PipelineOutcome};

/// Verdict of a single guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Continue,
    Redirect(Location),
    Abort(String),
}

impl GuardOutcome {
    /// `href` is a link target. Under the hash backend `#/path` and `/path`
    /// lead to the same place.
    pub fn redirect(href: &str) -> Self {
        GuardOutcome::Redirect(Location::parse(href))
    }

    pub fn abort(reason: impl Into<String>) -> Self {
        GuardOutcome::Abort(reason.into())
    }
}

/// Everything a guard may look at.
#[derive(Clone, Copy)]
pub struct GuardContext<'a> {
    pub node: &'a RouteNode,
    pub params: &'a Params,
    pub query: &'a QueryMap,
    pub location: &'a Location,
}

/// A pre-navigation guard bound to a route node.
pub trait Guard: Send + Sync {
    fn check<'a>(&'a self, ctx: GuardContext<'a>) -> BoxFuture<'a, GuardOutcome>;

    /// Label used in logs.
    fn name(&self) -> &str {
        "guard"
    }
}

pub type BoxedGuard = Arc<dyn Guard>;

/// Guard built from a synchronous closure.
pub struct FnGuard<F> {
    f: F,
}

impl<F> Guard for FnGuard<F>
where
    F: Fn(&GuardContext<'_>) -> GuardOutcome + Send + Sync,
{
    fn check<'a>(&'a self, ctx: GuardContext<'a>) -> BoxFuture<'a, GuardOutcome> {
        let outcome = (self.f)(&ctx);
        async move { outcome }.boxed()
    }

    fn name(&self) -> &str {
        "fn"
    }
}

pub fn guard_fn<F>(f: F) -> FnGuard<F>
where
    F: Fn(&GuardContext<'_>) -> GuardOutcome + Send + Sync,
{
    FnGuard { f }
}

/// Owned snapshot handed to asynchronous closure guards.
#[derive(Debug, Clone)]
pub struct GuardInput {
    pub pattern: String,
    pub params: Params,
    pub query: QueryMap,
    pub location: Location,
}

/// Guard built from an async closure over an owned [`GuardInput`].
pub struct AsyncFnGuard<F> {
    f: F,
}

impl<F, Fut> Guard for AsyncFnGuard<F>
where
    F: Fn(GuardInput) -> Fut + Send + Sync,
    Fut: Future<Output = GuardOutcome> + Send + 'static,
{
    fn check<'a>(&'a self, ctx: GuardContext<'a>) -> BoxFuture<'a, GuardOutcome> {
        let input = GuardInput {
            pattern: ctx.node.pattern().source().to_string(),
            params: ctx.params.clone(),
            query: ctx.query.clone(),
            location: ctx.location.clone(),
        };
        (self.f)(input).boxed()
    }

    fn name(&self) -> &str {
        "async-fn"
    }
}

pub fn guard_async<F, Fut>(f: F) -> AsyncFnGuard<F>
where
    F: Fn(GuardInput) -> Fut + Send + Sync,
    Fut: Future<Output = GuardOutcome> + Send + 'static,
{
    AsyncFnGuard { f }
}
