//! Built-in guards.
//!
//! - `RedirectGuard`: unconditional redirect, what a route's `redirect` key compiles to
//! - `ConditionGuard`: lets the navigation through only while a predicate holds

use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::guard::{Guard, GuardContext, GuardOutcome};
use crate::location::Location;
use crate::routing::matcher::{InvalidPatternError, PathPattern};

/// Redirects to a fixed target, filling `:param` placeholders from the match.
#[derive(Debug, Clone)]
pub struct RedirectGuard {
    target: PathPattern,
    /// `?query` and/or `#hash` carried verbatim.
    suffix: String,
}

impl RedirectGuard {
    pub fn new(target: &str) -> Result<Self, InvalidPatternError> {
        let split = target
            .find(|c| c == '?' || c == '#')
            .filter(|&i| i > 0)
            .unwrap_or(target.len());
        let (path, suffix) = target.split_at(split);

        Ok(Self {
            target: PathPattern::compile(path)?,
            suffix: suffix.to_string(),
        })
    }

    pub fn target_for(&self, ctx: &GuardContext<'_>) -> Location {
        Location::parse(&format!("{}{}", self.target.interpolate(ctx.params), self.suffix))
    }
}

impl Guard for RedirectGuard {
    fn check<'a>(&'a self, ctx: GuardContext<'a>) -> BoxFuture<'a, GuardOutcome> {
        let target = self.target_for(&ctx);
        async move { GuardOutcome::Redirect(target) }.boxed()
    }

    fn name(&self) -> &str {
        "redirect"
    }
}

/// What a [`ConditionGuard`] does when its predicate fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Otherwise {
    Redirect(String),
    Abort(String),
}

type Predicate = Arc<dyn Fn(&GuardContext<'_>) -> bool + Send + Sync>;

/// Allows the navigation while `predicate` holds.
#[derive(Clone)]
pub struct ConditionGuard {
    predicate: Predicate,
    otherwise: Otherwise,
}

impl ConditionGuard {
    pub fn new<F>(predicate: F, otherwise: Otherwise) -> Self
    where
        F: Fn(&GuardContext<'_>) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
            otherwise,
        }
    }

    /// Redirect to `target` when the predicate fails.
    pub fn redirect_unless<F>(predicate: F, target: &str) -> Self
    where
        F: Fn(&GuardContext<'_>) -> bool + Send + Sync + 'static,
    {
        Self::new(predicate, Otherwise::Redirect(target.to_string()))
    }
}

impl Guard for ConditionGuard {
    fn check<'a>(&'a self, ctx: GuardContext<'a>) -> BoxFuture<'a, GuardOutcome> {
        let outcome = if (self.predicate)(&ctx) {
            GuardOutcome::Continue
        } else {
            match &self.otherwise {
                Otherwise::Redirect(target) => GuardOutcome::redirect(target),
                Otherwise::Abort(reason) => GuardOutcome::abort(reason.clone()),
            }
        };
        async move { outcome }.boxed()
    }

    fn name(&self) -> &str {
        "condition"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryMap;
    use crate::routing::matcher::Params;
    use crate::routing::table::{RouteSpec, RouteTable};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn with_ctx<R>(params: &Params, f: impl FnOnce(GuardContext<'_>) -> R) -> R {
        let mut table = RouteTable::new();
        let id = table
            .register(None, RouteSpec::content("/blog/:slug", "blog"))
            .unwrap();
        let node = table.node(id).unwrap();
        let query = QueryMap::new();
        let location = Location::parse("/blog/hello-world");
        f(GuardContext {
            node,
            params,
            query: &query,
            location: &location,
        })
    }

    #[test]
    fn test_redirect_interpolates_params() {
        let guard = RedirectGuard::new("/articles/:slug?from=blog").unwrap();
        let mut params = Params::new();
        params.insert("slug".into(), "hello-world".into());

        let target = with_ctx(&params, |ctx| guard.target_for(&ctx));
        assert_eq!(target.to_string(), "/articles/hello-world?from=blog");
    }

    #[test]
    fn test_redirect_to_fragment() {
        let guard = RedirectGuard::new("#about").unwrap();
        let target = with_ctx(&Params::new(), |ctx| guard.target_for(&ctx));
        assert_eq!(target.hash.as_deref(), Some("about"));
        assert!(target.path.is_empty());
    }

    #[tokio::test]
    async fn test_condition_guard() {
        let logged_in = Arc::new(AtomicBool::new(false));
        let flag = logged_in.clone();
        let guard = ConditionGuard::redirect_unless(move |_| flag.load(Ordering::SeqCst), "/login");

        let params = Params::new();
        let mut table = RouteTable::new();
        let id = table.register(None, RouteSpec::content("/protected", "secret")).unwrap();
        let query = QueryMap::new();
        let location = Location::parse("/protected");
        let ctx = GuardContext {
            node: table.node(id).unwrap(),
            params: &params,
            query: &query,
            location: &location,
        };

        assert_eq!(guard.check(ctx).await, GuardOutcome::redirect("/login"));
        logged_in.store(true, Ordering::SeqCst);
        assert_eq!(guard.check(ctx).await, GuardOutcome::Continue);
    }
}
