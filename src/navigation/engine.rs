//! The navigation state machine.
//!
//! # Responsibilities
//! - Drive each request through Resolving → Guarding → Committing → Settled
//! - Apply the unmatched policy (fallback, unreachable sub-path, no match)
//! - Follow guard redirects up to `max_redirects`
//! - Drop superseded requests without committing anything
//! - Track the active match and per-node payload load states
//!
//! # Design Decisions
//! - The generation counter lives in a `watch` channel so suspended guards
//!   can be woken the moment a newer request starts
//! - The active snapshot is an `ArcSwapOption`; readers never block a commit
//! - Commit re-checks the generation under a mutex, so at most one request
//!   writes the location source at a time
//! - Subscribers are notified after the commit lock is released
//! - The phase word carries the generation that wrote it; an older request
//!   can never overwrite the phase of a newer one

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use futures_util::future::join_all;
use parking_lot::Mutex;
use tokio::sync::watch;
use uuid::Uuid;

use crate::config::schema::{RouterConfig, RoutingMode};
use crate::error::RouterResult;
use crate::guard::{Cancellation, Pipeline, PipelineOutcome};
use crate::location::{source_from_config, Listeners, Location, LocationSource, NavigateMode, SubscriptionId};
use crate::navigation::listener::ExternalListener;
use crate::navigation::request::{NavigateOptions, NavigationRequest, Trigger};
use crate::navigation::state::{ActiveMatch, ActiveState, NavPhase, Navigation, NotFoundReason, Settled};
use crate::observability::metrics;
use crate::query::{self, QueryMap};
use crate::routing::matcher::Params;
use crate::routing::payload::{LoadState, Payload};
use crate::routing::table::{MatchResult, NodeId, RouteTable};

/// Engine tuning.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub max_redirects: usize,
    pub guard_timeout: Option<Duration>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            max_redirects: 10,
            guard_timeout: None,
        }
    }
}

impl From<&RouterConfig> for RouterOptions {
    fn from(config: &RouterConfig) -> Self {
        Self {
            max_redirects: config.max_redirects,
            guard_timeout: config.guard_timeout_ms.map(Duration::from_millis),
        }
    }
}

struct RouterInner {
    table: RouteTable,
    source: Arc<dyn LocationSource>,
    options: RouterOptions,
    pipeline: Pipeline,
    generation: watch::Sender<u64>,
    /// `generation << 8 | phase`
    phase: AtomicU64,
    commit_lock: Mutex<()>,
    active: ArcSwapOption<ActiveMatch>,
    settled: ArcSwapOption<Settled>,
    subscribers: Listeners<Settled>,
    load_states: DashMap<NodeId, LoadState>,
}

/// A routing context: one route table bound to one location source.
///
/// Cloning is cheap; clones drive the same instance.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

impl Router {
    pub fn new(table: RouteTable, source: Arc<dyn LocationSource>, options: RouterOptions) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            inner: Arc::new(RouterInner {
                table,
                source,
                pipeline: Pipeline::new(options.guard_timeout),
                options,
                generation,
                phase: AtomicU64::new(NavPhase::Idle as u64),
                commit_lock: Mutex::new(()),
                active: ArcSwapOption::empty(),
                settled: ArcSwapOption::empty(),
                subscribers: Listeners::new(),
                load_states: DashMap::new(),
            }),
        }
    }

    /// Build the table and the configured location source.
    pub fn from_config(config: &RouterConfig, initial_url: &str) -> RouterResult<Self> {
        let table = RouteTable::from_config(&config.routes)?;
        let source = source_from_config(config, initial_url);

        tracing::info!(
            mode = ?config.mode,
            base = %config.base,
            routes = table.len(),
            "Router created"
        );
        Ok(Self::new(table, source, RouterOptions::from(config)))
    }

    pub fn table(&self) -> &RouteTable {
        &self.inner.table
    }

    pub fn source(&self) -> &Arc<dyn LocationSource> {
        &self.inner.source
    }

    pub fn phase(&self) -> NavPhase {
        NavPhase::from_u8((self.inner.phase.load(Ordering::Acquire) & 0xff) as u8)
    }

    /// Record `phase` for `generation` unless a newer generation already wrote one.
    fn set_phase(&self, generation: u64, phase: NavPhase) {
        let packed = generation << 8 | phase as u64;
        let _ = self
            .inner
            .phase
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current >> 8 <= generation).then_some(packed)
            });
    }

    /// The committed match, if the last committed navigation matched.
    pub fn active(&self) -> Option<Arc<ActiveMatch>> {
        self.inner.active.load_full()
    }

    /// The last published terminal state.
    pub fn settled(&self) -> Option<Arc<Settled>> {
        self.inner.settled.load_full()
    }

    /// Called with every settled navigation, in subscription order.
    pub fn subscribe(&self, callback: impl Fn(&Settled) + Send + Sync + 'static) -> SubscriptionId {
        self.inner.subscribers.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.subscribers.unsubscribe(id)
    }

    /// Start receiving location changes the router did not make.
    pub fn listen(&self) -> ExternalListener {
        ExternalListener::new(self.clone())
    }

    /// Resolve whatever the location source currently shows.
    pub async fn sync(&self) -> Navigation {
        self.navigate(NavigationRequest::external(self.inner.source.current()))
            .await
    }

    pub async fn navigate_to(&self, href: &str, options: NavigateOptions) -> Navigation {
        let trigger = if options.replace {
            Trigger::Replace
        } else {
            Trigger::Push
        };
        let mut request = NavigationRequest::new(self.target_for(href), trigger);
        request.query = options.query;
        self.navigate(request).await
    }

    /// Merge `overrides` into the current query and replace the history entry.
    pub async fn merge_query(&self, overrides: QueryMap) -> Navigation {
        let request = NavigationRequest::new(self.inner.source.current(), Trigger::Replace)
            .with_query(overrides);
        self.navigate(request).await
    }

    /// Replace the current query wholesale.
    pub async fn set_query(&self, search: QueryMap) -> Navigation {
        let target = self.inner.source.current().with_query(search);
        self.navigate(NavigationRequest::new(target, Trigger::Replace))
            .await
    }

    /// The href a link to `href` should carry under the current backend.
    pub fn resolve_href(&self, href: &str, overrides: Option<&QueryMap>) -> String {
        let mut target = self.target_for(href);
        if let Some(overrides) = overrides {
            target.search = query::merge(&target.search, overrides);
        }
        self.inner.source.href(&target)
    }

    pub fn is_active(&self, href: &str) -> ActiveState {
        match self.active() {
            Some(active) => ActiveState::of(&self.target_for(href).path, &active.location.path),
            None => ActiveState::Inactive,
        }
    }

    /// Interpret a link href for the current backend. A bare `#frag` in
    /// history mode keeps the current path.
    fn target_for(&self, href: &str) -> Location {
        match self.inner.source.mode() {
            RoutingMode::Hash => Location::parse(href.strip_prefix('#').unwrap_or(href)),
            RoutingMode::History => match href.strip_prefix('#') {
                Some(fragment) => {
                    let mut target = self.inner.source.current();
                    target.hash = Some(fragment.to_string()).filter(|f| !f.is_empty());
                    target
                }
                None => Location::parse(href),
            },
        }
    }

    /// Guard redirect targets are written as link hrefs, so a `#/path` target
    /// in hash mode means `/path`.
    fn redirect_target(&self, next: Location) -> Location {
        if self.inner.source.mode() == RoutingMode::Hash
            && next.path.is_empty()
            && next.search.is_empty()
        {
            if let Some(hash) = &next.hash {
                return Location::parse(hash);
            }
        }
        next
    }

    /// Run a navigation request to completion.
    pub async fn navigate(&self, request: NavigationRequest) -> Navigation {
        let inner = &self.inner;

        let mut generation = 0;
        inner.generation.send_modify(|current| {
            *current += 1;
            generation = *current;
        });
        let mut cancel = Cancellation::new(generation, inner.generation.subscribe());

        let request_id = request.id;
        let mut target = request.target;
        if let Some(overrides) = &request.query {
            target.search = query::merge(&target.search, overrides);
        }

        tracing::debug!(
            request_id = %request_id,
            href = %target,
            trigger = ?request.trigger,
            generation,
            "Navigation started"
        );

        let origin = target.clone();
        let mut redirects = 0usize;
        let mut trail = vec![target.to_string()];

        let settled = loop {
            self.set_phase(generation, NavPhase::Resolving);
            let result = inner.table.resolve(&target);

            let (chain, params, fallback) = match self.apply_unmatched_policy(&target, result) {
                Ok(found) => found,
                Err(reason) => {
                    break Settled::NotFound {
                        location: target,
                        reason,
                    }
                }
            };

            tracing::debug!(
                request_id = %request_id,
                pattern = %inner.table.full_pattern(&chain),
                fallback,
                "Route resolved"
            );

            self.set_phase(generation, NavPhase::Guarding);
            let outcome = inner
                .pipeline
                .run(&inner.table, &chain, &params, &target, &mut cancel)
                .await;

            if !cancel.is_current() {
                metrics::record_superseded();
                tracing::debug!(request_id = %request_id, "Navigation superseded while guarding");
                return Navigation::Superseded;
            }

            match outcome {
                PipelineOutcome::Continue => {
                    break Settled::Matched(ActiveMatch {
                        location: target,
                        chain,
                        params,
                        fallback,
                    })
                }
                PipelineOutcome::Redirect(next) => {
                    let next = self.redirect_target(next);
                    redirects += 1;
                    trail.push(next.to_string());

                    if redirects > inner.options.max_redirects {
                        tracing::warn!(
                            request_id = %request_id,
                            limit = inner.options.max_redirects,
                            trail = %trail.join(" -> "),
                            "Redirect loop detected"
                        );
                        break Settled::NotFound {
                            location: origin,
                            reason: NotFoundReason::RedirectLoop {
                                limit: inner.options.max_redirects,
                                trail: std::mem::take(&mut trail),
                            },
                        };
                    }

                    metrics::record_redirect();
                    tracing::debug!(
                        request_id = %request_id,
                        from = %target,
                        to = %next,
                        "Guard redirected"
                    );
                    target = next;
                }
                PipelineOutcome::Abort(reason) => {
                    tracing::info!(request_id = %request_id, reason = %reason, "Navigation aborted");
                    break Settled::NotFound {
                        location: target,
                        reason: NotFoundReason::Aborted { reason },
                    };
                }
                PipelineOutcome::Superseded => {
                    metrics::record_superseded();
                    tracing::debug!(request_id = %request_id, "Navigation superseded while guarding");
                    return Navigation::Superseded;
                }
            }
        };

        let writes_location = match &settled {
            Settled::Matched(_) => true,
            Settled::NotFound { reason, .. } => matches!(
                reason,
                NotFoundReason::NoMatch | NotFoundReason::Unreachable { .. }
            ),
        };
        let mode = if writes_location {
            request.trigger.commit_mode(redirects > 0)
        } else {
            None
        };

        self.commit(settled, mode, &cancel, request_id)
    }

    /// Turn a failed resolution into a fallback chain or a not-found reason.
    fn apply_unmatched_policy(
        &self,
        target: &Location,
        result: MatchResult,
    ) -> Result<(Vec<NodeId>, Params, bool), NotFoundReason> {
        if result.is_match() {
            return Ok((result.chain, result.params, false));
        }

        let table = &self.inner.table;
        match result.unresolved {
            Some(unresolved) => match table.fallback_for(unresolved.prefix.last().copied()) {
                Some(fallback) => {
                    let mut chain = unresolved.prefix;
                    chain.push(fallback);
                    Ok((chain, unresolved.params, true))
                }
                None => Err(NotFoundReason::Unreachable {
                    href: target.to_string(),
                    suffix: unresolved.suffix_string(),
                    prefix: unresolved.prefix,
                    params: unresolved.params,
                }),
            },
            None => match table.fallback_for(None) {
                Some(fallback) => Ok((vec![fallback], Params::new(), true)),
                None => Err(NotFoundReason::NoMatch),
            },
        }
    }

    fn commit(
        &self,
        settled: Settled,
        mode: Option<NavigateMode>,
        cancel: &Cancellation,
        request_id: Uuid,
    ) -> Navigation {
        let inner = &self.inner;
        let settled = Arc::new(settled);

        {
            let _commit = inner.commit_lock.lock();
            if !cancel.is_current() {
                metrics::record_superseded();
                tracing::debug!(request_id = %request_id, "Navigation superseded before commit");
                return Navigation::Superseded;
            }

            self.set_phase(cancel.generation(), NavPhase::Committing);
            if let Some(mode) = mode {
                inner.source.navigate(settled.location(), mode);
            }

            match &*settled {
                Settled::Matched(active) => inner.active.store(Some(Arc::new(active.clone()))),
                Settled::NotFound {
                    reason: NotFoundReason::NoMatch | NotFoundReason::Unreachable { .. },
                    ..
                } => inner.active.store(None),
                Settled::NotFound { .. } => {}
            }
            inner.settled.store(Some(settled.clone()));
            self.set_phase(cancel.generation(), NavPhase::Settled);
        }

        metrics::record_navigation(settled.outcome());
        tracing::info!(
            request_id = %request_id,
            href = %settled.location(),
            outcome = settled.outcome(),
            "Navigation settled"
        );

        inner.subscribers.notify(&settled);

        self.set_phase(cancel.generation(), NavPhase::Idle);
        Navigation::Settled(settled)
    }

    /// Load state of a node's payload. `None` for an unknown node.
    pub fn payload_state(&self, id: NodeId) -> Option<LoadState> {
        let node = self.inner.table.node(id)?;
        let state = match node.payload() {
            Payload::Empty => LoadState::Idle,
            Payload::Immediate(content) => LoadState::Ready(content.clone()),
            Payload::Deferred(_) => self
                .inner
                .load_states
                .get(&id)
                .map(|state| state.value().clone())
                .unwrap_or(LoadState::Idle),
        };
        Some(state)
    }

    /// Resolve the deferred payloads of the active chain concurrently.
    ///
    /// Nodes already `Ready` or `Loading` are skipped. A failing loader only
    /// marks its own node `Failed`.
    pub async fn load_payloads(&self) -> Vec<(NodeId, LoadState)> {
        let Some(active) = self.active() else {
            return Vec::new();
        };

        let pending: Vec<_> = active
            .chain
            .iter()
            .filter_map(|id| match self.inner.table.node(*id)?.payload() {
                Payload::Deferred(loader) => Some((*id, loader.clone())),
                _ => None,
            })
            .filter(|(id, _)| {
                !matches!(
                    self.payload_state(*id),
                    Some(LoadState::Ready(_) | LoadState::Loading)
                )
            })
            .collect();

        for (id, _) in &pending {
            self.inner.load_states.insert(*id, LoadState::Loading);
        }

        let results = join_all(pending.into_iter().map(|(id, loader)| async move {
            let state = match loader.load().await {
                Ok(content) => LoadState::Ready(content),
                Err(error) => LoadState::Failed(error),
            };
            (id, state)
        }))
        .await;

        for (id, state) in &results {
            if let LoadState::Failed(error) = state {
                tracing::warn!(node = %id, error = %error, "Payload failed to load");
            }
            self.inner.load_states.insert(*id, state.clone());
        }
        results
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("mode", &self.inner.source.mode())
            .field("routes", &self.inner.table.len())
            .field("phase", &self.phase())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::{guard_async, guard_fn, GuardOutcome};
    use crate::location::{HashSource, HistorySource};
    use crate::routing::payload::Payload;
    use crate::routing::table::RouteSpec;
    use std::sync::atomic::AtomicUsize;

    fn router_with(routes: Vec<RouteSpec>, initial: &str) -> Router {
        let mut table = RouteTable::new();
        for route in routes {
            table.register(None, route).unwrap();
        }
        Router::new(
            table,
            Arc::new(HistorySource::new("", initial)),
            RouterOptions::default(),
        )
    }

    fn leaf_label(router: &Router, navigation: &Navigation) -> String {
        let active = navigation.settled().unwrap().active().unwrap();
        router
            .table()
            .node(active.leaf().unwrap())
            .unwrap()
            .label()
            .to_string()
    }

    #[tokio::test]
    async fn test_push_commits_location_and_active() {
        let router = router_with(
            vec![RouteSpec::content("/", "home").exact(true), RouteSpec::content("/about", "about")],
            "/",
        );

        let navigation = router.navigate_to("/about", NavigateOptions::default()).await;
        assert_eq!(leaf_label(&router, &navigation), "about");
        assert_eq!(router.source().current(), Location::parse("/about"));
        assert_eq!(router.phase(), NavPhase::Idle);
        assert_eq!(router.is_active("/about"), ActiveState::Exact);
        assert_eq!(router.is_active("/"), ActiveState::Inactive);
    }

    #[tokio::test]
    async fn test_abort_keeps_location_and_active() {
        let router = router_with(
            vec![
                RouteSpec::content("/", "home").exact(true),
                RouteSpec::content("/admin", "admin").guard(guard_fn(|_| GuardOutcome::abort("forbidden"))),
            ],
            "/",
        );
        router.sync().await;

        let navigation = router.navigate_to("/admin", NavigateOptions::default()).await;
        let settled = navigation.settled().unwrap();
        assert_eq!(settled.outcome(), "aborted");
        assert_eq!(settled.error().unwrap().to_string(), "navigation aborted: forbidden");

        assert_eq!(router.source().current(), Location::root());
        assert_eq!(router.active().unwrap().location, Location::root());
    }

    #[tokio::test]
    async fn test_redirect_loop_is_bounded() {
        let hops = Arc::new(AtomicUsize::new(0));
        let counter = hops.clone();

        let mut table = RouteTable::new();
        table
            .register(
                None,
                RouteSpec::content("/ping", "ping").guard(guard_fn(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    GuardOutcome::redirect("/pong")
                })),
            )
            .unwrap();
        table
            .register(
                None,
                RouteSpec::content("/pong", "pong").guard(guard_fn(|_| GuardOutcome::redirect("/ping"))),
            )
            .unwrap();

        let router = Router::new(
            table,
            Arc::new(HistorySource::new("", "/")),
            RouterOptions {
                max_redirects: 3,
                guard_timeout: None,
            },
        );

        let navigation = router.navigate_to("/ping", NavigateOptions::default()).await;
        let settled = navigation.settled().unwrap();
        match settled {
            Settled::NotFound {
                reason: NotFoundReason::RedirectLoop { limit, trail },
                ..
            } => {
                assert_eq!(*limit, 3);
                assert_eq!(trail.len(), 5);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(settled.location(), &Location::parse("/ping"));
        assert_eq!(hops.load(Ordering::SeqCst), 2);
        assert_eq!(router.source().current(), Location::root());
    }

    #[tokio::test]
    async fn test_newer_navigation_supersedes_suspended_guard() {
        let (release_tx, release_rx) = watch::channel(false);
        let router = router_with(
            vec![
                RouteSpec::content("/slow", "slow").guard(guard_async(move |_| {
                    let mut release = release_rx.clone();
                    async move {
                        let _ = release.wait_for(|open| *open).await;
                        GuardOutcome::Continue
                    }
                })),
                RouteSpec::content("/fast", "fast"),
            ],
            "/",
        );

        let slow = {
            let router = router.clone();
            tokio::spawn(async move { router.navigate_to("/slow", NavigateOptions::default()).await })
        };
        tokio::task::yield_now().await;
        while router.phase() != NavPhase::Guarding {
            tokio::task::yield_now().await;
        }

        let fast = router.navigate_to("/fast", NavigateOptions::default()).await;
        let _ = release_tx.send(true);

        assert!(slow.await.unwrap().is_superseded());
        assert_eq!(leaf_label(&router, &fast), "fast");
        assert_eq!(router.source().current(), Location::parse("/fast"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_superseded_redirect_leaves_phase_idle() {
        for _ in 0..100 {
            let (release_tx, release_rx) = watch::channel(false);
            let router = router_with(
                vec![
                    RouteSpec::content("/slow", "slow").guard(guard_async(move |_| {
                        let mut release = release_rx.clone();
                        async move {
                            let _ = release.wait_for(|open| *open).await;
                            GuardOutcome::redirect("/target")
                        }
                    })),
                    RouteSpec::content("/target", "target"),
                    RouteSpec::content("/fast", "fast"),
                ],
                "/",
            );

            let slow = {
                let router = router.clone();
                tokio::spawn(async move { router.navigate_to("/slow", NavigateOptions::default()).await })
            };
            while router.phase() != NavPhase::Guarding {
                tokio::task::yield_now().await;
            }

            // the guard finishes on the other worker while the newer request runs
            let release = tokio::spawn(async move {
                let _ = release_tx.send(true);
            });
            let fast = router.navigate_to("/fast", NavigateOptions::default()).await;
            release.await.unwrap();
            slow.await.unwrap();

            assert_eq!(leaf_label(&router, &fast), "fast");
            assert_eq!(router.source().current(), Location::parse("/fast"));
            assert_eq!(router.phase(), NavPhase::Idle);
        }
    }

    #[tokio::test]
    async fn test_hash_mode_redirect_target_drops_leading_hash() {
        let mut table = RouteTable::new();
        table.register(None, RouteSpec::content("/login", "login")).unwrap();
        table
            .register(
                None,
                RouteSpec::content("/private", "private")
                    .guard(guard_fn(|_| GuardOutcome::redirect("#/login?next=private"))),
            )
            .unwrap();
        let source = Arc::new(HashSource::new("/index.html#/"));
        let router = Router::new(table, source.clone(), RouterOptions::default());

        let navigation = router.navigate_to("#/private", NavigateOptions::default()).await;
        assert_eq!(leaf_label(&router, &navigation), "login");
        assert_eq!(source.current(), Location::parse("/login?next=private"));
    }

    #[tokio::test]
    async fn test_subscribers_see_settled_states_in_order() {
        let router = router_with(vec![RouteSpec::content("/a", "a"), RouteSpec::content("/b", "b")], "/");
        let seen = Arc::new(Mutex::new(Vec::new()));

        let (first, second) = (seen.clone(), seen.clone());
        router.subscribe(move |settled| first.lock().push(format!("1:{}", settled.location())));
        let id = router.subscribe(move |settled| second.lock().push(format!("2:{}", settled.location())));

        router.navigate_to("/a", NavigateOptions::default()).await;
        assert!(router.unsubscribe(id));
        router.navigate_to("/b", NavigateOptions::default()).await;

        assert_eq!(*seen.lock(), vec!["1:/a", "2:/a", "1:/b"]);
    }

    #[tokio::test]
    async fn test_deferred_payload_failure_is_isolated() {
        let router = router_with(
            vec![RouteSpec::new("/docs", Payload::deferred(|| async { Ok("docs".to_string()) }))
                .child(RouteSpec::new(
                    "/:page",
                    Payload::deferred(|| async { Err("chunk missing".to_string()) }),
                ))],
            "/",
        );

        let navigation = router.navigate_to("/docs/intro", NavigateOptions::default()).await;
        let chain = navigation.settled().unwrap().active().unwrap().chain.clone();
        assert_eq!(router.payload_state(chain[0]), Some(LoadState::Idle));

        let results = router.load_payloads().await;
        assert_eq!(results.len(), 2);
        assert_eq!(router.payload_state(chain[0]), Some(LoadState::Ready("docs".into())));
        assert_eq!(
            router.payload_state(chain[1]),
            Some(LoadState::Failed("chunk missing".into()))
        );

        // ready nodes are not loaded twice
        let again = router.load_payloads().await;
        assert_eq!(again.len(), 1);
    }
}
