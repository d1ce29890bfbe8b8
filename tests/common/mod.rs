//! Shared fixtures for the integration tests.
//!
//! `demo_table` mirrors a small demo application: nested routes, anchored
//! fragment routes, a gist viewer with fragment sub-routes, a protected page
//! and a level with its own fallback.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use client_router::guard::{ConditionGuard, RedirectGuard};
use client_router::location::{HashSource, HistorySource, LocationSource};
use client_router::navigation::{NavigateOptions, Navigation, Router, RouterOptions};
use client_router::routing::{Payload, RouteSpec, RouteTable};

pub fn demo_table(logged_in: Arc<AtomicBool>) -> RouteTable {
    let mut table = RouteTable::new();
    let routes = vec![
        RouteSpec::content("/", "home").exact(true),
        RouteSpec::content("/test", "test-page").children(vec![
            RouteSpec::new("/redirect", Payload::Empty)
                .guard(RedirectGuard::new("/test").unwrap()),
            RouteSpec::content("/props", "props"),
            RouteSpec::content("/:value", "value"),
        ]),
        RouteSpec::content("/example", "Hello World").children(vec![
            RouteSpec::content("/:name", "hello-name"),
            RouteSpec::fallback(Payload::immediate("Not found")),
        ]),
        RouteSpec::content("/e", "e-page").children(vec![
            RouteSpec::content("/known", "known"),
            RouteSpec::fallback(Payload::immediate("NOT FOUND")),
        ]),
        RouteSpec::content("/sub", "sub").children(vec![
            RouteSpec::content("#", "HOME").exact(true),
            RouteSpec::content("#about", "ABOUT"),
        ]),
        RouteSpec::content("/top", "?").children(vec![
            RouteSpec::content("/1", "a"),
            RouteSpec::content("/2", "b"),
            RouteSpec::content("/3", "c"),
        ]),
        RouteSpec::content("/gist", "GIST INFO").child(
            RouteSpec::content("#:sha1", "SHA1").children(vec![
                RouteSpec::content("/edit", "(edit)"),
                RouteSpec::content("/save", "(save)"),
            ]),
        ),
        RouteSpec::content("/auth", "auth").children(vec![
            RouteSpec::content("/login", "Log-in"),
            RouteSpec::content("/protected", "Welcome back.").guard(
                ConditionGuard::redirect_unless(
                    move |_| logged_in.load(Ordering::SeqCst),
                    "/auth/login",
                ),
            ),
        ]),
    ];

    for route in routes {
        table.register(None, route).unwrap();
    }
    table
}

pub struct Demo {
    pub router: Router,
    pub logged_in: Arc<AtomicBool>,
}

pub fn history_demo(base: &str, initial: &str) -> (Demo, Arc<HistorySource>) {
    let source = Arc::new(HistorySource::new(base, initial));
    (demo_with(source.clone()), source)
}

pub fn hash_demo(initial: &str) -> (Demo, Arc<HashSource>) {
    let source = Arc::new(HashSource::new(initial));
    (demo_with(source.clone()), source)
}

fn demo_with(source: Arc<dyn LocationSource>) -> Demo {
    let logged_in = Arc::new(AtomicBool::new(false));
    let table = demo_table(logged_in.clone());
    Demo {
        router: Router::new(table, source, RouterOptions::default()),
        logged_in,
    }
}

/// Labels of the settled chain; empty when nothing is active.
pub fn labels(router: &Router, navigation: &Navigation) -> Vec<String> {
    navigation
        .settled()
        .and_then(|settled| settled.active())
        .map(|active| {
            active
                .chain
                .iter()
                .map(|id| router.table().node(*id).unwrap().label().to_string())
                .collect()
        })
        .unwrap_or_default()
}

pub async fn push(router: &Router, href: &str) -> Navigation {
    router.navigate_to(href, NavigateOptions::default()).await
}
