//! Hash-style location backend.
//!
//! # Responsibilities
//! - Treat everything after `#` as a mini path + query
//! - Ignore the document path entirely for routing purposes
//! - Notify listeners on fragment changes (hashchange), back and forward
//!
//! # Design Decisions
//! - The configured base prefix does not apply; hrefs are always `#/...`
//! - Changing the document path alone never notifies anyone

use parking_lot::Mutex;

use crate::config::schema::RoutingMode;
use crate::location::listeners::{Listeners, SubscriptionId};
use crate::location::session::{DocumentUrl, SessionHistory};
use crate::location::{Location, LocationListener, LocationSource, NavigateMode};
use crate::query;

#[derive(Debug)]
pub struct HashSource {
    session: Mutex<SessionHistory>,
    listeners: Listeners<Location>,
}

impl HashSource {
    pub fn new(initial_url: &str) -> Self {
        Self {
            session: Mutex::new(SessionHistory::new(DocumentUrl::parse(initial_url))),
            listeners: Listeners::new(),
        }
    }

    pub fn document_url(&self) -> String {
        self.session.lock().current().to_string()
    }

    /// Emulates a manual fragment edit. Fires the change listeners.
    pub fn set_fragment(&self, fragment: &str) {
        {
            let mut session = self.session.lock();
            let mut url = session.current().clone();
            url.hash = fragment.trim_start_matches('#').to_string();
            session.push(url);
        }
        self.notify_current();
    }

    /// Changes the document path in place. Routing is unaffected and nothing is notified.
    pub fn set_document_path(&self, path: &str) {
        let mut session = self.session.lock();
        let mut url = session.current().clone();
        url.path = DocumentUrl::parse(path).path;
        session.replace(url);
    }

    fn fragment_for(target: &Location) -> String {
        let mut fragment = target.path_string();
        if !target.search.is_empty() {
            fragment.push('?');
            fragment.push_str(&query::serialize(&target.search));
        }
        fragment
    }

    fn notify_current(&self) {
        let current = self.current();
        tracing::debug!(location = %current, "Fragment location changed externally");
        self.listeners.notify(&current);
    }
}

impl LocationSource for HashSource {
    fn mode(&self) -> RoutingMode {
        RoutingMode::Hash
    }

    fn current(&self) -> Location {
        let hash = self.session.lock().current().hash.clone();
        Location::parse(&hash)
    }

    fn navigate(&self, target: &Location, mode: NavigateMode) {
        if let Some(hash) = &target.hash {
            tracing::debug!(hash = %hash, "Nested fragment dropped in hash mode");
        }
        let mut session = self.session.lock();
        let mut url = session.current().clone();
        url.hash = Self::fragment_for(target);
        match mode {
            NavigateMode::Push => session.push(url),
            NavigateMode::Replace => session.replace(url),
        }
    }

    fn href(&self, target: &Location) -> String {
        format!("#{}", Self::fragment_for(target))
    }

    fn subscribe(&self, listener: LocationListener) -> SubscriptionId {
        self.listeners.subscribe(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    fn back(&self) -> bool {
        let moved = self.session.lock().back();
        if moved {
            self.notify_current();
        }
        moved
    }

    fn forward(&self) -> bool {
        let moved = self.session.lock().forward();
        if moved {
            self.notify_current();
        }
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_fragment_is_the_routed_path() {
        let source = HashSource::new("/index.html#/test/props?truth=42");
        let loc = source.current();
        assert_eq!(loc.path, vec!["test", "props"]);
        assert_eq!(loc.search.get("truth"), Some("42"));
        assert_eq!(loc.hash, None);
    }

    #[test]
    fn test_document_path_is_ignored() {
        let source = HashSource::new("/app#/about");
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        source.subscribe(Box::new(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        }));

        source.set_document_path("/elsewhere/entirely");
        assert_eq!(source.current().path, vec!["about"]);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(source.document_url(), "/elsewhere/entirely#/about");

        source.set_fragment("#/contact");
        assert_eq!(source.current().path, vec!["contact"]);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_navigate_keeps_document_path() {
        let source = HashSource::new("/app");
        assert!(source.current().path.is_empty());

        source.navigate(&Location::parse("/test?x=y"), NavigateMode::Push);
        assert_eq!(source.document_url(), "/app#/test?x=y");
        assert_eq!(source.href(&Location::parse("/test")), "#/test");
        assert_eq!(source.href(&Location::root()), "#/");
    }
}
