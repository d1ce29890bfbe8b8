//! History-style location backend.
//!
//! # Responsibilities
//! - Read the routed path from the document path, minus the base prefix
//! - Re-prepend the base prefix when writing entries and generating hrefs
//! - Notify listeners on back/forward and on external navigations

use parking_lot::Mutex;

use crate::config::schema::RoutingMode;
use crate::location::listeners::{Listeners, SubscriptionId};
use crate::location::session::{DocumentUrl, SessionHistory};
use crate::location::{Location, LocationListener, LocationSource, NavigateMode};
use crate::query;
use crate::routing::matcher::split_segments;

#[derive(Debug)]
pub struct HistorySource {
    base: String,
    session: Mutex<SessionHistory>,
    listeners: Listeners<Location>,
}

impl HistorySource {
    /// `base` is a path prefix such as `/folder`, or empty.
    pub fn new(base: &str, initial_url: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            session: Mutex::new(SessionHistory::new(DocumentUrl::parse(initial_url))),
            listeners: Listeners::new(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// The raw document URL, base prefix included.
    pub fn document_url(&self) -> String {
        self.session.lock().current().to_string()
    }

    pub fn history_len(&self) -> usize {
        self.session.lock().len()
    }

    /// A navigation the router did not initiate (plain anchor, address bar).
    pub fn external_navigate(&self, url: &str) {
        self.session.lock().push(DocumentUrl::parse(url));
        self.notify_current();
    }

    fn strip_base<'a>(&self, path: &'a str) -> &'a str {
        if self.base.is_empty() {
            return path;
        }
        match path.strip_prefix(self.base.as_str()) {
            Some("") => "/",
            Some(rest) if rest.starts_with('/') => rest,
            _ => path,
        }
    }

    fn rebase(&self, target: &Location) -> String {
        if target.path.is_empty() && !self.base.is_empty() {
            return self.base.clone();
        }
        format!("{}{}", self.base, target.path_string())
    }

    fn to_document_url(&self, target: &Location) -> DocumentUrl {
        DocumentUrl {
            path: self.rebase(target),
            search: query::serialize(&target.search),
            hash: target.hash.clone().unwrap_or_default(),
        }
    }

    fn notify_current(&self) {
        let current = self.current();
        tracing::debug!(location = %current, "History location changed externally");
        self.listeners.notify(&current);
    }
}

impl LocationSource for HistorySource {
    fn mode(&self) -> RoutingMode {
        RoutingMode::History
    }

    fn current(&self) -> Location {
        let url = self.session.lock().current().clone();
        Location {
            path: split_segments(self.strip_base(&url.path)),
            hash: Some(url.hash).filter(|h| !h.is_empty()),
            search: query::parse(&url.search),
        }
    }

    fn navigate(&self, target: &Location, mode: NavigateMode) {
        let url = self.to_document_url(target);
        let mut session = self.session.lock();
        match mode {
            NavigateMode::Push => session.push(url),
            NavigateMode::Replace => session.replace(url),
        }
    }

    fn href(&self, target: &Location) -> String {
        self.to_document_url(target).to_string()
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
    use std::sync::Arc;

    #[test]
    fn test_reads_path_search_and_hash() {
        let source = HistorySource::new("", "/test/props?truth=42#anchor");
        let loc = source.current();
        assert_eq!(loc.path, vec!["test", "props"]);
        assert_eq!(loc.search.get("truth"), Some("42"));
        assert_eq!(loc.hash.as_deref(), Some("anchor"));
    }

    #[test]
    fn test_base_is_stripped_and_reapplied() {
        let source = HistorySource::new("/folder/", "/folder/test");
        assert_eq!(source.base(), "/folder");
        assert_eq!(source.current().path, vec!["test"]);

        assert_eq!(source.href(&Location::root()), "/folder");
        assert_eq!(source.href(&Location::parse("/test?x=1")), "/folder/test?x=1");

        source.navigate(&Location::parse("/test/props"), NavigateMode::Push);
        assert_eq!(source.document_url(), "/folder/test/props");
        assert_eq!(source.current().path, vec!["test", "props"]);
    }

    #[test]
    fn test_base_only_strips_whole_segments() {
        let source = HistorySource::new("/folder", "/folderish/x");
        assert_eq!(source.current().path, vec!["folderish", "x"]);

        let source = HistorySource::new("/folder", "/folder");
        assert!(source.current().path.is_empty());
    }

    #[test]
    fn test_push_and_replace() {
        let source = HistorySource::new("", "/");
        source.navigate(&Location::parse("/a"), NavigateMode::Push);
        source.navigate(&Location::parse("/b"), NavigateMode::Replace);
        assert_eq!(source.history_len(), 2);
        assert_eq!(source.document_url(), "/b");
    }

    #[test]
    fn test_back_notifies_listeners() {
        let source = HistorySource::new("", "/");
        source.navigate(&Location::parse("/a"), NavigateMode::Push);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let id = source.subscribe(Box::new(move |loc| s.lock().push(loc.to_string())));

        assert!(source.back());
        assert!(!source.back());
        assert!(source.forward());
        assert_eq!(*seen.lock(), vec!["/".to_string(), "/a".to_string()]);

        assert!(source.unsubscribe(id));
        source.external_navigate("/b");
        assert_eq!(seen.lock().len(), 2);
        assert_eq!(source.current().path, vec!["b"]);
    }
}
