//! Location source subsystem.
//!
//! # Data Flow
//! ```text
//! document URL (session.rs, in-memory history stack)
//!     → history.rs: path minus base prefix, ?search, #hash
//!     → hash.rs:    everything after '#' parsed as path + query
//!     → Location { path, hash, search }   (identical shape for both)
//!     → routing table / navigation engine
//!
//! External change (back/forward, fragment edit):
//!     backend updates its session history
//!     → listeners.rs notifies subscribers in order
//! ```
//!
//! # Design Decisions
//! - Backend choice is invisible past `LocationSource`
//! - Programmatic `navigate` never notifies listeners; only external changes do
//! - Base-href rebasing is applied on read and on href generation (history only)

pub mod hash;
pub mod history;
pub mod listeners;
pub mod session;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::config::schema::{RouterConfig, RoutingMode};
use crate::query::{self, QueryMap};
use crate::routing::matcher::split_segments;

pub use hash::HashSource;
pub use history::HistorySource;
pub use listeners::{Listeners, SubscriptionId};

/// Normalized location consumed by the routing core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Location {
    pub path: Vec<String>,
    pub hash: Option<String>,
    pub search: QueryMap,
}

impl Location {
    /// Parse `/a/b?x=1#frag`. The leading slash is optional.
    pub fn parse(href: &str) -> Self {
        let (rest, hash) = match href.split_once('#') {
            Some((rest, hash)) => (rest, Some(hash)),
            None => (href, None),
        };
        let (path, search) = match rest.split_once('?') {
            Some((path, search)) => (path, search),
            None => (rest, ""),
        };

        Self {
            path: split_segments(path),
            hash: hash.filter(|h| !h.is_empty()).map(str::to_string),
            search: query::parse(search),
        }
    }

    pub fn root() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, search: QueryMap) -> Self {
        self.search = search;
        self
    }

    /// `/a/b`, or `/` for the root.
    pub fn path_string(&self) -> String {
        format!("/{}", self.path.join("/"))
    }

    pub fn hash_segments(&self) -> Vec<String> {
        self.hash.as_deref().map(split_segments).unwrap_or_default()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path_string())?;
        if !self.search.is_empty() {
            write!(f, "?{}", query::serialize(&self.search))?;
        }
        if let Some(hash) = &self.hash {
            write!(f, "#{}", hash)?;
        }
        Ok(())
    }
}

impl From<&str> for Location {
    fn from(href: &str) -> Self {
        Location::parse(href)
    }
}

/// How a committed navigation is written to the session history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigateMode {
    Push,
    Replace,
}

/// Callback invoked with the new location on external changes.
pub type LocationListener = Box<dyn Fn(&Location) + Send + Sync>;

/// Abstract "current location" over a history or hash backend.
pub trait LocationSource: Send + Sync + fmt::Debug {
    fn mode(&self) -> RoutingMode;

    fn current(&self) -> Location;

    /// Record a programmatic navigation. Listeners are not notified.
    fn navigate(&self, target: &Location, mode: NavigateMode);

    /// Link href for `target`, rebased for the backend.
    fn href(&self, target: &Location) -> String;

    fn subscribe(&self, listener: LocationListener) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Emulated user "back". Notifies listeners when the cursor moved.
    fn back(&self) -> bool;

    /// Emulated user "forward". Notifies listeners when the cursor moved.
    fn forward(&self) -> bool;
}

/// Build the backend selected by `config.mode`, starting at `initial_url`.
pub fn source_from_config(config: &RouterConfig, initial_url: &str) -> Arc<dyn LocationSource> {
    match config.mode {
        RoutingMode::History => Arc::new(HistorySource::new(&config.base, initial_url)),
        RoutingMode::Hash => Arc::new(HashSource::new(initial_url)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_location() {
        let loc = Location::parse("/test/props?truth=42#top");
        assert_eq!(loc.path, vec!["test", "props"]);
        assert_eq!(loc.search.get("truth"), Some("42"));
        assert_eq!(loc.hash.as_deref(), Some("top"));
        assert_eq!(loc.to_string(), "/test/props?truth=42#top");
    }

    #[test]
    fn test_empty_hash_is_none() {
        let loc = Location::parse("/sub#");
        assert_eq!(loc.hash, None);
        assert_eq!(loc.to_string(), "/sub");
    }

    #[test]
    fn test_root() {
        let loc = Location::parse("/");
        assert!(loc.path.is_empty());
        assert_eq!(loc.path_string(), "/");
        assert_eq!(Location::root(), loc);
    }

    #[test]
    fn test_hash_segments() {
        let loc = Location::parse("/gist#test/edit");
        assert_eq!(loc.hash_segments(), vec!["test", "edit"]);
        assert!(Location::parse("/gist").hash_segments().is_empty());
    }
}
