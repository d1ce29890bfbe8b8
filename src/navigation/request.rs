//! Navigation requests.

use uuid::Uuid;

use crate::location::{Location, NavigateMode};
use crate::query::QueryMap;

/// What started a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Push,
    Replace,
    /// The location source changed on its own (back, forward, manual edit).
    External,
}

impl Trigger {
    /// How the committed location is written, if at all.
    pub fn commit_mode(self, redirected: bool) -> Option<NavigateMode> {
        match self {
            Trigger::Push => Some(NavigateMode::Push),
            Trigger::Replace => Some(NavigateMode::Replace),
            Trigger::External if redirected => Some(NavigateMode::Replace),
            Trigger::External => None,
        }
    }
}

/// A single navigation attempt.
#[derive(Debug, Clone)]
pub struct NavigationRequest {
    /// Correlation id carried by every log line of this navigation.
    pub id: Uuid,
    pub target: Location,
    pub trigger: Trigger,
    /// Merged into the target's query before resolution.
    pub query: Option<QueryMap>,
}

impl NavigationRequest {
    pub fn new(target: Location, trigger: Trigger) -> Self {
        Self {
            id: Uuid::new_v4(),
            target,
            trigger,
            query: None,
        }
    }

    pub fn push(href: &str) -> Self {
        Self::new(Location::parse(href), Trigger::Push)
    }

    pub fn replace(href: &str) -> Self {
        Self::new(Location::parse(href), Trigger::Replace)
    }

    pub fn external(target: Location) -> Self {
        Self::new(target, Trigger::External)
    }

    pub fn with_query(mut self, query: QueryMap) -> Self {
        self.query = Some(query);
        self
    }
}

/// Options accepted by `Router::navigate_to`.
#[derive(Debug, Clone, Default)]
pub struct NavigateOptions {
    /// Replace the current history entry instead of pushing a new one.
    pub replace: bool,
    /// Query parameters merged over the ones in the href.
    pub query: Option<QueryMap>,
}

impl NavigateOptions {
    pub fn replace() -> Self {
        Self {
            replace: true,
            query: None,
        }
    }

    pub fn with_query(mut self, query: QueryMap) -> Self {
        self.query = Some(query);
        self
    }
}
