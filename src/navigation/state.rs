//! Navigation states and results.

use std::sync::Arc;

use serde::Serialize;

use crate::error::RouterError;
use crate::location::Location;
use crate::routing::matcher::Params;
use crate::routing::table::NodeId;

/// Where the engine currently is in a navigation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum NavPhase {
    Idle = 0,
    Resolving = 1,
    Guarding = 2,
    Committing = 3,
    Settled = 4,
}

impl NavPhase {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => NavPhase::Resolving,
            2 => NavPhase::Guarding,
            3 => NavPhase::Committing,
            4 => NavPhase::Settled,
            _ => NavPhase::Idle,
        }
    }
}

/// A committed route match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveMatch {
    pub location: Location,
    /// Root to leaf. Ends with the fallback node when `fallback` is set.
    pub chain: Vec<NodeId>,
    pub params: Params,
    pub fallback: bool,
}

impl ActiveMatch {
    pub fn leaf(&self) -> Option<NodeId> {
        self.chain.last().copied()
    }
}

/// Why a navigation settled without a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotFoundReason {
    /// Nothing matched, not even partially.
    NoMatch,
    /// A prefix matched but none of its children took the rest. `prefix`
    /// is the deepest matched chain and `params` what it captured.
    Unreachable {
        href: String,
        suffix: String,
        prefix: Vec<NodeId>,
        params: Params,
    },
    /// A guard stopped the navigation.
    Aborted { reason: String },
    /// Guards kept redirecting past the bound. The settled location is the
    /// original request target, not the last hop.
    RedirectLoop { limit: usize, trail: Vec<String> },
}

/// Terminal state of a navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Settled {
    Matched(ActiveMatch),
    NotFound {
        location: Location,
        reason: NotFoundReason,
    },
}

impl Settled {
    pub fn is_match(&self) -> bool {
        matches!(self, Settled::Matched(_))
    }

    pub fn active(&self) -> Option<&ActiveMatch> {
        match self {
            Settled::Matched(active) => Some(active),
            Settled::NotFound { .. } => None,
        }
    }

    /// The location this navigation resolved (or tried to resolve).
    pub fn location(&self) -> &Location {
        match self {
            Settled::Matched(active) => &active.location,
            Settled::NotFound { location, .. } => location,
        }
    }

    /// The error a caller would raise for an unmatched navigation.
    pub fn error(&self) -> Option<RouterError> {
        let Settled::NotFound { reason, .. } = self else {
            return None;
        };
        match reason {
            NotFoundReason::NoMatch => None,
            NotFoundReason::Unreachable { href, suffix, .. } => Some(RouterError::UnreachableSubpath {
                href: href.clone(),
                suffix: suffix.clone(),
            }),
            NotFoundReason::Aborted { reason } => Some(RouterError::GuardAbort(reason.clone())),
            NotFoundReason::RedirectLoop { limit, trail } => Some(RouterError::RedirectLoop {
                limit: *limit,
                trail: trail.clone(),
            }),
        }
    }

    /// The matched prefix of an unreachable sub-path, with its params.
    pub fn unresolved_prefix(&self) -> Option<(&[NodeId], &Params)> {
        match self {
            Settled::NotFound {
                reason: NotFoundReason::Unreachable { prefix, params, .. },
                ..
            } => Some((prefix.as_slice(), params)),
            _ => None,
        }
    }

    /// Label used for logs and the `outcome` metric.
    pub fn outcome(&self) -> &'static str {
        match self {
            Settled::Matched(active) if active.fallback => "fallback",
            Settled::Matched(_) => "matched",
            Settled::NotFound { reason, .. } => match reason {
                NotFoundReason::NoMatch | NotFoundReason::Unreachable { .. } => "not_found",
                NotFoundReason::Aborted { .. } => "aborted",
                NotFoundReason::RedirectLoop { .. } => "redirect_loop",
            },
        }
    }
}

/// What a caller of `Router::navigate` gets back.
#[derive(Debug, Clone)]
pub enum Navigation {
    Settled(Arc<Settled>),
    /// A newer navigation took over before this one committed.
    Superseded,
}

impl Navigation {
    pub fn settled(&self) -> Option<&Settled> {
        match self {
            Navigation::Settled(settled) => Some(settled),
            Navigation::Superseded => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, Navigation::Superseded)
    }
}

/// How a link target relates to the active location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveState {
    /// Same path as the active location.
    Exact,
    /// A proper prefix of the active path. Never reported for the root.
    Ancestor,
    Inactive,
}

impl ActiveState {
    /// Compare a link path with the active path segment by segment.
    pub fn of(link: &[String], active: &[String]) -> Self {
        if link == active {
            ActiveState::Exact
        } else if !link.is_empty() && active.starts_with(link) {
            ActiveState::Ancestor
        } else {
            ActiveState::Inactive
        }
    }

    pub fn is_active(self) -> bool {
        self != ActiveState::Inactive
    }
}
