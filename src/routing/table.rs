//! Route table: registration and hierarchical lookup.
//!
//! # Responsibilities
//! - Own the route tree (arena of nodes, children referenced by id)
//! - Reject malformed or duplicate registrations before touching the tree
//! - Resolve a location to a chain of nodes plus merged params
//! - Report the deepest partially matched prefix when nothing resolves
//!
//! # Design Decisions
//! - First match wins, depth-first, in registration order; no specificity scoring
//! - A non-exact node whose subtree cannot resolve the remainder is not a
//!   match; its siblings are tried next (anchored routes)
//! - A node without children behaves as exact
//! - Fragment patterns (`#...`) only apply once the path is fully consumed
//! - Nodes hold no parent pointer; ancestry lives in the `MatchResult` chain

use std::fmt;

use serde::Serialize;

use crate::config::schema::RouteConfig;
use crate::error::{RouterError, RouterResult};
use crate::guard::{BoxedGuard, Guard, RedirectGuard};
use crate::location::Location;
use crate::routing::matcher::{Params, PathPattern};
use crate::routing::payload::Payload;

/// Stable handle to a registered route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One registered route.
pub struct RouteNode {
    id: NodeId,
    pattern: PathPattern,
    payload: Payload,
    children: Vec<NodeId>,
    middleware: Vec<BoxedGuard>,
    fallback: bool,
    name: Option<String>,
}

impl RouteNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn middleware(&self) -> &[BoxedGuard] {
        &self.middleware
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Content id, route name, or pattern, whichever is available first.
    pub fn label(&self) -> &str {
        self.payload
            .content()
            .or(self.name.as_deref())
            .unwrap_or(self.pattern.source())
    }
}

impl fmt::Debug for RouteNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteNode")
            .field("id", &self.id)
            .field("pattern", &self.pattern.source())
            .field("payload", &self.payload)
            .field("children", &self.children)
            .field("middleware", &self.middleware.len())
            .field("fallback", &self.fallback)
            .finish()
    }
}

/// Declarative registration input.
pub struct RouteSpec {
    pattern: String,
    payload: Payload,
    exact: bool,
    fallback: bool,
    name: Option<String>,
    middleware: Vec<BoxedGuard>,
    children: Vec<RouteSpec>,
}

impl RouteSpec {
    pub fn new(pattern: impl Into<String>, payload: Payload) -> Self {
        Self {
            pattern: pattern.into(),
            payload,
            exact: false,
            fallback: false,
            name: None,
            middleware: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Route with immediate content.
    pub fn content(pattern: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(pattern, Payload::immediate(content))
    }

    /// Fallback for the level it is registered at.
    pub fn fallback(payload: Payload) -> Self {
        let mut spec = Self::new("*", payload);
        spec.fallback = true;
        spec
    }

    pub fn exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn guard(mut self, guard: impl Guard + 'static) -> Self {
        self.middleware.push(std::sync::Arc::new(guard));
        self
    }

    pub fn guard_arc(mut self, guard: BoxedGuard) -> Self {
        self.middleware.push(guard);
        self
    }

    pub fn child(mut self, child: RouteSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = RouteSpec>) -> Self {
        self.children.extend(children);
        self
    }

    /// Build from the TOML route tree. A `redirect` key becomes a [`RedirectGuard`].
    pub fn from_config(config: &RouteConfig) -> RouterResult<Self> {
        let payload = config
            .content
            .as_ref()
            .map(Payload::immediate)
            .unwrap_or_default();

        let pattern = if config.fallback && config.pattern.is_empty() {
            "*".to_string()
        } else {
            config.pattern.clone()
        };

        let mut spec = Self::new(pattern, payload).exact(config.exact);
        spec.fallback = config.fallback;
        spec.name = config.name.clone();

        if let Some(target) = &config.redirect {
            spec = spec.guard(RedirectGuard::new(target)?);
        }

        for child in &config.children {
            spec.children.push(Self::from_config(child)?);
        }

        Ok(spec)
    }
}

/// Spec with its pattern compiled, ready to be inserted without failing.
struct CompiledRoute {
    pattern: PathPattern,
    payload: Payload,
    fallback: bool,
    name: Option<String>,
    middleware: Vec<BoxedGuard>,
    children: Vec<CompiledRoute>,
}

/// Deepest partially matched prefix of a failed resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
    /// Nodes that matched before their subtree gave up.
    pub prefix: Vec<NodeId>,
    /// Params captured along `prefix`.
    pub params: Params,
    /// Segments no child could consume.
    pub suffix: Vec<String>,
    /// Whether `suffix` belongs to the location hash.
    pub in_fragment: bool,
}

impl Unresolved {
    pub fn suffix_string(&self) -> String {
        self.suffix.join("/")
    }
}

/// Result of resolving a location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    /// Root to deepest matched node. Empty means no match.
    pub chain: Vec<NodeId>,
    /// Merged params; children override parents.
    pub params: Params,
    /// Set only when `chain` is empty and some prefix did match.
    pub unresolved: Option<Unresolved>,
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        !self.chain.is_empty()
    }

    pub fn leaf(&self) -> Option<NodeId> {
        self.chain.last().copied()
    }
}

/// Flattened view of a registered route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlatRoute {
    pub id: NodeId,
    pub depth: usize,
    pub full_pattern: String,
    pub fallback: bool,
}

/// Input still to be consumed at one level of the tree.
#[derive(Clone, Copy)]
struct Remaining<'a> {
    path: &'a [String],
    hash: &'a [String],
    in_fragment: bool,
}

enum LevelOutcome {
    Matched { chain: Vec<NodeId>, params: Params },
    Failed(Option<Unresolved>),
}

/// Ordered tree of routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    nodes: Vec<RouteNode>,
    roots: Vec<NodeId>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every route of a declarative tree at the root level.
    pub fn from_config(routes: &[RouteConfig]) -> RouterResult<Self> {
        let mut table = Self::new();
        for route in routes {
            table.register(None, RouteSpec::from_config(route)?)?;
        }
        Ok(table)
    }

    /// Register `spec` (and its children) under `parent`, or at the root level.
    ///
    /// The whole subtree is validated first; on error nothing is inserted.
    pub fn register(&mut self, parent: Option<NodeId>, spec: RouteSpec) -> RouterResult<NodeId> {
        if let Some(parent) = parent {
            if self.node(parent).is_none() {
                return Err(RouterError::UnknownParent(parent.0));
            }
        }

        let siblings: Vec<(&PathPattern, bool)> = self
            .children_of(parent)
            .iter()
            .map(|id| {
                let node = &self.nodes[id.0];
                (&node.pattern, node.fallback)
            })
            .collect();

        let compiled = Self::compile(spec, &siblings)?;
        let id = self.insert(parent, compiled);

        tracing::debug!(
            id = %id,
            pattern = %self.nodes[id.0].pattern,
            parent = ?parent,
            "Route registered"
        );
        Ok(id)
    }

    fn compile(spec: RouteSpec, siblings: &[(&PathPattern, bool)]) -> RouterResult<CompiledRoute> {
        let pattern = PathPattern::compile(&spec.pattern)?.exact(spec.exact);

        if spec.fallback && !spec.children.is_empty() {
            return Err(RouterError::FallbackWithChildren(spec.pattern));
        }

        for (existing, existing_fallback) in siblings {
            let clash = match (spec.fallback, *existing_fallback) {
                (true, true) => true,
                (false, false) => existing.is_structurally_equal(&pattern),
                _ => false,
            };
            if clash {
                return Err(RouterError::DuplicateRoute {
                    pattern: spec.pattern,
                    existing: existing.source().to_string(),
                });
            }
        }

        let mut children: Vec<CompiledRoute> = Vec::with_capacity(spec.children.len());
        for child in spec.children {
            let seen: Vec<(&PathPattern, bool)> =
                children.iter().map(|c| (&c.pattern, c.fallback)).collect();
            let compiled = Self::compile(child, &seen)?;
            children.push(compiled);
        }

        Ok(CompiledRoute {
            pattern,
            payload: spec.payload,
            fallback: spec.fallback,
            name: spec.name,
            middleware: spec.middleware,
            children,
        })
    }

    fn insert(&mut self, parent: Option<NodeId>, route: CompiledRoute) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(RouteNode {
            id,
            pattern: route.pattern,
            payload: route.payload,
            children: Vec::new(),
            middleware: route.middleware,
            fallback: route.fallback,
            name: route.name,
        });

        match parent {
            Some(parent) => self.nodes[parent.0].children.push(id),
            None => self.roots.push(id),
        }

        for child in route.children {
            self.insert(Some(id), child);
        }

        id
    }

    pub fn node(&self, id: NodeId) -> Option<&RouteNode> {
        self.nodes.get(id.0)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Children of `parent`, or the root level for `None`.
    pub fn children_of(&self, parent: Option<NodeId>) -> &[NodeId] {
        match parent.and_then(|id| self.node(id)) {
            Some(node) => node.children.as_slice(),
            None if parent.is_none() => self.roots.as_slice(),
            None => &[],
        }
    }

    /// The fallback registered directly under `parent` (root level for `None`).
    pub fn fallback_for(&self, parent: Option<NodeId>) -> Option<NodeId> {
        self.children_of(parent)
            .iter()
            .copied()
            .find(|id| self.nodes[id.0].fallback)
    }

    /// Every route in depth-first registration order.
    pub fn flatten(&self) -> Vec<FlatRoute> {
        let mut out = Vec::with_capacity(self.nodes.len());
        for &root in &self.roots {
            self.flatten_into(root, 0, "", &mut out);
        }
        out
    }

    fn flatten_into(&self, id: NodeId, depth: usize, prefix: &str, out: &mut Vec<FlatRoute>) {
        let node = &self.nodes[id.0];
        let full_pattern = join_patterns(prefix, node.pattern.source());
        out.push(FlatRoute {
            id,
            depth,
            full_pattern: full_pattern.clone(),
            fallback: node.fallback,
        });
        for &child in &node.children {
            self.flatten_into(child, depth + 1, &full_pattern, out);
        }
    }

    /// Full pattern of a chain, e.g. `/gist#:sha1/edit`.
    pub fn full_pattern(&self, chain: &[NodeId]) -> String {
        chain
            .iter()
            .filter_map(|id| self.node(*id))
            .fold(String::new(), |acc, node| join_patterns(&acc, node.pattern.source()))
    }

    /// Resolve `location` against the tree.
    pub fn resolve(&self, location: &Location) -> MatchResult {
        let hash = location.hash_segments();
        let remaining = Remaining {
            path: &location.path,
            hash: &hash,
            in_fragment: false,
        };

        match self.resolve_level(&self.roots, remaining) {
            LevelOutcome::Matched { chain, params } => MatchResult {
                chain,
                params,
                unresolved: None,
            },
            LevelOutcome::Failed(unresolved) => MatchResult {
                chain: Vec::new(),
                params: Params::new(),
                unresolved,
            },
        }
    }

    fn resolve_level(&self, ids: &[NodeId], remaining: Remaining<'_>) -> LevelOutcome {
        let mut deepest: Option<Unresolved> = None;

        for &id in ids {
            let node = &self.nodes[id.0];
            if node.fallback {
                continue;
            }

            let (input, in_fragment) = if remaining.in_fragment {
                (remaining.hash, true)
            } else if node.pattern.is_fragment() {
                if !remaining.path.is_empty() {
                    continue;
                }
                (remaining.hash, true)
            } else {
                (remaining.path, false)
            };

            let Some(matched) = node.pattern.match_segments(input) else {
                continue;
            };
            let rest = &input[matched.consumed..];

            // leaves behave as exact
            if node.children.is_empty() {
                if rest.is_empty() {
                    return LevelOutcome::Matched {
                        chain: vec![id],
                        params: matched.params,
                    };
                }
                continue;
            }

            let next = if in_fragment {
                Remaining {
                    path: &[],
                    hash: rest,
                    in_fragment: true,
                }
            } else {
                Remaining {
                    path: rest,
                    hash: remaining.hash,
                    in_fragment: false,
                }
            };

            let pending_hash = !in_fragment
                && rest.is_empty()
                && !remaining.hash.is_empty()
                && self.has_fragment_children(node);

            if rest.is_empty() && !pending_hash {
                // fully consumed: an index child may still extend the chain
                let mut chain = vec![id];
                let mut params = matched.params;
                if let LevelOutcome::Matched {
                    chain: child_chain,
                    params: child_params,
                } = self.resolve_level(&node.children, next)
                {
                    chain.extend(child_chain);
                    params.extend(child_params);
                }
                return LevelOutcome::Matched { chain, params };
            }

            match self.resolve_level(&node.children, next) {
                LevelOutcome::Matched {
                    chain: child_chain,
                    params: child_params,
                } => {
                    let mut chain = vec![id];
                    chain.extend(child_chain);
                    let mut params = matched.params;
                    params.extend(child_params);
                    return LevelOutcome::Matched { chain, params };
                }
                LevelOutcome::Failed(child_unresolved) => {
                    let candidate = match child_unresolved {
                        Some(mut unresolved) => {
                            unresolved.prefix.insert(0, id);
                            let mut params = matched.params;
                            params.extend(unresolved.params);
                            unresolved.params = params;
                            unresolved
                        }
                        None if pending_hash => Unresolved {
                            prefix: vec![id],
                            params: matched.params,
                            suffix: remaining.hash.to_vec(),
                            in_fragment: true,
                        },
                        None => Unresolved {
                            prefix: vec![id],
                            params: matched.params,
                            suffix: rest.to_vec(),
                            in_fragment,
                        },
                    };

                    let deeper = deepest
                        .as_ref()
                        .map_or(true, |d| candidate.prefix.len() > d.prefix.len());
                    if deeper {
                        deepest = Some(candidate);
                    }
                }
            }
        }

        LevelOutcome::Failed(deepest)
    }

    fn has_fragment_children(&self, node: &RouteNode) -> bool {
        node.children
            .iter()
            .any(|id| self.nodes[id.0].pattern.is_fragment())
    }
}

/// Join a parent pattern and a child pattern into one display pattern.
fn join_patterns(parent: &str, child: &str) -> String {
    let parent = parent.trim_end_matches('/');
    let joined = if child.starts_with('#') {
        format!("{}{}", parent, child)
    } else {
        let child = child.trim_start_matches('/');
        if child.is_empty() {
            parent.to_string()
        } else {
            format!("{}/{}", parent, child)
        }
    };

    if joined.is_empty() {
        "/".to_string()
    } else {
        joined
    }
}
