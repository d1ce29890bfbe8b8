//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a router
//! instance. All types derive Serde traits for deserialization from TOML.

use serde::{Deserialize, Serialize};

/// Root configuration for a router instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Location backend ("history" or "hash").
    pub mode: RoutingMode,

    /// Base path prefix for history mode (e.g., "/folder"). Empty for none.
    pub base: String,

    /// Maximum redirects in one navigation before it settles as a loop.
    pub max_redirects: usize,

    /// Per-guard deadline in milliseconds. None waits indefinitely.
    pub guard_timeout_ms: Option<u64>,

    /// Declarative route tree.
    pub routes: Vec<RouteConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            mode: RoutingMode::History,
            base: String::new(),
            max_redirects: 10,
            guard_timeout_ms: None,
            routes: Vec::new(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Location backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMode {
    #[default]
    History,
    Hash,
}

/// One node of the declarative route tree.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Pattern such as "/users/:id", "*rest" or "#:sha1".
    pub pattern: String,

    /// Content identifier handed to the rendering layer.
    pub content: Option<String>,

    /// Optional route name for diagnostics.
    pub name: Option<String>,

    /// Require the pattern to consume the whole remaining path.
    pub exact: bool,

    /// Marks the fallback for this level.
    pub fallback: bool,

    /// Redirect target; `:param` placeholders are filled from the match.
    pub redirect: Option<String>,

    /// Nested routes.
    pub children: Vec<RouteConfig>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter used when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "client_router=info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RouterConfig::default();
        assert_eq!(config.mode, RoutingMode::History);
        assert!(config.base.is_empty());
        assert_eq!(config.max_redirects, 10);
        assert!(config.guard_timeout_ms.is_none());
    }

    #[test]
    fn test_minimal_toml() {
        let config: RouterConfig = toml::from_str(
            r#"
            mode = "hash"

            [[routes]]
            pattern = "/top"
            content = "top"

            [[routes.children]]
            pattern = "/:id"
            content = "item"
            "#,
        )
        .unwrap();

        assert_eq!(config.mode, RoutingMode::Hash);
        assert_eq!(config.routes.len(), 1);
        assert_eq!(config.routes[0].children[0].pattern, "/:id");
        assert!(!config.routes[0].exact);
    }
}
