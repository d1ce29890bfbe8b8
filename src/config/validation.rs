//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the base prefix shape and redirect bound
//! - Compile every route pattern and redirect target
//! - Detect conflicting sibling routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Routes are addressed by their path in the tree, e.g. `routes[1].children[0]`

use thiserror::Error;

use crate::config::schema::{RouteConfig, RouterConfig};
use crate::guard::RedirectGuard;
use crate::routing::matcher::PathPattern;

/// One semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("base '{0}' must be empty or start with '/' and not end with '/'")]
    InvalidBase(String),

    #[error("max_redirects must be greater than zero")]
    ZeroRedirectLimit,

    #[error("{route}: {reason}")]
    InvalidPattern { route: String, reason: String },

    #[error("{0}: route needs content or a redirect")]
    MissingTarget(String),

    #[error("{0}: fallback routes cannot have children")]
    FallbackWithChildren(String),

    #[error("{route}: duplicates sibling '{existing}'")]
    DuplicateSibling { route: String, existing: String },
}

pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let base = &config.base;
    if !base.is_empty() && (!base.starts_with('/') || base.ends_with('/')) {
        errors.push(ValidationError::InvalidBase(base.clone()));
    }

    if config.max_redirects == 0 {
        errors.push(ValidationError::ZeroRedirectLimit);
    }

    validate_level(&config.routes, "routes", &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_level(routes: &[RouteConfig], prefix: &str, errors: &mut Vec<ValidationError>) {
    let mut seen: Vec<(PathPattern, bool, &str)> = Vec::new();

    for (i, route) in routes.iter().enumerate() {
        let label = format!("{}[{}]", prefix, i);

        if route.fallback && !route.children.is_empty() {
            errors.push(ValidationError::FallbackWithChildren(label.clone()));
        }

        if !route.fallback && route.content.is_none() && route.redirect.is_none() {
            errors.push(ValidationError::MissingTarget(label.clone()));
        }

        if let Some(Err(e)) = route.redirect.as_deref().map(RedirectGuard::new) {
            errors.push(ValidationError::InvalidPattern {
                route: label.clone(),
                reason: e.to_string(),
            });
        }

        let source = if route.fallback && route.pattern.is_empty() {
            "*"
        } else {
            route.pattern.as_str()
        };

        match PathPattern::compile(source) {
            Ok(pattern) => {
                let pattern = pattern.exact(route.exact);
                let clash = seen.iter().find(|(other, fallback, _)| {
                    match (route.fallback, *fallback) {
                        (true, true) => true,
                        (false, false) => other.is_structurally_equal(&pattern),
                        _ => false,
                    }
                });
                if let Some((_, _, existing)) = clash {
                    errors.push(ValidationError::DuplicateSibling {
                        route: label.clone(),
                        existing: existing.to_string(),
                    });
                }
                seen.push((pattern, route.fallback, source));
            }
            Err(e) => errors.push(ValidationError::InvalidPattern {
                route: label.clone(),
                reason: e.to_string(),
            }),
        }

        validate_level(&route.children, &format!("{}.children", label), errors);
    }
}
