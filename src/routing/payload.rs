//! Route payloads: immediate content or a deferred loader.
//!
//! The engine only sees `Payload` and `LoadState`; how a loader fetches its
//! content (dynamic import, network, disk) is the loader's business.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde::Serialize;

/// Future returned by a deferred loader.
pub type LoadFuture = BoxFuture<'static, Result<String, String>>;

/// Handle to a deferred payload loader.
#[derive(Clone)]
pub struct Loader(Arc<dyn Fn() -> LoadFuture + Send + Sync>);

impl Loader {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, String>> + Send + 'static,
    {
        Self(Arc::new(move || f().boxed()))
    }

    pub fn load(&self) -> LoadFuture {
        (self.0)()
    }
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Loader(..)")
    }
}

/// What a route resolves to.
#[derive(Debug, Clone, Default)]
pub enum Payload {
    /// No content of its own (redirect-only or grouping routes).
    #[default]
    Empty,
    Immediate(String),
    Deferred(Loader),
}

impl Payload {
    pub fn immediate(content: impl Into<String>) -> Self {
        Payload::Immediate(content.into())
    }

    pub fn deferred<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, String>> + Send + 'static,
    {
        Payload::Deferred(Loader::new(f))
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Payload::Deferred(_))
    }

    /// Content known without loading.
    pub fn content(&self) -> Option<&str> {
        match self {
            Payload::Immediate(content) => Some(content),
            _ => None,
        }
    }
}

/// Resolution state of a node's payload, tracked per node by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "lowercase")]
pub enum LoadState {
    Idle,
    Loading,
    Ready(String),
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deferred_loader_runs_each_time() {
        let payload = Payload::deferred(|| async { Ok::<_, String>("lazy".to_string()) });
        assert!(payload.is_deferred());
        assert_eq!(payload.content(), None);

        if let Payload::Deferred(loader) = payload {
            assert_eq!(loader.load().await, Ok("lazy".to_string()));
            assert_eq!(loader.load().await, Ok("lazy".to_string()));
        }
    }

    #[test]
    fn test_immediate_content() {
        assert_eq!(Payload::immediate("home").content(), Some("home"));
        assert_eq!(Payload::Empty.content(), None);
    }
}
