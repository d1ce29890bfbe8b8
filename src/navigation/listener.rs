//! Funnels external location changes into the navigation engine.

use tokio::sync::mpsc;

use crate::location::{Location, SubscriptionId};
use crate::navigation::engine::Router;
use crate::navigation::request::NavigationRequest;
use crate::navigation::state::Navigation;

/// Subscription to the router's location source.
///
/// Dropping it removes the subscription.
pub struct ExternalListener {
    router: Router,
    rx: mpsc::UnboundedReceiver<Location>,
    subscription: SubscriptionId,
}

impl ExternalListener {
    pub(crate) fn new(router: Router) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = router.source().subscribe(Box::new(move |location: &Location| {
            let _ = tx.send(location.clone());
        }));

        Self {
            router,
            rx,
            subscription,
        }
    }

    /// Wait for the next external change and navigate to it.
    ///
    /// Changes that piled up in the meantime collapse into one `External`
    /// navigation to the latest location. Returns `None` once the source
    /// has dropped the subscription.
    pub async fn next(&mut self) -> Option<Navigation> {
        let mut latest = self.rx.recv().await?;

        let mut skipped = 0usize;
        while let Ok(location) = self.rx.try_recv() {
            latest = location;
            skipped += 1;
        }
        if skipped > 0 {
            tracing::debug!(skipped, href = %latest, "Coalesced external location changes");
        }

        Some(self.router.navigate(NavigationRequest::external(latest)).await)
    }
}

impl Drop for ExternalListener {
    fn drop(&mut self) {
        self.router.source().unsubscribe(self.subscription);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{HistorySource, LocationSource};
    use crate::navigation::engine::RouterOptions;
    use crate::routing::table::{RouteSpec, RouteTable};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_external_changes_coalesce() {
        let mut table = RouteTable::new();
        for path in ["/a", "/b", "/c"] {
            table.register(None, RouteSpec::content(path, path)).unwrap();
        }
        let source = Arc::new(HistorySource::new("", "/"));
        let router = Router::new(table, source.clone(), RouterOptions::default());
        let mut listener = router.listen();

        source.external_navigate("/a");
        source.external_navigate("/b");
        source.external_navigate("/c");

        let navigation = listener.next().await.unwrap();
        let settled = navigation.settled().unwrap();
        assert_eq!(settled.location(), &Location::parse("/c"));
        assert_eq!(source.history_len(), 4);

        assert!(source.back());
        let navigation = listener.next().await.unwrap();
        assert_eq!(navigation.settled().unwrap().location(), &Location::parse("/b"));
        assert_eq!(source.current(), Location::parse("/b"));
    }
}
