//! Guard pipeline execution.
//!
//! # Responsibilities
//! - Run the guards of every chain node, root to leaf
//! - Stop at the first Redirect or Abort
//! - Give up on a guard as soon as a newer navigation supersedes this one
//! - Apply the optional per-guard deadline

use std::time::Duration;

use tokio::sync::watch;

use crate::guard::{GuardContext, GuardOutcome};
use crate::location::Location;
use crate::observability::metrics;
use crate::routing::matcher::Params;
use crate::routing::table::{NodeId, RouteTable};

/// Tracks whether the navigation owning this token is still the newest one.
#[derive(Debug, Clone)]
pub struct Cancellation {
    generation: u64,
    rx: watch::Receiver<u64>,
}

impl Cancellation {
    pub fn new(generation: u64, rx: watch::Receiver<u64>) -> Self {
        Self { generation, rx }
    }

    /// A token that is never superseded.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(0);
        Self { generation: 0, rx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        *self.rx.borrow() == self.generation
    }

    /// Resolves once a newer generation has been published.
    pub async fn superseded(&mut self) {
        loop {
            if *self.rx.borrow_and_update() != self.generation {
                return;
            }
            if self.rx.changed().await.is_err() {
                // sender gone: nothing can supersede us any more
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Final verdict of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Continue,
    Redirect(Location),
    Abort(String),
    Superseded,
}

/// Runs bound guards for a matched chain.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    timeout: Option<Duration>,
}

impl Pipeline {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    pub async fn run(
        &self,
        table: &RouteTable,
        chain: &[NodeId],
        params: &Params,
        location: &Location,
        cancel: &mut Cancellation,
    ) -> PipelineOutcome {
        for node in chain.iter().filter_map(|id| table.node(*id)) {
            for guard in node.middleware() {
                if !cancel.is_current() {
                    return PipelineOutcome::Superseded;
                }

                let ctx = GuardContext {
                    node,
                    params,
                    query: &location.search,
                    location,
                };

                let check = async {
                    match self.timeout {
                        Some(limit) => tokio::time::timeout(limit, guard.check(ctx))
                            .await
                            .unwrap_or_else(|_| {
                                GuardOutcome::abort(format!(
                                    "guard timed out after {}ms",
                                    limit.as_millis()
                                ))
                            }),
                        None => guard.check(ctx).await,
                    }
                };

                let outcome = tokio::select! {
                    outcome = check => outcome,
                    _ = cancel.superseded() => return PipelineOutcome::Superseded,
                };

                tracing::debug!(
                    guard = guard.name(),
                    pattern = %node.pattern(),
                    outcome = ?outcome,
                    "Guard evaluated"
                );

                match outcome {
                    GuardOutcome::Continue => continue,
                    GuardOutcome::Redirect(target) => return PipelineOutcome::Redirect(target),
                    GuardOutcome::Abort(reason) => {
                        metrics::record_guard_abort();
                        return PipelineOutcome::Abort(reason);
                    }
                }
            }
        }

        PipelineOutcome::Continue
    }
}
