// src/plan/cleanup.rs

//! Stack of deferred release actions with guaranteed reverse-order unwind.
//!
//! Teardown ordering and error aggregation need to be explicit and
//! testable, so run-scoped resources register a release closure here
//! instead of relying on scope-exit finalization.

use std::future::Future;
use std::pin::Pin;

use tracing::{debug, warn};

type ReleaseFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;
type ReleaseFn = Box<dyn FnOnce() -> ReleaseFuture + Send>;

/// A release action that failed during unwind. Collected and logged, never
/// escalated: propagating it would mask the original failure or falsely
/// fail an otherwise-successful run.
#[derive(Debug)]
pub struct TeardownWarning {
    pub label: String,
    pub error: anyhow::Error,
}

/// Ordered collection of release actions for resources acquired during a
/// run. Owned exclusively by the plan executor.
#[derive(Default)]
pub struct CleanupStack {
    actions: Vec<(String, ReleaseFn)>,
}

impl CleanupStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Register a release action for a resource that has already been
    /// acquired. Registration itself has no side effects.
    pub fn push<F, Fut>(&mut self, label: impl Into<String>, release: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let label = label.into();
        debug!(resource = %label, "registered release action");
        self.actions
            .push((label, Box::new(move || Box::pin(release()))));
    }

    /// Execute every registered action in strict reverse order of
    /// registration, exactly once. A failing action is recorded and the
    /// remaining actions still run. Calling this again afterwards is a
    /// no-op.
    pub async fn release_all(&mut self) -> Vec<TeardownWarning> {
        let mut warnings = Vec::new();
        while let Some((label, release)) = self.actions.pop() {
            debug!(resource = %label, "releasing");
            if let Err(error) = release().await {
                warn!(
                    resource = %label,
                    error = %error,
                    "release action failed during unwind"
                );
                warnings.push(TeardownWarning { label, error });
            }
        }
        warnings
    }
}

impl std::fmt::Debug for CleanupStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupStack")
            .field("pending", &self.actions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording(
        stack: &mut CleanupStack,
        log: &Arc<Mutex<Vec<&'static str>>>,
        label: &'static str,
    ) {
        let log = Arc::clone(log);
        stack.push(label, move || async move {
            log.lock().unwrap().push(label);
            Ok(())
        });
    }

    #[tokio::test]
    async fn releases_in_reverse_order_of_registration() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = CleanupStack::new();

        recording(&mut stack, &log, "a");
        recording(&mut stack, &log, "b");
        recording(&mut stack, &log, "c");

        let warnings = stack.release_all().await;
        assert!(warnings.is_empty());
        assert_eq!(*log.lock().unwrap(), vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn failing_action_does_not_stop_the_unwind() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = CleanupStack::new();

        recording(&mut stack, &log, "a");
        {
            let log = Arc::clone(&log);
            stack.push("b", move || async move {
                log.lock().unwrap().push("b");
                Err(anyhow::anyhow!("release failed"))
            });
        }
        recording(&mut stack, &log, "c");

        let warnings = stack.release_all().await;
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].label, "b");
        assert_eq!(*log.lock().unwrap(), vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn second_release_is_a_noop() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = CleanupStack::new();
        recording(&mut stack, &log, "only");

        stack.release_all().await;
        stack.release_all().await;

        assert_eq!(*log.lock().unwrap(), vec!["only"]);
        assert!(stack.is_empty());
    }
}
