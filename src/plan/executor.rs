// src/plan/executor.rs

//! Sequential plan execution with unconditional teardown.

use tracing::{error, info, warn};

use crate::errors::Result;

use super::ExecutionPlan;
use super::cleanup::CleanupStack;

/// Run the plan in order.
///
/// The first failing step aborts the remainder; the cleanup stack is then
/// released before the failure is returned, so every backend started by an
/// earlier step is stopped on every exit path — including full success.
/// In dry-run mode the ordered step list is logged and nothing runs.
pub async fn execute(mut plan: ExecutionPlan, dry_run: bool) -> Result<()> {
    info!("execution plan ({} steps):", plan.len());
    for step in &plan {
        info!("  - {}", step.name());
    }

    if dry_run {
        warn!("exiting without execution: --dry-run");
        return Ok(());
    }

    let mut stack = CleanupStack::new();
    let mut outcome = Ok(());

    for step in plan.iter_mut() {
        info!(step = %step.name(), "running step");
        if let Err(err) = step.run(&mut stack).await {
            error!(step = %step.name(), error = %err, "step failed; aborting remaining steps");
            outcome = Err(err);
            break;
        }
    }

    let warnings = stack.release_all().await;
    if !warnings.is_empty() {
        warn!(count = warnings.len(), "teardown completed with warnings");
    }

    outcome
}
