use std::sync::{Arc, Mutex};

use stagehand::errors::StagehandError;
use stagehand::plan::{self, ExecutionPlan};
use stagehand_test_utils::recording::RecordingStep;
use stagehand_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::test]
async fn failing_step_aborts_remaining_and_tears_down_once() -> TestResult {
    with_timeout(async {
        init_tracing();

        let log = Arc::new(Mutex::new(Vec::new()));
        let plan: ExecutionPlan = vec![
            Box::new(RecordingStep::new("s1", Arc::clone(&log)).acquires("r1")),
            Box::new(RecordingStep::new("s2", Arc::clone(&log)).failing()),
            Box::new(RecordingStep::new("s3", Arc::clone(&log))),
        ];

        let result = plan::execute(plan, false).await;
        assert!(matches!(
            result,
            Err(StagehandError::StepFailed { ref step, .. }) if step == "s2"
        ));

        // s1 and s2 ran, s3 never did, and the resource acquired by s1 was
        // released exactly once, after the abort.
        let entries = log.lock().unwrap().clone();
        assert_eq!(entries, vec!["s1", "s2", "release r1"]);

        Ok(())
    })
    .await
}

#[tokio::test]
async fn success_still_unwinds_resources_in_reverse_order() -> TestResult {
    with_timeout(async {
        init_tracing();

        let log = Arc::new(Mutex::new(Vec::new()));
        let plan: ExecutionPlan = vec![
            Box::new(RecordingStep::new("s1", Arc::clone(&log)).acquires("r1")),
            Box::new(RecordingStep::new("s2", Arc::clone(&log)).acquires("r2")),
            Box::new(RecordingStep::new("s3", Arc::clone(&log))),
        ];

        plan::execute(plan, false).await?;

        let entries = log.lock().unwrap().clone();
        assert_eq!(entries, vec!["s1", "s2", "s3", "release r2", "release r1"]);

        Ok(())
    })
    .await
}

#[tokio::test]
async fn dry_run_invokes_no_step_and_acquires_nothing() -> TestResult {
    with_timeout(async {
        init_tracing();

        let log = Arc::new(Mutex::new(Vec::new()));
        let plan: ExecutionPlan = vec![
            Box::new(RecordingStep::new("s1", Arc::clone(&log)).acquires("r1")),
            Box::new(RecordingStep::new("s2", Arc::clone(&log)).failing()),
        ];

        // Dry-run succeeds even though s2 would fail: nothing runs.
        plan::execute(plan, true).await?;

        assert!(log.lock().unwrap().is_empty());

        Ok(())
    })
    .await
}

#[tokio::test]
async fn empty_plan_executes_cleanly() -> TestResult {
    with_timeout(async {
        init_tracing();
        plan::execute(Vec::new(), false).await?;
        Ok(())
    })
    .await
}
