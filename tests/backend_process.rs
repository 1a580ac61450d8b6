//! Live supervisor tests against real (tiny) processes: `sh` and `sleep`.

#![cfg(unix)]

use std::time::{Duration, Instant};

use stagehand::backend::process::GRACE_PERIOD;
use stagehand::backend::{ReadinessProbe, ServiceCommand, ServiceProcess, ServiceState};
use stagehand::errors::StagehandError;
use stagehand_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::test]
async fn stop_before_start_is_a_noop() -> TestResult {
    with_timeout(async {
        init_tracing();

        let mut process = ServiceProcess::new(ServiceCommand::new("svc", "sleep"));
        assert_eq!(process.state(), ServiceState::NotStarted);

        process.stop().await;
        process.stop().await;
        assert_eq!(process.state(), ServiceState::NotStarted);

        Ok(())
    })
    .await
}

#[tokio::test]
async fn repeated_stop_after_start_is_a_noop() -> TestResult {
    with_timeout(async {
        init_tracing();

        let command = ServiceCommand::new("svc", "sleep").arg("30");
        let mut process = ServiceProcess::new(command);

        process.start().await?;
        assert_eq!(process.state(), ServiceState::Ready);

        process.stop().await;
        assert_eq!(process.state(), ServiceState::Stopped);

        // Further stops change nothing and send nothing.
        process.stop().await;
        process.stop().await;
        assert_eq!(process.state(), ServiceState::Stopped);

        Ok(())
    })
    .await
}

#[tokio::test]
async fn early_exit_fails_start_with_captured_error_log() -> TestResult {
    with_timeout(async {
        init_tracing();

        let dir = tempfile::tempdir()?;
        let marker = dir.path().join("never-created");
        let error_log = dir.path().join("error.log");

        let command = ServiceCommand::new("svc", "sh")
            .arg("-c")
            .arg(format!("echo boom > {}; exit 3", error_log.display()))
            .readiness(ReadinessProbe::PathExists(marker))
            .ready_timeout(Duration::from_secs(10))
            .error_log(error_log);
        let mut process = ServiceProcess::new(command);

        let err = process.start().await.expect_err("start must fail");
        match err {
            StagehandError::BackendStartup {
                backend,
                reason,
                error_log,
            } => {
                assert_eq!(backend, "svc");
                assert!(
                    reason.contains("exited before becoming ready"),
                    "unexpected reason: {reason}"
                );
                assert!(error_log.contains("boom"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(process.state(), ServiceState::Failed);

        Ok(())
    })
    .await
}

#[tokio::test]
async fn path_probe_reaches_ready_once_the_file_appears() -> TestResult {
    with_timeout(async {
        init_tracing();

        let dir = tempfile::tempdir()?;
        let marker = dir.path().join("ready");

        let command = ServiceCommand::new("svc", "sh")
            .arg("-c")
            .arg(format!("touch {}; exec sleep 30", marker.display()))
            .readiness(ReadinessProbe::PathExists(marker))
            .ready_timeout(Duration::from_secs(10));
        let mut process = ServiceProcess::new(command);

        process.start().await?;
        assert_eq!(process.state(), ServiceState::Ready);

        process.stop().await;
        assert_eq!(process.state(), ServiceState::Stopped);

        Ok(())
    })
    .await
}

#[tokio::test]
async fn readiness_timeout_fails_start() -> TestResult {
    with_timeout(async {
        init_tracing();

        let dir = tempfile::tempdir()?;
        let marker = dir.path().join("never-created");

        let command = ServiceCommand::new("svc", "sleep")
            .arg("30")
            .readiness(ReadinessProbe::PathExists(marker))
            .ready_timeout(Duration::ZERO);
        let mut process = ServiceProcess::new(command);

        let err = process.start().await.expect_err("start must time out");
        match err {
            StagehandError::BackendStartup { reason, .. } => {
                assert!(reason.contains("not ready after"), "unexpected reason: {reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(process.state(), ServiceState::Failed);

        Ok(())
    })
    .await
}

#[tokio::test]
async fn spawn_failure_fails_start() -> TestResult {
    with_timeout(async {
        init_tracing();

        let command = ServiceCommand::new("svc", "/nonexistent/definitely-not-a-binary");
        let mut process = ServiceProcess::new(command);

        let err = process.start().await.expect_err("spawn must fail");
        assert!(matches!(err, StagehandError::BackendStartup { .. }));
        assert_eq!(process.state(), ServiceState::Failed);

        // stop on a failed process is still a no-op.
        process.stop().await;
        assert_eq!(process.state(), ServiceState::Failed);

        Ok(())
    })
    .await
}

#[tokio::test]
async fn cooperative_process_exits_within_the_grace_period() -> TestResult {
    with_timeout(async {
        init_tracing();

        let command = ServiceCommand::new("svc", "sleep").arg("30");
        let mut process = ServiceProcess::new(command);
        process.start().await?;

        let started = Instant::now();
        process.stop().await;
        let elapsed = started.elapsed();

        assert!(
            elapsed < GRACE_PERIOD,
            "graceful stop took {elapsed:?}, expected well under the grace period"
        );
        assert_eq!(process.state(), ServiceState::Stopped);

        Ok(())
    })
    .await
}

#[tokio::test]
async fn uncooperative_process_is_killed_after_the_grace_period() -> TestResult {
    with_timeout(async {
        init_tracing();

        // Ignores the graceful terminate; only the kill gets rid of it.
        let command = ServiceCommand::new("svc", "sh")
            .arg("-c")
            .arg("trap '' TERM; sleep 30");
        let mut process = ServiceProcess::new(command);
        process.start().await?;

        // Give the shell a moment to install the trap before signalling.
        tokio::time::sleep(Duration::from_millis(300)).await;

        let started = Instant::now();
        process.stop().await;
        let elapsed = started.elapsed();

        assert!(
            elapsed >= GRACE_PERIOD - Duration::from_millis(200),
            "stop returned after {elapsed:?}, before the grace period elapsed"
        );
        assert!(
            elapsed < GRACE_PERIOD + Duration::from_secs(5),
            "stop took {elapsed:?}, escalation seems stuck"
        );
        assert_eq!(process.state(), ServiceState::Stopped);

        Ok(())
    })
    .await
}
