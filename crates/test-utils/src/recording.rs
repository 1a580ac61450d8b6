use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use stagehand::errors::{Result, StagehandError};
use stagehand::plan::{CleanupStack, ExecutionStep};

/// A fake step that:
/// - records its name into a shared log when run
/// - optionally registers a recording release action ("release <label>")
/// - optionally fails after recording.
pub struct RecordingStep {
    name: String,
    log: Arc<Mutex<Vec<String>>>,
    acquires: Option<String>,
    fail: bool,
}

impl RecordingStep {
    pub fn new(name: &str, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.to_string(),
            log,
            acquires: None,
            fail: false,
        }
    }

    /// Register a release action under `label` when the step runs.
    pub fn acquires(mut self, label: &str) -> Self {
        self.acquires = Some(label.to_string());
        self
    }

    /// Fail the step (after recording and acquiring).
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl ExecutionStep for RecordingStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&mut self, stack: &mut CleanupStack) -> Result<()> {
        self.log.lock().unwrap().push(self.name.clone());

        if let Some(label) = &self.acquires {
            let log = Arc::clone(&self.log);
            let label = label.clone();
            stack.push(label.clone(), move || async move {
                log.lock().unwrap().push(format!("release {label}"));
                anyhow::Ok(())
            });
        }

        if self.fail {
            return Err(StagehandError::StepFailed {
                step: self.name.clone(),
                reason: "simulated failure".to_string(),
            });
        }
        Ok(())
    }
}
