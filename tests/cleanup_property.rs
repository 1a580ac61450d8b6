//! Property tests for the cleanup stack: release order is always the exact
//! reverse of acquisition order, and failing actions never block others.

use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use stagehand::plan::CleanupStack;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("building test runtime")
}

proptest! {
    #[test]
    fn release_order_is_reverse_of_acquisition(count in 0usize..24) {
        runtime().block_on(async {
            let log = Arc::new(Mutex::new(Vec::new()));
            let mut stack = CleanupStack::new();

            for i in 0..count {
                let log = Arc::clone(&log);
                stack.push(format!("r{i}"), move || async move {
                    log.lock().unwrap().push(i);
                    anyhow::Ok(())
                });
            }

            let warnings = stack.release_all().await;
            assert!(warnings.is_empty());

            let expected: Vec<usize> = (0..count).rev().collect();
            assert_eq!(*log.lock().unwrap(), expected);
            assert!(stack.is_empty());
        });
    }

    #[test]
    fn failing_actions_never_block_other_releases(
        failures in proptest::collection::vec(any::<bool>(), 0..16)
    ) {
        runtime().block_on(async {
            let log = Arc::new(Mutex::new(Vec::new()));
            let mut stack = CleanupStack::new();

            for (i, fail) in failures.iter().copied().enumerate() {
                let log = Arc::clone(&log);
                stack.push(format!("r{i}"), move || async move {
                    log.lock().unwrap().push(i);
                    if fail {
                        Err(anyhow::anyhow!("release {i} failed"))
                    } else {
                        Ok(())
                    }
                });
            }

            let warnings = stack.release_all().await;

            // Every action ran, in reverse order, regardless of failures.
            let expected: Vec<usize> = (0..failures.len()).rev().collect();
            assert_eq!(*log.lock().unwrap(), expected);

            let expected_failures = failures.iter().filter(|f| **f).count();
            assert_eq!(warnings.len(), expected_failures);
        });
    }
}
