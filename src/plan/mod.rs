// src/plan/mod.rs

//! Execution plans.
//!
//! - [`cleanup`] holds the stack of deferred release actions that scopes
//!   every backend (and any other run-scoped resource) to the run.
//! - [`steps`] contains the concrete step implementations.
//! - [`builder`] turns a [`crate::config::model::RunConfig`] into an
//!   ordered list of steps.
//! - [`executor`] runs the list sequentially with unconditional teardown.

pub mod builder;
pub mod cleanup;
pub mod executor;
pub mod steps;

pub use builder::build_execution_plan;
pub use cleanup::{CleanupStack, TeardownWarning};
pub use executor::execute;

use async_trait::async_trait;

use crate::errors::Result;

/// A unit of work in the plan: either a backend-lifecycle action or an
/// opaque named action.
#[async_trait]
pub trait ExecutionStep: Send {
    /// Human-readable step name, shown in plan listings and dry-run output.
    fn name(&self) -> &str;

    /// Run the step. Steps that acquire run-scoped resources push the
    /// matching release action onto `stack` once the acquisition side
    /// effect has happened.
    async fn run(&mut self, stack: &mut CleanupStack) -> Result<()>;
}

/// An ordered sequence of steps; built once per run, never mutated during
/// execution.
pub type ExecutionPlan = Vec<Box<dyn ExecutionStep>>;
