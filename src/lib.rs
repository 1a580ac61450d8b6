// src/lib.rs

pub mod backend;
pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod plan;
pub mod types;

use tracing::debug;

use crate::cli::CliArgs;
use crate::config::model::RunConfig;
use crate::errors::Result;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config file loading and CLI merging
/// - validation
/// - plan construction
/// - plan execution (with unconditional backend teardown)
pub async fn run(args: CliArgs) -> Result<()> {
    let file_cfg = config::load_optional(&args.config)?;

    // The ambient environment is read exactly once, here. Everything
    // downstream receives explicit values and explicit per-process env
    // maps; nothing mutates the process-wide environment.
    let ambient_display = std::env::var("DISPLAY").ok().filter(|d| !d.is_empty());

    let cfg = RunConfig::resolve(&args, file_cfg, ambient_display)?;
    config::validate(&cfg)?;

    debug!(stages = ?cfg.stages, "resolved stages");

    let plan = plan::build_execution_plan(&cfg);
    plan::execute(plan, cfg.dry_run).await
}
