// src/plan/builder.rs

//! Plan construction: a deterministic function of the run configuration.
//!
//! Ordering policy:
//! - cloning/setup precedes dependency installation
//! - the unit stage runs before anything requiring an installed site
//! - the database backend starts right before the site install, and the
//!   site install precedes every site-dependent stage
//! - display/driver/web backends are appended only when a selected stage
//!   needs them, in that dependency order
//! - the database-backed suite runs last

use std::collections::HashMap;

use crate::backend::{ChromeDriver, DevWebServer, MySqlServer, SharedBackend, SqliteStore, Xvfb};
use crate::config::model::RunConfig;
use crate::types::{DbEngine, Stage, WebFlavour};

use super::ExecutionPlan;
use super::steps::{
    CloneSources, CommandStep, EnsureDirectory, InstallSite, ReportVersions, StartBackends,
    UserCommands,
};

/// Build the ordered step list for one run. Pure function of the config:
/// no randomness, no side effects, no resource acquisition.
pub fn build_execution_plan(cfg: &RunConfig) -> ExecutionPlan {
    let mut plan: ExecutionPlan = Vec::new();
    let base_env = cfg.step_env();
    let display = effective_display(cfg);

    plan.push(Box::new(ReportVersions::new(vec![
        "git".to_string(),
        cfg.services.php.clone(),
        "composer".to_string(),
        "node".to_string(),
        "npm".to_string(),
    ])));
    plan.push(Box::new(EnsureDirectory::new(cfg.log_dir.clone())));

    if !cfg.skip_clone && (cfg.repository.is_some() || !cfg.projects.is_empty()) {
        plan.push(Box::new(CloneSources::new(
            cfg.repository.clone(),
            cfg.projects.clone(),
            cfg.site_dir.clone(),
        )));
    }

    if !cfg.skip_deps {
        plan.push(Box::new(CommandStep::new(
            "install php dependencies",
            cfg.commands.install_php_deps.clone(),
            cfg.site_dir.clone(),
            base_env.clone(),
        )));
    }

    // Needs neither an installed site nor a database.
    if cfg.stages.contains(&Stage::Unit) {
        plan.push(stage_step(cfg, Stage::Unit, &base_env, &display));
    }

    let needs_site = cfg.needs_installed_site() && !cfg.skip_install;
    if needs_site {
        let db = make_db_backend(cfg);
        plan.push(Box::new(StartBackends::new(vec![db.clone()])));
        plan.push(Box::new(InstallSite::new(
            cfg.commands.install_site.clone(),
            cfg.site_dir.clone(),
            base_env.clone(),
            db,
            cfg.db,
            cfg.base_url.clone(),
        )));
    }

    // JS dependencies install after the site: it takes a while, and the
    // stages above may fail first.
    if !cfg.skip_deps {
        plan.push(Box::new(CommandStep::new(
            "install js dependencies",
            cfg.commands.install_js_deps.clone(),
            cfg.site_dir.clone(),
            base_env.clone(),
        )));
    }

    if cfg.stages.contains(&Stage::Databaseless) {
        plan.push(stage_step(cfg, Stage::Databaseless, &base_env, &display));
    }
    if cfg.stages.contains(&Stage::Lint) {
        plan.push(stage_step(cfg, Stage::Lint, &base_env, &display));
    }

    let wants_builtin_web = cfg.needs_web() && cfg.web == WebFlavour::Builtin;
    if wants_builtin_web || cfg.needs_browser() {
        let mut backends: Vec<SharedBackend> = Vec::new();

        if cfg.needs_browser() {
            if cfg.ambient_display.is_none() {
                backends.push(SharedBackend::new(Xvfb::new(&cfg.services)));
            }
            backends.push(SharedBackend::new(ChromeDriver::new(
                &cfg.services,
                display.as_deref(),
            )));
        }
        if wants_builtin_web {
            backends.push(SharedBackend::new(DevWebServer::new(
                &cfg.services,
                &cfg.site_dir,
                cfg.web_port,
            )));
        }
        plan.push(Box::new(StartBackends::new(backends)));
    }

    if cfg.stages.contains(&Stage::Api) {
        plan.push(stage_step(cfg, Stage::Api, &base_env, &display));
    }
    if cfg.stages.contains(&Stage::Browser) {
        plan.push(stage_step(cfg, Stage::Browser, &base_env, &display));
    }

    // Database-backed suite runs last.
    if cfg.stages.contains(&Stage::Database) {
        plan.push(stage_step(cfg, Stage::Database, &base_env, &display));
    }

    if !cfg.user_commands.is_empty() {
        let mut env = base_env.clone();
        if !cfg.base_url.is_empty() {
            env.insert("BASE_URL".to_string(), cfg.base_url.clone());
        }
        if let Some(display) = &display {
            env.insert("DISPLAY".to_string(), display.clone());
        }
        plan.push(Box::new(UserCommands::new(
            cfg.user_commands.clone(),
            cfg.site_dir.clone(),
            env,
        )));
    }

    plan
}

/// The display browser stages will use: the ambient one when present,
/// otherwise the display of the Xvfb backend the plan provisions.
fn effective_display(cfg: &RunConfig) -> Option<String> {
    if let Some(display) = &cfg.ambient_display {
        return Some(display.clone());
    }
    cfg.needs_browser()
        .then(|| cfg.services.xvfb_display.clone())
}

fn make_db_backend(cfg: &RunConfig) -> SharedBackend {
    let dump_dir = cfg.dump_db_postrun.then(|| cfg.log_dir.clone());
    match cfg.db {
        DbEngine::Mysql => SharedBackend::new(MySqlServer::new(
            &cfg.services,
            cfg.db_dir.clone(),
            dump_dir,
        )),
        DbEngine::Sqlite => SharedBackend::new(SqliteStore::new(cfg.db_dir.clone())),
    }
}

fn stage_step(
    cfg: &RunConfig,
    stage: Stage,
    base_env: &HashMap<String, String>,
    display: &Option<String>,
) -> Box<CommandStep> {
    let mut env = base_env.clone();
    if stage.needs_web() {
        env.insert("BASE_URL".to_string(), cfg.base_url.clone());
    }
    if stage.needs_browser() {
        if let Some(display) = display {
            env.insert("DISPLAY".to_string(), display.clone());
        }
    }

    Box::new(CommandStep::new(
        format!("stage: {stage}"),
        cfg.commands.for_stage(stage),
        cfg.site_dir.clone(),
        env,
    ))
}
