// src/plan/steps.rs

//! Concrete plan steps.
//!
//! Backend lifecycle lives in [`StartBackends`]; everything else is an
//! opaque unit of work running a subprocess and caring only about its exit
//! status.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::backend::{SharedBackend, spawn_line_relay};
use crate::errors::{Result, StagehandError};
use crate::types::DbEngine;

use super::ExecutionStep;
use super::cleanup::CleanupStack;

/// Run a shell command in `cwd`, relaying its output to the log line by
/// line, and fail the step on a non-zero exit.
pub(crate) async fn run_shell(
    step: &str,
    command: &str,
    cwd: &Path,
    env: &HashMap<String, String>,
) -> Result<()> {
    info!(step = %step, cmd = %command, "running command");

    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    };

    cmd.current_dir(cwd)
        .envs(env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|err| StagehandError::StepFailed {
        step: step.to_string(),
        reason: format!("spawning `{command}`: {err}"),
    })?;

    if let Some(stdout) = child.stdout.take() {
        let name = step.to_string();
        spawn_line_relay(stdout, move |line| info!(step = %name, "{line}"));
    }
    if let Some(stderr) = child.stderr.take() {
        let name = step.to_string();
        spawn_line_relay(stderr, move |line| info!(step = %name, "{line}"));
    }

    let status = child
        .wait()
        .await
        .map_err(|err| StagehandError::StepFailed {
            step: step.to_string(),
            reason: format!("waiting for `{command}`: {err}"),
        })?;

    if !status.success() {
        return Err(StagehandError::StepFailed {
            step: step.to_string(),
            reason: format!("`{command}` exited with {status}"),
        });
    }
    Ok(())
}

/// Log the versions of the tools the plan is about to use. Missing tools
/// are not an error here; the step that needs them will fail with a
/// clearer message.
pub struct ReportVersions {
    programs: Vec<String>,
}

impl ReportVersions {
    pub fn new(programs: Vec<String>) -> Self {
        Self { programs }
    }
}

#[async_trait]
impl ExecutionStep for ReportVersions {
    fn name(&self) -> &str {
        "report tool versions"
    }

    async fn run(&mut self, _stack: &mut CleanupStack) -> Result<()> {
        for program in &self.programs {
            let output = Command::new(program)
                .arg("--version")
                .stdin(Stdio::null())
                .output()
                .await;
            match output {
                Ok(out) if out.status.success() => {
                    let stdout = String::from_utf8_lossy(&out.stdout);
                    let version = stdout.lines().next().unwrap_or("").trim().to_string();
                    info!(program = %program, version = %version, "tool version");
                }
                Ok(out) => {
                    debug!(program = %program, status = %out.status, "version probe failed");
                }
                Err(err) => {
                    debug!(program = %program, error = %err, "tool not available");
                }
            }
        }
        Ok(())
    }
}

/// Create a directory (and parents) if it does not exist yet.
pub struct EnsureDirectory {
    label: String,
    path: PathBuf,
}

impl EnsureDirectory {
    pub fn new(path: PathBuf) -> Self {
        Self {
            label: format!("ensure directory {}", path.display()),
            path,
        }
    }
}

#[async_trait]
impl ExecutionStep for EnsureDirectory {
    fn name(&self) -> &str {
        &self.label
    }

    async fn run(&mut self, _stack: &mut CleanupStack) -> Result<()> {
        tokio::fs::create_dir_all(&self.path).await?;
        Ok(())
    }
}

/// Clone the site repository and any extra project repositories.
///
/// The site repository lands first: the extra projects are cloned inside
/// the site directory.
pub struct CloneSources {
    repository: Option<String>,
    projects: Vec<String>,
    site_dir: PathBuf,
}

impl CloneSources {
    pub fn new(repository: Option<String>, projects: Vec<String>, site_dir: PathBuf) -> Self {
        Self {
            repository,
            projects,
            site_dir,
        }
    }
}

#[async_trait]
impl ExecutionStep for CloneSources {
    fn name(&self) -> &str {
        "clone sources"
    }

    async fn run(&mut self, _stack: &mut CleanupStack) -> Result<()> {
        if let Some(repository) = &self.repository {
            git_clone(repository, &self.site_dir).await?;
        }
        tokio::fs::create_dir_all(&self.site_dir).await?;

        for project in &self.projects {
            let dest = self.site_dir.join(project_basename(project));
            git_clone(project, &dest).await?;
        }
        Ok(())
    }
}

async fn git_clone(url: &str, dest: &Path) -> Result<()> {
    if dest.exists() {
        info!(dest = %dest.display(), "destination already present; skipping clone");
        return Ok(());
    }
    info!(repo = %url, dest = %dest.display(), "cloning");

    let output = Command::new("git")
        .arg("clone")
        .arg("--depth")
        .arg("1")
        .arg(url)
        .arg(dest)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|err| StagehandError::StepFailed {
            step: "clone sources".to_string(),
            reason: format!("spawning git: {err}"),
        })?;

    if !output.status.success() {
        return Err(StagehandError::StepFailed {
            step: "clone sources".to_string(),
            reason: format!(
                "`git clone {url}` exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }
    Ok(())
}

fn project_basename(url: &str) -> String {
    url.trim_end_matches('/')
        .trim_end_matches(".git")
        .rsplit('/')
        .next()
        .unwrap_or(url)
        .to_string()
}

/// An opaque named unit of work: one shell command in one directory with
/// an explicit environment.
pub struct CommandStep {
    label: String,
    command: String,
    cwd: PathBuf,
    env: HashMap<String, String>,
}

impl CommandStep {
    pub fn new(
        label: impl Into<String>,
        command: impl Into<String>,
        cwd: PathBuf,
        env: HashMap<String, String>,
    ) -> Self {
        Self {
            label: label.into(),
            command: command.into(),
            cwd,
            env,
        }
    }
}

#[async_trait]
impl ExecutionStep for CommandStep {
    fn name(&self) -> &str {
        &self.label
    }

    async fn run(&mut self, _stack: &mut CleanupStack) -> Result<()> {
        run_shell(&self.label, &self.command, &self.cwd, &self.env).await
    }
}

/// Start a group of backends in order, registering a stop action for each
/// one as soon as it is running.
pub struct StartBackends {
    label: String,
    backends: Vec<SharedBackend>,
}

impl StartBackends {
    pub fn new(backends: Vec<SharedBackend>) -> Self {
        let names: Vec<&str> = backends.iter().map(|b| b.name()).collect();
        Self {
            label: format!("start backends: {}", names.join(", ")),
            backends,
        }
    }
}

#[async_trait]
impl ExecutionStep for StartBackends {
    fn name(&self) -> &str {
        &self.label
    }

    async fn run(&mut self, stack: &mut CleanupStack) -> Result<()> {
        for backend in &self.backends {
            info!(backend = %backend.name(), "starting backend");
            backend.start().await?;

            let owned = backend.clone();
            stack.push(format!("backend {}", backend.name()), move || async move {
                owned.stop().await;
                anyhow::Ok(())
            });
        }
        Ok(())
    }
}

/// Install/provision the site against the started database backend. The
/// installer learns about the database and the site URL through its
/// environment.
pub struct InstallSite {
    command: String,
    cwd: PathBuf,
    env: HashMap<String, String>,
    db: SharedBackend,
    engine: DbEngine,
    base_url: String,
}

impl InstallSite {
    pub fn new(
        command: impl Into<String>,
        cwd: PathBuf,
        env: HashMap<String, String>,
        db: SharedBackend,
        engine: DbEngine,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            command: command.into(),
            cwd,
            env,
            db,
            engine,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ExecutionStep for InstallSite {
    fn name(&self) -> &str {
        "install site"
    }

    async fn run(&mut self, _stack: &mut CleanupStack) -> Result<()> {
        // The descriptor only exists once the backend has started, so it is
        // read here rather than at plan-build time.
        let descriptor = self.db.describe().await;

        let mut env = self.env.clone();
        env.insert("DB_BACKEND".to_string(), self.engine.to_string());
        match self.engine {
            DbEngine::Mysql => env.insert("DB_SOCKET".to_string(), descriptor),
            DbEngine::Sqlite => env.insert("DB_PATH".to_string(), descriptor),
        };
        env.insert("BASE_URL".to_string(), self.base_url.clone());

        run_shell("install site", &self.command, &self.cwd, &env).await
    }
}

/// User-supplied commands replacing the built-in stages, run in the site
/// directory; the first failure aborts the rest.
pub struct UserCommands {
    commands: Vec<String>,
    cwd: PathBuf,
    env: HashMap<String, String>,
}

impl UserCommands {
    pub fn new(commands: Vec<String>, cwd: PathBuf, env: HashMap<String, String>) -> Self {
        Self { commands, cwd, env }
    }
}

#[async_trait]
impl ExecutionStep for UserCommands {
    fn name(&self) -> &str {
        "user commands"
    }

    async fn run(&mut self, _stack: &mut CleanupStack) -> Result<()> {
        for command in &self.commands {
            run_shell("user command", command, &self.cwd, &self.env).await?;
        }
        Ok(())
    }
}
