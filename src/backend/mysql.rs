// src/backend/mysql.rs

//! Ephemeral MySQL server backend.
//!
//! Lifecycle: create a throwaway datadir, initialize it with
//! `mysql_install_db`, spawn `mysqld` listening on a unix socket inside the
//! datadir, wait for the socket to appear, then provision the test database
//! and grant with a one-shot `mysql` client invocation. Optionally dumps
//! all databases right before teardown.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::backend::process::{ServiceCommand, ServiceProcess, ServiceState};
use crate::backend::readiness::ReadinessProbe;
use crate::backend::Backend;
use crate::config::model::ServiceSettings;
use crate::errors::{Result, StagehandError};

pub struct MySqlServer {
    settings: ServiceSettings,
    /// Where to create the datadir; system temp dir when unset.
    base_dir: Option<PathBuf>,
    /// When set, `mysqldump` runs into this directory before teardown.
    dump_dir: Option<PathBuf>,
    datadir: Option<TempDir>,
    socket: Option<PathBuf>,
    process: Option<ServiceProcess>,
}

impl MySqlServer {
    pub fn new(
        settings: &ServiceSettings,
        base_dir: Option<PathBuf>,
        dump_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            settings: settings.clone(),
            base_dir,
            dump_dir,
            datadir: None,
            socket: None,
            process: None,
        }
    }

    async fn install_db(&self, datadir: &Path) -> Result<()> {
        info!("initializing mysql data directory");
        let user = std::env::var("USER").unwrap_or_else(|_| "root".to_string());

        let output = Command::new(&self.settings.mysql_install_db)
            .arg(format!("--datadir={}", datadir.display()))
            .arg(format!("--user={user}"))
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            warn!(
                "mysql_install_db output:\n{}{}",
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
            return Err(StagehandError::Install {
                command: self.settings.mysql_install_db.clone(),
                code: output.status.code().unwrap_or(-1),
            });
        }
        Ok(())
    }

    /// Create the test database and grant via a one-shot client session.
    async fn provision(&self, socket: &Path) -> Result<()> {
        info!("creating the test database and grant");

        let mut child = Command::new(&self.settings.mysql_client)
            .arg("--user=root")
            .arg(format!("--socket={}", socket.display()))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let sql = format!(
            "CREATE DATABASE IF NOT EXISTS {db};\n\
             GRANT ALL ON {db}.* TO '{user}'@'localhost' IDENTIFIED BY '{password}';\n",
            db = self.settings.db_name,
            user = self.settings.db_user,
            password = self.settings.db_password,
        );
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(sql.as_bytes()).await?;
            // Dropping stdin closes the pipe and ends the client session.
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(StagehandError::Install {
                command: self.settings.mysql_client.clone(),
                code: status.code().unwrap_or(-1),
            });
        }
        Ok(())
    }

    /// Dump all databases into the configured dump directory. Runs while
    /// the server is still up; a failure here is a teardown warning, never
    /// a run failure.
    async fn maybe_dump(&self) {
        let (Some(dump_dir), Some(socket)) = (&self.dump_dir, &self.socket) else {
            return;
        };
        let running = self
            .process
            .as_ref()
            .is_some_and(|p| p.state() == ServiceState::Ready);
        if !running {
            return;
        }

        let result_file = dump_dir.join("mysqldump.sql");
        info!(file = %result_file.display(), "dumping databases before teardown");

        let output = Command::new(&self.settings.mysqldump)
            .arg(format!("--socket={}", socket.display()))
            .arg("--user=root")
            .arg("--all-databases")
            .arg(format!("--result-file={}", result_file.display()))
            .stdin(Stdio::null())
            .output()
            .await;

        match output {
            Ok(out) if out.status.success() => {}
            Ok(out) => {
                warn!(
                    status = %out.status,
                    "mysqldump failed:\n{}",
                    String::from_utf8_lossy(&out.stderr)
                );
            }
            Err(err) => {
                warn!(error = %err, "could not run mysqldump");
            }
        }
    }
}

#[async_trait]
impl Backend for MySqlServer {
    fn name(&self) -> &str {
        "mysql"
    }

    async fn start(&mut self) -> Result<()> {
        let base = match &self.base_dir {
            Some(dir) => dir.clone(),
            None => std::env::temp_dir(),
        };
        tokio::fs::create_dir_all(&base).await?;
        let datadir = tempfile::Builder::new()
            .prefix("stagehand-mysql-")
            .tempdir_in(&base)?;
        let root = datadir.path().to_path_buf();
        debug!(dir = %root.display(), "mysql datadir");

        let socket = root.join("socket");
        let error_log = root.join("error.log");
        let pidfile = root.join("mysqld.pid");

        self.install_db(&root).await?;

        info!("starting mysql");
        let command = ServiceCommand::new("mysql", &self.settings.mysqld)
            .arg("--skip-networking")
            .arg(format!("--datadir={}", root.display()))
            .arg(format!("--log-error={}", error_log.display()))
            .arg(format!("--pid-file={}", pidfile.display()))
            .arg(format!("--socket={}", socket.display()))
            .readiness(ReadinessProbe::PathExists(socket.clone()))
            .ready_timeout(Duration::from_secs(self.settings.ready_timeout_secs))
            .error_log(error_log);

        let mut process = ServiceProcess::new(command);
        process.start().await?;

        self.datadir = Some(datadir);
        self.socket = Some(socket.clone());
        self.process = Some(process);

        self.provision(&socket).await?;
        info!("mysql is ready");
        Ok(())
    }

    async fn stop(&mut self) {
        self.maybe_dump().await;
        if let Some(mut process) = self.process.take() {
            process.stop().await;
        }
        // Drops the TempDir, removing the datadir.
        self.datadir = None;
        self.socket = None;
    }

    fn describe(&self) -> String {
        self.socket
            .as_ref()
            .map(|path| path.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
