// src/backend/webserver.rs

//! Built-in dev web server backend.
//!
//! Spawns the site's development server (PHP's built-in server by default,
//! optionally through a router script) in the site directory and waits for
//! the port to accept connections. Server output is relayed to the log as
//! it arrives.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::process::{ServiceCommand, ServiceProcess};
use crate::backend::readiness::ReadinessProbe;
use crate::backend::Backend;
use crate::config::model::ServiceSettings;
use crate::errors::Result;

pub struct DevWebServer {
    process: ServiceProcess,
    url: String,
}

impl DevWebServer {
    pub fn new(settings: &ServiceSettings, site_dir: &Path, port: u16) -> Self {
        let address = format!("{}:{}", settings.web_host, port);

        let mut command = ServiceCommand::new("webserver", &settings.php)
            .arg("-S")
            .arg(&address)
            .current_dir(site_dir)
            .readiness(ReadinessProbe::TcpConnect {
                host: settings.web_host.clone(),
                port,
            })
            .ready_timeout(Duration::from_secs(settings.ready_timeout_secs))
            .relay_stderr(true);

        if let Some(router) = &settings.router {
            command = command.arg(site_dir.join(router).to_string_lossy().into_owned());
        }

        Self {
            process: ServiceProcess::new(command),
            url: format!("http://{address}"),
        }
    }
}

#[async_trait]
impl Backend for DevWebServer {
    fn name(&self) -> &str {
        "webserver"
    }

    async fn start(&mut self) -> Result<()> {
        self.process.start().await
    }

    async fn stop(&mut self) {
        self.process.stop().await;
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}
