// src/backend/chromedriver.rs

//! Browser driver backend.
//!
//! The display is handed to the driver through its own environment map;
//! stagehand's ambient environment is read once at startup and never
//! mutated, so concurrent backend startups cannot observe a half-set
//! `DISPLAY`.

use std::time::Duration;

use async_trait::async_trait;

use crate::backend::process::{ServiceCommand, ServiceProcess};
use crate::backend::readiness::ReadinessProbe;
use crate::backend::Backend;
use crate::config::model::ServiceSettings;
use crate::errors::Result;

pub struct ChromeDriver {
    process: ServiceProcess,
    url: String,
}

impl ChromeDriver {
    pub fn new(settings: &ServiceSettings, display: Option<&str>) -> Self {
        let port = settings.chromedriver_port;

        let mut command = ServiceCommand::new("chromedriver", &settings.chromedriver)
            .arg(format!("--port={port}"))
            .arg(format!("--url-base={}", settings.url_base))
            .readiness(ReadinessProbe::TcpConnect {
                host: "127.0.0.1".to_string(),
                port,
            })
            .ready_timeout(Duration::from_secs(settings.ready_timeout_secs))
            .relay_stderr(true);

        command = match display {
            Some(display) => command.env("DISPLAY", display),
            None => command.env_remove("DISPLAY"),
        };

        Self {
            process: ServiceProcess::new(command),
            url: format!("http://127.0.0.1:{port}{}", settings.url_base),
        }
    }
}

#[async_trait]
impl Backend for ChromeDriver {
    fn name(&self) -> &str {
        "chromedriver"
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
