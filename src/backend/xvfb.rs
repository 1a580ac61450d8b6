// src/backend/xvfb.rs

//! Virtual display server backend.
//!
//! Xvfb needs no readiness probe; the original behaviour is to start it and
//! move on.

use async_trait::async_trait;

use crate::backend::process::{ServiceCommand, ServiceProcess};
use crate::backend::Backend;
use crate::config::model::ServiceSettings;
use crate::errors::Result;

pub struct Xvfb {
    process: ServiceProcess,
    display: String,
}

impl Xvfb {
    pub fn new(settings: &ServiceSettings) -> Self {
        let display = settings.xvfb_display.clone();

        let command = ServiceCommand::new("xvfb", &settings.xvfb)
            .arg(&display)
            .arg("-screen")
            .arg("0")
            .arg(&settings.xvfb_screen)
            .arg("-ac")
            .arg("-nolisten")
            .arg("tcp");

        Self {
            process: ServiceProcess::new(command),
            display,
        }
    }
}

#[async_trait]
impl Backend for Xvfb {
    fn name(&self) -> &str {
        "xvfb"
    }

    async fn start(&mut self) -> Result<()> {
        self.process.start().await
    }

    async fn stop(&mut self) {
        self.process.stop().await;
    }

    fn describe(&self) -> String {
        self.display.clone()
    }
}
