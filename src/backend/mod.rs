// src/backend/mod.rs

//! Supervised backing services.
//!
//! Each backend is an external service some test stage depends on: a
//! database, a web server, a display server, a browser driver. All of them
//! are polymorphic over [`Backend`]; callers never branch on the concrete
//! variant.
//!
//! - [`process`] owns the generic process supervisor: spawn, readiness
//!   polling, escalating termination.
//! - [`relay`] forwards a child's diagnostic stream to the log concurrently.
//! - [`readiness`] holds the probe types polled after spawning.
//! - The remaining modules are the concrete service variants.

pub mod chromedriver;
pub mod mysql;
pub mod process;
pub mod readiness;
pub mod relay;
pub mod sqlite;
pub mod webserver;
pub mod xvfb;

pub use chromedriver::ChromeDriver;
pub use mysql::MySqlServer;
pub use process::{ServiceCommand, ServiceProcess, ServiceState};
pub use readiness::ReadinessProbe;
pub use relay::spawn_line_relay;
pub use sqlite::SqliteStore;
pub use webserver::DevWebServer;
pub use xvfb::Xvfb;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::errors::Result;

/// One backing service required by the run.
///
/// `stop` is deliberately infallible: teardown must never be interrupted,
/// so implementations log failures instead of returning them.
#[async_trait]
pub trait Backend: Send {
    /// Short identifier used in logs and plan listings.
    fn name(&self) -> &str;

    /// Spawn the service and wait until it is ready to accept requests.
    async fn start(&mut self) -> Result<()>;

    /// Stop the service. Safe to call on a backend that was never started
    /// or has already been stopped.
    async fn stop(&mut self);

    /// Connection descriptor for dependent steps: a socket path, URL or
    /// display name. Only meaningful once the backend has started.
    fn describe(&self) -> String;
}

/// A backend shared between the step that starts it, the steps that consume
/// its descriptor, and the release action that stops it during unwind.
#[derive(Clone)]
pub struct SharedBackend {
    name: String,
    inner: Arc<Mutex<Box<dyn Backend>>>,
}

impl SharedBackend {
    pub fn new(backend: impl Backend + 'static) -> Self {
        let name = backend.name().to_string();
        Self {
            name,
            inner: Arc::new(Mutex::new(Box::new(backend))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn start(&self) -> Result<()> {
        self.inner.lock().await.start().await
    }

    pub async fn stop(&self) {
        self.inner.lock().await.stop().await;
    }

    pub async fn describe(&self) -> String {
        self.inner.lock().await.describe()
    }
}

impl std::fmt::Debug for SharedBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedBackend")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
