// src/backend/readiness.rs

//! Readiness probes polled after spawning a backend.
//!
//! Readiness is service-specific: a database creates a unix socket file, a
//! web server binds a TCP port, a display server needs no check at all. So
//! the probe is part of the service descriptor rather than hard-coded in
//! the supervisor.

use std::path::PathBuf;

use tokio::net::TcpStream;

/// A condition polled to determine when a backend can accept requests.
#[derive(Debug, Clone)]
pub enum ReadinessProbe {
    /// The service needs no check; it is ready as soon as it was spawned.
    None,
    /// A filesystem path (typically a unix domain socket) exists.
    PathExists(PathBuf),
    /// A TCP connection to `host:port` succeeds.
    TcpConnect { host: String, port: u16 },
}

impl ReadinessProbe {
    /// One poll attempt. Connection refusals and missing paths simply mean
    /// "not ready yet".
    pub async fn poll(&self) -> bool {
        match self {
            ReadinessProbe::None => true,
            ReadinessProbe::PathExists(path) => path.exists(),
            ReadinessProbe::TcpConnect { host, port } => {
                TcpStream::connect((host.as_str(), *port)).await.is_ok()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn none_is_immediately_ready() {
        assert!(ReadinessProbe::None.poll().await);
    }

    #[tokio::test]
    async fn path_probe_tracks_file_existence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("socket");

        let probe = ReadinessProbe::PathExists(path.clone());
        assert!(!probe.poll().await);

        std::fs::write(&path, b"").unwrap();
        assert!(probe.poll().await);
    }

    #[tokio::test]
    async fn tcp_probe_connects_to_bound_port() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let probe = ReadinessProbe::TcpConnect {
            host: "127.0.0.1".to_string(),
            port,
        };
        assert!(probe.poll().await);
    }

    #[tokio::test]
    async fn tcp_probe_fails_on_unbound_port() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let probe = ReadinessProbe::TcpConnect {
            host: "127.0.0.1".to_string(),
            port,
        };
        assert!(!probe.poll().await);
    }
}
