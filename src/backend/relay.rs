// src/backend/relay.rs

//! Forward a child process's diagnostic stream to a logging sink.
//!
//! The relay runs as a background Tokio task for the lifetime of the
//! stream, so service output shows up as it happens instead of being
//! buffered until exit, and the control task never blocks on the pipe.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;

/// Spawn a task that reads line-delimited text from `reader` and forwards
/// every line to `sink`, preserving arrival order, until end-of-stream.
///
/// A trailing partial line without a terminator is flushed as a final
/// line. The task finishes on its own when the stream is exhausted; the
/// returned handle only matters to tests.
pub fn spawn_line_relay<R>(
    reader: R,
    sink: impl Fn(String) + Send + 'static,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            sink(line);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    async fn collect(input: &'static [u8]) -> Vec<String> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let handle = spawn_line_relay(input, move |line| {
            sink_seen.lock().unwrap().push(line);
        });
        handle.await.unwrap();
        let lines = seen.lock().unwrap().clone();
        lines
    }

    #[tokio::test]
    async fn forwards_lines_in_order() {
        let lines = collect(b"first\nsecond\nthird\n").await;
        assert_eq!(lines, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn flushes_trailing_partial_line() {
        let lines = collect(b"complete\npartial").await;
        assert_eq!(lines, vec!["complete", "partial"]);
    }

    #[tokio::test]
    async fn empty_stream_forwards_nothing() {
        let lines = collect(b"").await;
        assert!(lines.is_empty());
    }
}
