//! Exec streamer
//!
//! Runs the diagnostic command inside a ready probe pod over the exec
//! sub-resource and captures combined stdout/stderr into a bounded buffer.
//! A non-zero exit code is not an error here: the diagnostic commands encode
//! their verdict in output text and interpreting that text belongs to the
//! calling tool. Errors are reserved for channel failures, deadline expiry
//! and cancellation.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::probe::driver::PodDriver;
use crate::probe::types::ProbeError;

/// Marker appended to captured output when the byte ceiling was hit
pub const TRUNCATION_MARKER: &str = "\n[output truncated]";

/// Accumulates stream bytes up to a fixed ceiling; bytes past it are dropped
pub struct OutputBuffer {
    buf: Vec<u8>,
    limit: usize,
    truncated: bool,
}

impl OutputBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            buf: Vec::new(),
            limit,
            truncated: false,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        let remaining = self.limit.saturating_sub(self.buf.len());
        if chunk.len() > remaining {
            self.truncated = true;
        }
        let take = remaining.min(chunk.len());
        self.buf.extend_from_slice(&chunk[..take]);
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn into_text(self) -> String {
        let mut text = String::from_utf8_lossy(&self.buf).into_owned();
        if self.truncated {
            text.push_str(TRUNCATION_MARKER);
        }
        text
    }
}

/// Execute `command` in the pod's container and capture its combined output
///
/// Resolves when the in-pod process exits (streams reach EOF), the deadline
/// passes, or the cancellation signal fires.
pub async fn exec_command(
    driver: &dyn PodDriver,
    namespace: &str,
    name: &str,
    command: &[String],
    deadline: Instant,
    output_limit: usize,
    cancel: &CancellationToken,
) -> Result<String, ProbeError> {
    // The attach itself can stall on a bad API connection; it gets no more
    // latitude than the streams do
    let streams = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(ProbeError::Canceled),
        _ = sleep_until(deadline) => return Err(ProbeError::ExecTimeout),
        attached = driver.exec(namespace, name, command) => attached?,
    };

    let buffer = Arc::new(Mutex::new(OutputBuffer::new(output_limit)));

    // The process has exited once both streams hit EOF; exit status is
    // deliberately ignored
    let streaming = async {
        tokio::join!(
            drain_stream(streams.stdout, buffer.clone()),
            drain_stream(streams.stderr, buffer.clone()),
        );
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(ProbeError::Canceled),
        _ = sleep_until(deadline) => return Err(ProbeError::ExecTimeout),
        _ = streaming => {}
    }

    let buffer = Arc::try_unwrap(buffer)
        .map_err(|_| ProbeError::ExecTransport("output stream still open".to_string()))?
        .into_inner();

    debug!(name, truncated = buffer.is_truncated(), "Command output captured");
    Ok(buffer.into_text())
}

/// Drain one stream into the shared bounded buffer until EOF
async fn drain_stream(
    stream: Option<impl AsyncRead + Unpin>,
    buffer: Arc<Mutex<OutputBuffer>>,
) {
    let Some(mut stream) = stream else {
        return;
    };
    let mut chunk = [0u8; 4096];
    loop {
        match stream.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => buffer.lock().await.push(&chunk[..n]),
            // Stream errors surface as an early EOF; the exec channel itself
            // reported any transport failure at attach time
            Err(_) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_buffer_under_limit() {
        let mut buf = OutputBuffer::new(16);
        buf.push(b"hello");
        assert!(!buf.is_truncated());
        assert_eq!(buf.into_text(), "hello");
    }

    #[test]
    fn test_output_buffer_truncates_at_limit() {
        let mut buf = OutputBuffer::new(8);
        buf.push(b"0123456789");
        assert!(buf.is_truncated());
        let text = buf.into_text();
        assert!(text.starts_with("01234567"));
        assert!(text.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn test_output_buffer_memory_bounded() {
        let mut buf = OutputBuffer::new(32);
        for _ in 0..1000 {
            buf.push(&[b'x'; 64]);
        }
        assert!(buf.is_truncated());
        // Capture never holds more than the ceiling
        assert_eq!(buf.buf.len(), 32);
    }

    #[test]
    fn test_output_buffer_exact_fit_not_truncated() {
        let mut buf = OutputBuffer::new(5);
        buf.push(b"exact");
        assert!(!buf.is_truncated());
        assert_eq!(buf.into_text(), "exact");
    }
}
