//! Writer for the diagnostic stream shared with the controller.
//!
//! Human-readable text and the reserved markers travel on the same stream.
//! Free-form text is scrubbed of marker bytes; markers are only written
//! through the dedicated methods. Every write is flushed immediately so the
//! controller sees it before the process can exit.

use std::error::Error;
use std::io::{self, Write};
use std::path::Path;

use thiserror::Error;

use nodeboot_types::markers::{self, SERVER_READY_MARKER, USER_EXCEPTION_MARKER};

use crate::process::ControllerStream;

/// Errors raised while emitting the ready marker.
#[derive(Debug, Error)]
pub enum MarkerError {
    /// The ready marker had already been written.
    #[error("ready marker already sent")]
    ReadyAlreadySent,
    /// Writing to the diagnostic stream failed.
    #[error("failed to write ready marker: {source}")]
    Io {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// The server's half of the marker protocol.
#[derive(Debug)]
pub struct DiagnosticStream<E> {
    inner: E,
    ready_sent: bool,
}

impl<E: Write> DiagnosticStream<E> {
    /// Wraps the diagnostic writer.
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            ready_sent: false,
        }
    }

    /// Returns `true` once the ready marker has been written.
    #[must_use]
    pub const fn ready_sent(&self) -> bool {
        self.ready_sent
    }

    /// Tells the controller the server is serving. Succeeds at most once.
    ///
    /// # Errors
    ///
    /// Returns [`MarkerError::ReadyAlreadySent`] on a repeat call, or
    /// [`MarkerError::Io`] when the write fails.
    pub fn emit_ready(&mut self) -> Result<(), MarkerError> {
        if self.ready_sent {
            return Err(MarkerError::ReadyAlreadySent);
        }
        self.inner
            .write_all(&[SERVER_READY_MARKER, b'\n'])
            .and_then(|()| self.inner.flush())
            .map_err(|source| MarkerError::Io { source })?;
        self.ready_sent = true;
        Ok(())
    }

    /// Sends a user-facing error line: the marker followed by the message.
    pub fn emit_user_error(&mut self, message: &str) {
        let mut line = Vec::with_capacity(message.len() + 2);
        line.push(USER_EXCEPTION_MARKER);
        line.extend_from_slice(markers::scrub(message).as_bytes());
        line.push(b'\n');
        self.write_raw(&line);
    }

    /// Writes ordinary diagnostic text as one line.
    pub fn write_line(&mut self, text: &str) {
        let mut line = markers::scrub(text);
        line.push('\n');
        self.write_raw(line.as_bytes());
    }

    /// Writes the full error chain without a marker.
    pub fn print_failure(&mut self, error: &dyn Error) {
        self.write_line(&render_chain(error));
    }

    /// Points the user at the configured log file.
    pub fn print_logs_hint(&mut self, log_file: &Path) {
        self.write_line(&format!(
            "ERROR: {} did not exit normally - check the logs at {}",
            env!("CARGO_PKG_NAME"),
            log_file.display()
        ));
    }

    /// Releases the underlying writer.
    pub fn into_inner(self) -> E {
        self.inner
    }

    // If the stream is gone the controller is gone too; there is nobody left
    // to report the failure to.
    fn write_raw(&mut self, bytes: &[u8]) {
        self.inner
            .write_all(bytes)
            .and_then(|()| self.inner.flush())
            .ok();
    }
}

impl<E: ControllerStream> DiagnosticStream<E> {
    /// Flushes and closes the stream, ending the handshake.
    ///
    /// # Errors
    ///
    /// Propagates the close failure.
    pub fn close(mut self) -> io::Result<()> {
        self.inner.close()
    }
}

/// Renders an error followed by one `Caused by:` line per source.
#[must_use]
pub fn render_chain(error: &dyn Error) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str("\nCaused by: ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
