//! Output streams shared with the controller.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::os::fd::{AsRawFd, RawFd};

/// A write stream the controller reads, which the server may sever.
pub trait ControllerStream: Write + Send {
    /// Flushes pending output and closes the stream so the controller observes
    /// end of file.
    fn close(&mut self) -> io::Result<()>;
}

/// One of the process's standard output streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdStream {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

impl StdStream {
    fn raw_fd(self) -> RawFd {
        match self {
            Self::Stdout => libc::STDOUT_FILENO,
            Self::Stderr => libc::STDERR_FILENO,
        }
    }
}

impl Write for StdStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Stdout => io::stdout().write(buf),
            Self::Stderr => io::stderr().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Stdout => io::stdout().flush(),
            Self::Stderr => io::stderr().flush(),
        }
    }
}

impl ControllerStream for StdStream {
    /// Replaces the descriptor with `/dev/null`.
    ///
    /// Closing the descriptor outright would let a later `open` reuse it, so
    /// stray writes could land in unrelated files. Pointing it at the null
    /// device releases the controller's pipe just the same.
    fn close(&mut self) -> io::Result<()> {
        self.flush()?;
        let null = OpenOptions::new().write(true).open("/dev/null")?;
        // SAFETY: both descriptors are valid for the duration of the call and
        // `dup2` does not retain either of them.
        let result = unsafe { libc::dup2(null.as_raw_fd(), self.raw_fd()) };
        if result == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}
