//! The controller's input stream and its two sequential owners.
//!
//! The stream first carries the framed startup record, then a single
//! shutdown byte. [`ControllerChannel`] tags the handle with its mode so the
//! signal read is only reachable after the record has been consumed, and
//! each read consumes the handle.

use std::io::Read;
use std::marker::PhantomData;

use nodeboot_types::markers::SERVER_SHUTDOWN_MARKER;
use nodeboot_types::{FrameError, StartupArgs, decode_frame};

use crate::outcome::ConnectionLostReason;

/// Mode of a channel still waiting for the startup record.
#[derive(Debug)]
pub struct ArgumentMode;

/// Mode of a channel waiting for the shutdown signal.
#[derive(Debug)]
pub struct SignalMode;

/// Input stream from the controller, tagged with its current mode.
#[derive(Debug)]
pub struct ControllerChannel<R, M> {
    reader: R,
    mode: PhantomData<M>,
}

/// What the controller communicated on the signal channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerSignal {
    /// The shutdown marker was received.
    Shutdown,
    /// The connection is no longer usable.
    Lost(ConnectionLostReason),
}

impl<R: Read> ControllerChannel<R, ArgumentMode> {
    /// Wraps the controller's input stream.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            mode: PhantomData,
        }
    }

    /// Decodes the startup record and hands the stream over to signal mode.
    ///
    /// The underlying reader is never closed and nothing past the frame is
    /// consumed.
    ///
    /// # Errors
    ///
    /// Returns the [`FrameError`] raised while decoding.
    pub fn read_args(mut self) -> Result<(StartupArgs, ControllerChannel<R, SignalMode>), FrameError> {
        let args = decode_frame(&mut self.reader)?;
        Ok((
            args,
            ControllerChannel {
                reader: self.reader,
                mode: PhantomData,
            },
        ))
    }
}

impl<R: Read> ControllerChannel<R, SignalMode> {
    /// Blocks for exactly one byte and classifies it.
    #[must_use]
    pub fn read_signal(mut self) -> ControllerSignal {
        let mut byte = [0_u8; 1];
        match self.reader.read(&mut byte) {
            Ok(0) => ControllerSignal::Lost(ConnectionLostReason::EndOfStream),
            Ok(_) => match byte {
                [SERVER_SHUTDOWN_MARKER] => ControllerSignal::Shutdown,
                [other] => ControllerSignal::Lost(ConnectionLostReason::UnexpectedByte(other)),
            },
            Err(error) => ControllerSignal::Lost(ConnectionLostReason::Io(error.kind())),
        }
    }
}

impl<R> ControllerChannel<R, SignalMode> {
    /// Releases the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}
