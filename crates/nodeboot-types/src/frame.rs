//! Length-prefixed framing of the startup record.
//!
//! A frame is a four byte big-endian payload length followed by the JSON
//! encoding of [`StartupArgs`]. Decoding reads exactly one frame and never
//! consumes bytes beyond it; the controller reuses the stream afterwards.

use std::io::{self, Read, Write};

use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

use crate::StartupArgs;

/// Largest payload accepted by [`decode_frame`].
pub const MAX_FRAME_LEN: u32 = 1024 * 1024;

const HEADER_LEN: usize = 4;

/// Errors raised while encoding or decoding a startup frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The stream ended before the length header was complete.
    #[error("argument stream closed before the frame header was received")]
    TruncatedHeader,
    /// The stream ended before the declared payload was complete.
    #[error("argument stream closed after {received} of {expected} payload bytes")]
    TruncatedPayload {
        /// Bytes declared by the header.
        expected: u32,
        /// Bytes actually received.
        received: u64,
    },
    /// The declared payload exceeds [`MAX_FRAME_LEN`].
    #[error("argument frame of {len} bytes exceeds the {MAX_FRAME_LEN} byte limit")]
    Oversized {
        /// Declared payload length.
        len: u64,
    },
    /// Reading from or writing to the stream failed.
    #[error("argument stream I/O failed: {source}")]
    Io {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The payload was not a valid startup record.
    #[error("malformed startup record: {source}")]
    Malformed {
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Serialises the record into a complete frame.
///
/// The intermediate JSON buffer is zeroed before it is freed. The returned
/// frame still carries the keystore password, so callers holding a secret
/// should zeroize it once it has been sent.
///
/// # Errors
///
/// Returns [`FrameError::Malformed`] when serialisation fails and
/// [`FrameError::Oversized`] when the payload exceeds [`MAX_FRAME_LEN`].
pub fn encode_frame(args: &StartupArgs) -> Result<Vec<u8>, FrameError> {
    let payload = Zeroizing::new(
        serde_json::to_vec(args).map_err(|source| FrameError::Malformed { source })?,
    );
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_FRAME_LEN)
        .ok_or(FrameError::Oversized {
            len: payload.len() as u64,
        })?;
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Encodes the record and writes it to the stream, flushing afterwards.
///
/// # Errors
///
/// Propagates encoding failures and returns [`FrameError::Io`] when the write
/// fails.
pub fn write_frame<W: Write>(writer: &mut W, args: &StartupArgs) -> Result<(), FrameError> {
    let frame = Zeroizing::new(encode_frame(args)?);
    writer
        .write_all(&frame)
        .and_then(|()| writer.flush())
        .map_err(|source| FrameError::Io { source })
}

/// Reads exactly one frame from the stream and decodes the record.
///
/// The reader is borrowed, not consumed, and is left positioned directly
/// after the frame.
///
/// # Errors
///
/// Returns a [`FrameError`] describing the truncation, size violation, IO
/// failure or malformed payload.
pub fn decode_frame<R: Read>(reader: &mut R) -> Result<StartupArgs, FrameError> {
    let mut header = [0_u8; HEADER_LEN];
    reader.read_exact(&mut header).map_err(|error| {
        if error.kind() == io::ErrorKind::UnexpectedEof {
            FrameError::TruncatedHeader
        } else {
            FrameError::Io { source: error }
        }
    })?;
    let len = u32::from_be_bytes(header);
    if len > MAX_FRAME_LEN {
        return Err(FrameError::Oversized {
            len: u64::from(len),
        });
    }

    // Sized up front so reading never reallocates and strands a copy.
    let mut payload = Zeroizing::new(
        usize::try_from(len).map_or_else(|_| Vec::new(), Vec::with_capacity),
    );
    let received = reader
        .by_ref()
        .take(u64::from(len))
        .read_to_end(&mut payload)
        .map_err(|source| FrameError::Io { source })?;
    if received as u64 != u64::from(len) {
        return Err(FrameError::TruncatedPayload {
            expected: len,
            received: received as u64,
        });
    }

    decode_payload(&mut payload)
}

/// Decodes the JSON payload and wipes it, whether or not decoding succeeded.
fn decode_payload(payload: &mut [u8]) -> Result<StartupArgs, FrameError> {
    let decoded =
        serde_json::from_slice(payload).map_err(|source| FrameError::Malformed { source });
    payload.zeroize();
    decoded
}
