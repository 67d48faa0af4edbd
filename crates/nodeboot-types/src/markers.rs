//! Reserved bytes multiplexed onto the server's diagnostic stream.
//!
//! None of these bytes may appear in ordinary diagnostic text. Writers on the
//! server side scrub them from free-form output.

/// Written on its own line once the server is serving.
pub const SERVER_READY_MARKER: u8 = 0x18;

/// Prefixes a single line carrying a user-facing error message.
pub const USER_EXCEPTION_MARKER: u8 = 0x15;

/// Sent by the controller on the input stream to request a graceful shutdown.
pub const SERVER_SHUTDOWN_MARKER: u8 = 0x1B;

/// Every reserved byte, for scrubbing free-form text.
pub const RESERVED: [u8; 3] = [
    SERVER_READY_MARKER,
    USER_EXCEPTION_MARKER,
    SERVER_SHUTDOWN_MARKER,
];

/// Returns `true` when the character is one of the reserved marker bytes.
#[must_use]
pub fn is_reserved(character: char) -> bool {
    u8::try_from(character).is_ok_and(|byte| RESERVED.contains(&byte))
}

/// Returns the text with every reserved marker byte removed.
#[must_use]
pub fn scrub(text: &str) -> String {
    text.chars().filter(|character| !is_reserved(*character)).collect()
}
