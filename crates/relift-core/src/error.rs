//! Error types for the expression wire format.

use thiserror::Error;

/// Error type for decoding serialized expressions.
///
/// Only hard stream errors are reported here. A recognizably malformed
/// record (unknown tag byte, unknown constant op, missing end-of-node
/// marker) is logged as a warning and skipped instead; see
/// [`deserialize`](crate::serialize::deserialize).
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Stream ended in the middle of a node.
    #[error("truncated stream: needed {needed} more bytes while reading {context}")]
    Truncated {
        needed: usize,
        context: &'static str,
    },

    /// A length field exceeded the remaining stream.
    #[error("invalid length {len} for {context}")]
    InvalidLength { len: usize, context: &'static str },

    /// A string payload was not valid UTF-8.
    #[error("invalid string payload")]
    InvalidString,

    /// A type or RTL handle failed to decode.
    #[error("invalid {kind} handle payload: {reason}")]
    InvalidHandle {
        kind: &'static str,
        reason: String,
    },
}
