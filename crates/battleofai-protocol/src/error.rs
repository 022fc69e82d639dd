//! Error types for the protocol layer.
//!
//! When you see a `ProtocolError`, the request reached the service and a
//! response came back, but its body was not what the wire format says it
//! should be.

/// Errors that can occur while encoding requests or decoding responses.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing a request payload failed.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// A body declared as JSON did not parse, or parsed into the wrong
    /// shape (missing fields, wrong types).
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The body parsed but does not carry the value the endpoint promises,
    /// e.g. `createGame` answering with something that is not an integer.
    #[error("unexpected response body: {0}")]
    UnexpectedBody(String),
}
