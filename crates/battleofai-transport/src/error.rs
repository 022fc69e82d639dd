/// Errors that can occur in the transport layer.
///
/// These are network-level faults only. A response that arrived with a
/// non-2xx status is NOT a transport error; it is handed up unchanged and
/// classified by the gateway.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request could not be built (bad URL, bad header value).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Connecting to the remote host or sending the request failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The response body could not be read.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The transport was closed and can no longer send requests.
    #[error("transport closed")]
    Closed,
}
