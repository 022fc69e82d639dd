//! Error types for the gateway layer.
//!
//! Every remote call fails with exactly one [`GatewayError`]. Non-2xx
//! responses are classified here, once, by status code; nothing above the
//! gateway re-wraps them.

use std::fmt;

use battleofai_protocol::ProtocolError;
use battleofai_transport::TransportError;

/// What the service said when it refused a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpFailure {
    pub status: u16,
    pub reason: String,
    /// The JSON `message` field or raw text body. May be empty.
    pub message: String,
}

impl fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (status code: {})", self.reason, self.status)?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

/// Errors that can occur when talking to the remote service.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// 401: the token set is expired or invalid. Recoverable by logging
    /// in again.
    #[error("unauthorized: {0}")]
    Unauthorized(HttpFailure),

    /// 403: the request was understood but refused.
    #[error("forbidden: {0}")]
    Forbidden(HttpFailure),

    /// 404: no such game (or endpoint).
    #[error("not found: {0}")]
    NotFound(HttpFailure),

    /// Any other non-2xx status.
    #[error("request failed: {0}")]
    Status(HttpFailure),

    /// The request never got a response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The response arrived but its body was malformed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The service answered the login without a complete token set.
    #[error("login failed: improper credentials")]
    LoginFailure,

    /// An authenticated call was made before any successful login.
    #[error("not logged in")]
    NotLoggedIn,
}

impl GatewayError {
    /// Classifies a non-2xx response by status code.
    pub fn from_status(failure: HttpFailure) -> Self {
        match failure.status {
            401 => Self::Unauthorized(failure),
            403 => Self::Forbidden(failure),
            404 => Self::NotFound(failure),
            _ => Self::Status(failure),
        }
    }

    /// Returns `true` for the one failure a re-login can fix.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// The HTTP failure details, for the status-classified variants.
    pub fn http_failure(&self) -> Option<&HttpFailure> {
        match self {
            Self::Unauthorized(f) | Self::Forbidden(f) | Self::NotFound(f) | Self::Status(f) => {
                Some(f)
            }
            _ => None,
        }
    }
}
