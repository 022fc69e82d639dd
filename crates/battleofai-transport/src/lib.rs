//! Transport abstraction layer for the battleofai client.
//!
//! Provides the [`Transport`] trait that abstracts over how a single HTTP
//! request/response exchange is performed. The gateway above only ever
//! builds a [`Request`] and inspects a [`Response`]; it never touches the
//! HTTP library directly, which lets tests swap in an in-memory service.
//!
//! # Feature Flags
//!
//! - `http` (default): real HTTP transport via `reqwest`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "http")]
mod http;

pub use error::TransportError;
#[cfg(feature = "http")]
pub use http::HttpTransport;

use std::fmt;
use std::future::Future;

/// The HTTP verbs the remote service uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    /// Returns the verb as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully built outgoing request.
///
/// `body` is already-serialized JSON; when it is present the transport
/// sends it with `Content-Type: application/json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    /// Query-string pairs, appended in order.
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl Request {
    /// Creates a request with no query, headers, or body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Adds a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the query-string pairs.
    pub fn query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    /// Sets a JSON body (already encoded).
    pub fn json_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Returns the value of the first header with the given name
    /// (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response as received from the remote service, status not yet judged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    /// The canonical reason phrase for `status` (e.g. "Not Found").
    pub reason: String,
    /// The raw `content-type` header, if one was sent.
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Response {
    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns `true` if the service declared the body as JSON.
    ///
    /// Parameters such as `; charset=utf-8` are ignored.
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
            .unwrap_or(false)
    }
}

/// Performs request/response exchanges with the remote service.
///
/// # Trait bounds
///
/// - `Send + Sync` → one transport is shared by every session of a client,
///   and sessions run as separate Tokio tasks.
/// - `'static` → the transport lives as long as the client that owns it.
///
/// The returned future must be `Send` so that session tasks holding it
/// across an `.await` can be spawned onto the runtime.
pub trait Transport: Send + Sync + 'static {
    /// Sends one request and waits for the complete response.
    ///
    /// Returns `Err` only for network-level failures; every response that
    /// arrives, whatever its status, is `Ok`.
    fn send(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send;

    /// Releases any pooled connections. Requests sent afterwards fail with
    /// [`TransportError::Closed`].
    fn close(&self) -> impl Future<Output = ()> + Send {
        async {}
    }
}
