//! HTTP transport implementation using `reqwest`.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::{Method, Request, Response, Transport, TransportError};

/// A [`Transport`] that talks to the real service over HTTP(S).
///
/// Wraps one `reqwest::Client`, so every session of a client shares a
/// single connection pool.
pub struct HttpTransport {
    client: reqwest::Client,
    closed: AtomicBool,
}

impl HttpTransport {
    /// Creates a transport with a fresh connection pool.
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        Ok(Self::with_client(client))
    }

    /// Wraps an existing `reqwest::Client` (custom proxy, timeouts, ...).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            closed: AtomicBool::new(false),
        }
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let mut builder = self.client.request(method, &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| TransportError::SendFailed(Box::new(e)))?;

        let status = resp.status();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = resp
            .bytes()
            .await
            .map_err(|e| TransportError::ReceiveFailed(Box::new(e)))?;

        tracing::trace!(
            method = %request.method,
            url = %request.url,
            status = status.as_u16(),
            "http exchange complete"
        );

        Ok(Response {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            content_type,
            body: body.to_vec(),
        })
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        tracing::debug!("http transport closed");
    }
}
