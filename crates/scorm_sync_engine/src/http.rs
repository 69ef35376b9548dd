//! HTTP fallback transport.
//!
//! The actual HTTP client is abstracted via a trait so any client library can
//! be plugged in, or none at all when testing against an in-process server.

use crate::error::{SyncError, SyncResult};
use crate::transport::FallbackTransport;
use parking_lot::RwLock;
use scorm_sync_protocol::{FallbackRequest, FallbackResponse, WireMessage};

/// Header carrying the anti-forgery token.
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Content type of every request and response body.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// A response from an HTTP POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction.
pub trait HttpClient: Send + Sync {
    /// Sends a POST request.
    ///
    /// Returns `Err` only when no response was received at all.
    fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: Vec<u8>,
    ) -> Result<HttpResponse, String>;
}

/// Source of the anti-forgery token sent with every fallback request.
pub trait AntiForgeryToken: Send + Sync {
    /// Returns the current token, if the environment provides one.
    fn token(&self) -> Option<String>;
}

/// A fixed token.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl AntiForgeryToken for StaticToken {
    fn token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Fallback transport over HTTP POST with JSON bodies.
pub struct HttpFallbackTransport<C: HttpClient, T: AntiForgeryToken> {
    url: String,
    client: C,
    token: T,
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient, T: AntiForgeryToken> HttpFallbackTransport<C, T> {
    /// Creates a transport posting to `url`.
    pub fn new(url: impl Into<String>, client: C, token: T) -> Self {
        Self {
            url: url.into(),
            client,
            token,
            last_error: RwLock::new(None),
        }
    }

    /// Returns the endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the last error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn fail(&self, err: SyncError) -> SyncError {
        *self.last_error.write() = Some(err.to_string());
        err
    }

    fn post(&self, request: &FallbackRequest) -> SyncResult<FallbackResponse> {
        let token = self.token.token().ok_or(SyncError::MissingToken)?;
        let body = request.encode()?;
        let headers = vec![
            (CSRF_HEADER.to_string(), token),
            ("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string()),
        ];

        let response = self
            .client
            .post(&self.url, &headers, body)
            .map_err(SyncError::transport_retryable)?;

        if !response.is_success() {
            return Err(SyncError::HttpStatus {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            });
        }

        Ok(FallbackResponse::decode(&response.body)?)
    }
}

impl<C: HttpClient, T: AntiForgeryToken> FallbackTransport for HttpFallbackTransport<C, T> {
    fn send(&self, request: &FallbackRequest) -> SyncResult<FallbackResponse> {
        match self.post(request) {
            Ok(response) => {
                *self.last_error.write() = None;
                Ok(response)
            }
            Err(e) => Err(self.fail(e)),
        }
    }
}

/// Trait for servers that can handle loopback requests.
pub trait LoopbackServer {
    /// Handles a POST request and returns the response.
    fn handle_post(&self, path: &str, headers: &[(String, String)], body: &[u8]) -> HttpResponse;
}

/// A loopback HTTP client that routes requests directly to a server.
///
/// Useful for testing without actual network overhead.
pub struct LoopbackClient<S: LoopbackServer> {
    server: S,
}

impl<S: LoopbackServer + Send + Sync> LoopbackClient<S> {
    /// Creates a new loopback client connected to the given server.
    pub fn new(server: S) -> Self {
        Self { server }
    }
}

impl<S: LoopbackServer + Send + Sync> HttpClient for LoopbackClient<S> {
    fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: Vec<u8>,
    ) -> Result<HttpResponse, String> {
        Ok(self.server.handle_post(url_path(url), headers, &body))
    }
}

/// Returns the path component of an absolute URL, or the input unchanged.
pub fn url_path(url: &str) -> &str {
    url.find("://")
        .map(|scheme_end| {
            let rest = &url[scheme_end + 3..];
            rest.find('/').map_or("/", |i| &rest[i..])
        })
        .unwrap_or(url)
}
