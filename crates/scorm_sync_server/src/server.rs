//! Main sync server.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::{HandlerContext, RequestHandler};
use crate::receipts::ReceiptLog;
use scorm_sync_protocol::{
    BatchId, BatchMessage, FallbackRequest, FallbackResponse, ServerMessage, WireMessage,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Last path segment of the fallback endpoint.
pub const FALLBACK_SUFFIX: &str = "scorm_api_fallback";

/// Header the anti-forgery token is read from.
const CSRF_HEADER: &str = "X-CSRFToken";

/// Returns the fallback endpoint path for a session.
pub fn fallback_path(session: &str) -> String {
    format!("/attempt/{session}/{FALLBACK_SUFFIX}")
}

/// Extracts the session id from a fallback endpoint path.
pub fn session_from_path(path: &str) -> Option<&str> {
    let path = path.split('?').next()?;
    let mut segments = path.trim_matches('/').split('/');
    match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some("attempt"), Some(session), Some(FALLBACK_SUFFIX), None) if !session.is_empty() => {
            Some(session)
        }
        _ => None,
    }
}

/// The sync server.
///
/// Stores batches from both transports into a shared receipt log. HTTP and
/// socket plumbing is left to the embedding application, which calls
/// [`SyncServer::handle_frame`] for primary channel frames and
/// [`SyncServer::handle_post`] for fallback requests.
///
/// # Example
///
/// ```
/// use scorm_sync_server::{ServerConfig, SyncServer};
///
/// let server = SyncServer::new(ServerConfig::default());
/// let reply = server
///     .handle_frame("42", br#"{"batch_id": 1, "elements": []}"#)
///     .unwrap();
/// assert_eq!(reply, br#"{"received":1}"#);
/// ```
pub struct SyncServer {
    handler: RequestHandler,
    context: Arc<HandlerContext>,
}

impl SyncServer {
    /// Creates a new sync server.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_receipts(config, Arc::new(ReceiptLog::new()))
    }

    /// Creates a sync server with an existing receipt log.
    pub fn with_receipts(config: ServerConfig, receipts: Arc<ReceiptLog>) -> Self {
        let context = Arc::new(HandlerContext::new(config, receipts));
        let handler = RequestHandler::new(Arc::clone(&context));
        Self { handler, context }
    }

    /// Handles a batch from the primary channel.
    pub fn handle_batch(&self, session: &str, message: BatchMessage) -> ServerResult<ServerMessage> {
        self.handler.handle_batch(session, message)
    }

    /// Handles a raw primary channel frame and returns the reply frame.
    pub fn handle_frame(&self, session: &str, frame: &[u8]) -> ServerResult<Vec<u8>> {
        let message = BatchMessage::decode(frame)?;
        let reply = self.handle_batch(session, message)?;
        Ok(reply.encode()?)
    }

    /// Handles a decoded fallback request.
    pub fn handle_fallback(
        &self,
        session: &str,
        token: Option<&str>,
        request: FallbackRequest,
    ) -> ServerResult<FallbackResponse> {
        self.handler.handle_fallback(session, token, request)
    }

    /// Handles an HTTP POST to the fallback endpoint.
    ///
    /// Returns the status code and response body.
    pub fn handle_post(&self, path: &str, headers: &[(String, String)], body: &[u8]) -> (u16, Vec<u8>) {
        match self.route_post(path, headers, body) {
            Ok(body) => (200, body),
            Err(e) => {
                warn!(path, error = %e, "fallback request failed");
                (e.status(), e.to_string().into_bytes())
            }
        }
    }

    fn route_post(&self, path: &str, headers: &[(String, String)], body: &[u8]) -> ServerResult<Vec<u8>> {
        let session =
            session_from_path(path).ok_or_else(|| ServerError::NotFound(path.to_string()))?;
        let token = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(CSRF_HEADER))
            .map(|(_, value)| value.as_str());
        let request = FallbackRequest::decode(body)?;
        let response = self.handle_fallback(session, token, request)?;
        Ok(response.encode()?)
    }

    /// Marks a session complete and returns the notice to push to its
    /// primary channel.
    pub fn complete(&self, session: &str) -> ServerMessage {
        if self.context.receipts.mark_complete(session) {
            info!(session, "session marked complete");
        }
        ServerMessage::completed()
    }

    /// Returns true if the session has been marked complete.
    pub fn is_complete(&self, session: &str) -> bool {
        self.context.receipts.is_complete(session)
    }

    /// Creates the anti-forgery token for a session.
    ///
    /// # Errors
    ///
    /// Fails if no secret is configured.
    pub fn create_token(&self, session: &str) -> ServerResult<String> {
        self.context
            .validator()
            .ok_or_else(|| ServerError::Internal("no auth secret configured".into()))?
            .create_token(session)
    }

    /// Checks an anti-forgery token for a session.
    pub fn validate_token(&self, session: &str, token: Option<&str>) -> ServerResult<()> {
        self.handler.authorize(session, token)
    }

    /// Returns every key and value stored for a session.
    pub fn values(&self, session: &str) -> BTreeMap<String, String> {
        self.context.receipts.values(session)
    }

    /// Returns the stored value of one key.
    pub fn value(&self, session: &str, key: &str) -> Option<String> {
        self.context.receipts.value(session, key).map(|v| v.value)
    }

    /// Returns every batch id stored for a session.
    pub fn received_ids(&self, session: &str) -> Vec<BatchId> {
        self.context.receipts.received_ids(session)
    }

    /// Returns the shared receipt log.
    pub fn receipts(&self) -> &Arc<ReceiptLog> {
        &self.context.receipts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scorm_sync_protocol::{Batch, Element};

    fn batch(id: BatchId, key: &str, value: &str, time: f64) -> Batch {
        Batch::new(id, vec![Element::new(key, value, time, 0)])
    }

    #[test]
    fn path_routing() {
        assert_eq!(fallback_path("42"), "/attempt/42/scorm_api_fallback");
        assert_eq!(session_from_path("/attempt/42/scorm_api_fallback"), Some("42"));
        assert_eq!(session_from_path("/attempt/42/scorm_api_fallback/"), Some("42"));
        assert_eq!(session_from_path("/attempt/42/scorm_api_fallback?x=1"), Some("42"));
        assert_eq!(session_from_path("/attempt//scorm_api_fallback"), None);
        assert_eq!(session_from_path("/attempt/42/other"), None);
        assert_eq!(session_from_path("/"), None);
    }

    #[test]
    fn frame_round_trip() {
        let server = SyncServer::new(ServerConfig::default());
        let frame = BatchMessage::from_batch(&batch(3, "cmi.location", "p1", 1.0))
            .encode()
            .unwrap();
        let reply = server.handle_frame("9", &frame).unwrap();
        assert_eq!(ServerMessage::decode(&reply).unwrap(), ServerMessage::received(3));
        assert_eq!(server.value("9", "cmi.location").as_deref(), Some("p1"));
    }

    #[test]
    fn malformed_frame_rejected() {
        let server = SyncServer::new(ServerConfig::default());
        let err = server.handle_frame("9", b"{").unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn post_fallback() {
        let server = SyncServer::new(ServerConfig::default());
        let request = FallbackRequest::from_batches(&[
            batch(1, "a", "x", 1.0),
            batch(2, "b", "y", 2.0),
        ]);
        let (status, body) =
            server.handle_post(&fallback_path("9"), &[], &request.encode().unwrap());

        assert_eq!(status, 200);
        let response = FallbackResponse::decode(&body).unwrap();
        assert_eq!(response.received_batches, vec![1, 2]);
        assert_eq!(server.received_ids("9"), vec![1, 2]);
    }

    #[test]
    fn post_unknown_path() {
        let server = SyncServer::new(ServerConfig::default());
        let (status, _) = server.handle_post("/nowhere", &[], b"{}");
        assert_eq!(status, 404);
    }

    #[test]
    fn post_malformed_body() {
        let server = SyncServer::new(ServerConfig::default());
        let (status, _) = server.handle_post(&fallback_path("9"), &[], b"not json");
        assert_eq!(status, 400);
    }

    #[test]
    fn post_checks_token_header() {
        let server = SyncServer::new(ServerConfig::default().with_auth(b"secret".to_vec()));
        let body = FallbackRequest::from_batches(&[batch(1, "a", "x", 1.0)])
            .encode()
            .unwrap();

        let (status, _) = server.handle_post(&fallback_path("9"), &[], &body);
        assert_eq!(status, 403);

        let token = server.create_token("9").unwrap();
        let headers = vec![("x-csrftoken".to_string(), token)];
        let (status, _) = server.handle_post(&fallback_path("9"), &headers, &body);
        assert_eq!(status, 200);
    }

    #[test]
    fn create_token_requires_secret() {
        let server = SyncServer::new(ServerConfig::default());
        assert!(server.create_token("9").is_err());
        assert!(server.validate_token("9", None).is_ok());
    }

    #[test]
    fn completion_notice() {
        let server = SyncServer::new(ServerConfig::default());
        let notice = server.complete("9");
        assert!(notice.is_completion());
        assert!(server.is_complete("9"));
        assert!(!server.is_complete("10"));

        let reply = server
            .handle_batch("9", BatchMessage::from_batch(&batch(4, "a", "x", 1.0)))
            .unwrap();
        assert!(reply.is_completion());
    }

    #[test]
    fn shared_receipts() {
        let receipts = Arc::new(ReceiptLog::new());
        let server = SyncServer::with_receipts(ServerConfig::default(), Arc::clone(&receipts));
        server
            .handle_batch("9", BatchMessage::from_batch(&batch(4, "a", "x", 1.0)))
            .unwrap();
        assert!(receipts.is_received("9", 4));
        assert_eq!(server.values("9").len(), 1);
    }
}
