//! Request handlers for the primary channel and the fallback endpoint.

use crate::auth::TokenValidator;
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::receipts::ReceiptLog;
use scorm_sync_protocol::{
    Batch, BatchMessage, FallbackRequest, FallbackResponse, ServerMessage, COMPLETION_COMPLETED,
};
use std::sync::Arc;
use tracing::debug;

/// Context for request handling.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// Receipt log (shared across all handlers).
    pub receipts: Arc<ReceiptLog>,
    validator: Option<TokenValidator>,
}

impl HandlerContext {
    /// Creates a new handler context.
    pub fn new(config: ServerConfig, receipts: Arc<ReceiptLog>) -> Self {
        let validator = config
            .auth_secret
            .as_ref()
            .map(|secret| TokenValidator::new(secret.clone()));
        Self {
            config,
            receipts,
            validator,
        }
    }

    /// Returns the token validator, if a secret is configured.
    pub fn validator(&self) -> Option<&TokenValidator> {
        self.validator.as_ref()
    }
}

/// Handler for sync requests.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    fn check_batch(&self, batch: &Batch) -> ServerResult<()> {
        let limit = self.context.config.max_batch_elements;
        if batch.len() > limit {
            return Err(ServerError::TooLarge {
                limit,
                actual: batch.len(),
            });
        }
        Ok(())
    }

    /// Stores a batch received on the primary channel.
    ///
    /// The receipt carries a completion notice once the session has been
    /// marked complete.
    pub fn handle_batch(&self, session: &str, message: BatchMessage) -> ServerResult<ServerMessage> {
        let batch = message.into_batch();
        self.check_batch(&batch)?;

        let fresh = self.context.receipts.apply(session, &batch);
        debug!(session, batch_id = batch.id, fresh, "primary batch stored");

        let completion_status = self
            .context
            .receipts
            .is_complete(session)
            .then(|| COMPLETION_COMPLETED.to_string());
        Ok(ServerMessage {
            received: Some(batch.id),
            completion_status,
        })
    }

    /// Checks the anti-forgery token of a fallback request.
    pub fn authorize(&self, session: &str, token: Option<&str>) -> ServerResult<()> {
        if !self.context.config.require_auth {
            return Ok(());
        }
        let validator = self
            .context
            .validator()
            .ok_or_else(|| ServerError::Internal("authentication enabled without secret".into()))?;
        let token =
            token.ok_or_else(|| ServerError::NotAuthorized("missing anti-forgery token".into()))?;
        validator.validate(session, token)
    }

    /// Stores every batch of a fallback request.
    ///
    /// Every id in the request is acknowledged, including ids stored
    /// before.
    pub fn handle_fallback(
        &self,
        session: &str,
        token: Option<&str>,
        request: FallbackRequest,
    ) -> ServerResult<FallbackResponse> {
        self.authorize(session, token)?;

        let limit = self.context.config.max_fallback_batches;
        if request.len() > limit {
            return Err(ServerError::TooLarge {
                limit,
                actual: request.len(),
            });
        }
        let batches: Vec<Batch> = request.iter_batches().collect();
        for batch in &batches {
            self.check_batch(batch)?;
        }

        let mut received = Vec::with_capacity(batches.len());
        for batch in &batches {
            let fresh = self.context.receipts.apply(session, batch);
            debug!(session, batch_id = batch.id, fresh, "fallback batch stored");
            received.push(batch.id);
        }
        Ok(FallbackResponse::new(received))
    }
}
