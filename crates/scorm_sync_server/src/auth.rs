//! Anti-forgery tokens for the fallback endpoint.
//!
//! A token is the HMAC-SHA256 of the session id under the server secret,
//! hex encoded (64 lowercase characters). Clients obtain it out of band and
//! echo it in a request header; the server recomputes and compares it in
//! constant time.

use crate::error::{ServerError, ServerResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Length of an encoded token.
const TOKEN_HEX_LEN: usize = 64;

/// Issues and checks per-session tokens.
#[derive(Clone)]
pub struct TokenValidator {
    secret: Vec<u8>,
}

impl TokenValidator {
    /// Creates a validator signing with `secret`.
    pub fn new(secret: Vec<u8>) -> Self {
        Self { secret }
    }

    fn mac(&self, session_id: &str) -> ServerResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| ServerError::Internal(format!("invalid auth secret: {e}")))?;
        mac.update(session_id.as_bytes());
        Ok(mac)
    }

    /// Creates the token for a session.
    pub fn create_token(&self, session_id: &str) -> ServerResult<String> {
        let tag = self.mac(session_id)?.finalize().into_bytes();
        Ok(hex::encode(tag))
    }

    /// Checks a token presented for a session.
    pub fn validate(&self, session_id: &str, token: &str) -> ServerResult<()> {
        if token.len() != TOKEN_HEX_LEN {
            return Err(ServerError::NotAuthorized("invalid token length".into()));
        }
        let tag = hex::decode(token)
            .map_err(|_| ServerError::NotAuthorized("token is not hex".into()))?;
        self.mac(session_id)?
            .verify_slice(&tag)
            .map_err(|_| ServerError::NotAuthorized("invalid signature".into()))
    }
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidator").finish_non_exhaustive()
    }
}
