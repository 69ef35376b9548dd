//! Server configuration.

/// Configuration for the sync server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum number of elements accepted in one batch.
    pub max_batch_elements: usize,
    /// Maximum number of batches accepted in one fallback request.
    pub max_fallback_batches: usize,
    /// Whether fallback requests must carry a valid anti-forgery token.
    pub require_auth: bool,
    /// Secret key for token signing (if auth enabled).
    pub auth_secret: Option<Vec<u8>>,
}

impl ServerConfig {
    /// Creates a configuration with default limits and no authentication.
    pub fn new() -> Self {
        Self {
            max_batch_elements: 1000,
            max_fallback_batches: 1000,
            require_auth: false,
            auth_secret: None,
        }
    }

    /// Sets the maximum batch size.
    pub fn with_max_batch_elements(mut self, max: usize) -> Self {
        self.max_batch_elements = max;
        self
    }

    /// Sets the maximum number of batches per fallback request.
    pub fn with_max_fallback_batches(mut self, max: usize) -> Self {
        self.max_fallback_batches = max;
        self
    }

    /// Enables authentication with the given secret.
    pub fn with_auth(mut self, secret: Vec<u8>) -> Self {
        self.require_auth = true;
        self.auth_secret = Some(secret);
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.max_batch_elements, 1000);
        assert!(!config.require_auth);
        assert!(config.auth_secret.is_none());
    }

    #[test]
    fn config_builder() {
        let config = ServerConfig::new()
            .with_max_batch_elements(50)
            .with_max_fallback_batches(10)
            .with_auth(vec![1, 2, 3, 4]);

        assert_eq!(config.max_batch_elements, 50);
        assert_eq!(config.max_fallback_batches, 10);
        assert!(config.require_auth);
        assert_eq!(config.auth_secret, Some(vec![1, 2, 3, 4]));
    }
}
