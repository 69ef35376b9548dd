//! Configuration for the sync engine.

use std::time::Duration;

/// Configuration for one synchronized session.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Opaque session (attempt) identifier.
    pub session_id: String,
    /// URL of the fallback endpoint.
    pub fallback_url: String,
    /// Period of the fast tick driving the primary transport.
    pub fast_period: Duration,
    /// Period of the slow tick driving the fallback transport.
    pub slow_period: Duration,
    /// Period at which health is re-evaluated and published.
    pub health_period: Duration,
    /// Minimum time the disconnected signal stays raised after recovery.
    pub warning_linger: Duration,
    /// Prefix of the durable store key.
    pub storage_prefix: String,
}

impl EngineConfig {
    /// Creates a configuration with the default timings.
    pub fn new(session_id: impl Into<String>, fallback_url: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            fallback_url: fallback_url.into(),
            fast_period: Duration::from_millis(50),
            slow_period: Duration::from_secs(5),
            health_period: Duration::from_millis(50),
            warning_linger: Duration::from_secs(1),
            storage_prefix: "attempt".into(),
        }
    }

    /// Sets the fast tick period.
    pub fn with_fast_period(mut self, period: Duration) -> Self {
        self.fast_period = period;
        self
    }

    /// Sets the slow tick period.
    pub fn with_slow_period(mut self, period: Duration) -> Self {
        self.slow_period = period;
        self
    }

    /// Sets the health evaluation period.
    pub fn with_health_period(mut self, period: Duration) -> Self {
        self.health_period = period;
        self
    }

    /// Sets how long the disconnected warning lingers.
    pub fn with_warning_linger(mut self, linger: Duration) -> Self {
        self.warning_linger = linger;
        self
    }

    /// Sets the durable key prefix.
    pub fn with_storage_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.storage_prefix = prefix.into();
        self
    }

    /// Returns the durable store key for this session.
    ///
    /// Session ids made of ASCII letters, digits, `-` and `_` are used as is.
    /// Any other id is hex encoded behind a `hex.` marker, which no plain id
    /// can produce, so every id maps to a distinct key any store accepts.
    pub fn storage_key(&self) -> String {
        let plain = self
            .session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
        if plain {
            format!("{}-{}-scorm-data", self.storage_prefix, self.session_id)
        } else {
            format!(
                "{}-hex.{}-scorm-data",
                self.storage_prefix,
                hex::encode(self.session_id.as_bytes())
            )
        }
    }

    /// Returns the path of the primary channel endpoint for this session.
    pub fn primary_path(&self) -> String {
        format!("/websocket/attempt/{}/scorm_api", self.session_id)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new("0", "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = EngineConfig::new("42", "https://lms.example.com/attempt/42/scorm_api_fallback")
            .with_fast_period(Duration::from_millis(20))
            .with_slow_period(Duration::from_secs(2))
            .with_health_period(Duration::from_millis(100))
            .with_warning_linger(Duration::from_millis(500));

        assert_eq!(config.session_id, "42");
        assert_eq!(config.fast_period, Duration::from_millis(20));
        assert_eq!(config.slow_period, Duration::from_secs(2));
        assert_eq!(config.health_period, Duration::from_millis(100));
        assert_eq!(config.warning_linger, Duration::from_millis(500));
    }

    #[test]
    fn default_timings() {
        let config = EngineConfig::default();
        assert_eq!(config.fast_period, Duration::from_millis(50));
        assert_eq!(config.slow_period, Duration::from_secs(5));
        assert_eq!(config.warning_linger, Duration::from_secs(1));
    }

    #[test]
    fn storage_key_per_session() {
        let config = EngineConfig::new("17", "");
        assert_eq!(config.storage_key(), "attempt-17-scorm-data");

        let config = config.with_storage_prefix("review");
        assert_eq!(config.storage_key(), "review-17-scorm-data");
    }

    #[test]
    fn storage_key_encodes_opaque_ids() {
        let key = EngineConfig::new("course:7", "").storage_key();
        assert_eq!(key, "attempt-hex.636f757273653a37-scorm-data");

        let keys: Vec<String> = ["a/b", "user@x", "a.b", "hex.612f62", "../x"]
            .iter()
            .map(|id| EngineConfig::new(*id, "").storage_key())
            .collect();
        for key in &keys {
            assert!(key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')));
        }
        let distinct: std::collections::BTreeSet<&String> = keys.iter().collect();
        assert_eq!(distinct.len(), keys.len());
    }

    #[test]
    fn primary_path_per_session() {
        let config = EngineConfig::new("17", "");
        assert_eq!(config.primary_path(), "/websocket/attempt/17/scorm_api");
    }
}
