//! Configuration for normalization, navigation and the HTTP surface.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::tree::core::errors::{TreeError, TreeResult};

/// Top-level configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BranchviewConfig {
    /// Normalizer settings.
    pub normalize: NormalizeConfig,
    /// Navigation settings.
    pub navigation: NavigationConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
}

impl BranchviewConfig {
    /// Build the default configuration with environment overrides applied.
    ///
    /// Recognized variables: `BRANCHVIEW_PORT`, `BRANCHVIEW_MAX_ATTEMPTS`.
    /// Unparseable values are ignored with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("BRANCHVIEW_PORT") {
            match raw.parse::<u16>() {
                Ok(port) => config.server.port = port,
                Err(err) => tracing::warn!(%raw, %err, "Ignoring invalid BRANCHVIEW_PORT"),
            }
        }

        if let Ok(raw) = std::env::var("BRANCHVIEW_MAX_ATTEMPTS") {
            match raw.parse::<u32>() {
                Ok(attempts) => config.navigation.max_attempts = attempts,
                Err(err) => {
                    tracing::warn!(%raw, %err, "Ignoring invalid BRANCHVIEW_MAX_ATTEMPTS");
                }
            }
        }

        config
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> TreeResult<()> {
        self.normalize.validate()?;
        self.navigation.validate()
    }
}

/// Normalizer settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NormalizeConfig {
    /// Label used for nodes whose content has no textual part.
    pub no_text_label: String,
    /// Label used for the display root when it carries no text.
    pub root_label: String,
    /// Prefix for placeholder labels of malformed messages.
    pub error_label_prefix: String,
    /// Content types that are present in the tree but never rendered.
    pub context_note_types: Vec<String>,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            no_text_label: "[no text]".to_string(),
            root_label: "[conversation start]".to_string(),
            error_label_prefix: "[error]".to_string(),
            context_note_types: vec!["model_editable_context".to_string()],
        }
    }
}

impl NormalizeConfig {
    /// Validate normalizer settings.
    ///
    /// # Errors
    /// Returns an error if a label is empty.
    pub fn validate(&self) -> TreeResult<()> {
        if self.no_text_label.is_empty() {
            return Err(TreeError::InvalidConfig(
                "normalize.no_text_label must not be empty".to_string(),
            ));
        }
        if self.root_label.is_empty() {
            return Err(TreeError::InvalidConfig(
                "normalize.root_label must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a content type marks a context note.
    #[must_use]
    pub fn is_context_note(&self, content_type: &str) -> bool {
        self.context_note_types.iter().any(|t| t == content_type)
    }
}

/// Navigation settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Plan-and-execute cycles before reporting failure.
    pub max_attempts: u32,
    /// How long one actuation may take to settle.
    #[serde(with = "duration_millis")]
    pub settle_timeout: Duration,
    /// Maximum ids per visibility check call.
    pub visibility_batch_size: usize,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            settle_timeout: Duration::from_secs(2),
            visibility_batch_size: 200,
        }
    }
}

impl NavigationConfig {
    /// Set the maximum attempts.
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the settle timeout.
    #[must_use]
    pub const fn with_settle_timeout(mut self, timeout: Duration) -> Self {
        self.settle_timeout = timeout;
        self
    }

    /// Set the visibility batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, size: usize) -> Self {
        self.visibility_batch_size = size;
        self
    }

    /// Validate navigation settings.
    ///
    /// # Errors
    /// Returns an error if attempts, timeout or batch size are zero.
    pub fn validate(&self) -> TreeResult<()> {
        if self.max_attempts == 0 {
            return Err(TreeError::InvalidConfig(
                "navigation.max_attempts must be > 0".to_string(),
            ));
        }
        if self.settle_timeout.is_zero() {
            return Err(TreeError::InvalidConfig(
                "navigation.settle_timeout must be > 0".to_string(),
            ));
        }
        if self.visibility_batch_size == 0 {
            return Err(TreeError::InvalidConfig(
                "navigation.visibility_batch_size must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// HTTP server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = BranchviewConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.navigation.max_attempts, 5);
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let nav = NavigationConfig::default().with_max_attempts(0);
        assert!(matches!(nav.validate(), Err(TreeError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_batch_rejected() {
        let nav = NavigationConfig::default().with_batch_size(0);
        assert!(nav.validate().is_err());
    }

    #[test]
    fn test_settle_timeout_serializes_as_millis() {
        let nav = NavigationConfig::default().with_settle_timeout(Duration::from_millis(750));
        let json = serde_json::to_value(&nav).unwrap();
        assert_eq!(json["settle_timeout"], 750);
        let back: NavigationConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back.settle_timeout, Duration::from_millis(750));
    }

    #[test]
    fn test_context_note_detection() {
        let config = NormalizeConfig::default();
        assert!(config.is_context_note("model_editable_context"));
        assert!(!config.is_context_note("text"));
    }
}
