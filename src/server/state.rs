//! Application state shared across all request handlers.

use std::sync::Arc;

use crate::tree::core::config::BranchviewConfig;
use crate::tree::core::errors::TreeResult;
use crate::tree::normalize::Normalizer;

/// Shared application state.
pub struct AppState {
    /// Normalizer used by every request.
    pub normalizer: Normalizer,
    /// Effective configuration.
    pub config: BranchviewConfig,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: BranchviewConfig) -> TreeResult<Arc<Self>> {
        config.validate()?;
        let normalizer = Normalizer::new(config.normalize.clone());
        Ok(Arc::new(Self { normalizer, config }))
    }
}
