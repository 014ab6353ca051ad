//! Error types for the conversation tree subsystem.

use thiserror::Error;

use crate::tree::core::ids::NodeId;

/// Conversation tree error type.
#[derive(Debug, Error)]
pub enum TreeError {
    /// The raw mapping has no unique root.
    #[error("malformed tree: expected exactly one root, found {candidates}")]
    MalformedTree {
        /// Number of parentless or orphaned nodes found.
        candidates: usize,
    },
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A referenced node does not exist in the current tree.
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),
    /// The visibility oracle failed or returned a misaligned report.
    #[error("visibility check failed: {0}")]
    Visibility(String),
    /// The branch-switch actuator could not perform a step.
    #[error("branch switch failed for {node}: {reason}")]
    Actuator {
        /// Node whose control was addressed.
        node: NodeId,
        /// Actuator-provided reason.
        reason: String,
    },
    /// An actuation did not settle within the configured timeout.
    #[error("branch switch for {0} did not settle in time")]
    SettleTimeout(NodeId),
    /// Navigation exhausted its retries with the target still hidden.
    #[error("navigation failed: {target} still hidden after {attempts} attempts")]
    NavigationFailed {
        /// Target node of the navigation.
        target: NodeId,
        /// Number of plan-and-execute cycles attempted.
        attempts: u32,
    },
    /// Navigation was superseded by a newer request.
    #[error("navigation to {0} was superseded by a newer request")]
    Cancelled(NodeId),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TreeError {
    /// Whether a navigation attempt that hit this error may be retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Actuator { .. } | Self::SettleTimeout(_))
    }
}

/// Convenience result alias for tree operations.
pub type TreeResult<T> = Result<T, TreeError>;
