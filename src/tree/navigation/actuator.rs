//! Branch-switch actuator contract.

use crate::tree::core::errors::TreeResult;
use crate::tree::navigation::oracle::NavFuture;
use crate::tree::navigation::planner::Step;

/// Performs one sibling switch on the rendering surface.
///
/// Implementations press the previous/next control attached to
/// `step.node_id` and resolve once the switch has settled. The navigator
/// bounds every call with its settle timeout.
pub trait BranchActuator: Send + Sync {
    /// Execute one step.
    ///
    /// # Errors
    /// Returns `Actuator` when the addressed control cannot be found or
    /// pressed.
    fn execute_step(&self, step: Step) -> NavFuture<'_, TreeResult<()>>;
}
