//! Branch navigation: planning, collaborator contracts and execution.

pub mod actuator;
pub mod navigator;
pub mod oracle;
pub mod planner;
pub mod simulated;

pub use actuator::BranchActuator;
pub use navigator::{NavigationOutcome, Navigator};
pub use oracle::{CurrentNodeOracle, NavFuture, VisibilityOracle, observe};
pub use planner::{Direction, Step, plan_steps};
pub use simulated::SimulatedBranchSurface;
