//! Conversation tree subsystem.
//!
//! - `core`: ids, raw export types, display types, configuration and errors
//! - `normalize`: raw mapping to pruned display tree, export load/save
//! - `navigation`: branch navigation planner, oracle/actuator contracts and
//!   the retrying navigator
//! - `session`: per-conversation state with scoped event delivery

pub mod core;
pub mod navigation;
pub mod normalize;
pub mod session;

pub use self::core::{
    AuthorRole, BranchviewConfig, Conversation, ConversationNode, DisplayNode, Edge, Message,
    NavigationConfig, NodeId, NormalizeConfig, NormalizedTree, RawMapping, SessionId, TreeError,
    TreeResult, Visibility,
};
pub use navigation::{
    BranchActuator, CurrentNodeOracle, Direction, NavigationOutcome, Navigator,
    SimulatedBranchSurface, Step, VisibilityOracle, plan_steps,
};
pub use normalize::{Normalizer, find_root, load_export, parse_export, save_export};
pub use session::{ConversationSession, SessionEvent};
