//! Core tree types and identifiers.

pub mod config;
pub mod display;
pub mod errors;
pub mod ids;
pub mod raw;

pub use config::{BranchviewConfig, NavigationConfig, NormalizeConfig, ServerConfig};
pub use display::{ContentKind, DisplayNode, Edge, NormalizedTree, Visibility};
pub use errors::{TreeError, TreeResult};
pub use ids::{NodeId, SessionId};
pub use raw::{
    Author, AuthorRole, Content, ContentPart, Conversation, ConversationNode, Message,
    MessageMetadata, RECIPIENT_ALL, RawMapping,
};
