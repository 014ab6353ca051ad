//! Session-scoped notifications.

use serde::Serialize;

use crate::tree::core::ids::{NodeId, SessionId};

/// Something observers of a session may want to react to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A new tree replaced the previous one.
    TreeLoaded {
        /// Emitting session.
        session: SessionId,
        /// Display nodes in the new tree.
        nodes: usize,
    },
    /// Visibility flags were refreshed from the oracle.
    VisibilityRefreshed {
        /// Emitting session.
        session: SessionId,
        /// Nodes now hidden.
        hidden: usize,
    },
    /// A navigation started.
    NavigationStarted {
        /// Emitting session.
        session: SessionId,
        /// Target node.
        target: NodeId,
    },
    /// A navigation made its target visible.
    NavigationSucceeded {
        /// Emitting session.
        session: SessionId,
        /// Target node.
        target: NodeId,
        /// Cycles used.
        attempts: u32,
    },
    /// A navigation ended without revealing its target.
    NavigationFailed {
        /// Emitting session.
        session: SessionId,
        /// Target node.
        target: NodeId,
        /// Human-readable reason.
        reason: String,
    },
    /// A node was marked as favorite.
    FavoriteAdded {
        /// Emitting session.
        session: SessionId,
        /// Node id.
        node: NodeId,
    },
    /// A favorite mark was removed.
    FavoriteRemoved {
        /// Emitting session.
        session: SessionId,
        /// Node id.
        node: NodeId,
    },
}
