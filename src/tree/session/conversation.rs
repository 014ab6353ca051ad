//! Conversation session orchestration.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, broadcast};
use tracing::{info, warn};

use crate::tree::core::config::BranchviewConfig;
use crate::tree::core::display::NormalizedTree;
use crate::tree::core::errors::{TreeError, TreeResult};
use crate::tree::core::ids::{NodeId, SessionId};
use crate::tree::core::raw::{Conversation, RawMapping};
use crate::tree::navigation::actuator::BranchActuator;
use crate::tree::navigation::navigator::{NavigationOutcome, Navigator};
use crate::tree::navigation::oracle::VisibilityOracle;
use crate::tree::navigation::planner::{Step, plan_steps};
use crate::tree::normalize::normalizer::Normalizer;
use crate::tree::session::events::SessionEvent;

/// Capacity of the per-session event channel.
const EVENT_CAPACITY: usize = 64;

/// One open conversation: its current tree, its collaborators and its
/// observers.
pub struct ConversationSession {
    id: SessionId,
    config: BranchviewConfig,
    normalizer: Normalizer,
    navigator: Navigator,
    oracle: Arc<dyn VisibilityOracle>,
    actuator: Arc<dyn BranchActuator>,
    tree: RwLock<NormalizedTree>,
    favorites: Mutex<BTreeSet<NodeId>>,
    events: broadcast::Sender<SessionEvent>,
}

impl ConversationSession {
    /// Create a session with an empty tree.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(
        config: BranchviewConfig,
        oracle: Arc<dyn VisibilityOracle>,
        actuator: Arc<dyn BranchActuator>,
    ) -> TreeResult<Self> {
        config.validate()?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            id: SessionId::new(),
            normalizer: Normalizer::new(config.normalize.clone()),
            navigator: Navigator::new(config.navigation.clone()),
            config,
            oracle,
            actuator,
            tree: RwLock::new(NormalizedTree::default()),
            favorites: Mutex::new(BTreeSet::new()),
            events,
        })
    }

    /// Session id.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &BranchviewConfig {
        &self.config
    }

    /// Register an observer.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: SessionEvent) {
        // No receivers is not an error.
        let _ = self.events.send(event);
    }

    /// Rebuild the tree from a raw mapping; returns the node count.
    ///
    /// Favorites that no longer exist in the new tree are dropped.
    pub async fn load(&self, mapping: &RawMapping) -> usize {
        let fresh = self.normalizer.normalize(mapping);
        let nodes = fresh.nodes.len();

        self.favorites
            .lock()
            .await
            .retain(|id| fresh.node(id.as_str()).is_some());
        *self.tree.write().await = fresh;

        info!(session = %self.id, nodes, "Conversation tree loaded");
        self.emit(SessionEvent::TreeLoaded {
            session: self.id,
            nodes,
        });
        nodes
    }

    /// Rebuild the tree from a full export.
    pub async fn load_conversation(&self, conversation: &Conversation) -> usize {
        self.load(&conversation.mapping).await
    }

    /// Copy of the current tree.
    pub async fn snapshot(&self) -> NormalizedTree {
        self.tree.read().await.clone()
    }

    /// Re-check visibility of every node; returns the hidden count.
    ///
    /// # Errors
    /// Returns an oracle error; node state is unchanged in that case.
    pub async fn refresh_visibility(&self) -> TreeResult<usize> {
        self.navigator.refresh(&self.tree, self.oracle.as_ref()).await?;
        let hidden = self.tree.read().await.hidden_ids().len();
        self.emit(SessionEvent::VisibilityRefreshed {
            session: self.id,
            hidden,
        });
        Ok(hidden)
    }

    /// Plan against the current visibility state without executing.
    pub async fn plan(&self, target: &NodeId) -> Vec<Step> {
        plan_steps(&self.tree.read().await.nodes, target.as_str())
    }

    /// Make `target` the visible branch.
    ///
    /// # Errors
    /// See [`Navigator::navigate`].
    pub async fn navigate_to(&self, target: &NodeId) -> TreeResult<NavigationOutcome> {
        self.emit(SessionEvent::NavigationStarted {
            session: self.id,
            target: target.clone(),
        });

        let result = self
            .navigator
            .navigate(
                &self.tree,
                self.oracle.as_ref(),
                self.actuator.as_ref(),
                target,
            )
            .await;

        match &result {
            Ok(outcome) => self.emit(SessionEvent::NavigationSucceeded {
                session: self.id,
                target: target.clone(),
                attempts: outcome.attempts,
            }),
            Err(err) => {
                warn!(session = %self.id, %target, %err, "Navigation did not complete");
                self.emit(SessionEvent::NavigationFailed {
                    session: self.id,
                    target: target.clone(),
                    reason: err.to_string(),
                });
            }
        }
        result
    }

    /// Mark a node as favorite; returns false if it already was.
    ///
    /// # Errors
    /// Returns `UnknownNode` if the node is not in the current tree.
    pub async fn add_favorite(&self, node: &NodeId) -> TreeResult<bool> {
        if self.tree.read().await.node(node.as_str()).is_none() {
            return Err(TreeError::UnknownNode(node.clone()));
        }
        let added = self.favorites.lock().await.insert(node.clone());
        if added {
            self.emit(SessionEvent::FavoriteAdded {
                session: self.id,
                node: node.clone(),
            });
        }
        Ok(added)
    }

    /// Remove a favorite mark; returns false if there was none.
    pub async fn remove_favorite(&self, node: &NodeId) -> bool {
        let removed = self.favorites.lock().await.remove(node);
        if removed {
            self.emit(SessionEvent::FavoriteRemoved {
                session: self.id,
                node: node.clone(),
            });
        }
        removed
    }

    /// Current favorites, ordered by id.
    pub async fn favorites(&self) -> Vec<NodeId> {
        self.favorites.lock().await.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::core::raw::{AuthorRole, ConversationNode, Message};
    use crate::tree::navigation::simulated::SimulatedBranchSurface;

    /// root -> sys -> [u1(visible), u2(hidden)]; u2 -> reply.
    fn mapping() -> RawMapping {
        let nodes = [
            ConversationNode::new("root", None).with_children(["sys"]),
            ConversationNode::new("sys", Some(NodeId::from("root")))
                .with_message(Message::text(AuthorRole::System, ""))
                .with_children(["u1", "u2"]),
            ConversationNode::new("u1", Some(NodeId::from("sys")))
                .with_message(Message::text(AuthorRole::User, "v1")),
            ConversationNode::new("u2", Some(NodeId::from("sys")))
                .with_message(Message::text(AuthorRole::User, "v2"))
                .with_children(["reply"]),
            ConversationNode::new("reply", Some(NodeId::from("u2")))
                .with_message(Message::text(AuthorRole::Assistant, "answer")),
        ];
        nodes.into_iter().map(|n| (n.id.clone(), n)).collect()
    }

    fn session() -> (ConversationSession, Arc<SimulatedBranchSurface>) {
        let raw = mapping();
        let tree = Normalizer::default().normalize(&raw);
        let surface = Arc::new(SimulatedBranchSurface::from_tree(&tree));
        let session =
            ConversationSession::new(BranchviewConfig::default(), surface.clone(), surface.clone())
                .unwrap();
        (session, surface)
    }

    #[tokio::test]
    async fn test_load_emits_tree_loaded() {
        let (session, _surface) = session();
        let mut events = session.subscribe();
        let nodes = session.load(&mapping()).await;
        assert_eq!(nodes, 4);
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::TreeLoaded {
                session: session.id(),
                nodes: 4
            }
        );
    }

    #[tokio::test]
    async fn test_plan_reveals_hidden_reply_in_one_step() {
        let (session, _surface) = session();
        session.load(&mapping()).await;
        let hidden = session.refresh_visibility().await.unwrap();
        assert_eq!(hidden, 2);

        let plan = session.plan(&NodeId::from("reply")).await;
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].node_id.as_str(), "u1");
    }

    #[tokio::test]
    async fn test_navigate_reports_progress_to_observers() {
        let (session, surface) = session();
        session.load(&mapping()).await;
        let mut events = session.subscribe();

        let outcome = session.navigate_to(&NodeId::from("reply")).await.unwrap();
        assert_eq!(outcome.attempts, 1);
        assert_eq!(surface.executed().await.len(), 1);

        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::NavigationStarted { .. }
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::NavigationSucceeded { attempts: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_failed_navigation_is_reported() {
        let (session, _surface) = session();
        session.load(&mapping()).await;
        let mut events = session.subscribe();

        let err = session.navigate_to(&NodeId::from("ghost")).await.unwrap_err();
        assert!(matches!(err, TreeError::UnknownNode(_)));
        let _started = events.recv().await.unwrap();
        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::NavigationFailed { .. }
        ));
    }

    #[tokio::test]
    async fn test_favorites_roundtrip() {
        let (session, _surface) = session();
        session.load(&mapping()).await;
        let mut events = session.subscribe();

        assert!(session.add_favorite(&NodeId::from("u2")).await.unwrap());
        assert!(!session.add_favorite(&NodeId::from("u2")).await.unwrap());
        assert!(session.add_favorite(&NodeId::from("ghost")).await.is_err());
        assert_eq!(session.favorites().await, vec![NodeId::from("u2")]);

        assert!(session.remove_favorite(&NodeId::from("u2")).await);
        assert!(!session.remove_favorite(&NodeId::from("u2")).await);

        assert!(matches!(events.recv().await.unwrap(), SessionEvent::FavoriteAdded { .. }));
        assert!(matches!(events.recv().await.unwrap(), SessionEvent::FavoriteRemoved { .. }));
    }

    #[tokio::test]
    async fn test_reload_drops_stale_favorites() {
        let (session, _surface) = session();
        session.load(&mapping()).await;
        session.add_favorite(&NodeId::from("reply")).await.unwrap();

        let mut trimmed = mapping();
        trimmed.remove("reply");
        if let Some(u2) = trimmed.get_mut("u2") {
            u2.child_ids.clear();
        }
        session.load(&trimmed).await;
        assert!(session.favorites().await.is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let surface = Arc::new(SimulatedBranchSurface::from_tree(&NormalizedTree::default()));
        let mut config = BranchviewConfig::default();
        config.navigation.max_attempts = 0;
        assert!(ConversationSession::new(config, surface.clone(), surface).is_err());
    }
}
