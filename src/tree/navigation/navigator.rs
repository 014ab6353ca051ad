//! Plan-and-execute navigation with bounded retries.
//!
//! A navigation observes the surface, plans, executes each step under a
//! settle timeout and re-observes after every step. When the target is
//! still hidden the whole cycle starts over from a fresh observation. A
//! newer request supersedes the one in flight at its next step boundary.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::tree::core::config::NavigationConfig;
use crate::tree::core::display::NormalizedTree;
use crate::tree::core::errors::{TreeError, TreeResult};
use crate::tree::core::ids::NodeId;
use crate::tree::navigation::actuator::BranchActuator;
use crate::tree::navigation::oracle::{VisibilityOracle, observe};
use crate::tree::navigation::planner::{Step, plan_steps};

/// Result of a successful navigation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NavigationOutcome {
    /// Node that is now visible.
    pub target: NodeId,
    /// Plan-and-execute cycles it took; zero if it was already visible.
    pub attempts: u32,
    /// Steps the actuator completed across all cycles.
    pub steps_executed: usize,
}

/// Executes navigation plans against a rendering surface.
pub struct Navigator {
    config: NavigationConfig,
    generation: AtomicU64,
    in_flight: Mutex<()>,
}

impl Navigator {
    /// Create a navigator.
    #[must_use]
    pub fn new(config: NavigationConfig) -> Self {
        Self {
            config,
            generation: AtomicU64::new(0),
            in_flight: Mutex::new(()),
        }
    }

    /// Navigation settings.
    #[must_use]
    pub const fn config(&self) -> &NavigationConfig {
        &self.config
    }

    /// Re-check every node of `tree` and store the result.
    ///
    /// # Errors
    /// Returns an oracle error; the tree is left untouched in that case.
    pub async fn refresh(
        &self,
        tree: &RwLock<NormalizedTree>,
        oracle: &dyn VisibilityOracle,
    ) -> TreeResult<()> {
        let ids = tree.read().await.ids();
        let report = observe(oracle, &ids, self.config.visibility_batch_size).await?;
        tree.write().await.apply_visibility(&ids, &report)
    }

    /// Make `target` visible.
    ///
    /// # Errors
    /// - `UnknownNode` if the target is not in the tree.
    /// - `Cancelled` if a newer navigation was requested meanwhile.
    /// - `Visibility` if the oracle fails.
    /// - `NavigationFailed` once all attempts are used up.
    pub async fn navigate(
        &self,
        tree: &RwLock<NormalizedTree>,
        oracle: &dyn VisibilityOracle,
        actuator: &dyn BranchActuator,
        target: &NodeId,
    ) -> TreeResult<NavigationOutcome> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = self.in_flight.lock().await;

        if tree.read().await.node(target.as_str()).is_none() {
            return Err(TreeError::UnknownNode(target.clone()));
        }

        let mut steps_executed = 0;
        for attempt in 1..=self.config.max_attempts {
            self.ensure_current(ticket, target)?;
            self.refresh(tree, oracle).await?;

            let plan = {
                let snapshot = tree.read().await;
                if !is_hidden(&snapshot, target) {
                    return Ok(self.success(target, attempt - 1, steps_executed));
                }
                plan_steps(&snapshot.nodes, target.as_str())
            };

            if plan.is_empty() {
                warn!(%target, attempt, "Target hidden but no steps could be planned");
                continue;
            }

            debug!(%target, attempt, steps = plan.len(), "Executing navigation plan");
            match self
                .execute_plan(ticket, tree, oracle, actuator, target, &plan, &mut steps_executed)
                .await
            {
                Ok(()) => {}
                Err(err) if err.is_retryable() => {
                    warn!(%target, attempt, %err, "Navigation step failed, replanning");
                }
                Err(err) => return Err(err),
            }
        }

        self.ensure_current(ticket, target)?;
        self.refresh(tree, oracle).await?;
        if !is_hidden(&*tree.read().await, target) {
            return Ok(self.success(target, self.config.max_attempts, steps_executed));
        }

        warn!(%target, attempts = self.config.max_attempts, "Navigation failed");
        Err(TreeError::NavigationFailed {
            target: target.clone(),
            attempts: self.config.max_attempts,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute_plan(
        &self,
        ticket: u64,
        tree: &RwLock<NormalizedTree>,
        oracle: &dyn VisibilityOracle,
        actuator: &dyn BranchActuator,
        target: &NodeId,
        plan: &[Step],
        steps_executed: &mut usize,
    ) -> TreeResult<()> {
        for step in plan {
            self.ensure_current(ticket, target)?;
            match tokio::time::timeout(self.config.settle_timeout, actuator.execute_step(step.clone()))
                .await
            {
                Err(_) => return Err(TreeError::SettleTimeout(step.node_id.clone())),
                Ok(Err(err @ (TreeError::Actuator { .. } | TreeError::SettleTimeout(_)))) => {
                    return Err(err);
                }
                Ok(Err(err)) => {
                    return Err(TreeError::Actuator {
                        node: step.node_id.clone(),
                        reason: err.to_string(),
                    });
                }
                Ok(Ok(())) => *steps_executed += 1,
            }
            self.refresh(tree, oracle).await?;
        }
        Ok(())
    }

    fn ensure_current(&self, ticket: u64, target: &NodeId) -> TreeResult<()> {
        if self.generation.load(Ordering::SeqCst) == ticket {
            Ok(())
        } else {
            info!(%target, "Navigation superseded");
            Err(TreeError::Cancelled(target.clone()))
        }
    }

    fn success(&self, target: &NodeId, attempts: u32, steps_executed: usize) -> NavigationOutcome {
        info!(%target, attempts, steps_executed, max = self.config.max_attempts, "Navigation succeeded");
        NavigationOutcome {
            target: target.clone(),
            attempts,
            steps_executed,
        }
    }
}

fn is_hidden(tree: &NormalizedTree, target: &NodeId) -> bool {
    tree.node(target.as_str()).is_none_or(|n| n.is_hidden())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use super::*;
    use crate::tree::core::display::Visibility;
    use crate::tree::navigation::oracle::NavFuture;
    use crate::tree::core::raw::{AuthorRole, ConversationNode, Message, RawMapping};
    use crate::tree::navigation::simulated::SimulatedBranchSurface;
    use crate::tree::normalize::Normalizer;

    /// root -> sys -> [u1, u2, u3]; each ui -> ai.
    fn tree() -> NormalizedTree {
        let mut mapping = RawMapping::new();
        let mut add = |node: ConversationNode| {
            mapping.insert(node.id.clone(), node);
        };
        add(ConversationNode::new("root", None).with_children(["sys"]));
        add(ConversationNode::new("sys", Some(NodeId::from("root")))
            .with_message(Message::text(AuthorRole::System, ""))
            .with_children(["u1", "u2", "u3"]));
        for i in 1..=3 {
            add(ConversationNode::new(format!("u{i}"), Some(NodeId::from("sys")))
                .with_message(Message::text(AuthorRole::User, format!("take {i}")))
                .with_children([format!("a{i}")]));
            add(ConversationNode::new(format!("a{i}"), Some(NodeId::from(format!("u{i}"))))
                .with_message(Message::text(AuthorRole::Assistant, format!("reply {i}"))));
        }
        Normalizer::default().normalize(&mapping)
    }

    fn config() -> NavigationConfig {
        NavigationConfig::default().with_settle_timeout(Duration::from_millis(500))
    }

    #[tokio::test]
    async fn test_navigates_to_hidden_branch() {
        let snapshot = tree();
        let surface = SimulatedBranchSurface::from_tree(&snapshot);
        let tree = RwLock::new(snapshot);
        let navigator = Navigator::new(config());

        let outcome = navigator
            .navigate(&tree, &surface, &surface, &NodeId::from("a3"))
            .await
            .unwrap();
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.steps_executed, 2);
        assert!(!tree.read().await.node("a3").unwrap().is_hidden());
        assert!(tree.read().await.node("a1").unwrap().is_hidden());
    }

    #[tokio::test]
    async fn test_visible_target_needs_no_attempt() {
        let snapshot = tree();
        let surface = SimulatedBranchSurface::from_tree(&snapshot);
        let tree = RwLock::new(snapshot);
        let navigator = Navigator::new(config());

        let outcome = navigator
            .navigate(&tree, &surface, &surface, &NodeId::from("a1"))
            .await
            .unwrap();
        assert_eq!(outcome.attempts, 0);
        assert!(surface.executed().await.is_empty());
    }

    #[tokio::test]
    async fn test_retries_after_actuator_failure() {
        let snapshot = tree();
        let surface = SimulatedBranchSurface::from_tree(&snapshot).with_failures(1);
        let tree = RwLock::new(snapshot);
        let navigator = Navigator::new(config());

        let outcome = navigator
            .navigate(&tree, &surface, &surface, &NodeId::from("u2"))
            .await
            .unwrap();
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.steps_executed, 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let snapshot = tree();
        let surface = SimulatedBranchSurface::from_tree(&snapshot).with_failures(100);
        let tree = RwLock::new(snapshot);
        let navigator = Navigator::new(config().with_max_attempts(3));

        let err = navigator
            .navigate(&tree, &surface, &surface, &NodeId::from("a2"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TreeError::NavigationFailed { attempts: 3, .. }
        ));
    }

    #[tokio::test]
    async fn test_slow_switch_times_out_and_fails() {
        let snapshot = tree();
        let surface =
            SimulatedBranchSurface::from_tree(&snapshot).with_settle_delay(Duration::from_millis(200));
        let tree = RwLock::new(snapshot);
        let navigator = Navigator::new(
            NavigationConfig::default()
                .with_settle_timeout(Duration::from_millis(10))
                .with_max_attempts(2),
        );

        let err = navigator
            .navigate(&tree, &surface, &surface, &NodeId::from("u2"))
            .await
            .unwrap_err();
        assert!(matches!(err, TreeError::NavigationFailed { .. }));
    }

    #[tokio::test]
    async fn test_unknown_target_is_rejected() {
        let snapshot = tree();
        let surface = SimulatedBranchSurface::from_tree(&snapshot);
        let tree = RwLock::new(snapshot);
        let navigator = Navigator::new(config());

        let err = navigator
            .navigate(&tree, &surface, &surface, &NodeId::from("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, TreeError::UnknownNode(_)));
    }

    #[tokio::test]
    async fn test_newer_request_supersedes_in_flight_one() {
        let snapshot = tree();
        let surface =
            SimulatedBranchSurface::from_tree(&snapshot).with_settle_delay(Duration::from_millis(30));
        let tree = RwLock::new(snapshot);
        let navigator = Navigator::new(config());

        let a3 = NodeId::from("a3");
        let u2 = NodeId::from("u2");
        let (first, second) = tokio::join!(
            navigator.navigate(&tree, &surface, &surface, &a3),
            navigator.navigate(&tree, &surface, &surface, &u2),
        );
        assert!(matches!(first, Err(TreeError::Cancelled(_))));
        assert!(second.is_ok());
        assert!(!tree.read().await.node("u2").unwrap().is_hidden());
    }

    /// Delegates to a surface but fails on the `fail_on`-th call.
    struct FlakyOracle {
        surface: Arc<SimulatedBranchSurface>,
        calls: AtomicUsize,
        fail_on: usize,
    }

    impl VisibilityOracle for FlakyOracle {
        fn check_visibility(&self, ids: Vec<NodeId>) -> NavFuture<'_, TreeResult<Vec<Visibility>>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Box::pin(async move {
                if call == self.fail_on {
                    return Err(TreeError::Visibility("page went away".to_string()));
                }
                self.surface.check_visibility(ids).await
            })
        }
    }

    #[tokio::test]
    async fn test_oracle_failure_aborts_without_touching_state() {
        let snapshot = tree();
        let surface = Arc::new(SimulatedBranchSurface::from_tree(&snapshot));
        let tree = RwLock::new(snapshot);
        let navigator = Navigator::new(config());

        navigator.refresh(&tree, surface.as_ref()).await.unwrap();
        let before = tree.read().await.clone();

        let oracle = FlakyOracle {
            surface: surface.clone(),
            calls: AtomicUsize::new(0),
            fail_on: 2,
        };
        let err = navigator
            .navigate(&tree, &oracle, surface.as_ref(), &NodeId::from("a3"))
            .await
            .unwrap_err();

        assert!(matches!(err, TreeError::Visibility(_)));
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 2);
        assert_eq!(*tree.read().await, before);
        assert_eq!(surface.executed().await.len(), 1);
    }
}
