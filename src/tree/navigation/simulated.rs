//! In-memory rendering surface.
//!
//! Tracks which child is active under every node, the way a chat page shows
//! one branch per level with previous/next controls. It answers visibility
//! checks and executes steps, so a full navigation can run without a page.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::debug;

use crate::tree::core::display::{NormalizedTree, Visibility};
use crate::tree::core::errors::{TreeError, TreeResult};
use crate::tree::core::ids::NodeId;
use crate::tree::navigation::actuator::BranchActuator;
use crate::tree::navigation::oracle::{NavFuture, VisibilityOracle};
use crate::tree::navigation::planner::{Direction, Step};

/// Simulated branch surface.
pub struct SimulatedBranchSurface {
    children: HashMap<NodeId, Vec<NodeId>>,
    parents: HashMap<NodeId, NodeId>,
    active: Mutex<HashMap<NodeId, usize>>,
    log: Mutex<Vec<Step>>,
    pending_failures: AtomicU32,
    settle_delay: Option<Duration>,
}

impl SimulatedBranchSurface {
    /// Build a surface for a tree; every level starts on its first child.
    #[must_use]
    pub fn from_tree(tree: &NormalizedTree) -> Self {
        let mut children = HashMap::new();
        let mut parents = HashMap::new();
        let mut active = HashMap::new();

        for node in &tree.nodes {
            if !node.child_ids.is_empty() {
                active.insert(node.id.clone(), 0);
            }
            for child in &node.child_ids {
                parents.insert(child.clone(), node.id.clone());
            }
            children.insert(node.id.clone(), node.child_ids.clone());
        }

        Self {
            children,
            parents,
            active: Mutex::new(active),
            log: Mutex::new(Vec::new()),
            pending_failures: AtomicU32::new(0),
            settle_delay: None,
        }
    }

    /// Fail the next `count` step executions.
    #[must_use]
    pub fn with_failures(self, count: u32) -> Self {
        self.pending_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Delay every step execution.
    #[must_use]
    pub const fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = Some(delay);
        self
    }

    /// Make the branch ending at `leaf` the rendered one.
    pub async fn show(&self, leaf: &NodeId) {
        let mut active = self.active.lock().await;
        let mut cursor = leaf.clone();
        while let Some(parent) = self.parents.get(&cursor) {
            if let Some(position) = self.position(parent, &cursor) {
                active.insert(parent.clone(), position);
            }
            cursor = parent.clone();
        }
    }

    /// Steps executed so far, in order.
    pub async fn executed(&self) -> Vec<Step> {
        self.log.lock().await.clone()
    }

    fn position(&self, parent: &NodeId, child: &NodeId) -> Option<usize> {
        self.children.get(parent)?.iter().position(|c| c == child)
    }

    fn visibility(&self, active: &HashMap<NodeId, usize>, id: &NodeId) -> Visibility {
        if !self.children.contains_key(id) {
            return Visibility::Hidden;
        }
        let mut cursor = id;
        while let Some(parent) = self.parents.get(cursor) {
            let rendered = active.get(parent).copied();
            if rendered.is_none() || rendered != self.position(parent, cursor) {
                return Visibility::Hidden;
            }
            cursor = parent;
        }
        Visibility::Visible
    }

    fn switch_failed(step: &Step, reason: &str) -> TreeError {
        TreeError::Actuator {
            node: step.node_id.clone(),
            reason: reason.to_string(),
        }
    }
}

impl VisibilityOracle for SimulatedBranchSurface {
    fn check_visibility(&self, ids: Vec<NodeId>) -> NavFuture<'_, TreeResult<Vec<Visibility>>> {
        Box::pin(async move {
            let active = self.active.lock().await;
            Ok(ids.iter().map(|id| self.visibility(&active, id)).collect())
        })
    }
}

impl BranchActuator for SimulatedBranchSurface {
    fn execute_step(&self, step: Step) -> NavFuture<'_, TreeResult<()>> {
        Box::pin(async move {
            if let Some(delay) = self.settle_delay {
                tokio::time::sleep(delay).await;
            }

            let failing = self
                .pending_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(Self::switch_failed(&step, "control did not respond"));
            }

            let mut active = self.active.lock().await;
            if self.visibility(&active, &step.node_id).is_hidden() {
                return Err(Self::switch_failed(&step, "control not found on page"));
            }
            let parent = self
                .parents
                .get(&step.node_id)
                .ok_or_else(|| Self::switch_failed(&step, "node has no siblings"))?;
            let siblings = self.children.get(parent).map_or(0, Vec::len);
            let position = self
                .position(parent, &step.node_id)
                .ok_or_else(|| Self::switch_failed(&step, "node not among its siblings"))?;

            let next = match step.closer_direction {
                Direction::Right if position + 1 < siblings => position + 1,
                Direction::Left if position > 0 => position - 1,
                _ => return Err(Self::switch_failed(&step, "no sibling in that direction")),
            };
            active.insert(parent.clone(), next);
            drop(active);

            debug!(node = %step.node_id, direction = %step.closer_direction, next, "Switched branch");
            self.log.lock().await.push(step);
            Ok(())
        })
    }
}
