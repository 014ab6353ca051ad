//! Branch navigation planner.
//!
//! Computes the sibling switches that expose a hidden node. The walk goes
//! from the target up to the first visible ancestor, one tree level at a
//! time; the plan is emitted top-down because every switch changes which
//! descendants are rendered below it.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::tree::core::display::DisplayNode;
use crate::tree::core::ids::NodeId;

/// Which sibling control to press, relative to the sibling being addressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Previous sibling.
    Left,
    /// Next sibling.
    Right,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
        }
    }
}

/// One atomic sibling switch.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Step {
    /// Sibling whose control is pressed; it is the active one when the
    /// step runs.
    pub node_id: NodeId,
    /// Direction toward the target's ancestor at this level.
    pub closer_direction: Direction,
}

impl Step {
    fn new(node_id: &NodeId, closer_direction: Direction) -> Self {
        Self {
            node_id: node_id.clone(),
            closer_direction,
        }
    }
}

/// Plan the ordered steps that reveal `target_id`.
///
/// Returns an empty plan when the target is unknown or already visible.
/// A broken ancestor chain ends the walk early and the partial plan is
/// returned as is.
#[must_use]
pub fn plan_steps(nodes: &[DisplayNode], target_id: &str) -> Vec<Step> {
    let index: HashMap<&str, &DisplayNode> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();

    let Some(mut current) = index.get(target_id).copied() else {
        debug!(target = target_id, "Target not in tree, nothing to plan");
        return Vec::new();
    };

    // Collected bottom-up, one entry per ancestor level.
    let mut levels: Vec<Vec<Step>> = Vec::new();

    for _ in 0..nodes.len() {
        if !current.is_hidden() {
            break;
        }
        let Some(parent) = current
            .parent_id
            .as_ref()
            .and_then(|id| index.get(id.as_str()).copied())
        else {
            debug!(node = %current.id, "Ancestor chain ends, returning partial plan");
            break;
        };

        let Some(child_index) = parent.child_ids.iter().position(|c| *c == current.id) else {
            warn!(node = %current.id, parent = %parent.id, "Parent does not list node as child");
            break;
        };

        if parent.child_ids.len() > 1 {
            let active_index = parent.child_ids.iter().position(|c| {
                index.get(c.as_str()).is_some_and(|sibling| !sibling.is_hidden())
            });
            levels.push(level_steps(&parent.child_ids, active_index, child_index));
        }

        current = parent;
    }

    let plan: Vec<Step> = levels.into_iter().rev().flatten().collect();
    debug!(target = target_id, steps = plan.len(), "Planned branch navigation");
    plan
}

/// Steps for one sibling list, in execution order.
fn level_steps(siblings: &[NodeId], active_index: Option<usize>, child_index: usize) -> Vec<Step> {
    match active_index {
        // Nothing rendered at this level yet: walk from the first sibling.
        None => siblings[..child_index]
            .iter()
            .map(|id| Step::new(id, Direction::Right))
            .collect(),
        Some(active) if child_index > active => siblings[active..child_index]
            .iter()
            .map(|id| Step::new(id, Direction::Right))
            .collect(),
        Some(active) => siblings[child_index + 1..=active]
            .iter()
            .rev()
            .map(|id| Step::new(id, Direction::Left))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::core::display::Visibility;

    fn node(id: &str, parent: Option<&str>, children: &[&str], hidden: bool) -> DisplayNode {
        DisplayNode {
            id: NodeId::from(id),
            parent_id: parent.map(NodeId::from),
            child_ids: children.iter().map(|c| NodeId::from(*c)).collect(),
            label: id.to_string(),
            role: None,
            timestamp: None,
            content_type: None,
            kind: None,
            model_slug: None,
            visibility: Visibility::from_missing(hidden),
            visually_hidden: false,
            degraded: false,
        }
    }

    fn ids(plan: &[Step]) -> Vec<&str> {
        plan.iter().map(|s| s.node_id.as_str()).collect()
    }

    #[test]
    fn test_unknown_target_yields_empty_plan() {
        let nodes = vec![node("r", None, &[], false)];
        assert!(plan_steps(&nodes, "nope").is_empty());
    }

    #[test]
    fn test_visible_target_yields_empty_plan() {
        let nodes = vec![
            node("r", None, &["a", "b"], false),
            node("a", Some("r"), &[], false),
            node("b", Some("r"), &[], true),
        ];
        assert!(plan_steps(&nodes, "a").is_empty());
    }

    #[test]
    fn test_moves_right_from_active_sibling() {
        let nodes = vec![
            node("p", None, &["A", "B", "C", "D"], false),
            node("A", Some("p"), &[], false),
            node("B", Some("p"), &[], true),
            node("C", Some("p"), &[], true),
            node("D", Some("p"), &[], true),
        ];
        let plan = plan_steps(&nodes, "D");
        assert_eq!(ids(&plan), vec!["A", "B", "C"]);
        assert!(plan.iter().all(|s| s.closer_direction == Direction::Right));
    }

    #[test]
    fn test_moves_left_from_active_sibling() {
        let nodes = vec![
            node("p", None, &["A", "B", "C", "D"], false),
            node("A", Some("p"), &[], true),
            node("B", Some("p"), &[], true),
            node("C", Some("p"), &[], true),
            node("D", Some("p"), &[], false),
        ];
        let plan = plan_steps(&nodes, "B");
        assert_eq!(ids(&plan), vec!["D", "C"]);
        assert!(plan.iter().all(|s| s.closer_direction == Direction::Left));
    }

    #[test]
    fn test_no_active_sibling_walks_from_first() {
        let nodes = vec![
            node("p", None, &["A", "B", "C"], true),
            node("A", Some("p"), &[], true),
            node("B", Some("p"), &[], true),
            node("C", Some("p"), &[], true),
        ];
        let plan = plan_steps(&nodes, "C");
        assert_eq!(ids(&plan), vec!["A", "B"]);
        assert!(plan.iter().all(|s| s.closer_direction == Direction::Right));
    }

    #[test]
    fn test_single_child_levels_contribute_nothing() {
        // r -> [x, y]; y -> m (only child) -> [t1, t2]
        let nodes = vec![
            node("r", None, &["x", "y"], false),
            node("x", Some("r"), &[], false),
            node("y", Some("r"), &["m"], true),
            node("m", Some("y"), &["t1", "t2"], true),
            node("t1", Some("m"), &[], true),
            node("t2", Some("m"), &[], true),
        ];
        let plan = plan_steps(&nodes, "t2");
        assert_eq!(ids(&plan), vec!["x", "t1"]);
        assert!(!ids(&plan).contains(&"m"));
        assert!(!ids(&plan).contains(&"y"));
    }

    #[test]
    fn test_root_levels_come_first() {
        // r -> [a, b]; b -> [c, d]; target d. Upper level must precede lower.
        let nodes = vec![
            node("r", None, &["a", "b"], false),
            node("a", Some("r"), &[], false),
            node("b", Some("r"), &["c", "d"], true),
            node("c", Some("b"), &[], true),
            node("d", Some("b"), &[], true),
        ];
        let plan = plan_steps(&nodes, "d");
        assert_eq!(
            plan,
            vec![
                Step::new(&NodeId::from("a"), Direction::Right),
                Step::new(&NodeId::from("c"), Direction::Right),
            ]
        );
    }

    #[test]
    fn test_broken_chain_returns_partial_plan() {
        // "gone" is referenced as parent but absent.
        let nodes = vec![
            node("m", Some("gone"), &["t1", "t2"], true),
            node("t1", Some("m"), &[], false),
            node("t2", Some("m"), &[], true),
        ];
        let plan = plan_steps(&nodes, "t2");
        assert_eq!(ids(&plan), vec!["t1"]);
    }

    #[test]
    fn test_hidden_root_stops_cleanly() {
        let nodes = vec![
            node("r", None, &["a", "b"], true),
            node("a", Some("r"), &[], false),
            node("b", Some("r"), &[], true),
        ];
        let plan = plan_steps(&nodes, "b");
        assert_eq!(ids(&plan), vec!["a"]);
    }

    #[test]
    fn test_parent_cycle_terminates() {
        let nodes = vec![
            node("a", Some("b"), &["b", "x"], true),
            node("b", Some("a"), &["a", "y"], true),
        ];
        let plan = plan_steps(&nodes, "a");
        assert!(plan.len() <= 4);
    }
}
