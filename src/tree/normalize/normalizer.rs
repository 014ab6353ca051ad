//! Raw mapping to pruned display tree.
//!
//! The walk borrows the raw mapping and builds a fresh output; nothing in
//! the input is rewritten. Traversal is iterative so very long conversations
//! cannot exhaust the stack.

use std::cmp::Ordering;
use std::collections::{HashSet, VecDeque};

use tracing::{debug, warn};

use crate::tree::core::config::NormalizeConfig;
use crate::tree::core::display::{ContentKind, DisplayNode, Edge, NormalizedTree, Visibility};
use crate::tree::core::errors::{TreeError, TreeResult};
use crate::tree::core::ids::NodeId;
use crate::tree::core::raw::{ConversationNode, RawMapping};
use crate::tree::normalize::validity::{self, NodeClass};

/// Locate the unique raw root: the only node without a (known) parent.
///
/// # Errors
/// Returns `MalformedTree` when zero or several candidates exist.
pub fn find_root(mapping: &RawMapping) -> TreeResult<NodeId> {
    let mut candidates = root_candidates(mapping);
    if candidates.len() == 1 {
        return Ok(candidates.remove(0));
    }
    Err(TreeError::MalformedTree {
        candidates: candidates.len(),
    })
}

/// Parentless or orphaned nodes, oldest first.
fn root_candidates(mapping: &RawMapping) -> Vec<NodeId> {
    let mut candidates: Vec<&ConversationNode> = mapping
        .values()
        .filter(|n| {
            n.parent_id
                .as_ref()
                .is_none_or(|parent| !mapping.contains_key(parent))
        })
        .collect();

    candidates.sort_by(|a, b| compare_create_time(a, b).then_with(|| a.id.cmp(&b.id)));
    candidates.into_iter().map(|n| n.id.clone()).collect()
}

fn compare_create_time(a: &ConversationNode, b: &ConversationNode) -> Ordering {
    let time = |n: &ConversationNode| {
        n.message
            .as_ref()
            .and_then(|m| m.create_time)
            .unwrap_or(f64::NEG_INFINITY)
    };
    time(a).total_cmp(&time(b))
}

/// Builds display trees from raw mappings.
#[derive(Clone, Debug, Default)]
pub struct Normalizer {
    config: NormalizeConfig,
}

impl Normalizer {
    /// Create a normalizer with the given settings.
    #[must_use]
    pub const fn new(config: NormalizeConfig) -> Self {
        Self { config }
    }

    /// Normalizer settings.
    #[must_use]
    pub const fn config(&self) -> &NormalizeConfig {
        &self.config
    }

    /// Normalize a raw mapping into a pruned display tree.
    ///
    /// Never fails: a mapping without a unique root is hung under a
    /// synthetic root, and unreadable messages become placeholders.
    #[must_use]
    pub fn normalize(&self, mapping: &RawMapping) -> NormalizedTree {
        if mapping.is_empty() {
            debug!("Empty mapping, nothing to normalize");
            return NormalizedTree::default();
        }

        let walk = match find_root(mapping) {
            Ok(root) => Walk::new(mapping, root, Vec::new()),
            Err(err) => {
                let orphans = root_candidates(mapping);
                warn!(%err, orphans = orphans.len(), "Falling back to a virtual root");
                Walk::new(mapping, NodeId::virtual_root(), orphans)
            }
        };

        let tree = walk.build(&self.config);
        debug!(
            nodes = tree.nodes.len(),
            edges = tree.edges.len(),
            root = ?tree.root,
            "Normalized conversation tree"
        );
        tree
    }
}

/// One normalization pass over a borrowed mapping.
struct Walk<'a> {
    mapping: &'a RawMapping,
    root: NodeId,
    virtual_children: Vec<NodeId>,
}

impl<'a> Walk<'a> {
    fn new(mapping: &'a RawMapping, root: NodeId, virtual_children: Vec<NodeId>) -> Self {
        Self {
            mapping,
            root,
            virtual_children,
        }
    }

    fn raw_children(&self, id: &NodeId) -> &[NodeId] {
        if id.is_virtual_root() && !self.mapping.contains_key(id) {
            return &self.virtual_children;
        }
        self.mapping
            .get(id)
            .map_or(&[][..], |n| n.child_ids.as_slice())
    }

    /// Parent of the first user turn found breadth-first; that parent
    /// becomes the display root so sibling variants above the first turn
    /// stay reachable.
    ///
    /// A synthetic root is kept as is with all of its orphan branches.
    fn effective_root(&self) -> (NodeId, bool) {
        if self.root.is_virtual_root() && !self.mapping.contains_key(&self.root) {
            return (self.root.clone(), true);
        }
        let mut queue = VecDeque::from([(self.root.clone(), None::<NodeId>)]);
        let mut seen = HashSet::from([self.root.clone()]);

        while let Some((id, via)) = queue.pop_front() {
            let message = self.mapping.get(&id).and_then(|n| n.message.as_ref());
            if validity::is_user_turn(message) {
                return (via.unwrap_or(id), true);
            }
            for child in self.raw_children(&id) {
                if seen.insert(child.clone()) {
                    queue.push_back((child.clone(), Some(id.clone())));
                }
            }
        }
        (self.root.clone(), false)
    }

    /// Follow first children from `start` until a materialized node.
    fn promote(&self, start: &NodeId) -> Option<NodeId> {
        let mut current = start.clone();
        for _ in 0..=self.mapping.len() {
            let Some(node) = self.mapping.get(&current) else {
                warn!(child = %current, "Skipping dangling child reference");
                return None;
            };
            if validity::classify(node).is_materialized() {
                return Some(current);
            }
            current = node.child_ids.first()?.clone();
        }
        warn!(start = %start, "Promotion chain loops, dropping branch");
        None
    }

    fn build(&self, config: &NormalizeConfig) -> NormalizedTree {
        let (root, has_turns) = self.effective_root();
        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        let mut claimed: HashSet<NodeId> = HashSet::from([root.clone()]);
        let mut stack: Vec<(NodeId, Option<NodeId>)> = vec![(root.clone(), None)];

        while let Some((id, parent_id)) = stack.pop() {
            let is_root = parent_id.is_none();
            let mut children = Vec::new();
            if has_turns {
                for raw_child in self.raw_children(&id) {
                    let Some(promoted) = self.promote(raw_child) else {
                        continue;
                    };
                    if claimed.insert(promoted.clone()) {
                        children.push(promoted);
                    } else {
                        warn!(node = %promoted, parent = %id, "Node reached twice, keeping first position");
                    }
                }
            }

            for child in &children {
                edges.push(Edge {
                    from: id.clone(),
                    to: child.clone(),
                });
            }
            for child in children.iter().rev() {
                stack.push((child.clone(), Some(id.clone())));
            }

            nodes.push(self.display_node(id, parent_id, children, is_root, config));
        }

        NormalizedTree {
            root: Some(root),
            nodes,
            edges,
        }
    }

    fn display_node(
        &self,
        id: NodeId,
        parent_id: Option<NodeId>,
        child_ids: Vec<NodeId>,
        is_root: bool,
        config: &NormalizeConfig,
    ) -> DisplayNode {
        let mut display = DisplayNode {
            id,
            parent_id,
            child_ids,
            label: config.root_label.clone(),
            role: None,
            timestamp: None,
            content_type: None,
            kind: None,
            model_slug: None,
            visibility: Visibility::Hidden,
            visually_hidden: false,
            degraded: false,
        };

        let Some(node) = self.mapping.get(&display.id) else {
            return display;
        };
        let class = validity::classify(node);
        let Some(message) = node.message.as_ref() else {
            return display;
        };

        display.role = message.role().cloned();
        display.timestamp = message.create_time;
        display.model_slug = message.model_slug().map(str::to_owned);
        if let Some(content) = message.content.as_ref() {
            let context_note = config.is_context_note(&content.content_type);
            display.content_type = Some(content.content_type.clone());
            display.kind = Some(ContentKind::classify(&content.content_type, context_note));
        }
        display.visually_hidden = validity::is_visually_hidden(message, config);

        match class {
            NodeClass::Valid => display.label = validity::label_for(message, config),
            NodeClass::Degraded(reason) => {
                let node_id = &display.id;
                warn!(node = %node_id, reason, "Rendering placeholder for malformed message");
                display.label = validity::placeholder_label(reason, config);
                display.degraded = true;
            }
            NodeClass::Invalid if !is_root => {
                let node_id = &display.id;
                debug!(node = %node_id, "Invalid node materialized outside the root slot");
            }
            NodeClass::Invalid => {
                if let Some(text) = message.content.as_ref().and_then(|c| c.first_text()) {
                    display.label = text;
                }
            }
        }
        display
    }
}
