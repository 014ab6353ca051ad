//! Display-side tree produced by normalization.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::tree::core::errors::{TreeError, TreeResult};
use crate::tree::core::ids::NodeId;
use crate::tree::core::raw::AuthorRole;

/// Live on-page visibility of a node, as reported by a visibility oracle.
///
/// Oracles historically answer "is this node missing from the page", so a
/// bare `true` meant hidden. This type keeps that polarity out of the API.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Not part of the currently rendered branch.
    #[default]
    Hidden,
    /// Rendered on the active branch.
    Visible,
}

impl Visibility {
    /// Convert from a "missing from the page" flag.
    #[must_use]
    pub const fn from_missing(missing: bool) -> Self {
        if missing { Self::Hidden } else { Self::Visible }
    }

    /// Whether this is `Hidden`.
    #[must_use]
    pub const fn is_hidden(self) -> bool {
        matches!(self, Self::Hidden)
    }
}

/// Coarse classification of message content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Plain text.
    Text,
    /// Text mixed with attachments.
    Multimodal,
    /// Code or execution output.
    Code,
    /// Structurally present note that is never rendered.
    ContextNote,
    /// Anything else.
    Other,
}

impl ContentKind {
    /// Classify a content type string.
    #[must_use]
    pub fn classify(content_type: &str, context_note: bool) -> Self {
        if context_note {
            return Self::ContextNote;
        }
        match content_type {
            "text" => Self::Text,
            "multimodal_text" => Self::Multimodal,
            "code" | "execution_output" => Self::Code,
            _ => Self::Other,
        }
    }
}

/// A renderable node of the pruned tree.
///
/// Only `id`, `child_ids` and `hidden` are required on input; planning
/// never reads the display fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplayNode {
    /// Node id (same as the raw node it came from).
    pub id: NodeId,
    /// Display parent, absent for the display root.
    pub parent_id: Option<NodeId>,
    /// Display children in sibling order.
    pub child_ids: Vec<NodeId>,
    /// Short text shown for the node.
    #[serde(default)]
    pub label: String,
    /// Author role, absent for placeholders and message-less roots.
    #[serde(default)]
    pub role: Option<AuthorRole>,
    /// Creation time in seconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: Option<f64>,
    /// Raw content type.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Content classification.
    #[serde(default)]
    pub kind: Option<ContentKind>,
    /// Model that produced the message.
    #[serde(default)]
    pub model_slug: Option<String>,
    /// Live visibility, `"hidden": true|false` on the wire.
    #[serde(rename = "hidden", with = "hidden_flag")]
    pub visibility: Visibility,
    /// Present in the tree but never rendered.
    #[serde(default)]
    pub visually_hidden: bool,
    /// Placeholder for a message that could not be read.
    #[serde(default)]
    pub degraded: bool,
}

impl DisplayNode {
    /// Whether the node is currently hidden.
    #[must_use]
    pub const fn is_hidden(&self) -> bool {
        self.visibility.is_hidden()
    }

    /// Creation time as a UTC datetime.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let seconds = self.timestamp?;
        if !seconds.is_finite() {
            return None;
        }
        #[allow(clippy::cast_possible_truncation)]
        let millis = (seconds * 1000.0).round() as i64;
        Utc.timestamp_millis_opt(millis).single()
    }
}

/// A parent to child link of the pruned tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Parent id.
    pub from: NodeId,
    /// Child id.
    pub to: NodeId,
}

/// Output of one normalization pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTree {
    /// Display root, absent for an empty mapping.
    pub root: Option<NodeId>,
    /// Display nodes in pre-order.
    pub nodes: Vec<DisplayNode>,
    /// Parent to child links, grouped by parent in child order.
    pub edges: Vec<Edge>,
}

impl NormalizedTree {
    /// Whether the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&DisplayNode> {
        self.nodes.iter().find(|n| n.id.as_str() == id)
    }

    /// Display parent of a node.
    #[must_use]
    pub fn parent_of(&self, id: &str) -> Option<&DisplayNode> {
        let parent_id = self.node(id)?.parent_id.as_ref()?;
        self.node(parent_id.as_str())
    }

    /// Display children of a node, in sibling order.
    #[must_use]
    pub fn children_of(&self, id: &str) -> Vec<&DisplayNode> {
        self.node(id)
            .map(|n| {
                n.child_ids
                    .iter()
                    .filter_map(|c| self.node(c.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All node ids in pre-order.
    #[must_use]
    pub fn ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id.clone()).collect()
    }

    /// Ids of nodes currently hidden.
    #[must_use]
    pub fn hidden_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.is_hidden())
            .map(|n| n.id.clone())
            .collect()
    }

    /// Apply a visibility report aligned positionally with `ids`.
    ///
    /// Nothing is mutated unless the report is aligned and every id is known.
    ///
    /// # Errors
    /// Returns `Visibility` on a length mismatch and `UnknownNode` for ids
    /// missing from the tree.
    pub fn apply_visibility(&mut self, ids: &[NodeId], report: &[Visibility]) -> TreeResult<()> {
        if ids.len() != report.len() {
            return Err(TreeError::Visibility(format!(
                "report has {} entries for {} ids",
                report.len(),
                ids.len()
            )));
        }

        let index: HashMap<&str, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();

        let mut updates = Vec::with_capacity(ids.len());
        for (id, visibility) in ids.iter().zip(report) {
            let position = index
                .get(id.as_str())
                .copied()
                .ok_or_else(|| TreeError::UnknownNode(id.clone()))?;
            updates.push((position, *visibility));
        }

        for (position, visibility) in updates {
            self.nodes[position].visibility = visibility;
        }
        Ok(())
    }
}

mod hidden_flag {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Visibility;

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(value: &Visibility, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(value.is_hidden())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Visibility, D::Error> {
        Ok(Visibility::from_missing(bool::deserialize(deserializer)?))
    }
}
