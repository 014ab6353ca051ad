//! Display-eligibility predicate and label derivation.

use crate::tree::core::config::NormalizeConfig;
use crate::tree::core::raw::{AuthorRole, ConversationNode, Message, RECIPIENT_ALL};

/// How the normalizer treats a raw node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeClass {
    /// Displayable message.
    Valid,
    /// Message present but unreadable; shown as a placeholder.
    Degraded(&'static str),
    /// Structural or non-content node; its first descendant takes its place.
    Invalid,
}

impl NodeClass {
    /// Whether the node is materialized as a display node.
    #[must_use]
    pub const fn is_materialized(self) -> bool {
        !matches!(self, Self::Invalid)
    }
}

/// Classify a raw node.
#[must_use]
pub fn classify(node: &ConversationNode) -> NodeClass {
    let Some(message) = node.message.as_ref() else {
        return NodeClass::Invalid;
    };
    let Some(author) = message.author.as_ref() else {
        return NodeClass::Degraded("message has no author");
    };
    let Some(content) = message.content.as_ref() else {
        return NodeClass::Degraded("message has no content");
    };

    if author.role.is_structural() || message.recipient != RECIPIENT_ALL || !content.has_content()
    {
        return NodeClass::Invalid;
    }
    NodeClass::Valid
}

/// Whether a message is a user turn with content; used to locate the first turn.
#[must_use]
pub fn is_user_turn(message: Option<&Message>) -> bool {
    message.is_some_and(|m| {
        m.role().is_some_and(|r| *r == AuthorRole::User)
            && m.content.as_ref().is_some_and(|c| c.has_content())
    })
}

/// Label for a displayable message: its first text part, or the no-text marker.
#[must_use]
pub fn label_for(message: &Message, config: &NormalizeConfig) -> String {
    message
        .content
        .as_ref()
        .and_then(|c| c.first_text())
        .unwrap_or_else(|| config.no_text_label.clone())
}

/// Placeholder label for a degraded message.
#[must_use]
pub fn placeholder_label(reason: &str, config: &NormalizeConfig) -> String {
    format!("{} {reason}", config.error_label_prefix)
}

/// Whether a message is present but never rendered.
#[must_use]
pub fn is_visually_hidden(message: &Message, config: &NormalizeConfig) -> bool {
    message.is_flagged_hidden()
        || message
            .content
            .as_ref()
            .is_some_and(|c| config.is_context_note(&c.content_type))
}
