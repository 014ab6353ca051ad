//! Raw conversation export types.
//!
//! These mirror the JSON shape of a conversation export: a mapping keyed by
//! node id where each entry carries its parent, its ordered children and an
//! optional message. Deserialization is deliberately lenient: unknown fields
//! are ignored and `null` collections read as empty.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::tree::core::ids::NodeId;

/// Raw mapping of node id to node, ordered by id.
pub type RawMapping = BTreeMap<NodeId, ConversationNode>;

/// Recipient value that marks a message intended for display.
pub const RECIPIENT_ALL: &str = "all";

/// A full conversation export.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Conversation {
    /// Conversation title.
    #[serde(default)]
    pub title: Option<String>,
    /// Creation time in seconds since the Unix epoch.
    #[serde(default)]
    pub create_time: Option<f64>,
    /// Last update time in seconds since the Unix epoch.
    #[serde(default)]
    pub update_time: Option<f64>,
    /// Node mapping.
    #[serde(default)]
    pub mapping: RawMapping,
    /// Leaf of the branch that was active when the export was taken.
    #[serde(default)]
    pub current_node: Option<NodeId>,
}

/// One node of the raw conversation tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationNode {
    /// Node id.
    pub id: NodeId,
    /// Parent id, absent for the root.
    #[serde(default, rename = "parent")]
    pub parent_id: Option<NodeId>,
    /// Ordered child ids; order is creation/edit order.
    #[serde(default, rename = "children", deserialize_with = "nullable_vec")]
    pub child_ids: Vec<NodeId>,
    /// Message payload, absent for structural nodes.
    #[serde(default)]
    pub message: Option<Message>,
}

impl ConversationNode {
    /// Create a node without a message.
    #[must_use]
    pub fn new(id: impl Into<NodeId>, parent_id: Option<NodeId>) -> Self {
        Self {
            id: id.into(),
            parent_id,
            child_ids: Vec::new(),
            message: None,
        }
    }

    /// Attach a message.
    #[must_use]
    pub fn with_message(mut self, message: Message) -> Self {
        self.message = Some(message);
        self
    }

    /// Set the ordered child ids.
    #[must_use]
    pub fn with_children<I, T>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<NodeId>,
    {
        self.child_ids = children.into_iter().map(Into::into).collect();
        self
    }
}

/// Author role of a message.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuthorRole {
    /// System prompt or structural message.
    System,
    /// Human turn.
    User,
    /// Model turn.
    Assistant,
    /// Tool output.
    Tool,
    /// Any role this crate does not know about.
    Unknown(String),
}

impl AuthorRole {
    /// Stable string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
            Self::Unknown(other) => other,
        }
    }

    /// Whether messages with this role are never displayed.
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        matches!(self, Self::System | Self::Tool)
    }
}

impl From<String> for AuthorRole {
    fn from(value: String) -> Self {
        match value.as_str() {
            "system" => Self::System,
            "user" => Self::User,
            "assistant" => Self::Assistant,
            "tool" => Self::Tool,
            _ => Self::Unknown(value),
        }
    }
}

impl From<AuthorRole> for String {
    fn from(value: AuthorRole) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for AuthorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message author.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Author {
    /// Author role.
    pub role: AuthorRole,
    /// Optional author name (tool name for tool messages).
    #[serde(default)]
    pub name: Option<String>,
}

/// Message payload of a node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message id (usually equal to the node id).
    #[serde(default)]
    pub id: Option<String>,
    /// Author; absent only in malformed exports.
    #[serde(default)]
    pub author: Option<Author>,
    /// Creation time in seconds since the Unix epoch.
    #[serde(default)]
    pub create_time: Option<f64>,
    /// Content; absent only in malformed exports.
    #[serde(default)]
    pub content: Option<Content>,
    /// Intended recipient, `"all"` for displayable messages.
    #[serde(default = "default_recipient")]
    pub recipient: String,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: Option<MessageMetadata>,
}

impl Message {
    /// Build a plain text message addressed to everyone.
    #[must_use]
    pub fn text(role: AuthorRole, text: impl Into<String>) -> Self {
        Self {
            id: None,
            author: Some(Author { role, name: None }),
            create_time: None,
            content: Some(Content {
                content_type: "text".to_string(),
                parts: vec![ContentPart::Text(text.into())],
                text: None,
                model_set_context: None,
            }),
            recipient: RECIPIENT_ALL.to_string(),
            metadata: None,
        }
    }

    /// Set the creation time.
    #[must_use]
    pub const fn at(mut self, create_time: f64) -> Self {
        self.create_time = Some(create_time);
        self
    }

    /// Set the recipient.
    #[must_use]
    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = recipient.into();
        self
    }

    /// Author role, if an author is present.
    #[must_use]
    pub fn role(&self) -> Option<&AuthorRole> {
        self.author.as_ref().map(|a| &a.role)
    }

    /// Model slug from metadata.
    #[must_use]
    pub fn model_slug(&self) -> Option<&str> {
        self.metadata.as_ref()?.model_slug.as_deref()
    }

    /// Whether metadata flags the message as hidden from the conversation.
    #[must_use]
    pub fn is_flagged_hidden(&self) -> bool {
        self.metadata
            .as_ref()
            .is_some_and(|m| m.is_visually_hidden_from_conversation)
    }
}

/// Known message metadata fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Model that produced the message.
    #[serde(default)]
    pub model_slug: Option<String>,
    /// Export-side flag for messages that are never rendered.
    #[serde(default)]
    pub is_visually_hidden_from_conversation: bool,
}

/// Message content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Content type, e.g. `text` or `multimodal_text`.
    #[serde(default)]
    pub content_type: String,
    /// Ordered content parts.
    #[serde(default, deserialize_with = "nullable_vec")]
    pub parts: Vec<ContentPart>,
    /// Single text body used by `code`-like content types instead of parts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Body of `model_editable_context` notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_set_context: Option<String>,
}

impl Content {
    /// Content parts with single-body content types folded into one text part.
    #[must_use]
    pub fn resolved_parts(&self) -> Cow<'_, [ContentPart]> {
        if !self.parts.is_empty() {
            return Cow::Borrowed(&self.parts);
        }
        match self.text.as_ref().or(self.model_set_context.as_ref()) {
            Some(body) => Cow::Owned(vec![ContentPart::Text(body.clone())]),
            None => Cow::Borrowed(&[]),
        }
    }

    /// Whether the first part carries content.
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.resolved_parts()
            .first()
            .is_some_and(ContentPart::has_content)
    }

    /// First non-empty textual part.
    #[must_use]
    pub fn first_text(&self) -> Option<String> {
        self.resolved_parts().iter().find_map(|part| match part {
            ContentPart::Text(text) if !text.is_empty() => Some(text.clone()),
            _ => None,
        })
    }
}

/// One content part: plain text or an opaque structured payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentPart {
    /// Plain text.
    Text(String),
    /// Structured payload (image pointer, audio, ...).
    Other(serde_json::Value),
}

impl ContentPart {
    /// Whether the part carries content.
    ///
    /// Text must be non-empty; a structured object counts when any of its
    /// entries is a string.
    #[must_use]
    pub fn has_content(&self) -> bool {
        match self {
            Self::Text(text) => !text.is_empty(),
            Self::Other(serde_json::Value::Object(map)) => map.values().any(serde_json::Value::is_string),
            Self::Other(_) => false,
        }
    }
}

fn default_recipient() -> String {
    RECIPIENT_ALL.to_string()
}

fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
