//! Conversation export load/save.
//!
//! Accepts either a full conversation export (an object with a `mapping`
//! key) or a bare mapping keyed by node id.

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;

use crate::tree::core::errors::TreeResult;
use crate::tree::core::ids::NodeId;
use crate::tree::core::raw::{Conversation, RawMapping};

/// Parse an export from JSON text.
///
/// # Errors
/// Returns a serialization error if the text is not a conversation export
/// or a mapping.
pub fn parse_export(json: &str) -> TreeResult<Conversation> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    from_value(value)
}

/// Parse an export from an already-decoded JSON value.
///
/// # Errors
/// Returns a serialization error if the value has neither shape.
pub fn from_value(value: serde_json::Value) -> TreeResult<Conversation> {
    if value.get("mapping").is_some() {
        return Ok(serde_json::from_value(value)?);
    }
    let mapping: RawMapping = serde_json::from_value(value)?;
    Ok(Conversation {
        mapping,
        ..Conversation::default()
    })
}

/// Serialize an export as pretty JSON.
///
/// # Errors
/// Returns a serialization error if encoding fails.
pub fn to_json(conversation: &Conversation) -> TreeResult<String> {
    Ok(serde_json::to_string_pretty(conversation)?)
}

/// Read an export from disk.
///
/// # Errors
/// Returns an I/O error if the file cannot be read, or a serialization
/// error if it cannot be parsed.
pub fn load_export(path: impl AsRef<Path>) -> TreeResult<Conversation> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let conversation = parse_export(&text)?;
    debug!(
        path = %path.display(),
        nodes = conversation.mapping.len(),
        "Loaded conversation export"
    );
    Ok(conversation)
}

/// Write an export to disk.
///
/// # Errors
/// Returns an error if encoding or writing fails.
pub fn save_export(path: impl AsRef<Path>, conversation: &Conversation) -> TreeResult<()> {
    std::fs::write(path, to_json(conversation)?)?;
    Ok(())
}

/// Ids on the branch that ends at `current_node`, leaf first.
///
/// Empty when the export has no current node or it is unknown.
#[must_use]
pub fn active_path(conversation: &Conversation) -> Vec<NodeId> {
    let mut path = Vec::new();
    let mut seen = HashSet::new();
    let mut cursor = conversation.current_node.clone();

    while let Some(id) = cursor {
        let Some(node) = conversation.mapping.get(&id) else {
            break;
        };
        if !seen.insert(id.clone()) {
            break;
        }
        cursor = node.parent_id.clone();
        path.push(id);
    }
    path
}
