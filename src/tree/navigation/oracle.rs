//! Visibility oracle contract and the offline oracle.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use futures::future::try_join_all;
use tracing::debug;

use crate::tree::core::display::Visibility;
use crate::tree::core::errors::{TreeError, TreeResult};
use crate::tree::core::ids::NodeId;
use crate::tree::core::raw::Conversation;
use crate::tree::normalize::export::active_path;

/// Boxed future type for navigation collaborators.
pub type NavFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Reports which nodes are currently rendered.
pub trait VisibilityOracle: Send + Sync {
    /// Check visibility of `ids`; the result is aligned positionally.
    ///
    /// # Errors
    /// Returns an error if the rendering surface cannot be inspected.
    fn check_visibility(&self, ids: Vec<NodeId>) -> NavFuture<'_, TreeResult<Vec<Visibility>>>;
}

/// Check `ids` in batches of at most `batch_size`, concurrently.
///
/// # Errors
/// Returns the first oracle error, or `Visibility` if a batch comes back
/// misaligned.
pub async fn observe(
    oracle: &dyn VisibilityOracle,
    ids: &[NodeId],
    batch_size: usize,
) -> TreeResult<Vec<Visibility>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let batches = ids
        .chunks(batch_size.max(1))
        .map(|chunk| check_batch(oracle, chunk.to_vec()));
    let reports = try_join_all(batches).await?;

    let report: Vec<Visibility> = reports.into_iter().flatten().collect();
    debug!(
        checked = ids.len(),
        hidden = report.iter().filter(|v| v.is_hidden()).count(),
        "Observed visibility"
    );
    Ok(report)
}

async fn check_batch(oracle: &dyn VisibilityOracle, batch: Vec<NodeId>) -> TreeResult<Vec<Visibility>> {
    let expected = batch.len();
    let report = oracle.check_visibility(batch).await?;
    if report.len() != expected {
        return Err(TreeError::Visibility(format!(
            "oracle answered {} entries for {expected} ids",
            report.len()
        )));
    }
    Ok(report)
}

/// Offline oracle: the branch ending at the export's current node is
/// visible, everything else is hidden.
#[derive(Clone, Debug, Default)]
pub struct CurrentNodeOracle {
    visible: HashSet<NodeId>,
}

impl CurrentNodeOracle {
    /// Build from a conversation export.
    #[must_use]
    pub fn from_conversation(conversation: &Conversation) -> Self {
        Self {
            visible: active_path(conversation).into_iter().collect(),
        }
    }

    /// Build from an explicit set of visible ids.
    #[must_use]
    pub fn with_visible<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = NodeId>,
    {
        Self {
            visible: ids.into_iter().collect(),
        }
    }
}

impl VisibilityOracle for CurrentNodeOracle {
    fn check_visibility(&self, ids: Vec<NodeId>) -> NavFuture<'_, TreeResult<Vec<Visibility>>> {
        Box::pin(async move {
            Ok(ids
                .iter()
                .map(|id| Visibility::from_missing(!self.visible.contains(id)))
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::tree::normalize::export::parse_export;

    struct CountingOracle {
        calls: AtomicUsize,
        truncate: bool,
    }

    impl VisibilityOracle for CountingOracle {
        fn check_visibility(&self, ids: Vec<NodeId>) -> NavFuture<'_, TreeResult<Vec<Visibility>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                let mut report: Vec<Visibility> = ids
                    .iter()
                    .map(|id| Visibility::from_missing(id.as_str() != "v"))
                    .collect();
                if self.truncate {
                    report.pop();
                }
                Ok(report)
            })
        }
    }

    fn ids(raw: &[&str]) -> Vec<NodeId> {
        raw.iter().map(|s| NodeId::from(*s)).collect()
    }

    #[tokio::test]
    async fn test_observe_batches_and_keeps_order() {
        let oracle = CountingOracle {
            calls: AtomicUsize::new(0),
            truncate: false,
        };
        let report = observe(&oracle, &ids(&["a", "v", "b", "c", "v"]), 2).await.unwrap();
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            report,
            vec![
                Visibility::Hidden,
                Visibility::Visible,
                Visibility::Hidden,
                Visibility::Hidden,
                Visibility::Visible,
            ]
        );
    }

    #[tokio::test]
    async fn test_observe_rejects_misaligned_batches() {
        let oracle = CountingOracle {
            calls: AtomicUsize::new(0),
            truncate: true,
        };
        let err = observe(&oracle, &ids(&["a", "b"]), 10).await.unwrap_err();
        assert!(matches!(err, TreeError::Visibility(_)));
    }

    #[tokio::test]
    async fn test_observe_empty_skips_oracle() {
        let oracle = CountingOracle {
            calls: AtomicUsize::new(0),
            truncate: false,
        };
        assert!(observe(&oracle, &[], 10).await.unwrap().is_empty());
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_current_node_oracle_marks_active_branch() {
        let conversation = parse_export(
            r#"{
                "current_node": "b",
                "mapping": {
                    "r": {"id": "r", "children": ["a", "b"]},
                    "a": {"id": "a", "parent": "r"},
                    "b": {"id": "b", "parent": "r"}
                }
            }"#,
        )
        .unwrap();
        let oracle = CurrentNodeOracle::from_conversation(&conversation);
        let report = oracle.check_visibility(ids(&["r", "a", "b"])).await.unwrap();
        assert_eq!(
            report,
            vec![Visibility::Visible, Visibility::Hidden, Visibility::Visible]
        );
    }
}
