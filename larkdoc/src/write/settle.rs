//! Waiting for created blocks to become visible

use crate::api::{ApiError, DocumentApi};
use crate::model::{Block, BlockMap};
use std::collections::HashSet;
use std::thread;
use std::time::Duration;

/// Bounded poll used before reading back created blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlePolicy {
    /// Wait before each read
    pub interval: Duration,

    /// Reads before giving up and using what was found
    pub max_attempts: u32,
}

impl SettlePolicy {
    /// A single read with no wait
    pub fn immediate() -> Self {
        Self {
            interval: Duration::ZERO,
            max_attempts: 1,
        }
    }
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            max_attempts: 5,
        }
    }
}

pub(crate) fn pause(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

/// Image blocks still lacking media, in document order
///
/// When `created` is non-empty only those IDs are considered, so placeholders
/// left behind by earlier writes are not picked up.
pub(crate) fn placeholders(blocks: Vec<Block>, created: &HashSet<String>) -> Vec<Block> {
    let map = BlockMap::from_blocks(blocks);
    map.preorder()
        .into_iter()
        .filter(|b| b.is_image_placeholder())
        .filter(|b| created.is_empty() || created.contains(&b.block_id))
        .cloned()
        .collect()
}

/// Re-read the document until `expected` placeholders are visible
///
/// Returns whatever was found on the last successful read once the attempts
/// run out. Fails only if every read failed.
pub(crate) fn wait_for_placeholders(
    api: &dyn DocumentApi,
    document_id: &str,
    expected: usize,
    created: &HashSet<String>,
    policy: SettlePolicy,
) -> Result<Vec<Block>, ApiError> {
    let attempts = policy.max_attempts.max(1);
    let mut found: Option<Vec<Block>> = None;
    let mut last_error = None;

    for attempt in 1..=attempts {
        pause(policy.interval);
        match api.list_document_blocks(document_id) {
            Ok(blocks) => {
                let images = placeholders(blocks, created);
                if images.len() >= expected {
                    return Ok(images);
                }
                log::debug!(
                    "Attempt {}/{}: {} of {} image placeholders visible",
                    attempt,
                    attempts,
                    images.len(),
                    expected
                );
                found = Some(images);
            }
            Err(err) => {
                log::warn!("Attempt {}/{}: {}", attempt, attempts, err);
                last_error = Some(err);
            }
        }
    }

    match (found, last_error) {
        (Some(images), _) => Ok(images),
        (None, Some(err)) => Err(err),
        (None, None) => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockDescriptor;
    use crate::store::MemoryStore;

    #[test]
    fn test_placeholders_in_document_order() {
        // Arrange
        let store = MemoryStore::new();
        let doc = store.create_document("Doc", None).unwrap();
        let created = store
            .create_blocks(
                &doc,
                &doc,
                &[
                    BlockDescriptor::image_placeholder(),
                    BlockDescriptor::divider(),
                    BlockDescriptor::image_placeholder(),
                ],
                None,
            )
            .unwrap();

        // Act
        let images = wait_for_placeholders(
            &store,
            &doc,
            2,
            &HashSet::new(),
            SettlePolicy::immediate(),
        )
        .unwrap();

        // Assert
        let ids: Vec<_> = images.iter().map(|b| b.block_id.as_str()).collect();
        assert_eq!(ids, vec![created[0].block_id.as_str(), created[2].block_id.as_str()]);
    }

    #[test]
    fn test_placeholders_restricted_to_created_ids() {
        let store = MemoryStore::new();
        let doc = store.create_document("Doc", None).unwrap();
        let old = store
            .create_blocks(&doc, &doc, &[BlockDescriptor::image_placeholder()], None)
            .unwrap();
        let new = store
            .create_blocks(&doc, &doc, &[BlockDescriptor::image_placeholder()], None)
            .unwrap();
        let created = HashSet::from([new[0].block_id.clone()]);

        let images = placeholders(store.list_document_blocks(&doc).unwrap(), &created);

        assert_eq!(images.len(), 1);
        assert_ne!(images[0].block_id, old[0].block_id);
    }

    #[test]
    fn test_gives_up_with_partial_result() {
        let store = MemoryStore::new();
        let doc = store.create_document("Doc", None).unwrap();
        let policy = SettlePolicy {
            interval: Duration::ZERO,
            max_attempts: 3,
        };

        let images = wait_for_placeholders(&store, &doc, 1, &HashSet::new(), policy).unwrap();

        assert!(images.is_empty());
    }

    #[test]
    fn test_read_failure_is_reported() {
        let store = MemoryStore::new();
        let result =
            wait_for_placeholders(&store, "missing", 1, &HashSet::new(), SettlePolicy::immediate());
        assert!(result.is_err());
    }
}
