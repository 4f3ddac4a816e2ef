//! Position batch enrichment.
//!
//! Takes each incoming batch of raw positions, resolves every avatar's image
//! concurrently, orders the result, replaces the latest-batch snapshot, and
//! hands the batch to the broadcaster. The batch is atomic: nothing is
//! emitted until every resolution has completed or failed.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::debug;

use crate::broadcast::{Broadcaster, SubscriberId};
use crate::models::{AvatarPosition, EnrichedAvatar};
use crate::profile_images::ProfileImageResolver;

/// Avatar identities granted sort priority in every broadcast batch.
/// Static allow-list; membership is not derived from any cache or remote
/// call.
pub const STAFF_AVATAR_IDS: &[&str] = &["54de3375-a7b0-4f76-b47b-5c8ff9a55431"];

pub fn is_staff(avatar_id: &str) -> bool {
    STAFF_AVATAR_IDS.contains(&avatar_id)
}

#[derive(Clone)]
pub struct EnrichmentPipeline {
    resolver: ProfileImageResolver,
    broadcaster: Arc<Broadcaster>,
    latest_batch: Arc<RwLock<Option<Vec<EnrichedAvatar>>>>,
}

impl EnrichmentPipeline {
    pub fn new(resolver: ProfileImageResolver, broadcaster: Arc<Broadcaster>) -> Self {
        Self {
            resolver,
            broadcaster,
            latest_batch: Arc::new(RwLock::new(None)),
        }
    }

    /// Ingest one batch of raw positions: resolve all images concurrently,
    /// order the enriched batch, store it as the latest known state, and
    /// broadcast it.
    pub async fn ingest(&self, positions: Vec<AvatarPosition>) {
        let resolutions = positions.iter().map(|p| self.resolver.resolve(&p.id));
        let resolved = join_all(resolutions).await;

        let mut enriched: Vec<EnrichedAvatar> = positions
            .into_iter()
            .zip(resolved)
            .map(|(position, image)| EnrichedAvatar {
                is_staff: is_staff(&position.id),
                id: position.id,
                name: position.name,
                display_name: position.display_name,
                x: position.x,
                y: position.y,
                z: position.z,
                image: image.image_url,
                blur_hash: image.blur_hash,
            })
            .collect();

        apply_ordering(&mut enriched);
        debug!("Enriched batch of {} avatars", enriched.len());

        {
            let mut latest = self.latest_batch.write().await;
            *latest = Some(enriched.clone());
        }

        self.broadcaster.broadcast(&enriched).await;
    }

    /// The last broadcast batch, if any
    pub async fn latest(&self) -> Option<Vec<EnrichedAvatar>> {
        self.latest_batch.read().await.clone()
    }

    /// Replay the last known batch to a single subscriber, so new
    /// connections see current state without waiting for the next ingestion
    pub async fn replay_latest_to(&self, subscriber: SubscriberId) {
        if let Some(batch) = self.latest().await {
            self.broadcaster.send_batch_to(subscriber, &batch).await;
        }
    }
}

/// Staff entries sort before all others; the sort is stable, so each group
/// keeps its input order.
fn apply_ordering(batch: &mut [EnrichedAvatar]) {
    batch.sort_by_key(|avatar| !avatar.is_staff);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn avatar(id: &str) -> EnrichedAvatar {
        EnrichedAvatar {
            is_staff: is_staff(id),
            id: id.to_string(),
            name: "resident".to_string(),
            display_name: "Resident".to_string(),
            x: 0.0,
            y: 0.0,
            z: 0.0,
            image: String::new(),
            blur_hash: String::new(),
        }
    }

    #[test]
    fn test_staff_allow_list() {
        assert!(is_staff("54de3375-a7b0-4f76-b47b-5c8ff9a55431"));
        assert!(!is_staff("11111111-2222-3333-4444-555555555555"));
    }

    #[test]
    fn test_staff_sort_before_others() {
        let mut batch = vec![
            avatar("ordinary-one"),
            avatar("54de3375-a7b0-4f76-b47b-5c8ff9a55431"),
            avatar("ordinary-two"),
        ];

        apply_ordering(&mut batch);

        assert_eq!(batch[0].id, "54de3375-a7b0-4f76-b47b-5c8ff9a55431");
        assert_eq!(batch[1].id, "ordinary-one");
        assert_eq!(batch[2].id, "ordinary-two");
    }

    #[test]
    fn test_ordering_is_stable_within_groups() {
        let mut batch = vec![avatar("a"), avatar("b"), avatar("c")];
        apply_ordering(&mut batch);
        let ids: Vec<&str> = batch.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
