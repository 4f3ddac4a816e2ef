use std::sync::Arc;

use tracing::{debug, warn};

use super::ProfileFetcher;
use crate::database::Database;
use crate::errors::AppError;
use crate::profile_images::resolver::MemoryTier;

/// Blur hash stored when an avatar has no image or its image is unusable
pub const PLACEHOLDER_BLUR_HASH: &str = "LEHV6nWB2yk8pyo0adR*.7kCMdnj";

/// Horizontal and vertical component counts for the hash. The grid is
/// asymmetric to match the 4:3 aspect of the source images.
const COMPONENTS_X: u32 = 4;
const COMPONENTS_Y: u32 = 3;

/// Computes blur hashes for resolved images and writes them back to both
/// cache tiers. Runs only inside detached background tasks; completion is
/// observable through a later rebroadcast, never through the triggering
/// request.
#[derive(Clone)]
pub struct BlurHashGenerator {
    database: Database,
    fetcher: Arc<dyn ProfileFetcher>,
    memory: MemoryTier,
}

impl BlurHashGenerator {
    pub fn new(database: Database, fetcher: Arc<dyn ProfileFetcher>, memory: MemoryTier) -> Self {
        Self {
            database,
            fetcher,
            memory,
        }
    }

    /// Generate and persist the blur hash for an avatar's image.
    ///
    /// A download or decode failure marks the image as unusable: the cached
    /// URL is cleared in both tiers and the placeholder hash is stored, so
    /// the next resolution after expiry starts from a clean slate.
    pub async fn generate(&self, avatar_id: &str, image_url: &str) -> Result<(), AppError> {
        if !image_url.is_empty() {
            match self.compute_hash(image_url).await {
                Ok(blur_hash) => {
                    debug!("Computed blur hash for {}", avatar_id);
                    return self.store_blur_hash(avatar_id, &blur_hash).await;
                }
                Err(e) => {
                    warn!(
                        "Image for {} is unusable ({}), clearing cached URL",
                        avatar_id, e
                    );
                    self.clear_image_url(avatar_id).await?;
                }
            }
        }

        self.store_blur_hash(avatar_id, PLACEHOLDER_BLUR_HASH).await
    }

    async fn compute_hash(&self, image_url: &str) -> Result<String, AppError> {
        let bytes = self.fetcher.fetch_image(image_url).await?;

        let image = image::load_from_memory(&bytes)?;
        // Force an alpha channel; the encoder expects RGBA samples
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();

        blurhash::encode(COMPONENTS_X, COMPONENTS_Y, width, height, rgba.as_raw())
            .map_err(|e| AppError::internal(format!("Blur hash encoding failed: {:?}", e)))
    }

    async fn store_blur_hash(&self, avatar_id: &str, blur_hash: &str) -> Result<(), AppError> {
        self.database
            .set_avatar_blur_hash(avatar_id, blur_hash)
            .await?;

        // Update the memory tier only if the id is still resident
        let mut memory = self.memory.write().await;
        if let Some(record) = memory.get_mut(avatar_id) {
            record.blur_hash = blur_hash.to_string();
        }

        Ok(())
    }

    async fn clear_image_url(&self, avatar_id: &str) -> Result<(), AppError> {
        self.database.clear_avatar_image_url(avatar_id).await?;

        let mut memory = self.memory.write().await;
        if let Some(record) = memory.get_mut(avatar_id) {
            record.image_url.clear();
        }

        Ok(())
    }
}
