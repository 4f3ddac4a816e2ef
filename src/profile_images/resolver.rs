use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use regex::Regex;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{BlurHashGenerator, ProfileFetcher};
use crate::config::ProfilesConfig;
use crate::database::Database;
use crate::errors::AppError;
use crate::models::AvatarImageRecord;
use crate::tasks::run_in_background;
use crate::utils;

/// Image identifier token published by the profile source when an avatar has
/// no profile image.
pub const NO_IMAGE_TOKEN: &str = "00000000-0000-0000-0000-000000000000";

/// Shared in-memory cache tier, keyed by avatar id
pub type MemoryTier = Arc<RwLock<HashMap<String, AvatarImageRecord>>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedImage {
    pub image_url: String,
    pub blur_hash: String,
}

/// Resolves an avatar id to a profile image URL through three tiers:
/// memory cache, the `avatar_images` table, and a remote profile-page scrape.
///
/// Blur hash computation is scheduled as a detached task on every remote
/// resolution; callers always receive the hash that is cached at call time
/// (possibly empty) and pick up the computed one via a later rebroadcast.
#[derive(Clone)]
pub struct ProfileImageResolver {
    database: Database,
    fetcher: Arc<dyn ProfileFetcher>,
    memory: MemoryTier,
    hasher: BlurHashGenerator,
    picture_base_url: String,
    freshness_window: chrono::Duration,
}

impl ProfileImageResolver {
    pub fn new(
        database: Database,
        fetcher: Arc<dyn ProfileFetcher>,
        config: &ProfilesConfig,
    ) -> Self {
        let memory: MemoryTier = Arc::new(RwLock::new(HashMap::new()));
        let hasher = BlurHashGenerator::new(database.clone(), fetcher.clone(), memory.clone());

        Self {
            database,
            fetcher,
            memory,
            hasher,
            picture_base_url: config.picture_base_url.clone(),
            freshness_window: config.freshness_window(),
        }
    }

    /// Resolve the profile image for an avatar. Never fails: any internal
    /// error degrades to an empty result and a warning in the log.
    pub async fn resolve(&self, avatar_id: &str) -> ResolvedImage {
        match self.resolve_inner(avatar_id).await {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!("Failed to resolve profile image for {}: {}", avatar_id, e);
                ResolvedImage::default()
            }
        }
    }

    async fn resolve_inner(&self, avatar_id: &str) -> Result<ResolvedImage, AppError> {
        // Fast path: fresh entry in the memory tier
        {
            let memory = self.memory.read().await;
            if let Some(record) = memory.get(avatar_id) {
                if record.is_fresh(self.freshness_window) {
                    return Ok(ResolvedImage {
                        image_url: record.image_url.clone(),
                        blur_hash: record.blur_hash.clone(),
                    });
                }
            }
        }

        // Second tier: durable cache, repopulating the memory tier on a hit
        if let Some(record) = self.database.get_avatar_image(avatar_id).await? {
            if record.is_fresh(self.freshness_window) {
                let resolved = ResolvedImage {
                    image_url: record.image_url.clone(),
                    blur_hash: record.blur_hash.clone(),
                };
                let mut memory = self.memory.write().await;
                memory.insert(avatar_id.to_string(), record);
                return Ok(resolved);
            }
        }

        // Cold or stale in both tiers: scrape the public profile page.
        // Concurrent resolutions for the same cold id each fetch independently;
        // the resulting upserts are idempotent per key.
        debug!("Fetching profile page for {}", avatar_id);
        let page = self.fetcher.fetch_profile_page(avatar_id).await?;

        let image_url = match extract_image_token(&page) {
            Some(token) if token != NO_IMAGE_TOKEN => {
                utils::picture_url(&self.picture_base_url, &token)
            }
            _ => String::new(),
        };

        // Write back both tiers. The blur hash stays untouched here; it is
        // owned by the detached hash task scheduled below.
        let record = AvatarImageRecord {
            avatar_id: avatar_id.to_string(),
            image_url: image_url.clone(),
            blur_hash: String::new(),
            updated_at: Utc::now(),
        };
        {
            let mut memory = self.memory.write().await;
            memory.insert(avatar_id.to_string(), record);
        }
        self.database
            .upsert_avatar_image_url(avatar_id, &image_url)
            .await?;

        let hasher = self.hasher.clone();
        let id = avatar_id.to_string();
        let url = image_url.clone();
        run_in_background(async move { hasher.generate(&id, &url).await });

        Ok(ResolvedImage {
            image_url,
            blur_hash: String::new(),
        })
    }
}

/// Extract the image identifier token from the profile page markup
fn extract_image_token(html: &str) -> Option<String> {
    let token_re = Regex::new(r#"<meta\s+name="imageid"\s+content="([^"]+)""#).ok()?;
    token_re
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
