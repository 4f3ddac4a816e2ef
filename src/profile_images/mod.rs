//! Profile image resolution and blur hash generation.
//!
//! The resolver owns both cache tiers (the in-memory map and, through the
//! `Database` API, the `avatar_images` table). The remote profile source sits
//! behind the `ProfileFetcher` trait so the cache logic can be exercised
//! against a fake in tests.

use crate::config::ProfilesConfig;
use crate::errors::AppError;
use crate::utils;
use async_trait::async_trait;

pub mod hasher;
pub mod resolver;

pub use hasher::BlurHashGenerator;
pub use resolver::{ProfileImageResolver, ResolvedImage};

#[async_trait]
pub trait ProfileFetcher: Send + Sync {
    /// Fetch the avatar's public profile page markup
    async fn fetch_profile_page(&self, avatar_id: &str) -> Result<String, AppError>;

    /// Download raw image bytes from the picture service
    async fn fetch_image(&self, image_url: &str) -> Result<Vec<u8>, AppError>;
}

/// `ProfileFetcher` backed by the real remote profile and picture services
pub struct HttpProfileFetcher {
    client: reqwest::Client,
    resident_base_url: String,
}

impl HttpProfileFetcher {
    pub fn new(config: &ProfilesConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            resident_base_url: config.resident_base_url.clone(),
        })
    }
}

#[async_trait]
impl ProfileFetcher for HttpProfileFetcher {
    async fn fetch_profile_page(&self, avatar_id: &str) -> Result<String, AppError> {
        let url = utils::resident_profile_url(&self.resident_base_url, avatar_id);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(AppError::external_service(
                "profile-source",
                format!("HTTP {} fetching {}", response.status(), url),
            ));
        }

        Ok(response.text().await?)
    }

    async fn fetch_image(&self, image_url: &str) -> Result<Vec<u8>, AppError> {
        let response = self.client.get(image_url).send().await?;

        if !response.status().is_success() {
            return Err(AppError::external_service(
                "picture-service",
                format!("HTTP {} fetching {}", response.status(), image_url),
            ));
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if !content_type.starts_with("image/") {
            return Err(AppError::external_service(
                "picture-service",
                format!("URL does not point to an image: {}", image_url),
            ));
        }

        let bytes = response.bytes().await?;
        if bytes.len() > 10 * 1024 * 1024 {
            return Err(AppError::external_service(
                "picture-service",
                "Image too large (max 10MB)",
            ));
        }

        Ok(bytes.to_vec())
    }
}
