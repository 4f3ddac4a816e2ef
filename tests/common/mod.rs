//! Shared fixtures: an in-memory database and a fake remote profile source
//! with per-call counters.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use avatar_relay::config::{DatabaseConfig, ProfilesConfig};
use avatar_relay::database::Database;
use avatar_relay::errors::AppError;
use avatar_relay::profile_images::ProfileFetcher;

pub async fn test_database() -> Database {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: Some(1),
    };
    let database = Database::new(&config).await.unwrap();
    database.migrate().await.unwrap();
    database
}

pub fn test_profiles_config() -> ProfilesConfig {
    ProfilesConfig {
        resident_base_url: "https://profiles.test/resident".to_string(),
        picture_base_url: "https://pictures.test".to_string(),
        user_agent: "avatar-relay-test/1.0".to_string(),
        freshness_hours: 24,
    }
}

pub fn profile_page(token: &str) -> String {
    format!(
        r#"<html><head><meta name="imageid" content="{}"/></head><body></body></html>"#,
        token
    )
}

/// A 4x4 opaque PNG, decodable by the hash generator
pub fn tiny_png() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([120, 80, 40, 255]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// Fake remote profile source. Pages are keyed by avatar id; image requests
/// serve fixed bytes. Both fetch kinds are counted so tests can assert which
/// cache tier answered.
pub struct FakeProfileSource {
    pages: Mutex<HashMap<String, String>>,
    image_bytes: Mutex<Vec<u8>>,
    pub profile_fetches: AtomicUsize,
    pub image_fetches: AtomicUsize,
}

impl FakeProfileSource {
    pub fn new() -> Self {
        Self {
            pages: Mutex::new(HashMap::new()),
            image_bytes: Mutex::new(tiny_png()),
            profile_fetches: AtomicUsize::new(0),
            image_fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_page(self, avatar_id: &str, page: String) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(avatar_id.to_string(), page);
        self
    }

    pub fn with_image_bytes(self, bytes: Vec<u8>) -> Self {
        *self.image_bytes.lock().unwrap() = bytes;
        self
    }

    pub fn profile_fetch_count(&self) -> usize {
        self.profile_fetches.load(Ordering::SeqCst)
    }

    pub fn image_fetch_count(&self) -> usize {
        self.image_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileFetcher for FakeProfileSource {
    async fn fetch_profile_page(&self, avatar_id: &str) -> Result<String, AppError> {
        self.profile_fetches.fetch_add(1, Ordering::SeqCst);
        self.pages
            .lock()
            .unwrap()
            .get(avatar_id)
            .cloned()
            .ok_or_else(|| AppError::external_service("profile-source", "HTTP 404"))
    }

    async fn fetch_image(&self, _image_url: &str) -> Result<Vec<u8>, AppError> {
        self.image_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.image_bytes.lock().unwrap().clone())
    }
}

/// A remote source where every request fails, for degraded-path tests
pub struct UnreachableProfileSource;

#[async_trait]
impl ProfileFetcher for UnreachableProfileSource {
    async fn fetch_profile_page(&self, _avatar_id: &str) -> Result<String, AppError> {
        Err(AppError::external_service("profile-source", "connect timeout"))
    }

    async fn fetch_image(&self, _image_url: &str) -> Result<Vec<u8>, AppError> {
        Err(AppError::external_service("picture-service", "connect timeout"))
    }
}
