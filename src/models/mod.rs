use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A raw avatar position as published by the virtual-world client.
///
/// Positions are ephemeral: each ingestion call supplies a fresh batch and no
/// history is kept.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvatarPosition {
    pub id: String,
    pub name: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// An avatar position enriched with its cached profile image and blur hash.
///
/// `image` is the empty string when the avatar has no profile image;
/// `blur_hash` is the empty string until the detached hash computation has
/// completed and a later batch picks it up.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichedAvatar {
    pub id: String,
    pub name: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub image: String,
    #[serde(rename = "blurHash")]
    pub blur_hash: String,
    #[serde(rename = "isStaff")]
    pub is_staff: bool,
}

/// A cached image record, shared by the in-memory tier and the `avatar_images`
/// table. Records older than the configured freshness window are treated as
/// absent and re-resolved.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct AvatarImageRecord {
    pub avatar_id: String,
    pub image_url: String,
    pub blur_hash: String,
    pub updated_at: DateTime<Utc>,
}

impl AvatarImageRecord {
    pub fn is_fresh(&self, window: Duration) -> bool {
        Utc::now().signed_duration_since(self.updated_at) < window
    }
}

/// The message pushed to every live subscriber.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LiveUpdate {
    pub data: Vec<EnrichedAvatar>,
}
