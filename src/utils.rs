//! Utility functions for the avatar relay
//!
//! URL construction for the remote profile and picture services, plus
//! datetime parsing for timestamps stored as TEXT in SQLite.

use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx;

/// Parse datetime from SQLite format or RFC3339 format
pub fn parse_datetime(datetime_str: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    // Try parsing as RFC3339 first (with timezone info)
    if let Ok(dt) = DateTime::parse_from_rfc3339(datetime_str) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Try parsing as naive datetime and assume UTC
    if let Ok(naive_dt) = NaiveDateTime::parse_from_str(datetime_str, "%Y-%m-%d %H:%M:%S") {
        return Ok(DateTime::from_naive_utc_and_offset(naive_dt, Utc));
    }

    Err(sqlx::Error::Decode(
        format!("Unable to parse datetime: {}", datetime_str).into(),
    ))
}

/// Sanitize a base URL by removing trailing slashes and ensuring a scheme
pub fn sanitize_base_url(base_url: &str) -> String {
    let mut url = base_url.trim().to_string();

    while url.ends_with('/') {
        url.pop();
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        url = format!("https://{}", url);
    }

    url
}

/// Build the public profile page URL for an avatar
pub fn resident_profile_url(base_url: &str, avatar_id: &str) -> String {
    format!("{}/{}", sanitize_base_url(base_url), avatar_id)
}

/// Build the canonical picture URL for a resolved image identifier token
pub fn picture_url(base_url: &str, image_token: &str) -> String {
    format!("{}/{}/256x192.jpg", sanitize_base_url(base_url), image_token)
}
