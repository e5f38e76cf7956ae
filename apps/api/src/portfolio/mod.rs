//! Public portfolio rendering, share links and visit capture.

pub mod handlers;

use rand::distributions::Alphanumeric;
use rand::Rng;
use uuid::Uuid;

pub const SHARE_TOKEN_LENGTH: usize = 32;
pub const MAX_LOCATION_LENGTH: usize = 100;

pub fn generate_share_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SHARE_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

pub fn share_key(token: &str) -> String {
    format!("share:{token}")
}

/// Requested lifetime, defaulting to and capped at `max_secs`. Zero is treated as unset.
pub fn clamp_share_ttl(requested: Option<u64>, max_secs: u64) -> u64 {
    match requested {
        Some(secs) if secs > 0 => secs.min(max_secs),
        _ => max_secs,
    }
}

/// Share tokens are alphanumeric only; anything else never hits Redis.
pub fn is_well_formed_token(token: &str) -> bool {
    token.len() == SHARE_TOKEN_LENGTH && token.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Trimmed `X-Visitor-Location` value, or `None` when absent or blank.
pub fn normalize_location(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_LOCATION_LENGTH).collect())
}

/// Owners looking at their own page are not counted.
pub fn should_record_visit(profile_user_id: Uuid, viewer_id: Option<Uuid>) -> bool {
    viewer_id != Some(profile_user_id)
}
