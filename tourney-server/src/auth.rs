use chrono::Utc;
use sha2::{Digest, Sha256};
use tourney_api::id::UserId;

/// Hashes a password with a single round of SHA-256 and no salt. Stored hashes depend on this
/// exact scheme, changing it invalidates every existing account.
pub fn password_hash(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Creates an opaque bearer token for the user, bound to the `issued_at` unix timestamp.
///
/// Tokens are not signed and are never checked by the server.
pub fn create_token(id: UserId, username: &str, issued_at: i64) -> String {
    let data = format!("{}:{}:{}", id, username, issued_at);
    hex::encode(Sha256::digest(data.as_bytes()))
}

/// [`create_token`] with the current time.
#[inline]
pub fn issue_token(id: UserId, username: &str) -> String {
    create_token(id, username, Utc::now().timestamp())
}
