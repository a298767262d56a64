use axum::http::{header, HeaderMap};
use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::user::User;

pub const SESSION_COOKIE: &str = "portfolio_session";
pub const STATE_COOKIE: &str = "oauth_state";
/// Lifetime of the OAuth `state` cookie.
pub const STATE_MAX_AGE_SECS: i64 = 600;

/// Generates a random session token.
///
/// Returns `(plaintext, sha256_hex)`. The plaintext goes into the cookie;
/// only the hash is persisted.
pub fn generate_session_token() -> (String, String) {
    let plaintext = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
    let hash = hash_token(&plaintext);
    (plaintext, hash)
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Compares two secrets through their digests so the comparison time does
/// not depend on how many leading bytes match.
pub fn tokens_match(provided: &str, expected: &str) -> bool {
    let a = Sha256::digest(provided.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Value of cookie `name` from the `Cookie` headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `Set-Cookie` value for an HttpOnly, SameSite=Lax cookie.
pub fn build_cookie(name: &str, value: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn expired_cookie(name: &str, secure: bool) -> String {
    build_cookie(name, "", 0, secure)
}

/// Stores a new session for `user_id`, returning the plaintext token.
pub async fn create_session(pool: &PgPool, user_id: i32, ttl_hours: i64) -> Result<String, sqlx::Error> {
    let (token, hash) = generate_session_token();
    let expires_at = Utc::now() + Duration::hours(ttl_hours);
    sqlx::query("INSERT INTO sessions (token_hash, user_id, expires_at) VALUES ($1, $2, $3)")
        .bind(&hash)
        .bind(user_id)
        .bind(expires_at)
        .execute(pool)
        .await?;
    // Opportunistic cleanup; stale rows are harmless but pile up.
    sqlx::query("DELETE FROM sessions WHERE expires_at < NOW()")
        .execute(pool)
        .await?;
    Ok(token)
}

/// The user owning an unexpired session, if any.
pub async fn find_session_user(pool: &PgPool, token: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT u.*
        FROM sessions s
        JOIN users u ON u.id = s.user_id
        WHERE s.token_hash = $1 AND s.expires_at > NOW()
        "#,
    )
    .bind(hash_token(token))
    .fetch_optional(pool)
    .await
}

pub async fn delete_session(pool: &PgPool, token: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
        .bind(hash_token(token))
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_token_hashes_to_stored_value() {
        let (token, hash) = generate_session_token();
        assert_eq!(token.len(), 64);
        assert_eq!(hash, hash_token(&token));
        assert_ne!(token, hash);
    }

    #[test]
    fn test_hash_token_known_value() {
        assert_eq!(
            hash_token("s3cr3t-token"),
            "fb07916a0e7daf7f3f4823b7773f85a839a8dd46fbf3858b8f53d3fa463c8ef3"
        );
    }

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match("abc", "abc"));
        assert!(!tokens_match("abc", "abd"));
        assert!(!tokens_match("", "abc"));
    }

    #[test]
    fn test_read_cookie_among_several() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "theme=dark; portfolio_session=abc123".parse().unwrap());
        headers.append(header::COOKIE, "oauth_state=xyz".parse().unwrap());
        assert_eq!(read_cookie(&headers, SESSION_COOKIE).as_deref(), Some("abc123"));
        assert_eq!(read_cookie(&headers, STATE_COOKIE).as_deref(), Some("xyz"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_read_cookie_ignores_empty_value() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "portfolio_session=".parse().unwrap());
        assert_eq!(read_cookie(&headers, SESSION_COOKIE), None);
    }

    #[test]
    fn test_build_cookie_flags() {
        assert_eq!(
            build_cookie("a", "b", 60, false),
            "a=b; Path=/; HttpOnly; SameSite=Lax; Max-Age=60"
        );
        assert!(build_cookie("a", "b", 60, true).ends_with("; Secure"));
        assert!(expired_cookie("a", false).contains("Max-Age=0"));
    }
}
