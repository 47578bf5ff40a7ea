//! Dashboard authentication
//!
//! Passwords are stored as Argon2id PHC strings and verified with the
//! `argon2` crate. A successful login creates a server-side session and
//! hands its token to the browser in an HTTP-only `session` cookie.

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use rand::{distr::Alphanumeric, Rng};
use redb::Database;
use serde_json::json;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::database::{AppState, StoreError};
use crate::error::ApiError;
use crate::model::{AdminUser, LoginRequest, Session, ValidationError};
use crate::repository;

pub const SESSION_COOKIE: &str = "session";
const TOKEN_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("password hashing failed: {0}")]
    Hash(argon2::password_hash::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Store(err) => ApiError::Store(err),
            AuthError::Hash(err) => ApiError::Internal(err.to_string()),
        }
    }
}

/// Hashes a password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(AuthError::Hash)
}

/// Checks a password against a stored PHC string. Unparseable hashes never match.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            warn!(error = %err, "stored password hash is unreadable");
            false
        }
    }
}

/// Creates the admin account, or resets its password if it already exists.
pub fn ensure_admin(db: &Database, username: &str, password: &str) -> Result<AdminUser, AuthError> {
    let created_at = repository::get_admin(db, username)?
        .map(|existing| existing.created_at)
        .unwrap_or_else(Utc::now);

    let user = AdminUser {
        username: username.to_string(),
        password_hash: hash_password(password)?,
        created_at,
    };
    repository::upsert_admin(db, &user)?;
    Ok(user)
}

/// Hash checked when the username is unknown, so a miss costs the same
/// Argon2 verification as a wrong password.
fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| hash_password(&generate_token()).unwrap_or_default())
}

fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Reads the session token from the request cookies.
pub fn session_token(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

fn session_cookie(token: String, config: &AppConfig) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(config.session_ttl_hours))
        .secure(config.cookie_secure)
        .build()
}

fn removal_cookie(config: &AppConfig) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE)
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .build()
}

/// Logs an admin into the dashboard
///
/// # Request Body
///
/// ```json
/// { "username": "owner", "password": "..." }
/// ```
///
/// # Response
///
/// - **200 OK** - sets the `session` cookie
/// - **400 Bad Request** - username or password missing
/// - **401 Unauthorized** - unknown user or wrong password
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let (Some(username), Some(password)) = (
        request.username.filter(|u| !u.is_empty()),
        request.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ValidationError::Credentials.into());
    };

    let verified = match repository::get_admin(&state.db, &username)? {
        Some(user) => verify_password(&password, &user.password_hash),
        None => {
            verify_password(&password, dummy_hash());
            false
        }
    };
    if !verified {
        warn!(username = %username, "rejected dashboard login");
        return Err(ApiError::Unauthorized("Invalid credentials"));
    }

    let now = Utc::now();
    let purged = repository::purge_expired_sessions(&state.db, now)?;
    if purged > 0 {
        debug!(purged, "removed expired sessions");
    }

    let session = Session {
        token: generate_token(),
        username,
        created_at: now,
        expires_at: now + Duration::hours(state.config.session_ttl_hours),
    };
    repository::insert_session(&state.db, &session)?;
    info!(username = %session.username, "admin logged in");

    Ok((
        jar.add(session_cookie(session.token, &state.config)),
        Json(json!({ "success": true, "message": "Login successful" })),
    ))
}

/// Ends the current session, if any, and expires the cookie.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = session_token(&jar) {
        if repository::delete_session(&state.db, &token)? {
            info!("admin logged out");
        }
    }

    Ok((
        jar.remove(removal_cookie(&state.config)),
        Json(json!({ "success": true, "message": "Logged out" })),
    ))
}

/// Reports whether the caller holds a live session.
pub async fn session_status(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let session = match session_token(&jar) {
        Some(token) => repository::find_session(&state.db, &token, Utc::now())?,
        None => None,
    };

    Ok(Json(match session {
        Some(session) => json!({ "authenticated": true, "username": session.username }),
        None => json!({ "authenticated": false }),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderMap, HeaderValue};

    #[test]
    fn hashes_verify_and_never_equal_the_password() {
        let hash = hash_password("correct horse").unwrap();
        assert_ne!(hash, "correct horse");
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn plaintext_stored_passwords_never_match() {
        assert!(!verify_password("hunter2", "hunter2"));
    }

    #[test]
    fn unknown_users_are_checked_against_a_real_hash() {
        assert!(dummy_hash().starts_with("$argon2"));
        assert!(!verify_password("", dummy_hash()));
        assert!(!verify_password("gold-and-silver", dummy_hash()));
    }

    #[test]
    fn session_token_is_read_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=abc123; other=1"),
        );
        assert_eq!(session_token(&CookieJar::from_headers(&headers)).as_deref(), Some("abc123"));

        let mut empty = HeaderMap::new();
        empty.insert(header::COOKIE, HeaderValue::from_static("session="));
        assert_eq!(session_token(&CookieJar::from_headers(&empty)), None);
        assert_eq!(session_token(&CookieJar::new()), None);
    }

    #[test]
    fn cookie_carries_security_attributes() {
        let mut config = AppConfig::default();
        let cookie = session_cookie("tok".into(), &config);
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::hours(8)));
        assert_ne!(cookie.secure(), Some(true));

        config.cookie_secure = true;
        assert_eq!(session_cookie("tok".into(), &config).secure(), Some(true));
        assert_eq!(removal_cookie(&config).secure(), Some(true));
    }

    #[test]
    fn generated_tokens_are_long_and_distinct() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), TOKEN_LEN);
        assert_ne!(a, b);
    }
}
