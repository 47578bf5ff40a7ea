use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;

use crate::auth::session_token;
use crate::database::AppState;
use crate::error::ApiError;
use crate::repository;

/// Middleware guarding the dashboard's write endpoints
///
/// Requires a `session` cookie that maps to a live session. On success the
/// [`Session`](crate::model::Session) is stored in the request extensions so
/// handlers can tell who made the change.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = session_token(&CookieJar::from_headers(request.headers()))
        .ok_or(ApiError::Unauthorized("Authentication required"))?;

    let session = repository::find_session(&state.db, &token, Utc::now())?
        .ok_or(ApiError::Unauthorized("Session expired or invalid"))?;

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}
