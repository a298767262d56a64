use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    Json,
};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::extractors::CurrentUser;
use super::google::GoogleClient;
use super::session::{
    build_cookie, create_session, delete_session, expired_cookie, read_cookie, tokens_match,
    SESSION_COOKIE, STATE_COOKIE, STATE_MAX_AGE_SECS,
};
use super::users::upsert_google_user;
use crate::errors::AppError;
use crate::models::user::{Role, User};
use crate::state::AppState;

fn google_client(state: &AppState) -> Result<&GoogleClient, AppError> {
    state
        .google
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("Google sign-in is not configured".to_string()))
}

/// GET /auth/login/google
pub async fn login_google(State(state): State<AppState>) -> Result<Response, AppError> {
    let google = google_client(&state)?;
    let oauth_state = Uuid::new_v4().simple().to_string();
    let url = google.authorize_url(&oauth_state)?;
    let cookie = build_cookie(
        STATE_COOKIE,
        &oauth_state,
        STATE_MAX_AGE_SECS,
        state.config.secure_cookies,
    );
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Redirect::to(url.as_str()),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// GET /auth/google/callback
pub async fn google_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<CallbackQuery>,
) -> Result<Response, AppError> {
    let google = google_client(&state)?;
    if let Some(error) = q.error {
        return Err(AppError::Validation(format!(
            "Google sign-in was not completed: {error}"
        )));
    }

    let expected = read_cookie(&headers, STATE_COOKIE);
    match (q.state.as_deref(), expected.as_deref()) {
        (Some(received), Some(expected)) if tokens_match(received, expected) => {}
        _ => {
            warn!("OAuth callback with missing or mismatched state");
            return Err(AppError::Validation("Invalid OAuth state".to_string()));
        }
    }
    let code = q
        .code
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Missing authorization code".to_string()))?;

    let access_token = google.exchange_code(&code).await?;
    let profile = google.fetch_user(&access_token).await?;
    if !profile.verified_email {
        warn!("Rejected sign-in for unverified email {}", profile.email);
        return Err(AppError::Forbidden);
    }

    let country = headers
        .get("x-country")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|c| !c.is_empty());
    let user = upsert_google_user(&state.db, &profile, country, state.config.admin_email.as_deref()).await?;
    if user.role() == Role::Banned {
        warn!("Banned user {} attempted to sign in", user.email);
        return Err(AppError::Forbidden);
    }

    let token = create_session(&state.db, user.id, state.config.session_ttl_hours).await?;
    info!("User {} signed in ({})", user.email, user.role);

    let secure = state.config.secure_cookies;
    let session_cookie = build_cookie(
        SESSION_COOKIE,
        &token,
        state.config.session_ttl_hours * 3600,
        secure,
    );
    let target = if user.role() == Role::Admin { "/admin" } else { "/" };
    Ok((
        AppendHeaders([
            (header::SET_COOKIE, session_cookie),
            (header::SET_COOKIE, expired_cookie(STATE_COOKIE, secure)),
        ]),
        Redirect::to(target),
    )
        .into_response())
}

/// GET /auth/logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    if let Some(token) = read_cookie(&headers, SESSION_COOKIE) {
        delete_session(&state.db, &token).await?;
    }
    Ok((
        AppendHeaders([(
            header::SET_COOKIE,
            expired_cookie(SESSION_COOKIE, state.config.secure_cookies),
        )]),
        Redirect::to("/auth/login/google"),
    )
        .into_response())
}

/// GET /auth/me
pub async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}
