use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap};
use tracing::warn;

use super::session::{find_session_user, read_cookie, tokens_match, SESSION_COOKIE};
use crate::errors::AppError;
use crate::models::user::{Role, User};
use crate::state::AppState;

/// Grants access to admin routes.
///
/// A bearer token must equal `ADMIN_TOKEN`; a wrong token is rejected
/// outright without falling back to the session. Without a bearer token the
/// session cookie must belong to an admin (403 for other roles).
#[derive(Debug, Clone)]
pub enum AdminAccess {
    Token,
    Session(User),
}

impl AdminAccess {
    /// Who performed an admin action, for logs.
    pub fn actor(&self) -> String {
        match self {
            AdminAccess::Token => "api-token".to_string(),
            AdminAccess::Session(user) => user.email.clone(),
        }
    }
}

/// The signed-in user of any role.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

async fn session_user(parts: &Parts, state: &AppState) -> Result<Option<User>, AppError> {
    let Some(token) = read_cookie(&parts.headers, SESSION_COOKIE) else {
        return Ok(None);
    };
    Ok(find_session_user(&state.db, &token).await?)
}

#[async_trait]
impl FromRequestParts<AppState> for AdminAccess {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(token) = bearer_token(&parts.headers) {
            let valid = state
                .config
                .admin_token
                .as_deref()
                .is_some_and(|expected| tokens_match(token, expected));
            if !valid {
                warn!("Rejected admin request with invalid bearer token on {}", parts.uri.path());
                return Err(AppError::Unauthorized);
            }
            return Ok(AdminAccess::Token);
        }

        let user = session_user(parts, state).await?.ok_or(AppError::Unauthorized)?;
        match user.role() {
            Role::Admin => Ok(AdminAccess::Session(user)),
            role => {
                warn!("User {} ({}) denied admin access", user.email, role.as_str());
                Err(AppError::Forbidden)
            }
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        session_user(parts, state)
            .await?
            .map(CurrentUser)
            .ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, "Bearer  tok ".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("tok"));

        headers.insert(header::AUTHORIZATION, "Bearer ".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }

    async fn admin_with(authorization: Option<&str>) -> Result<AdminAccess, AppError> {
        let state = crate::state::test_state();
        let mut builder = axum::http::Request::builder().uri("/admin");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        AdminAccess::from_request_parts(&mut parts, &state).await
    }

    #[tokio::test]
    async fn test_admin_token_grants_access() {
        let access = admin_with(Some("Bearer s3cr3t-token")).await.unwrap();
        assert_eq!(access.actor(), "api-token");
    }

    #[tokio::test]
    async fn test_wrong_token_is_unauthorized() {
        assert!(matches!(admin_with(Some("Bearer nope")).await, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_missing_credentials_is_unauthorized() {
        assert!(matches!(admin_with(None).await, Err(AppError::Unauthorized)));
    }
}
