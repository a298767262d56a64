use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

use crate::config::GoogleOAuthConfig;
use crate::errors::AppError;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const SCOPE: &str = "email profile";

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Google returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid authorize URL: {0}")]
    Url(String),
}

impl From<OAuthError> for AppError {
    fn from(e: OAuthError) -> Self {
        AppError::Upstream(format!("Google sign-in failed: {e}"))
    }
}

/// Profile returned by the userinfo endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleUser {
    pub email: String,
    #[serde(default)]
    pub verified_email: bool,
    pub name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Authorization-code flow against Google's OAuth 2.0 endpoints.
#[derive(Clone)]
pub struct GoogleClient {
    http: reqwest::Client,
    config: GoogleOAuthConfig,
}

impl GoogleClient {
    pub fn new(http: reqwest::Client, config: GoogleOAuthConfig) -> Self {
        Self { http, config }
    }

    pub fn authorize_url(&self, state: &str) -> Result<Url, OAuthError> {
        Url::parse_with_params(
            AUTHORIZE_URL,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", SCOPE),
                ("state", state),
                ("access_type", "online"),
                ("prompt", "select_account"),
            ],
        )
        .map_err(|e| OAuthError::Url(e.to_string()))
    }

    /// Exchanges an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String, OAuthError> {
        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json::<TokenResponse>().await?.access_token)
    }

    pub async fn fetch_user(&self, access_token: &str) -> Result<GoogleUser, OAuthError> {
        let response = self
            .http
            .get(USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json::<GoogleUser>().await?)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, OAuthError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(OAuthError::Api {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GoogleClient {
        GoogleClient::new(
            reqwest::Client::new(),
            GoogleOAuthConfig {
                client_id: "client-123".to_string(),
                client_secret: "secret".to_string(),
                redirect_url: "https://portfolio.dev/auth/google/callback".to_string(),
            },
        )
    }

    #[test]
    fn test_authorize_url_carries_state_and_redirect() {
        let url = client().authorize_url("state-abc").unwrap();
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(url.host_str(), Some("accounts.google.com"));
        assert_eq!(params["client_id"], "client-123");
        assert_eq!(params["state"], "state-abc");
        assert_eq!(params["scope"], "email profile");
        assert_eq!(params["redirect_uri"], "https://portfolio.dev/auth/google/callback");
    }

    #[test]
    fn test_user_defaults_unverified() {
        let user: GoogleUser = serde_json::from_str(r#"{"email": "a@b.c"}"#).unwrap();
        assert!(!user.verified_email);
    }
}
