use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use sqlx::PgPool;
use tracing::info;

use crate::ai::GithubClient;
use crate::auth::google::GoogleClient;
use crate::cache::ResponseCache;
use crate::config::Config;
use crate::cv::PdfRenderer;
use crate::llm_client::LlmClient;
use crate::media::CloudinaryClient;
use crate::rate_limit::RateLimiter;

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Shared application state injected into all route handlers via Axum extractors.
/// Optional integrations are `None` when their credentials are not configured;
/// their endpoints answer 503.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub cache: ResponseCache,
    pub limiter: Arc<RateLimiter>,
    pub config: Config,
    pub llm: Option<LlmClient>,
    pub media: Option<CloudinaryClient>,
    pub google: Option<GoogleClient>,
    pub github: GithubClient,
    pub pdf: PdfRenderer,
}

impl AppState {
    /// Builds every outbound client from `config` around one shared HTTP pool.
    pub fn new(db: PgPool, cache: ResponseCache, config: Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("portfolio-api/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        let llm = config
            .gemini_api_key
            .clone()
            .map(|key| LlmClient::new(http.clone(), key, config.gemini_model.clone()));
        let media = config
            .cloudinary
            .clone()
            .map(|c| CloudinaryClient::new(http.clone(), c));
        let google = config
            .google
            .clone()
            .map(|g| GoogleClient::new(http.clone(), g));
        let github = GithubClient::new(http.clone(), config.github_token.clone());
        let pdf = PdfRenderer::new(
            http,
            config.pdf_service_url.clone(),
            config.weasyprint_bin.clone(),
        );

        info!(
            "Integrations: gemini={} cloudinary={} google_oauth={} pdf_service={}",
            llm.is_some(),
            media.is_some(),
            google.is_some(),
            config.pdf_service_url.is_some()
        );

        Ok(Self {
            db,
            cache,
            limiter: Arc::new(RateLimiter::new()),
            config,
            llm,
            media,
            google,
            github,
            pdf,
        })
    }
}

/// State over a pool that never connects; suitable for requests rejected
/// before any query runs.
#[cfg(test)]
pub(crate) fn test_state() -> AppState {
    let config = crate::config::test_config();
    let db = sqlx::postgres::PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(200))
        .connect_lazy(&config.database_url)
        .expect("lazy pool");
    test_state_with_pool(db)
}

/// State over a migrated test database.
#[cfg(test)]
pub(crate) fn test_state_with_pool(db: PgPool) -> AppState {
    let config = crate::config::test_config();
    AppState::new(db, ResponseCache::in_memory(), config).expect("test state")
}
