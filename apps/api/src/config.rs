use std::path::PathBuf;

use anyhow::{Context, Result};

/// Google OAuth client registration. Present only when all three variables are set.
#[derive(Debug, Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

/// Cloudinary account credentials. Present only when all three variables are set.
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Application configuration loaded from environment variables.
/// Only `DATABASE_URL` is required; every external integration is optional
/// and its endpoints answer 503 when unconfigured.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub default_lang: String,
    pub supported_langs: Vec<String>,
    pub admin_token: Option<String>,
    pub admin_email: Option<String>,
    pub google: Option<GoogleOAuthConfig>,
    pub session_ttl_hours: i64,
    pub secure_cookies: bool,
    pub cloudinary: Option<CloudinaryConfig>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub github_token: Option<String>,
    pub pdf_service_url: Option<String>,
    pub weasyprint_bin: String,
    pub cv_fallback_path: PathBuf,
    pub cors_origins: Vec<String>,
    /// Reverse proxies in front of the service. `X-Forwarded-For` is only
    /// read when this is non-zero.
    pub trusted_proxy_hops: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let default_lang = env_or("DEFAULT_LANG", "es").to_lowercase();
        let mut supported_langs = parse_list(&env_or("SUPPORTED_LANGS", "es,en"), true);
        if !supported_langs.contains(&default_lang) {
            supported_langs.insert(0, default_lang.clone());
        }

        let google = match (
            optional_env("GOOGLE_CLIENT_ID"),
            optional_env("GOOGLE_CLIENT_SECRET"),
            optional_env("GOOGLE_REDIRECT_URL"),
        ) {
            (Some(client_id), Some(client_secret), Some(redirect_url)) => Some(GoogleOAuthConfig {
                client_id,
                client_secret,
                redirect_url,
            }),
            _ => None,
        };

        let cloudinary = match (
            optional_env("CLOUDINARY_CLOUD_NAME"),
            optional_env("CLOUDINARY_API_KEY"),
            optional_env("CLOUDINARY_API_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => None,
        };

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: optional_env("REDIS_URL"),
            port: env_or("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
            default_lang,
            supported_langs,
            admin_token: optional_env("ADMIN_TOKEN"),
            admin_email: optional_env("ADMIN_EMAIL").map(|e| e.to_lowercase()),
            google,
            session_ttl_hours: env_or("SESSION_TTL_HOURS", "12")
                .parse::<i64>()
                .context("SESSION_TTL_HOURS must be an integer")?,
            secure_cookies: env_or("SECURE_COOKIES", "false")
                .parse::<bool>()
                .context("SECURE_COOKIES must be true or false")?,
            cloudinary,
            gemini_api_key: optional_env("GEMINI_API_KEY"),
            gemini_model: env_or("GEMINI_MODEL", "gemini-2.0-flash"),
            github_token: optional_env("GITHUB_TOKEN"),
            pdf_service_url: optional_env("PDF_SERVICE_URL")
                .map(|u| u.trim_end_matches('/').to_string()),
            weasyprint_bin: env_or("WEASYPRINT_BIN", "weasyprint"),
            cv_fallback_path: PathBuf::from(env_or("CV_FALLBACK_PATH", "data/resume.json")),
            cors_origins: parse_list(&env_or("CORS_ORIGINS", ""), false),
            trusted_proxy_hops: env_or("TRUSTED_PROXY_HOPS", "0")
                .parse::<usize>()
                .context("TRUSTED_PROXY_HOPS must be a non-negative integer")?,
        })
    }

    /// Resolves the `lang` query parameter against the configured languages.
    /// Unknown codes are passed through so stored translations in other
    /// languages stay reachable; a missing code means the default language.
    pub fn resolve_lang(&self, requested: Option<&str>) -> String {
        requested
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| self.default_lang.clone())
    }
}

/// Splits a comma-separated list, trimming entries and dropping empties.
pub fn parse_list(raw: &str, lowercase: bool) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| if lowercase { s.to_lowercase() } else { s.to_string() })
        .collect()
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/portfolio_test".to_string(),
        redis_url: None,
        port: 0,
        rust_log: "debug".to_string(),
        default_lang: "es".to_string(),
        supported_langs: vec!["es".to_string(), "en".to_string()],
        admin_token: Some("s3cr3t-token".to_string()),
        admin_email: Some("owner@example.com".to_string()),
        google: None,
        session_ttl_hours: 12,
        secure_cookies: false,
        cloudinary: None,
        gemini_api_key: None,
        gemini_model: "gemini-2.0-flash".to_string(),
        github_token: None,
        pdf_service_url: None,
        weasyprint_bin: "weasyprint-missing-for-tests".to_string(),
        cv_fallback_path: PathBuf::from("does/not/exist.json"),
        cors_origins: vec![],
        trusted_proxy_hops: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_trims_and_drops_empties() {
        assert_eq!(parse_list(" es, EN ,,fr ", true), vec!["es", "en", "fr"]);
    }

    #[test]
    fn test_parse_list_keeps_case_for_origins() {
        assert_eq!(
            parse_list("https://Example.com,", false),
            vec!["https://Example.com"]
        );
    }

    #[test]
    fn test_parse_list_empty_input() {
        assert!(parse_list("", true).is_empty());
    }

    #[test]
    fn test_resolve_lang_defaults_and_normalizes() {
        let config = test_config();
        assert_eq!(config.resolve_lang(None), "es");
        assert_eq!(config.resolve_lang(Some("  ")), "es");
        assert_eq!(config.resolve_lang(Some("EN")), "en");
        assert_eq!(config.resolve_lang(Some("fr")), "fr");
    }
}
