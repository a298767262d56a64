use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::CloudinaryConfig;
use crate::errors::AppError;

const API_BASE: &str = "https://api.cloudinary.com/v1_1";
const DELIVERY_BASE: &str = "https://res.cloudinary.com";
pub const DEFAULT_FOLDER: &str = "portfolio";
pub const BROWSE_LIMIT: u32 = 500;

/// Breakpoint widths served by [`responsive_urls`].
pub const RESPONSIVE_SIZES: &[(&str, u32)] = &[
    ("thumbnail", 300),
    ("mobile", 640),
    ("tablet", 1024),
    ("desktop", 1920),
];

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Cloudinary returned {status}: {message}")]
    Api { status: u16, message: String },
}

impl From<MediaError> for AppError {
    fn from(e: MediaError) -> Self {
        AppError::Upstream(format!("Image service error: {e}"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedImage {
    pub url: String,
    pub public_id: String,
    pub format: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub size: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowsedImage {
    pub public_id: String,
    pub url: String,
    pub thumbnail: String,
    pub created_at: Option<String>,
}

#[derive(Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
    format: Option<String>,
    width: Option<i64>,
    height: Option<i64>,
    bytes: Option<i64>,
}

#[derive(Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Deserialize)]
struct ResourcesResponse {
    #[serde(default)]
    resources: Vec<Resource>,
}

#[derive(Deserialize)]
struct Resource {
    public_id: String,
    secure_url: String,
    created_at: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorMessage,
}

#[derive(Deserialize)]
struct ApiErrorMessage {
    message: String,
}

/// Signature for an authenticated Cloudinary call: the parameters sorted by
/// name, joined as `k=v&k=v`, with the API secret appended, SHA-1 hex
/// (the account default).
/// `file`, `api_key` and `resource_type` are never signed.
pub fn sign_params(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let to_sign = params
        .iter()
        .filter(|(k, v)| !matches!(**k, "file" | "api_key" | "resource_type") && !v.is_empty())
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    let mut hasher = Sha1::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Delivery URL with automatic format and quality; when sized, the image is
/// cropped with `crop` around the detected subject.
pub fn optimized_url(
    cloud_name: &str,
    public_id: &str,
    width: Option<u32>,
    height: Option<u32>,
    crop: &str,
    quality: &str,
) -> String {
    let sized = width.is_some() || height.is_some();
    let mut parts = Vec::new();
    if sized {
        parts.push(format!("c_{crop}"));
    }
    parts.push("f_auto".to_string());
    if sized {
        parts.push("g_auto".to_string());
    }
    if let Some(h) = height {
        parts.push(format!("h_{h}"));
    }
    parts.push(format!("q_{quality}"));
    if let Some(w) = width {
        parts.push(format!("w_{w}"));
    }
    format!(
        "{DELIVERY_BASE}/{cloud_name}/image/upload/{}/{public_id}",
        parts.join(",")
    )
}

pub fn responsive_urls(cloud_name: &str, public_id: &str) -> BTreeMap<String, String> {
    RESPONSIVE_SIZES
        .iter()
        .map(|(name, width)| {
            (
                name.to_string(),
                optimized_url(cloud_name, public_id, Some(*width), None, "auto", "auto"),
            )
        })
        .collect()
}

/// Public id of a Cloudinary delivery URL: the path after `/upload/`
/// without the `v<digits>` version segment and the file extension.
pub fn extract_public_id(url: &str) -> Option<String> {
    let (_, path) = url.split_once("/upload/")?;
    let path = match path.split_once('/') {
        Some((first, rest))
            if first.len() > 1
                && first.starts_with('v')
                && first[1..].chars().all(|c| c.is_ascii_digit()) =>
        {
            rest
        }
        _ => path,
    };
    let last_segment_start = path.rfind('/').map_or(0, |i| i + 1);
    let public_id = match path[last_segment_start..].rfind('.') {
        Some(dot) => &path[..last_segment_start + dot],
        None => path,
    };
    (!public_id.is_empty()).then(|| public_id.to_string())
}

/// Folder prefix for browsing, optionally narrowed to one project.
pub fn browse_prefix(project_slug: Option<&str>) -> String {
    match project_slug.map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => format!("{DEFAULT_FOLDER}/{slug}/"),
        None => format!("{DEFAULT_FOLDER}/"),
    }
}

#[derive(Clone)]
pub struct CloudinaryClient {
    http: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryClient {
    pub fn new(http: reqwest::Client, config: CloudinaryConfig) -> Self {
        Self { http, config }
    }

    pub fn cloud_name(&self) -> &str {
        &self.config.cloud_name
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{API_BASE}/{}/{action}", self.config.cloud_name)
    }

    fn signed(&self, mut params: BTreeMap<&'static str, String>) -> BTreeMap<&'static str, String> {
        params.insert("timestamp", Utc::now().timestamp().to_string());
        let signature = sign_params(&params, &self.config.api_secret);
        params.insert("signature", signature);
        params.insert("api_key", self.config.api_key.clone());
        params
    }

    pub async fn upload(
        &self,
        file: Bytes,
        file_name: String,
        folder: &str,
        public_id: Option<&str>,
    ) -> Result<UploadedImage, MediaError> {
        let mut params = BTreeMap::new();
        params.insert("folder", folder.to_string());
        if let Some(public_id) = public_id {
            params.insert("public_id", public_id.to_string());
        }

        let mut form = Form::new().part("file", Part::bytes(file.to_vec()).file_name(file_name));
        for (key, value) in self.signed(params) {
            form = form.text(key, value);
        }

        let response = self
            .http
            .post(self.endpoint("image/upload"))
            .multipart(form)
            .send()
            .await?;
        let uploaded: UploadResponse = parse_response(response).await?;
        info!("Uploaded image {} to Cloudinary", uploaded.public_id);
        Ok(UploadedImage {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
            format: uploaded.format,
            width: uploaded.width,
            height: uploaded.height,
            size: uploaded.bytes,
        })
    }

    /// Deletes an image, returning Cloudinary's verdict (`ok`, `not found`).
    pub async fn destroy(&self, public_id: &str) -> Result<String, MediaError> {
        let mut params = BTreeMap::new();
        params.insert("public_id", public_id.to_string());
        let response = self
            .http
            .post(self.endpoint("image/destroy"))
            .form(&self.signed(params))
            .send()
            .await?;
        let destroyed: DestroyResponse = parse_response(response).await?;
        if destroyed.result == "ok" {
            info!("Deleted Cloudinary image {public_id}");
        } else {
            warn!("Cloudinary delete of {public_id} returned '{}'", destroyed.result);
        }
        Ok(destroyed.result)
    }

    /// Lists uploaded images under `prefix` through the Admin API.
    pub async fn browse(&self, prefix: &str) -> Result<Vec<BrowsedImage>, MediaError> {
        let response = self
            .http
            .get(self.endpoint("resources/image/upload"))
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
            .query(&[
                ("prefix", prefix.to_string()),
                ("max_results", BROWSE_LIMIT.to_string()),
            ])
            .send()
            .await?;
        let listing: ResourcesResponse = parse_response(response).await?;
        Ok(listing
            .resources
            .into_iter()
            .map(|r| BrowsedImage {
                thumbnail: optimized_url(
                    self.cloud_name(),
                    &r.public_id,
                    Some(300),
                    Some(300),
                    "fill",
                    "auto",
                ),
                public_id: r.public_id,
                url: r.secure_url,
                created_at: r.created_at,
            })
            .collect())
    }
}

async fn parse_response<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T, MediaError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|b| b.error.message)
        .unwrap_or(body);
    Err(MediaError::Api {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_params_matches_documented_example() {
        let mut params = BTreeMap::new();
        params.insert("eager", "w_400,h_300,c_pad|w_260,h_200,c_crop".to_string());
        params.insert("public_id", "sample_image".to_string());
        params.insert("timestamp", "1315060510".to_string());
        assert_eq!(
            sign_params(&params, "abcd"),
            "bfd09f95f331f558cbd1320e67aa8d488770583e"
        );
    }

    #[test]
    fn test_sign_params_skips_unsigned_and_empty_fields() {
        let mut signed = BTreeMap::new();
        signed.insert("public_id", "sample_image".to_string());
        signed.insert("timestamp", "1315060510".to_string());

        let mut extra = signed.clone();
        extra.insert("api_key", "123456".to_string());
        extra.insert("resource_type", "image".to_string());
        extra.insert("folder", String::new());

        assert_eq!(sign_params(&extra, "abcd"), sign_params(&signed, "abcd"));
    }

    #[test]
    fn test_optimized_url_unsized() {
        assert_eq!(
            optimized_url("demo", "portfolio/a", None, None, "auto", "auto"),
            "https://res.cloudinary.com/demo/image/upload/f_auto,q_auto/portfolio/a"
        );
    }

    #[test]
    fn test_optimized_url_sized() {
        assert_eq!(
            optimized_url("demo", "portfolio/a", Some(300), Some(200), "fill", "80"),
            "https://res.cloudinary.com/demo/image/upload/c_fill,f_auto,g_auto,h_200,q_80,w_300/portfolio/a"
        );
    }

    #[test]
    fn test_responsive_urls_breakpoints() {
        let urls = responsive_urls("demo", "x");
        assert_eq!(urls.len(), 4);
        assert!(urls["mobile"].contains("w_640"));
        assert!(urls["desktop"].contains("w_1920"));
    }

    #[test]
    fn test_extract_public_id_strips_version_and_extension() {
        assert_eq!(
            extract_public_id("https://res.cloudinary.com/demo/image/upload/v1699/portfolio/app/shot.png").as_deref(),
            Some("portfolio/app/shot")
        );
    }

    #[test]
    fn test_extract_public_id_without_version() {
        assert_eq!(
            extract_public_id("https://res.cloudinary.com/demo/image/upload/portfolio/v2.final/img.jpg").as_deref(),
            Some("portfolio/v2.final/img")
        );
        assert_eq!(
            extract_public_id("https://res.cloudinary.com/demo/image/upload/videos/intro").as_deref(),
            Some("videos/intro")
        );
    }

    #[test]
    fn test_extract_public_id_rejects_foreign_urls() {
        assert_eq!(extract_public_id("https://example.com/image.png"), None);
    }

    #[test]
    fn test_browse_prefix() {
        assert_eq!(browse_prefix(None), "portfolio/");
        assert_eq!(browse_prefix(Some("pipeline")), "portfolio/pipeline/");
        assert_eq!(browse_prefix(Some("  ")), "portfolio/");
    }
}
