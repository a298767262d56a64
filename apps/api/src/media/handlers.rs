use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::cloudinary::{browse_prefix, BrowsedImage, UploadedImage, DEFAULT_FOLDER};
use super::CloudinaryClient;
use crate::auth::AdminAccess;
use crate::errors::AppError;
use crate::state::AppState;

fn media_client(state: &AppState) -> Result<&CloudinaryClient, AppError> {
    state
        .media
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("Image hosting is not configured".to_string()))
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(flatten)]
    pub image: UploadedImage,
}

/// POST /admin/upload-image
pub async fn upload_image(
    State(state): State<AppState>,
    admin: AdminAccess,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let client = media_client(&state)?;

    let mut file: Option<(Bytes, String)> = None;
    let mut folder = DEFAULT_FOLDER.to_string();
    let mut public_id: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read file: {e}")))?;
                if !data.is_empty() {
                    file = Some((data, file_name));
                }
            }
            Some("folder") => {
                let value = field.text().await.unwrap_or_default();
                if !value.trim().is_empty() {
                    folder = value.trim().to_string();
                }
            }
            Some("public_id") => {
                let value = field.text().await.unwrap_or_default();
                public_id = Some(value.trim().to_string()).filter(|v| !v.is_empty());
            }
            _ => {}
        }
    }

    let (data, file_name) = file.ok_or_else(|| AppError::Validation("No file provided".to_string()))?;
    info!("{} uploading {file_name} ({} bytes) to {folder}", admin.actor(), data.len());
    let image = client.upload(data, file_name, &folder, public_id.as_deref()).await?;
    Ok(Json(UploadResponse { success: true, image }))
}

#[derive(Debug, Deserialize)]
pub struct DeleteImageRequest {
    pub public_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteImageResponse {
    pub success: bool,
    pub result: String,
}

/// POST /admin/delete-image
pub async fn delete_image(
    State(state): State<AppState>,
    _admin: AdminAccess,
    Json(req): Json<DeleteImageRequest>,
) -> Result<Json<DeleteImageResponse>, AppError> {
    let client = media_client(&state)?;
    let public_id = req
        .public_id
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::Validation("No public_id provided".to_string()))?;
    let result = client.destroy(public_id).await?;
    Ok(Json(DeleteImageResponse {
        success: result == "ok",
        result,
    }))
}

#[derive(Debug, Serialize)]
pub struct BrowseResponse {
    pub success: bool,
    pub prefix: String,
    pub images: Vec<BrowsedImage>,
}

async fn browse(state: &AppState, project_slug: Option<&str>) -> Result<Json<BrowseResponse>, AppError> {
    let client = media_client(state)?;
    let prefix = browse_prefix(project_slug);
    let images = client.browse(&prefix).await?;
    Ok(Json(BrowseResponse {
        success: true,
        prefix,
        images,
    }))
}

/// GET /admin/cloudinary/browse
pub async fn browse_all(State(state): State<AppState>, _admin: AdminAccess) -> Result<Json<BrowseResponse>, AppError> {
    browse(&state, None).await
}

/// GET /admin/cloudinary/browse/:project_slug
pub async fn browse_project(
    State(state): State<AppState>,
    _admin: AdminAccess,
    Path(project_slug): Path<String>,
) -> Result<Json<BrowseResponse>, AppError> {
    browse(&state, Some(&project_slug)).await
}
