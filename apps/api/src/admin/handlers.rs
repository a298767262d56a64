use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;

use super::{backup_filename, load_snapshot, Backup, BACKUP_VERSION};
use crate::auth::AdminAccess;
use crate::catalog::certifications::{save_certification, CertificationPayload};
use crate::catalog::education::{save_education, EducationPayload};
use crate::catalog::experience::{save_experience, ExperiencePayload};
use crate::catalog::profile::{save_profile, ProfilePayload};
use crate::catalog::projects::{save_project, ProjectPayload};
use crate::catalog::skills::{save_skill, SkillPayload};
use crate::catalog::{delete_item, ContentKind, SavedItem};
use crate::db::ping_with_retries;
use crate::errors::AppError;
use crate::state::AppState;

const CHECK_ATTEMPTS: u32 = 3;

/// Invalidates cached content and shapes the save response.
async fn saved(state: &AppState, admin: &AdminAccess, kind: &str, item: SavedItem) -> Json<Value> {
    state.cache.invalidate_content().await;
    info!("{} saved {kind} {} ({})", admin.actor(), item.id, item.slug);
    Json(json!({ "success": true, "id": item.id, "slug": item.slug }))
}

/// POST /admin/save/project
pub async fn save_project_handler(
    State(state): State<AppState>,
    admin: AdminAccess,
    Json(payload): Json<ProjectPayload>,
) -> Result<Json<Value>, AppError> {
    let item = save_project(&state.db, &payload, &state.config.supported_langs).await?;
    Ok(saved(&state, &admin, "project", item).await)
}

/// POST /admin/save/experience
pub async fn save_experience_handler(
    State(state): State<AppState>,
    admin: AdminAccess,
    Json(payload): Json<ExperiencePayload>,
) -> Result<Json<Value>, AppError> {
    let item = save_experience(&state.db, &payload, &state.config.supported_langs).await?;
    Ok(saved(&state, &admin, "experience", item).await)
}

/// POST /admin/save/education
pub async fn save_education_handler(
    State(state): State<AppState>,
    admin: AdminAccess,
    Json(payload): Json<EducationPayload>,
) -> Result<Json<Value>, AppError> {
    let item = save_education(&state.db, &payload, &state.config.supported_langs).await?;
    Ok(saved(&state, &admin, "education", item).await)
}

/// POST /admin/save/skill
pub async fn save_skill_handler(
    State(state): State<AppState>,
    admin: AdminAccess,
    Json(payload): Json<SkillPayload>,
) -> Result<Json<Value>, AppError> {
    let item = save_skill(&state.db, &payload, &state.config.supported_langs).await?;
    Ok(saved(&state, &admin, "skill", item).await)
}

/// POST /admin/save/certification
pub async fn save_certification_handler(
    State(state): State<AppState>,
    admin: AdminAccess,
    Json(payload): Json<CertificationPayload>,
) -> Result<Json<Value>, AppError> {
    let item = save_certification(&state.db, &payload, &state.config.supported_langs).await?;
    Ok(saved(&state, &admin, "certification", item).await)
}

/// POST /admin/save/profile
pub async fn save_profile_handler(
    State(state): State<AppState>,
    admin: AdminAccess,
    Json(payload): Json<ProfilePayload>,
) -> Result<Json<Value>, AppError> {
    let item = save_profile(&state.db, &payload, &state.config.supported_langs).await?;
    Ok(saved(&state, &admin, "profile", item).await)
}

async fn delete_and_invalidate(
    state: &AppState,
    admin: &AdminAccess,
    kind: ContentKind,
    id: i32,
) -> Result<Json<Value>, AppError> {
    delete_item(&state.db, kind, id).await?;
    state.cache.invalidate_content().await;
    info!("{} deleted {} {id}", admin.actor(), kind.as_str());
    Ok(Json(json!({ "success": true, "id": id, "type": kind.as_str() })))
}

/// DELETE|POST /admin/delete/project/:id
pub async fn delete_project(
    State(state): State<AppState>,
    admin: AdminAccess,
    Path(id): Path<i32>,
) -> Result<Json<Value>, AppError> {
    delete_and_invalidate(&state, &admin, ContentKind::Project, id).await
}

/// DELETE /admin/delete/:kind/:id
pub async fn delete_content(
    State(state): State<AppState>,
    admin: AdminAccess,
    Path((kind, id)): Path<(String, i32)>,
) -> Result<Json<Value>, AppError> {
    let kind: ContentKind = kind.parse()?;
    delete_and_invalidate(&state, &admin, kind, id).await
}

/// GET /admin
pub async fn dashboard(
    State(state): State<AppState>,
    admin: AdminAccess,
) -> Result<Json<Value>, AppError> {
    let content = load_snapshot(&state.db).await?;
    Ok(Json(json!({
        "admin": admin.actor(),
        "languages": state.config.supported_langs,
        "counts": content.counts(),
        "content": content,
    })))
}

/// GET /admin/check
pub async fn check_database(State(state): State<AppState>, _admin: AdminAccess) -> Json<Value> {
    let ready = ping_with_retries(&state.db, CHECK_ATTEMPTS).await;
    Json(json!({ "ready": ready }))
}

/// GET /admin/backup
pub async fn backup(
    State(state): State<AppState>,
    admin: AdminAccess,
) -> Result<Response, AppError> {
    let timestamp = Utc::now();
    let backup = Backup {
        timestamp,
        version: BACKUP_VERSION,
        content: load_snapshot(&state.db).await?,
    };
    let filename = backup_filename(timestamp);
    info!("{} exported {filename}", admin.actor());

    let disposition = HeaderValue::from_str(&format!("attachment; filename={filename}"))
        .map_err(|e| AppError::Internal(e.into()))?;
    Ok(([(header::CONTENT_DISPOSITION, disposition)], Json(backup)).into_response())
}

/// POST /admin/cache/clear
pub async fn clear_cache(
    State(state): State<AppState>,
    admin: AdminAccess,
) -> Result<Json<Value>, AppError> {
    state
        .cache
        .clear()
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
    info!("{} cleared the cache", admin.actor());
    Ok(Json(json!({ "success": true, "backend": state.cache.backend_name() })))
}
