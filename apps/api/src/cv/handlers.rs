use axum::{
    extract::{Query, State},
    http::{header, HeaderValue},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::info;

use super::builder::{get_cv_data, Resume};
use super::pdf::pdf_filename;
use super::render::render_html;
use crate::cache::{lang_key, LOOKUP_TTL};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CvQuery {
    pub lang: Option<String>,
}

async fn require_cv(state: &AppState, lang: &str) -> Result<Resume, AppError> {
    get_cv_data(state, lang)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No CV data available for '{lang}'")))
}

/// GET /api/cv
pub async fn get_cv_json(
    State(state): State<AppState>,
    Query(q): Query<CvQuery>,
) -> Result<Json<Resume>, AppError> {
    let lang = state.config.resolve_lang(q.lang.as_deref());
    let key = lang_key("/api/cv", &lang, None, None);
    let resume = state
        .cache
        .get_or_load(&key, LOOKUP_TTL, || require_cv(&state, &lang))
        .await?;
    Ok(Json(resume))
}

/// GET /cv
pub async fn get_cv_page(
    State(state): State<AppState>,
    Query(q): Query<CvQuery>,
) -> Result<Html<String>, AppError> {
    let lang = state.config.resolve_lang(q.lang.as_deref());
    let resume = require_cv(&state, &lang).await?;
    Ok(Html(render_html(&resume, &lang)))
}

/// GET /cv/pdf
pub async fn download_cv_pdf(
    State(state): State<AppState>,
    Query(q): Query<CvQuery>,
) -> Result<Response, AppError> {
    let lang = state.config.resolve_lang(q.lang.as_deref());
    let resume = require_cv(&state, &lang).await?;
    let html = render_html(&resume, &lang);
    let pdf = state.pdf.render(&html, &lang).await?;

    let filename = pdf_filename(&resume.basics.name, &lang);
    info!("Serving {filename} ({} bytes)", pdf.len());
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf,
    )
        .into_response())
}
