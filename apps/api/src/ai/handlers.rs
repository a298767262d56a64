use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::github::parse_repo_url;
use super::prompts::{project_draft_prompt, PROJECT_DRAFT_SYSTEM};
use crate::auth::AdminAccess;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateProjectBody {
    pub repo_url: String,
    pub model: Option<String>,
}

/// POST /admin/ai/generate-project
pub async fn generate_project(
    State(state): State<AppState>,
    admin: AdminAccess,
    Json(body): Json<GenerateProjectBody>,
) -> Result<Json<Value>, AppError> {
    let llm = state
        .llm
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("AI drafting is not configured (GEMINI_API_KEY)".to_string()))?;
    let repo = parse_repo_url(&body.repo_url)?;

    info!("{} requested an AI draft for {}", admin.actor(), repo.full_name());
    let context = state.github.gather_context(&repo).await?;
    let prompt = project_draft_prompt(&repo.html_url(), &repo.raw_base(&context.branch), &context.text);

    let model = body.model.as_deref();
    let draft: Value = llm.call_json(model, &prompt, PROJECT_DRAFT_SYSTEM).await?;

    Ok(Json(json!({
        "success": true,
        "repo": repo.full_name(),
        "model": model.map(str::trim).filter(|m| !m.is_empty()).unwrap_or(llm.default_model()),
        "data": draft,
    })))
}
