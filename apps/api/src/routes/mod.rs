pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    response::Redirect,
    routing::{delete, get, post},
    Router,
};

use crate::admin::handlers as admin;
use crate::ai::handlers as ai;
use crate::analytics::handlers as analytics;
use crate::auth::handlers as auth;
use crate::catalog::handlers as catalog;
use crate::cv::handlers as cv;
use crate::errors::AppError;
use crate::media::handlers as media;
use crate::rate_limit::{enforce, RateLimitState, RateTier};
use crate::state::AppState;

/// Largest accepted image upload.
const UPLOAD_LIMIT_BYTES: usize = 10 * 1024 * 1024;

async fn index() -> Redirect {
    Redirect::to("/api/health")
}

async fn route_not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

pub fn build_router(state: AppState) -> Router {
    let limit = |tier: RateTier| RateLimitState {
        limiter: state.limiter.clone(),
        tier,
        trusted_proxy_hops: state.config.trusted_proxy_hops,
    };

    // Cheap lookups
    let generous = Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/health", get(health::api_health))
        .route("/api/languages", get(catalog::get_languages))
        .route("/api/categories", get(catalog::get_categories))
        .route("/api/tags", get(catalog::get_tags))
        .route("/api/profile", get(catalog::get_profile))
        .route_layer(middleware::from_fn_with_state(limit(RateTier::Generous), enforce));

    // Content reads
    let api = Router::new()
        .route("/api/projects", get(catalog::list_projects))
        .route("/api/projects/:slug", get(catalog::get_project))
        .route("/api/experience", get(catalog::list_experience))
        .route("/api/education", get(catalog::list_education))
        .route("/api/skills", get(catalog::list_skills))
        .route("/api/certifications", get(catalog::list_certifications))
        .route("/api/cv", get(cv::get_cv_json))
        .route(
            "/api/analytics/projects/:slug/events",
            post(analytics::record_project_event),
        )
        .route_layer(middleware::from_fn_with_state(limit(RateTier::Api), enforce));

    // Rendering and model calls
    let strict = Router::new()
        .route("/cv", get(cv::get_cv_page))
        .route("/cv/pdf", get(cv::download_cv_pdf))
        .route("/admin/ai/generate-project", post(ai::generate_project))
        .route_layer(middleware::from_fn_with_state(limit(RateTier::Strict), enforce));

    let auth = Router::new()
        .route("/auth/login/google", get(auth::login_google))
        .route("/auth/google/callback", get(auth::google_callback))
        .route("/auth/logout", get(auth::logout))
        .route("/auth/me", get(auth::me));

    let admin = Router::new()
        .route("/admin", get(admin::dashboard))
        .route("/admin/check", get(admin::check_database))
        .route("/admin/backup", get(admin::backup))
        .route("/admin/cache/clear", post(admin::clear_cache))
        .route("/admin/save/project", post(admin::save_project_handler))
        .route("/admin/save/experience", post(admin::save_experience_handler))
        .route("/admin/save/education", post(admin::save_education_handler))
        .route("/admin/save/skill", post(admin::save_skill_handler))
        .route("/admin/save/certification", post(admin::save_certification_handler))
        .route("/admin/save/profile", post(admin::save_profile_handler))
        .route(
            "/admin/delete/project/:id",
            delete(admin::delete_project).post(admin::delete_project),
        )
        .route("/admin/delete/:kind/:id", delete(admin::delete_content))
        .route(
            "/admin/upload-image",
            post(media::upload_image).layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES)),
        )
        .route("/admin/delete-image", post(media::delete_image))
        .route("/admin/cloudinary/browse", get(media::browse_all))
        .route("/admin/cloudinary/browse/:project_slug", get(media::browse_project))
        .route("/admin/analytics", get(analytics::analytics_overview))
        .route("/admin/analytics/:slug/events", get(analytics::project_events));

    Router::new()
        .route("/", get(index))
        .merge(generous)
        .merge(api)
        .merge(strict)
        .merge(auth)
        .merge(admin)
        .fallback(route_not_found)
        .with_state(state)
}
