use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::certifications::{load_certifications, CertificationView};
use super::education::{load_educations, EducationView};
use super::experience::{load_experiences, ExperienceView};
use super::profile::{load_profile, ProfileView};
use super::projects::{find_project, load_projects, ProjectDetail, ProjectFilter, ProjectView};
use super::skills::{load_skills, SkillView};
use super::tags::{tag_counts, TagCount};
use super::{list_categories, list_languages, CategoryCount, CategoryKind};
use crate::cache::{lang_key, CONTENT_TTL, LOOKUP_TTL};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub lang: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl ListQuery {
    fn category(&self) -> Option<&str> {
        self.category.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }

    fn tag(&self) -> Option<&str> {
        self.tag.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

/// A localized list.
#[derive(Debug, Serialize, Deserialize)]
pub struct Listing<T> {
    pub lang: String,
    pub count: usize,
    pub items: Vec<T>,
}

impl<T> Listing<T> {
    fn new(lang: &str, items: Vec<T>) -> Self {
        Listing {
            lang: lang.to_string(),
            count: items.len(),
            items,
        }
    }
}

/// GET /api/projects
pub async fn list_projects(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Listing<ProjectView>>, AppError> {
    let lang = state.config.resolve_lang(q.lang.as_deref());
    let key = lang_key("/api/projects", &lang, q.tag(), q.category());
    let listing = state
        .cache
        .get_or_load(&key, CONTENT_TTL, || async {
            let filter = ProjectFilter {
                category: q.category().map(String::from),
                tag: q.tag().map(String::from),
                ..ProjectFilter::default()
            };
            let bundles = load_projects(&state.db, &filter).await?;
            let items = bundles.iter().filter_map(|b| b.to_view(&lang)).collect();
            Ok::<_, AppError>(Listing::new(&lang, items))
        })
        .await?;
    Ok(Json(listing))
}

/// GET /api/projects/:slug
pub async fn get_project(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(q): Query<ListQuery>,
) -> Result<Json<ProjectDetail>, AppError> {
    let lang = state.config.resolve_lang(q.lang.as_deref());
    let key = lang_key(&format!("/api/projects/{slug}"), &lang, None, None);
    let detail = state
        .cache
        .get_or_load(&key, CONTENT_TTL, || async {
            find_project(&state.db, &slug)
                .await?
                .and_then(|b| b.to_detail(&lang))
                .ok_or_else(|| AppError::ProjectNotFound {
                    slug: slug.clone(),
                })
        })
        .await?;
    Ok(Json(detail))
}

/// GET /api/experience
pub async fn list_experience(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Listing<ExperienceView>>, AppError> {
    let lang = state.config.resolve_lang(q.lang.as_deref());
    let key = lang_key("/api/experience", &lang, None, None);
    let listing = state
        .cache
        .get_or_load(&key, CONTENT_TTL, || async {
            let bundles = load_experiences(&state.db).await?;
            let items = bundles.iter().filter_map(|b| b.to_view(&lang)).collect();
            Ok::<_, AppError>(Listing::new(&lang, items))
        })
        .await?;
    Ok(Json(listing))
}

/// GET /api/education
pub async fn list_education(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Listing<EducationView>>, AppError> {
    let lang = state.config.resolve_lang(q.lang.as_deref());
    let key = lang_key("/api/education", &lang, None, None);
    let listing = state
        .cache
        .get_or_load(&key, CONTENT_TTL, || async {
            let bundles = load_educations(&state.db).await?;
            let items = bundles.iter().filter_map(|b| b.to_view(&lang)).collect();
            Ok::<_, AppError>(Listing::new(&lang, items))
        })
        .await?;
    Ok(Json(listing))
}

/// GET /api/skills
pub async fn list_skills(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Listing<SkillView>>, AppError> {
    let lang = state.config.resolve_lang(q.lang.as_deref());
    let key = lang_key("/api/skills", &lang, None, q.category());
    let listing = state
        .cache
        .get_or_load(&key, CONTENT_TTL, || async {
            let bundles = load_skills(&state.db, q.category(), false).await?;
            let items = bundles.iter().filter_map(|b| b.to_view(&lang)).collect();
            Ok::<_, AppError>(Listing::new(&lang, items))
        })
        .await?;
    Ok(Json(listing))
}

/// GET /api/certifications
pub async fn list_certifications(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Listing<CertificationView>>, AppError> {
    let lang = state.config.resolve_lang(q.lang.as_deref());
    let key = lang_key("/api/certifications", &lang, None, None);
    let listing = state
        .cache
        .get_or_load(&key, CONTENT_TTL, || async {
            let bundles = load_certifications(&state.db).await?;
            let items = bundles.iter().filter_map(|b| b.to_view(&lang)).collect();
            Ok::<_, AppError>(Listing::new(&lang, items))
        })
        .await?;
    Ok(Json(listing))
}

/// GET /api/profile
pub async fn get_profile(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<ProfileView>, AppError> {
    let lang = state.config.resolve_lang(q.lang.as_deref());
    let key = lang_key("/api/profile", &lang, None, None);
    let view = state
        .cache
        .get_or_load(&key, LOOKUP_TTL, || async {
            load_profile(&state.db)
                .await?
                .map(|p| p.to_view(&lang))
                .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))
        })
        .await?;
    Ok(Json(view))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LanguagesResponse {
    pub languages: Vec<String>,
    pub count: usize,
}

/// GET /api/languages
pub async fn get_languages(State(state): State<AppState>) -> Result<Json<LanguagesResponse>, AppError> {
    let response = state
        .cache
        .get_or_load("/api/languages", LOOKUP_TTL, || async {
            let languages = list_languages(&state.db).await?;
            Ok::<_, AppError>(LanguagesResponse {
                count: languages.len(),
                languages,
            })
        })
        .await?;
    Ok(Json(response))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoriesResponse {
    #[serde(rename = "type")]
    pub kind: String,
    pub categories: Vec<CategoryCount>,
    pub count: usize,
}

/// GET /api/categories
pub async fn get_categories(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<CategoriesResponse>, AppError> {
    let raw_kind = q.kind.as_deref().unwrap_or("project");
    let kind: CategoryKind = raw_kind.parse()?;
    let key = lang_key("/api/categories", "all", Some(raw_kind), None);
    let response = state
        .cache
        .get_or_load(&key, LOOKUP_TTL, || async {
            let categories = list_categories(&state.db, kind).await?;
            Ok::<_, AppError>(CategoriesResponse {
                kind: raw_kind.to_string(),
                count: categories.len(),
                categories,
            })
        })
        .await?;
    Ok(Json(response))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TagsResponse {
    pub tags: Vec<TagCount>,
    pub total: usize,
}

/// GET /api/tags
pub async fn get_tags(State(state): State<AppState>) -> Result<Json<TagsResponse>, AppError> {
    let response = state
        .cache
        .get_or_load("/api/tags", LOOKUP_TTL, || async {
            let tags = tag_counts(&state.db).await?;
            Ok::<_, AppError>(TagsResponse {
                total: tags.len(),
                tags,
            })
        })
        .await?;
    Ok(Json(response))
}
