use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{PgConnection, PgPool};
use tracing::info;

use super::lang::{languages_with_content, localized_text, localized_value, pick_translation, slug_source, LocalizedFields};
use super::links::{parse_project_links, ProjectLink};
use super::slug::{resolve_slug, SlugTable};
use super::tags::resolve_tags;
use super::{group_by, SavedItem};
use crate::errors::AppError;
use crate::models::project::{ProjectImageRow, ProjectRow, ProjectTranslationRow, ProjectUrlRow};
use crate::models::{OwnedTagRow, TagRow};

pub const PROJECT_CATEGORIES: &[&str] = &["project", "work", "study"];

const TEXT_FIELDS: &[&str] = &["title", "subtitle", "description", "summary", "content"];

#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    pub category: Option<String>,
    /// Tag slug or name.
    pub tag: Option<String>,
    pub slug: Option<String>,
    pub featured_cv_only: bool,
}

/// A project with every related row, as loaded for views, the admin
/// dashboard and backups.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectBundle {
    #[serde(flatten)]
    pub project: ProjectRow,
    pub translations: Vec<ProjectTranslationRow>,
    pub images: Vec<ProjectImageRow>,
    pub urls: Vec<ProjectUrlRow>,
    pub tags: Vec<TagRow>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectText {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub content: Option<Value>,
}

impl From<&ProjectTranslationRow> for ProjectText {
    fn from(t: &ProjectTranslationRow) -> Self {
        ProjectText {
            title: t.title.clone(),
            subtitle: t.subtitle.clone(),
            description: t.description.clone(),
            summary: t.summary.clone(),
            content: t.content.clone(),
        }
    }
}

/// Public list item in a single language.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectView {
    pub id: i32,
    pub slug: String,
    pub category: Option<String>,
    pub is_featured_cv: bool,
    /// Language actually served, which differs from the requested one on fallback.
    pub lang: String,
    #[serde(flatten)]
    pub text: ProjectText,
    pub tags: Vec<String>,
    pub images: Vec<ProjectImageRow>,
    pub urls: Vec<ProjectUrlRow>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDetail {
    pub id: i32,
    pub slug: String,
    pub category: Option<String>,
    pub is_featured_cv: bool,
    pub lang: String,
    pub current: ProjectText,
    pub translations: BTreeMap<String, ProjectText>,
    pub tags: Vec<String>,
    pub images: Vec<ProjectImageRow>,
    pub urls: Vec<ProjectUrlRow>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectBundle {
    fn tag_names(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.name.clone()).collect()
    }

    /// `None` when the project has no translation at all.
    pub fn to_view(&self, lang: &str) -> Option<ProjectView> {
        let t = pick_translation(&self.translations, lang)?;
        Some(ProjectView {
            id: self.project.id,
            slug: self.project.slug.clone(),
            category: self.project.category.clone(),
            is_featured_cv: self.project.is_featured_cv,
            lang: t.lang.clone(),
            text: t.into(),
            tags: self.tag_names(),
            images: self.images.clone(),
            urls: self.urls.clone(),
            created_at: self.project.created_at,
            updated_at: self.project.updated_at,
        })
    }

    pub fn to_detail(&self, lang: &str) -> Option<ProjectDetail> {
        let t = pick_translation(&self.translations, lang)?;
        Some(ProjectDetail {
            id: self.project.id,
            slug: self.project.slug.clone(),
            category: self.project.category.clone(),
            is_featured_cv: self.project.is_featured_cv,
            lang: t.lang.clone(),
            current: t.into(),
            translations: self
                .translations
                .iter()
                .map(|t| (t.lang.clone(), t.into()))
                .collect(),
            tags: self.tag_names(),
            images: self.images.clone(),
            urls: self.urls.clone(),
            created_at: self.project.created_at,
            updated_at: self.project.updated_at,
        })
    }
}

/// Loads projects matching `filter`, newest first, with their children.
pub async fn load_projects(pool: &PgPool, filter: &ProjectFilter) -> Result<Vec<ProjectBundle>, sqlx::Error> {
    let projects = sqlx::query_as::<_, ProjectRow>(
        r#"
        SELECT p.id, p.slug, p.category, p.url, p.is_featured_cv, p.created_at, p.updated_at
        FROM projects p
        WHERE ($1::TEXT IS NULL OR p.category = $1)
          AND ($2::TEXT IS NULL OR p.slug = $2)
          AND ($3::TEXT IS NULL OR EXISTS (
                SELECT 1 FROM project_tags pt
                JOIN tags t ON t.id = pt.tag_id
                WHERE pt.project_id = p.id AND (t.slug = $3 OR t.name = $3)))
          AND (NOT $4 OR p.is_featured_cv)
        ORDER BY p.created_at DESC, p.id DESC
        "#,
    )
    .bind(&filter.category)
    .bind(&filter.slug)
    .bind(&filter.tag)
    .bind(filter.featured_cv_only)
    .fetch_all(pool)
    .await?;

    if projects.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i32> = projects.iter().map(|p| p.id).collect();

    let translations = sqlx::query_as::<_, ProjectTranslationRow>(
        "SELECT * FROM project_translations WHERE project_id = ANY($1) ORDER BY id",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;
    let images = sqlx::query_as::<_, ProjectImageRow>(
        "SELECT * FROM project_images WHERE project_id = ANY($1) ORDER BY sort_order, id",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;
    let urls = sqlx::query_as::<_, ProjectUrlRow>(
        "SELECT * FROM project_urls WHERE project_id = ANY($1) ORDER BY sort_order, id",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;
    let tags = sqlx::query_as::<_, OwnedTagRow>(
        r#"
        SELECT pt.project_id AS owner_id, t.id, t.name, t.slug, t.category
        FROM project_tags pt
        JOIN tags t ON t.id = pt.tag_id
        WHERE pt.project_id = ANY($1)
        ORDER BY t.name
        "#,
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let mut translations = group_by(translations, |t| t.project_id);
    let mut images = group_by(images, |i| i.project_id);
    let mut urls = group_by(urls, |u| u.project_id);
    let mut tags = group_by(tags, |t| t.owner_id);

    Ok(projects
        .into_iter()
        .map(|project| {
            let id = project.id;
            ProjectBundle {
                project,
                translations: translations.remove(&id).unwrap_or_default(),
                images: images.remove(&id).unwrap_or_default(),
                urls: urls.remove(&id).unwrap_or_default(),
                tags: tags
                    .remove(&id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(TagRow::from)
                    .collect(),
            }
        })
        .collect())
}

pub async fn find_project(pool: &PgPool, slug: &str) -> Result<Option<ProjectBundle>, sqlx::Error> {
    let filter = ProjectFilter {
        slug: Some(slug.to_string()),
        ..ProjectFilter::default()
    };
    Ok(load_projects(pool, &filter).await?.into_iter().next())
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImagePayload {
    pub url: String,
    #[serde(rename = "type", alias = "image_type", default = "default_image_type")]
    pub image_type: String,
    pub caption: Option<String>,
    pub thumbnail_url: Option<String>,
    pub alt_text: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
}

fn default_image_type() -> String {
    "gallery".to_string()
}

/// Admin form for creating (no `id`) or updating a project. Localized
/// fields arrive flat as `title_es`, `summary_en`, …
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectPayload {
    pub id: Option<i32>,
    pub slug: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub is_featured_cv: bool,
    #[serde(default)]
    pub url: Value,
    #[serde(default)]
    pub urls: Value,
    #[serde(default)]
    pub images: Vec<ImagePayload>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub localized: LocalizedFields,
}

impl ProjectPayload {
    pub fn links(&self) -> Vec<ProjectLink> {
        let links = parse_project_links(&self.url);
        if links.is_empty() {
            parse_project_links(&self.urls)
        } else {
            links
        }
    }

    pub fn validate(&self, langs: &[String]) -> Result<(), AppError> {
        if langs.iter().all(|l| localized_text(&self.localized, "title", l).is_none()) {
            return Err(AppError::Validation(
                "Title is required in at least one language".to_string(),
            ));
        }
        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            if !PROJECT_CATEGORIES.contains(&category) {
                return Err(AppError::Validation(format!(
                    "Invalid category '{category}', expected one of: {}",
                    PROJECT_CATEGORIES.join(", ")
                )));
            }
        }
        if self.images.iter().any(|i| i.url.trim().is_empty()) {
            return Err(AppError::Validation("Every image needs a url".to_string()));
        }
        Ok(())
    }
}

/// Content arrives either as structured JSON or as a JSON document in a string.
fn content_value(value: Option<Value>) -> Option<Value> {
    match value? {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(serde_json::from_str(&s).unwrap_or(Value::String(s))),
        other => Some(other),
    }
}

/// Creates or updates a project and replaces its translations, links,
/// images and tags in one transaction.
pub async fn save_project(pool: &PgPool, payload: &ProjectPayload, langs: &[String]) -> Result<SavedItem, AppError> {
    payload.validate(langs)?;
    let links = payload.links();
    let primary_url = links
        .iter()
        .find(|l| l.url_type == "live")
        .or_else(|| links.first())
        .map(|l| l.url.clone());
    let category = payload.category.as_deref().filter(|c| !c.is_empty());

    let mut tx = pool.begin().await?;

    let source = slug_source(&payload.localized, "title", langs);
    let slug = resolve_slug(
        &mut tx,
        SlugTable::Projects,
        payload.slug.as_deref(),
        source.as_deref(),
        payload.id,
    )
    .await?;

    let id: i32 = match payload.id {
        Some(id) => sqlx::query_scalar(
            r#"
            UPDATE projects
            SET slug = $2, category = $3, url = $4, is_featured_cv = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(&slug)
        .bind(category)
        .bind(&primary_url)
        .bind(payload.is_featured_cv)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Project {id} not found")))?,
        None => {
            sqlx::query_scalar(
                r#"
                INSERT INTO projects (slug, category, url, is_featured_cv)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                "#,
            )
            .bind(&slug)
            .bind(category)
            .bind(&primary_url)
            .bind(payload.is_featured_cv)
            .fetch_one(&mut *tx)
            .await?
        }
    };

    replace_translations(&mut tx, id, &payload.localized, langs).await?;
    replace_links(&mut tx, id, &links).await?;
    replace_images(&mut tx, id, &payload.images).await?;

    sqlx::query("DELETE FROM project_tags WHERE project_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    for tag_id in resolve_tags(&mut tx, &payload.tags).await? {
        sqlx::query("INSERT INTO project_tags (project_id, tag_id) VALUES ($1, $2)")
            .bind(id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    info!("Saved project {id} ({slug})");
    Ok(SavedItem { id, slug })
}

async fn replace_translations(
    conn: &mut PgConnection,
    project_id: i32,
    fields: &LocalizedFields,
    langs: &[String],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM project_translations WHERE project_id = $1")
        .bind(project_id)
        .execute(&mut *conn)
        .await?;
    for lang in languages_with_content(fields, TEXT_FIELDS, langs) {
        sqlx::query(
            r#"
            INSERT INTO project_translations
                (project_id, lang, title, subtitle, description, summary, content)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(project_id)
        .bind(lang)
        .bind(localized_text(fields, "title", lang))
        .bind(localized_text(fields, "subtitle", lang))
        .bind(localized_text(fields, "description", lang))
        .bind(localized_text(fields, "summary", lang))
        .bind(content_value(localized_value(fields, "content", lang)))
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn replace_links(conn: &mut PgConnection, project_id: i32, links: &[ProjectLink]) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM project_urls WHERE project_id = $1")
        .bind(project_id)
        .execute(&mut *conn)
        .await?;
    for link in links {
        sqlx::query(
            "INSERT INTO project_urls (project_id, url_type, url, label, sort_order) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(project_id)
        .bind(&link.url_type)
        .bind(&link.url)
        .bind(&link.label)
        .bind(link.sort_order)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn replace_images(conn: &mut PgConnection, project_id: i32, images: &[ImagePayload]) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM project_images WHERE project_id = $1")
        .bind(project_id)
        .execute(&mut *conn)
        .await?;
    for (idx, image) in images.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO project_images
                (project_id, url, image_type, caption, sort_order, thumbnail_url,
                 alt_text, width, height, file_size, mime_type, is_featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(project_id)
        .bind(image.url.trim())
        .bind(&image.image_type)
        .bind(&image.caption)
        .bind(idx as i32)
        .bind(&image.thumbnail_url)
        .bind(&image.alt_text)
        .bind(image.width)
        .bind(image.height)
        .bind(image.file_size)
        .bind(&image.mime_type)
        .bind(image.is_featured)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}
