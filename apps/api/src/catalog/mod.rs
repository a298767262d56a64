//! Portfolio content: projects, experience, education, skills,
//! certifications and the owner profile, each with per-language
//! translations.

pub mod certifications;
pub mod education;
pub mod experience;
pub mod handlers;
pub mod lang;
pub mod links;
pub mod profile;
pub mod projects;
pub mod skills;
pub mod slug;
pub mod tags;

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::info;

use crate::errors::AppError;

/// Returned by every admin save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedItem {
    pub id: i32,
    pub slug: String,
}

/// Content types that can be deleted by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Project,
    Experience,
    Education,
    Skill,
    Certification,
}

impl ContentKind {
    fn table(self) -> &'static str {
        match self {
            ContentKind::Project => "projects",
            ContentKind::Experience => "experiences",
            ContentKind::Education => "educations",
            ContentKind::Skill => "skills",
            ContentKind::Certification => "certifications",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Project => "project",
            ContentKind::Experience => "experience",
            ContentKind::Education => "education",
            ContentKind::Skill => "skill",
            ContentKind::Certification => "certification",
        }
    }
}

impl FromStr for ContentKind {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "project" => Ok(ContentKind::Project),
            "experience" => Ok(ContentKind::Experience),
            "education" => Ok(ContentKind::Education),
            "skill" => Ok(ContentKind::Skill),
            "certification" => Ok(ContentKind::Certification),
            other => Err(AppError::Validation(format!("Unknown content type '{other}'"))),
        }
    }
}

/// Deletes one item; translations, images, links, courses and tag links
/// go with it through `ON DELETE CASCADE`. Tags themselves are kept.
pub async fn delete_item(pool: &PgPool, kind: ContentKind, id: i32) -> Result<(), AppError> {
    let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", kind.table()))
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("{} {id} not found", kind.as_str())));
    }
    info!("Deleted {} {id}", kind.as_str());
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

/// Every language code that has at least one translation, sorted.
pub async fn list_languages(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT lang FROM project_translations
        UNION SELECT lang FROM experience_translations
        UNION SELECT lang FROM education_translations
        UNION SELECT lang FROM skill_translations
        UNION SELECT lang FROM certification_translations
        UNION SELECT lang FROM profile_translations
        ORDER BY lang
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Kinds of rows that carry a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryKind {
    Project,
    Skill,
}

impl FromStr for CategoryKind {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "project" => Ok(CategoryKind::Project),
            "skill" => Ok(CategoryKind::Skill),
            other => Err(AppError::Validation(format!(
                "Unknown category type '{other}', expected project or skill"
            ))),
        }
    }
}

pub async fn list_categories(pool: &PgPool, kind: CategoryKind) -> Result<Vec<CategoryCount>, sqlx::Error> {
    let table = match kind {
        CategoryKind::Project => "projects",
        CategoryKind::Skill => "skills",
    };
    sqlx::query_as::<_, CategoryCount>(&format!(
        r#"
        SELECT category, COUNT(*)::BIGINT AS count
        FROM {table}
        WHERE category IS NOT NULL AND category <> ''
        GROUP BY category
        ORDER BY category
        "#
    ))
    .fetch_all(pool)
    .await
}

/// Groups child rows by their parent id, keeping their order.
pub(crate) fn group_by<T>(rows: Vec<T>, key: impl Fn(&T) -> i32) -> HashMap<i32, Vec<T>> {
    let mut grouped: HashMap<i32, Vec<T>> = HashMap::new();
    for row in rows {
        grouped.entry(key(&row)).or_default().push(row);
    }
    grouped
}

/// Trimmed value of an optional form field, `None` when blank.
pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
