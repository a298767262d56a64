use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use super::Localized;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProjectRow {
    pub id: i32,
    pub slug: String,
    pub category: Option<String>,
    pub url: Option<String>,
    pub is_featured_cv: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProjectTranslationRow {
    pub id: i32,
    pub project_id: i32,
    pub lang: String,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub content: Option<Value>,
}

impl Localized for ProjectTranslationRow {
    fn lang(&self) -> &str {
        &self.lang
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProjectImageRow {
    pub id: i32,
    pub project_id: i32,
    pub url: String,
    pub image_type: String,
    pub caption: Option<String>,
    pub sort_order: i32,
    pub thumbnail_url: Option<String>,
    pub alt_text: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub is_featured: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProjectUrlRow {
    pub id: i32,
    pub project_id: i32,
    pub url_type: String,
    pub url: String,
    pub label: Option<String>,
    pub sort_order: i32,
}
