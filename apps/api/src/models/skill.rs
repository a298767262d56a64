use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Localized;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SkillRow {
    pub id: i32,
    pub slug: String,
    pub icon_url: Option<String>,
    /// 0–100.
    pub proficiency: i32,
    pub category: Option<String>,
    pub sort_order: i32,
    pub show_in_cv: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SkillTranslationRow {
    pub id: i32,
    pub skill_id: i32,
    pub lang: String,
    pub name: String,
    pub description: Option<String>,
}

impl Localized for SkillTranslationRow {
    fn lang(&self) -> &str {
        &self.lang
    }
}
