use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Localized;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExperienceRow {
    pub id: i32,
    pub slug: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub current: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExperienceTranslationRow {
    pub id: i32,
    pub experience_id: i32,
    pub lang: String,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub description: Option<String>,
}

impl Localized for ExperienceTranslationRow {
    fn lang(&self) -> &str {
        &self.lang
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EducationRow {
    pub id: i32,
    pub slug: String,
    pub institution: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub current: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EducationTranslationRow {
    pub id: i32,
    pub education_id: i32,
    pub lang: String,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub description: Option<String>,
}

impl Localized for EducationTranslationRow {
    fn lang(&self) -> &str {
        &self.lang
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CourseRow {
    pub id: i32,
    pub education_id: i32,
    pub name: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CertificationRow {
    pub id: i32,
    pub slug: String,
    pub issuer: Option<String>,
    pub issue_date: Option<String>,
    pub expiry_date: Option<String>,
    pub credential_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CertificationTranslationRow {
    pub id: i32,
    pub certification_id: i32,
    pub lang: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl Localized for CertificationTranslationRow {
    fn lang(&self) -> &str {
        &self.lang
    }
}
