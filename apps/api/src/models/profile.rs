use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use super::Localized;

/// The site owner. There is at most one row; `location` is
/// `{city, region, country}` and `social_links` maps network → URL.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProfileRow {
    pub id: i32,
    pub slug: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<Value>,
    pub avatar_url: Option<String>,
    pub social_links: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProfileTranslationRow {
    pub id: i32,
    pub profile_id: i32,
    pub lang: String,
    pub role: Option<String>,
    pub tagline: Option<String>,
    pub bio: Option<String>,
    /// Spoken languages as `[{language, fluency}]`, already in this translation's language.
    pub languages: Option<Value>,
}

impl Localized for ProfileTranslationRow {
    fn lang(&self) -> &str {
        &self.lang
    }
}
