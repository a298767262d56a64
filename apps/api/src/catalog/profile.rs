use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use tracing::info;

use super::lang::{languages_with_content, localized_text, localized_value, pick_translation, LocalizedFields};
use super::slug::{resolve_slug, SlugTable};
use super::{non_blank, SavedItem};
use crate::errors::AppError;
use crate::models::profile::{ProfileRow, ProfileTranslationRow};

const TEXT_FIELDS: &[&str] = &["role", "tagline", "bio", "languages"];

#[derive(Debug, Clone, Serialize)]
pub struct ProfileBundle {
    #[serde(flatten)]
    pub profile: ProfileRow,
    pub translations: Vec<ProfileTranslationRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileView {
    pub slug: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<Value>,
    pub avatar_url: Option<String>,
    pub social: Option<Value>,
    pub lang: String,
    pub role: Option<String>,
    pub tagline: Option<String>,
    pub bio: Option<String>,
    pub languages: Option<Value>,
}

impl ProfileBundle {
    pub fn translation(&self, lang: &str) -> Option<&ProfileTranslationRow> {
        pick_translation(&self.translations, lang)
    }

    /// A profile without translations still renders its contact details.
    pub fn to_view(&self, lang: &str) -> ProfileView {
        let t = self.translation(lang);
        let p = &self.profile;
        ProfileView {
            slug: p.slug.clone(),
            name: p.name.clone(),
            email: p.email.clone(),
            phone: p.phone.clone(),
            location: p.location.clone(),
            avatar_url: p.avatar_url.clone(),
            social: p.social_links.clone(),
            lang: t.map_or_else(|| lang.to_string(), |t| t.lang.clone()),
            role: t.and_then(|t| t.role.clone()),
            tagline: t.and_then(|t| t.tagline.clone()),
            bio: t.and_then(|t| t.bio.clone()),
            languages: t.and_then(|t| t.languages.clone()),
        }
    }
}

/// The site owner's profile, if one was saved.
pub async fn load_profile(pool: &PgPool) -> Result<Option<ProfileBundle>, sqlx::Error> {
    let Some(profile) = sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles ORDER BY id LIMIT 1")
        .fetch_optional(pool)
        .await?
    else {
        return Ok(None);
    };
    let translations = sqlx::query_as::<_, ProfileTranslationRow>(
        "SELECT * FROM profile_translations WHERE profile_id = $1 ORDER BY id",
    )
    .bind(profile.id)
    .fetch_all(pool)
    .await?;
    Ok(Some(ProfileBundle { profile, translations }))
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfilePayload {
    pub slug: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Value,
    #[serde(alias = "avatar")]
    pub avatar_url: Option<String>,
    #[serde(rename = "social", alias = "social_links", default)]
    pub social_links: Value,
    #[serde(flatten)]
    pub localized: LocalizedFields,
}

fn json_or_none(value: &Value) -> Option<&Value> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        other => Some(other),
    }
}

/// Creates the profile or updates the existing one.
pub async fn save_profile(pool: &PgPool, payload: &ProfilePayload, langs: &[String]) -> Result<SavedItem, AppError> {
    let name = non_blank(&payload.name).ok_or_else(|| AppError::Validation("Name is required".to_string()))?;

    let mut tx = pool.begin().await?;
    let existing: Option<i32> = sqlx::query_scalar("SELECT id FROM profiles ORDER BY id LIMIT 1")
        .fetch_optional(&mut *tx)
        .await?;
    let slug = resolve_slug(&mut tx, SlugTable::Profiles, payload.slug.as_deref(), Some(name), existing).await?;

    let id: i32 = match existing {
        Some(id) => {
            sqlx::query_scalar(
                r#"
                UPDATE profiles
                SET slug = $2, name = $3, email = $4, phone = $5, location = $6,
                    avatar_url = $7, social_links = $8, updated_at = NOW()
                WHERE id = $1
                RETURNING id
                "#,
            )
            .bind(id)
            .bind(&slug)
            .bind(name)
            .bind(non_blank(&payload.email))
            .bind(non_blank(&payload.phone))
            .bind(json_or_none(&payload.location))
            .bind(non_blank(&payload.avatar_url))
            .bind(json_or_none(&payload.social_links))
            .fetch_one(&mut *tx)
            .await?
        }
        None => {
            sqlx::query_scalar(
                r#"
                INSERT INTO profiles (slug, name, email, phone, location, avatar_url, social_links)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING id
                "#,
            )
            .bind(&slug)
            .bind(name)
            .bind(non_blank(&payload.email))
            .bind(non_blank(&payload.phone))
            .bind(json_or_none(&payload.location))
            .bind(non_blank(&payload.avatar_url))
            .bind(json_or_none(&payload.social_links))
            .fetch_one(&mut *tx)
            .await?
        }
    };

    sqlx::query("DELETE FROM profile_translations WHERE profile_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    for lang in languages_with_content(&payload.localized, TEXT_FIELDS, langs) {
        sqlx::query(
            r#"
            INSERT INTO profile_translations (profile_id, lang, role, tagline, bio, languages)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(lang)
        .bind(localized_text(&payload.localized, "role", lang))
        .bind(localized_text(&payload.localized, "tagline", lang))
        .bind(localized_text(&payload.localized, "bio", lang))
        .bind(localized_value(&payload.localized, "languages", lang))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    info!("Saved profile {id} ({slug})");
    Ok(SavedItem { id, slug })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn bundle(translations: Vec<ProfileTranslationRow>) -> ProfileBundle {
        let now = Utc::now();
        ProfileBundle {
            profile: ProfileRow {
                id: 1,
                slug: "ada-lovelace".to_string(),
                name: "Ada Lovelace".to_string(),
                email: Some("ada@example.com".to_string()),
                phone: None,
                location: Some(json!({"city": "London", "country": "United Kingdom"})),
                avatar_url: None,
                social_links: Some(json!({"github": "https://github.com/ada"})),
                created_at: now,
                updated_at: now,
            },
            translations,
        }
    }

    #[test]
    fn test_view_without_translation_keeps_contact_details() {
        let view = bundle(Vec::new()).to_view("en");
        assert_eq!(view.name, "Ada Lovelace");
        assert_eq!(view.lang, "en");
        assert!(view.role.is_none());
        assert_eq!(view.social.unwrap()["github"], "https://github.com/ada");
    }

    #[test]
    fn test_view_picks_translation() {
        let view = bundle(vec![ProfileTranslationRow {
            id: 1,
            profile_id: 1,
            lang: "es".to_string(),
            role: Some("Ingeniera".to_string()),
            tagline: None,
            bio: Some("Bio".to_string()),
            languages: None,
        }])
        .to_view("en");
        assert_eq!(view.lang, "es");
        assert_eq!(view.role.as_deref(), Some("Ingeniera"));
    }

    #[test]
    fn test_payload_social_alias() {
        let p: ProfilePayload = serde_json::from_value(json!({
            "name": "Ada",
            "social_links": {"linkedin": "https://linkedin.com/in/ada"},
            "role_en": "Engineer"
        }))
        .unwrap();
        assert!(p.social_links.is_object());
        assert!(json_or_none(&p.location).is_none());
        assert_eq!(p.localized.len(), 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_save_profile_keeps_a_single_row(pool: PgPool) {
        let langs = vec!["es".to_string(), "en".to_string()];
        let form: ProfilePayload = serde_json::from_value(json!({
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "location": {"city": "London", "country": "United Kingdom"},
            "social": {"github": "https://github.com/ada"},
            "role_en": "Data Engineer",
            "bio_es": "Ingeniera de datos"
        }))
        .unwrap();
        let first = save_profile(&pool, &form, &langs).await.unwrap();
        assert_eq!(first.slug, "ada-lovelace");

        let mut edit = form.clone();
        edit.email = Some("ada@lovelace.dev".to_string());
        let second = save_profile(&pool, &edit, &langs).await.unwrap();
        assert_eq!(second.id, first.id);

        let profile = load_profile(&pool).await.unwrap().unwrap();
        assert_eq!(profile.profile.email.as_deref(), Some("ada@lovelace.dev"));
        assert_eq!(profile.translations.len(), 2);
        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_profile_requires_name(pool: PgPool) {
        let form: ProfilePayload = serde_json::from_value(json!({"email": "x@y.z"})).unwrap();
        let err = save_profile(&pool, &form, &["en".to_string()]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
