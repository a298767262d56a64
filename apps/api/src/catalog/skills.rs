use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;

use super::lang::{languages_with_content, localized_text, pick_translation, slug_source, LocalizedFields};
use super::slug::{resolve_slug, SlugTable};
use super::{group_by, non_blank, SavedItem};
use crate::errors::AppError;
use crate::models::skill::{SkillRow, SkillTranslationRow};

const DEFAULT_PROFICIENCY: i32 = 50;

#[derive(Debug, Clone, Serialize)]
pub struct SkillBundle {
    #[serde(flatten)]
    pub skill: SkillRow,
    pub translations: Vec<SkillTranslationRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillView {
    pub id: i32,
    pub slug: String,
    pub icon_url: Option<String>,
    pub proficiency: i32,
    pub category: Option<String>,
    pub sort_order: i32,
    pub show_in_cv: bool,
    pub lang: String,
    pub name: String,
    pub description: Option<String>,
}

impl SkillBundle {
    pub fn to_view(&self, lang: &str) -> Option<SkillView> {
        let t = pick_translation(&self.translations, lang)?;
        let s = &self.skill;
        Some(SkillView {
            id: s.id,
            slug: s.slug.clone(),
            icon_url: s.icon_url.clone(),
            proficiency: s.proficiency,
            category: s.category.clone(),
            sort_order: s.sort_order,
            show_in_cv: s.show_in_cv,
            lang: t.lang.clone(),
            name: t.name.clone(),
            description: t.description.clone(),
        })
    }
}

/// Skills ordered by `sort_order`, optionally restricted to one category
/// or to those shown on the CV.
pub async fn load_skills(
    pool: &PgPool,
    category: Option<&str>,
    cv_only: bool,
) -> Result<Vec<SkillBundle>, sqlx::Error> {
    let rows = sqlx::query_as::<_, SkillRow>(
        r#"
        SELECT * FROM skills
        WHERE ($1::TEXT IS NULL OR category = $1)
          AND (NOT $2 OR show_in_cv)
        ORDER BY sort_order ASC, id ASC
        "#,
    )
    .bind(category)
    .bind(cv_only)
    .fetch_all(pool)
    .await?;
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
    let translations = sqlx::query_as::<_, SkillTranslationRow>(
        "SELECT * FROM skill_translations WHERE skill_id = ANY($1) ORDER BY id",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let mut translations = group_by(translations, |t| t.skill_id);
    Ok(rows
        .into_iter()
        .map(|skill| {
            let id = skill.id;
            SkillBundle {
                skill,
                translations: translations.remove(&id).unwrap_or_default(),
            }
        })
        .collect())
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct SkillPayload {
    pub id: Option<i32>,
    pub slug: Option<String>,
    pub icon_url: Option<String>,
    pub proficiency: Option<i64>,
    pub category: Option<String>,
    #[serde(rename = "order", alias = "sort_order", default)]
    pub sort_order: i32,
    #[serde(default = "default_true")]
    pub show_in_cv: bool,
    #[serde(flatten)]
    pub localized: LocalizedFields,
}

impl SkillPayload {
    pub fn proficiency(&self) -> Result<i32, AppError> {
        match self.proficiency {
            None => Ok(DEFAULT_PROFICIENCY),
            Some(p) if (0..=100).contains(&p) => Ok(p as i32),
            Some(p) => Err(AppError::Validation(format!(
                "Proficiency must be between 0 and 100, got {p}"
            ))),
        }
    }
}

pub async fn save_skill(pool: &PgPool, payload: &SkillPayload, langs: &[String]) -> Result<SavedItem, AppError> {
    let proficiency = payload.proficiency()?;
    let fallback_name = slug_source(&payload.localized, "name", langs)
        .ok_or_else(|| AppError::Validation("Name is required in at least one language".to_string()))?;
    let category = non_blank(&payload.category);

    let mut tx = pool.begin().await?;
    let slug = resolve_slug(
        &mut tx,
        SlugTable::Skills,
        payload.slug.as_deref(),
        Some(&fallback_name),
        payload.id,
    )
    .await?;

    let id: i32 = match payload.id {
        Some(id) => sqlx::query_scalar(
            r#"
            UPDATE skills
            SET slug = $2, icon_url = $3, proficiency = $4, category = $5, sort_order = $6,
                show_in_cv = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(&slug)
        .bind(non_blank(&payload.icon_url))
        .bind(proficiency)
        .bind(category)
        .bind(payload.sort_order)
        .bind(payload.show_in_cv)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Skill {id} not found")))?,
        None => {
            sqlx::query_scalar(
                r#"
                INSERT INTO skills (slug, icon_url, proficiency, category, sort_order, show_in_cv)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id
                "#,
            )
            .bind(&slug)
            .bind(non_blank(&payload.icon_url))
            .bind(proficiency)
            .bind(category)
            .bind(payload.sort_order)
            .bind(payload.show_in_cv)
            .fetch_one(&mut *tx)
            .await?
        }
    };

    sqlx::query("DELETE FROM skill_translations WHERE skill_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    for lang in languages_with_content(&payload.localized, &["name", "description"], langs) {
        // Name is mandatory per row; a language with only a description reuses another name.
        let name = localized_text(&payload.localized, "name", lang).unwrap_or_else(|| fallback_name.clone());
        sqlx::query("INSERT INTO skill_translations (skill_id, lang, name, description) VALUES ($1, $2, $3, $4)")
            .bind(id)
            .bind(lang)
            .bind(name)
            .bind(localized_text(&payload.localized, "description", lang))
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    info!("Saved skill {id} ({slug})");
    Ok(SavedItem { id, slug })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> SkillPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_proficiency_bounds() {
        assert_eq!(payload(json!({"name_en": "Rust"})).proficiency().unwrap(), 50);
        assert_eq!(payload(json!({"proficiency": 100})).proficiency().unwrap(), 100);
        assert_eq!(payload(json!({"proficiency": 0})).proficiency().unwrap(), 0);
        assert!(payload(json!({"proficiency": 101})).proficiency().is_err());
        assert!(payload(json!({"proficiency": -1})).proficiency().is_err());
    }

    #[test]
    fn test_payload_defaults() {
        let p = payload(json!({"name_es": "Python", "order": 3}));
        assert!(p.show_in_cv);
        assert_eq!(p.sort_order, 3);
        assert!(!p.localized.contains_key("order"));
    }

    fn langs() -> Vec<String> {
        vec!["es".to_string(), "en".to_string()]
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_save_skill_and_filter_for_cv(pool: PgPool) {
        let rust: SkillPayload = serde_json::from_value(json!({
            "name_en": "Rust",
            "category": "languages",
            "proficiency": 85
        }))
        .unwrap();
        let hidden: SkillPayload = serde_json::from_value(json!({
            "name_en": "Excel",
            "category": "other",
            "show_in_cv": false
        }))
        .unwrap();
        let saved = save_skill(&pool, &rust, &langs()).await.unwrap();
        save_skill(&pool, &hidden, &langs()).await.unwrap();
        assert_eq!(saved.slug, "rust");

        let all = load_skills(&pool, None, false).await.unwrap();
        assert_eq!(all.len(), 2);
        let cv = load_skills(&pool, None, true).await.unwrap();
        assert_eq!(cv.len(), 1);
        assert_eq!(cv[0].skill.proficiency, 85);
        let languages = load_skills(&pool, Some("languages"), false).await.unwrap();
        assert_eq!(languages[0].translations[0].name, "Rust");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_out_of_range_proficiency_is_rejected(pool: PgPool) {
        let form: SkillPayload =
            serde_json::from_value(json!({"name_en": "Go", "proficiency": 120})).unwrap();
        let err = save_skill(&pool, &form, &langs()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
