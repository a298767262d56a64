use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;

use super::lang::{languages_with_content, localized_text, pick_translation, slug_source, LocalizedFields};
use super::slug::{resolve_slug, SlugTable};
use super::tags::resolve_tags;
use super::{group_by, non_blank, SavedItem};
use crate::errors::AppError;
use crate::models::career::{ExperienceRow, ExperienceTranslationRow};
use crate::models::{OwnedTagRow, TagRow};

const TEXT_FIELDS: &[&str] = &["title", "subtitle", "description"];

#[derive(Debug, Clone, Serialize)]
pub struct ExperienceBundle {
    #[serde(flatten)]
    pub experience: ExperienceRow,
    pub translations: Vec<ExperienceTranslationRow>,
    pub tags: Vec<TagRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceView {
    pub id: i32,
    pub slug: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub current: bool,
    pub lang: String,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

impl ExperienceBundle {
    pub fn to_view(&self, lang: &str) -> Option<ExperienceView> {
        let t = pick_translation(&self.translations, lang)?;
        let e = &self.experience;
        Some(ExperienceView {
            id: e.id,
            slug: e.slug.clone(),
            company: e.company.clone(),
            location: e.location.clone(),
            start_date: e.start_date.clone(),
            end_date: e.end_date.clone(),
            current: e.current,
            lang: t.lang.clone(),
            title: t.title.clone(),
            subtitle: t.subtitle.clone(),
            description: t.description.clone(),
            tags: self.tags.iter().map(|t| t.name.clone()).collect(),
        })
    }
}

/// Current positions first, then by start date, newest first.
pub async fn load_experiences(pool: &PgPool) -> Result<Vec<ExperienceBundle>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ExperienceRow>(
        r#"
        SELECT * FROM experiences
        ORDER BY current DESC, start_date DESC NULLS LAST, id DESC
        "#,
    )
    .fetch_all(pool)
    .await?;
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();

    let translations = sqlx::query_as::<_, ExperienceTranslationRow>(
        "SELECT * FROM experience_translations WHERE experience_id = ANY($1) ORDER BY id",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;
    let tags = sqlx::query_as::<_, OwnedTagRow>(
        r#"
        SELECT et.experience_id AS owner_id, t.id, t.name, t.slug, t.category
        FROM experience_tags et
        JOIN tags t ON t.id = et.tag_id
        WHERE et.experience_id = ANY($1)
        ORDER BY t.name
        "#,
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let mut translations = group_by(translations, |t| t.experience_id);
    let mut tags = group_by(tags, |t| t.owner_id);
    Ok(rows
        .into_iter()
        .map(|experience| {
            let id = experience.id;
            ExperienceBundle {
                experience,
                translations: translations.remove(&id).unwrap_or_default(),
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

#[derive(Debug, Clone, Deserialize)]
pub struct ExperiencePayload {
    pub id: Option<i32>,
    pub slug: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "startDate", alias = "start_date")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate", alias = "end_date")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub current: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub localized: LocalizedFields,
}

pub async fn save_experience(
    pool: &PgPool,
    payload: &ExperiencePayload,
    langs: &[String],
) -> Result<SavedItem, AppError> {
    let title = slug_source(&payload.localized, "title", langs)
        .ok_or_else(|| AppError::Validation("Title is required in at least one language".to_string()))?;
    let company = non_blank(&payload.company);
    let source = match company {
        Some(company) => format!("{title} {company}"),
        None => title,
    };
    // A current position has no end date.
    let end_date = if payload.current {
        None
    } else {
        non_blank(&payload.end_date)
    };

    let mut tx = pool.begin().await?;
    let slug = resolve_slug(
        &mut tx,
        SlugTable::Experiences,
        payload.slug.as_deref(),
        Some(&source),
        payload.id,
    )
    .await?;

    let id: i32 = match payload.id {
        Some(id) => sqlx::query_scalar(
            r#"
            UPDATE experiences
            SET slug = $2, company = $3, location = $4, start_date = $5, end_date = $6,
                current = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(&slug)
        .bind(company)
        .bind(non_blank(&payload.location))
        .bind(non_blank(&payload.start_date))
        .bind(end_date)
        .bind(payload.current)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Experience {id} not found")))?,
        None => {
            sqlx::query_scalar(
                r#"
                INSERT INTO experiences (slug, company, location, start_date, end_date, current)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id
                "#,
            )
            .bind(&slug)
            .bind(company)
            .bind(non_blank(&payload.location))
            .bind(non_blank(&payload.start_date))
            .bind(end_date)
            .bind(payload.current)
            .fetch_one(&mut *tx)
            .await?
        }
    };

    sqlx::query("DELETE FROM experience_translations WHERE experience_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    for lang in languages_with_content(&payload.localized, TEXT_FIELDS, langs) {
        sqlx::query(
            r#"
            INSERT INTO experience_translations (experience_id, lang, title, subtitle, description)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id)
        .bind(lang)
        .bind(localized_text(&payload.localized, "title", lang))
        .bind(localized_text(&payload.localized, "subtitle", lang))
        .bind(localized_text(&payload.localized, "description", lang))
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("DELETE FROM experience_tags WHERE experience_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    for tag_id in resolve_tags(&mut tx, &payload.tags).await? {
        sqlx::query("INSERT INTO experience_tags (experience_id, tag_id) VALUES ($1, $2)")
            .bind(id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    info!("Saved experience {id} ({slug})");
    Ok(SavedItem { id, slug })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn test_payload_accepts_camel_and_snake_dates() {
        let camel: ExperiencePayload =
            serde_json::from_value(json!({"startDate": "2021-03", "title_en": "Engineer"})).unwrap();
        let snake: ExperiencePayload =
            serde_json::from_value(json!({"start_date": "2021-03", "title_en": "Engineer"})).unwrap();
        assert_eq!(camel.start_date.as_deref(), Some("2021-03"));
        assert_eq!(snake.start_date.as_deref(), Some("2021-03"));
        assert!(!camel.localized.contains_key("startDate"));
    }

    #[test]
    fn test_view_uses_requested_language() {
        let now = Utc::now();
        let bundle = ExperienceBundle {
            experience: ExperienceRow {
                id: 4,
                slug: "data-engineer-acme".to_string(),
                company: Some("Acme".to_string()),
                location: None,
                start_date: Some("2022-01".to_string()),
                end_date: None,
                current: true,
                created_at: now,
                updated_at: now,
            },
            translations: vec![
                ExperienceTranslationRow {
                    id: 1,
                    experience_id: 4,
                    lang: "es".to_string(),
                    title: Some("Ingeniero de datos".to_string()),
                    subtitle: None,
                    description: None,
                },
                ExperienceTranslationRow {
                    id: 2,
                    experience_id: 4,
                    lang: "en".to_string(),
                    title: Some("Data engineer".to_string()),
                    subtitle: None,
                    description: None,
                },
            ],
            tags: Vec::new(),
        };
        let view = bundle.to_view("en").unwrap();
        assert_eq!(view.title.as_deref(), Some("Data engineer"));
        assert!(view.current);
    }

    fn langs() -> Vec<String> {
        vec!["es".to_string(), "en".to_string()]
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_save_experience_round_trip(pool: PgPool) {
        let form: ExperiencePayload = serde_json::from_value(json!({
            "company": "Acme",
            "startDate": "2021-03",
            "endDate": "2023-01",
            "current": true,
            "title_en": "Data Engineer",
            "title_es": "Ingeniero de Datos",
            "tags": ["Python", "Airflow"]
        }))
        .unwrap();
        let saved = save_experience(&pool, &form, &langs()).await.unwrap();
        assert_eq!(saved.slug, "data-engineer-acme");

        let stored = load_experiences(&pool).await.unwrap();
        assert_eq!(stored.len(), 1);
        let exp = &stored[0];
        assert!(exp.experience.current);
        assert_eq!(exp.experience.end_date, None);
        assert_eq!(exp.translations.len(), 2);
        assert_eq!(exp.tags.len(), 2);

        let mut edit = form.clone();
        edit.id = Some(saved.id);
        edit.current = false;
        edit.tags = vec![];
        save_experience(&pool, &edit, &langs()).await.unwrap();

        let exp = &load_experiences(&pool).await.unwrap()[0];
        assert_eq!(exp.experience.end_date.as_deref(), Some("2023-01"));
        assert!(exp.tags.is_empty());
    }
}
