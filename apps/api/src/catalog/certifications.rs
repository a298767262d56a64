use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;

use super::lang::{languages_with_content, localized_text, pick_translation, slug_source, LocalizedFields};
use super::slug::{resolve_slug, SlugTable};
use super::{group_by, non_blank, SavedItem};
use crate::errors::AppError;
use crate::models::career::{CertificationRow, CertificationTranslationRow};

#[derive(Debug, Clone, Serialize)]
pub struct CertificationBundle {
    #[serde(flatten)]
    pub certification: CertificationRow,
    pub translations: Vec<CertificationTranslationRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificationView {
    pub id: i32,
    pub slug: String,
    pub issuer: Option<String>,
    pub issue_date: Option<String>,
    pub expiry_date: Option<String>,
    pub credential_url: Option<String>,
    pub lang: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl CertificationBundle {
    pub fn to_view(&self, lang: &str) -> Option<CertificationView> {
        let t = pick_translation(&self.translations, lang)?;
        let c = &self.certification;
        Some(CertificationView {
            id: c.id,
            slug: c.slug.clone(),
            issuer: c.issuer.clone(),
            issue_date: c.issue_date.clone(),
            expiry_date: c.expiry_date.clone(),
            credential_url: c.credential_url.clone(),
            lang: t.lang.clone(),
            title: t.title.clone(),
            description: t.description.clone(),
        })
    }
}

pub async fn load_certifications(pool: &PgPool) -> Result<Vec<CertificationBundle>, sqlx::Error> {
    let rows = sqlx::query_as::<_, CertificationRow>(
        "SELECT * FROM certifications ORDER BY issue_date DESC NULLS LAST, id DESC",
    )
    .fetch_all(pool)
    .await?;
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
    let translations = sqlx::query_as::<_, CertificationTranslationRow>(
        "SELECT * FROM certification_translations WHERE certification_id = ANY($1) ORDER BY id",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let mut translations = group_by(translations, |t| t.certification_id);
    Ok(rows
        .into_iter()
        .map(|certification| {
            let id = certification.id;
            CertificationBundle {
                certification,
                translations: translations.remove(&id).unwrap_or_default(),
            }
        })
        .collect())
}

#[derive(Debug, Clone, Deserialize)]
pub struct CertificationPayload {
    pub id: Option<i32>,
    pub slug: Option<String>,
    pub issuer: Option<String>,
    #[serde(rename = "issueDate", alias = "issue_date")]
    pub issue_date: Option<String>,
    #[serde(rename = "expiryDate", alias = "expiry_date")]
    pub expiry_date: Option<String>,
    #[serde(rename = "url", alias = "credential_url")]
    pub credential_url: Option<String>,
    #[serde(flatten)]
    pub localized: LocalizedFields,
}

pub async fn save_certification(
    pool: &PgPool,
    payload: &CertificationPayload,
    langs: &[String],
) -> Result<SavedItem, AppError> {
    let title = slug_source(&payload.localized, "title", langs)
        .ok_or_else(|| AppError::Validation("Title is required in at least one language".to_string()))?;

    let mut tx = pool.begin().await?;
    let slug = resolve_slug(
        &mut tx,
        SlugTable::Certifications,
        payload.slug.as_deref(),
        Some(&title),
        payload.id,
    )
    .await?;

    let id: i32 = match payload.id {
        Some(id) => sqlx::query_scalar(
            r#"
            UPDATE certifications
            SET slug = $2, issuer = $3, issue_date = $4, expiry_date = $5, credential_url = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(&slug)
        .bind(non_blank(&payload.issuer))
        .bind(non_blank(&payload.issue_date))
        .bind(non_blank(&payload.expiry_date))
        .bind(non_blank(&payload.credential_url))
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Certification {id} not found")))?,
        None => {
            sqlx::query_scalar(
                r#"
                INSERT INTO certifications (slug, issuer, issue_date, expiry_date, credential_url)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id
                "#,
            )
            .bind(&slug)
            .bind(non_blank(&payload.issuer))
            .bind(non_blank(&payload.issue_date))
            .bind(non_blank(&payload.expiry_date))
            .bind(non_blank(&payload.credential_url))
            .fetch_one(&mut *tx)
            .await?
        }
    };

    sqlx::query("DELETE FROM certification_translations WHERE certification_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    for lang in languages_with_content(&payload.localized, &["title", "description"], langs) {
        sqlx::query(
            "INSERT INTO certification_translations (certification_id, lang, title, description) VALUES ($1, $2, $3, $4)",
        )
        .bind(id)
        .bind(lang)
        .bind(localized_text(&payload.localized, "title", lang))
        .bind(localized_text(&payload.localized, "description", lang))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    info!("Saved certification {id} ({slug})");
    Ok(SavedItem { id, slug })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_maps_url_to_credential_url() {
        let p: CertificationPayload = serde_json::from_value(json!({
            "issuer": "AWS",
            "issueDate": "2023-05",
            "url": "https://verify.example/123",
            "title_en": "Solutions Architect"
        }))
        .unwrap();
        assert_eq!(p.credential_url.as_deref(), Some("https://verify.example/123"));
        assert_eq!(p.issue_date.as_deref(), Some("2023-05"));
        assert_eq!(p.localized.len(), 1);
    }

    fn langs() -> Vec<String> {
        vec!["es".to_string(), "en".to_string()]
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_save_certification_round_trip(pool: PgPool) {
        let form: CertificationPayload = serde_json::from_value(json!({
            "issuer": "AWS",
            "issueDate": "2024-05",
            "url": "https://aws.example/cert/1",
            "title_en": "Solutions Architect"
        }))
        .unwrap();
        let saved = save_certification(&pool, &form, &langs()).await.unwrap();
        assert_eq!(saved.slug, "solutions-architect");

        let stored = load_certifications(&pool).await.unwrap();
        let cert = &stored[0];
        assert_eq!(cert.certification.issuer.as_deref(), Some("AWS"));
        assert_eq!(cert.translations.len(), 1);
        assert_eq!(cert.translations[0].lang, "en");
    }
}
