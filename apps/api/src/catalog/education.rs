use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;

use super::lang::{languages_with_content, localized_text, pick_translation, slug_source, LocalizedFields};
use super::slug::{resolve_slug, SlugTable};
use super::{group_by, non_blank, SavedItem};
use crate::errors::AppError;
use crate::models::career::{CourseRow, EducationRow, EducationTranslationRow};

const TEXT_FIELDS: &[&str] = &["title", "subtitle", "description"];

#[derive(Debug, Clone, Serialize)]
pub struct EducationBundle {
    #[serde(flatten)]
    pub education: EducationRow,
    pub translations: Vec<EducationTranslationRow>,
    pub courses: Vec<CourseRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EducationView {
    pub id: i32,
    pub slug: String,
    pub institution: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub current: bool,
    pub lang: String,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub courses: Vec<String>,
}

impl EducationBundle {
    pub fn course_names(&self) -> Vec<String> {
        self.courses.iter().map(|c| c.name.clone()).collect()
    }

    pub fn to_view(&self, lang: &str) -> Option<EducationView> {
        let t = pick_translation(&self.translations, lang)?;
        let e = &self.education;
        Some(EducationView {
            id: e.id,
            slug: e.slug.clone(),
            institution: e.institution.clone(),
            location: e.location.clone(),
            start_date: e.start_date.clone(),
            end_date: e.end_date.clone(),
            current: e.current,
            lang: t.lang.clone(),
            title: t.title.clone(),
            subtitle: t.subtitle.clone(),
            description: t.description.clone(),
            courses: self.course_names(),
        })
    }
}

pub async fn load_educations(pool: &PgPool) -> Result<Vec<EducationBundle>, sqlx::Error> {
    let rows = sqlx::query_as::<_, EducationRow>(
        "SELECT * FROM educations ORDER BY current DESC, start_date DESC NULLS LAST, id DESC",
    )
    .fetch_all(pool)
    .await?;
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();

    let translations = sqlx::query_as::<_, EducationTranslationRow>(
        "SELECT * FROM education_translations WHERE education_id = ANY($1) ORDER BY id",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;
    let courses = sqlx::query_as::<_, CourseRow>(
        "SELECT * FROM courses WHERE education_id = ANY($1) ORDER BY sort_order, id",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let mut translations = group_by(translations, |t| t.education_id);
    let mut courses = group_by(courses, |c| c.education_id);
    Ok(rows
        .into_iter()
        .map(|education| {
            let id = education.id;
            EducationBundle {
                education,
                translations: translations.remove(&id).unwrap_or_default(),
                courses: courses.remove(&id).unwrap_or_default(),
            }
        })
        .collect())
}

#[derive(Debug, Clone, Deserialize)]
pub struct EducationPayload {
    pub id: Option<i32>,
    pub slug: Option<String>,
    pub institution: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "startDate", alias = "start_date")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate", alias = "end_date")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub current: bool,
    #[serde(default)]
    pub courses: Vec<String>,
    #[serde(flatten)]
    pub localized: LocalizedFields,
}

pub async fn save_education(
    pool: &PgPool,
    payload: &EducationPayload,
    langs: &[String],
) -> Result<SavedItem, AppError> {
    let title = slug_source(&payload.localized, "title", langs)
        .ok_or_else(|| AppError::Validation("Title is required in at least one language".to_string()))?;
    let institution = non_blank(&payload.institution);
    let source = match institution {
        Some(institution) => format!("{title} {institution}"),
        None => title,
    };
    let end_date = if payload.current {
        None
    } else {
        non_blank(&payload.end_date)
    };

    let mut tx = pool.begin().await?;
    let slug = resolve_slug(
        &mut tx,
        SlugTable::Educations,
        payload.slug.as_deref(),
        Some(&source),
        payload.id,
    )
    .await?;

    let id: i32 = match payload.id {
        Some(id) => sqlx::query_scalar(
            r#"
            UPDATE educations
            SET slug = $2, institution = $3, location = $4, start_date = $5, end_date = $6,
                current = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(&slug)
        .bind(institution)
        .bind(non_blank(&payload.location))
        .bind(non_blank(&payload.start_date))
        .bind(end_date)
        .bind(payload.current)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Education {id} not found")))?,
        None => {
            sqlx::query_scalar(
                r#"
                INSERT INTO educations (slug, institution, location, start_date, end_date, current)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id
                "#,
            )
            .bind(&slug)
            .bind(institution)
            .bind(non_blank(&payload.location))
            .bind(non_blank(&payload.start_date))
            .bind(end_date)
            .bind(payload.current)
            .fetch_one(&mut *tx)
            .await?
        }
    };

    sqlx::query("DELETE FROM education_translations WHERE education_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    for lang in languages_with_content(&payload.localized, TEXT_FIELDS, langs) {
        sqlx::query(
            r#"
            INSERT INTO education_translations (education_id, lang, title, subtitle, description)
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

    sqlx::query("DELETE FROM courses WHERE education_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let courses = payload.courses.iter().map(|c| c.trim()).filter(|c| !c.is_empty());
    for (idx, course) in courses.enumerate() {
        sqlx::query("INSERT INTO courses (education_id, name, sort_order) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(course)
            .bind(idx as i32)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    info!("Saved education {id} ({slug})");
    Ok(SavedItem { id, slug })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_keeps_courses_out_of_localized() {
        let p: EducationPayload = serde_json::from_value(json!({
            "institution": "UPM",
            "courses": ["Algorithms", "Databases"],
            "title_es": "Grado en Informática"
        }))
        .unwrap();
        assert_eq!(p.courses.len(), 2);
        assert_eq!(p.localized.len(), 1);
    }

    fn langs() -> Vec<String> {
        vec!["es".to_string(), "en".to_string()]
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_save_education_replaces_courses_in_order(pool: PgPool) {
        let form: EducationPayload = serde_json::from_value(json!({
            "institution": "UPM",
            "title_es": "Grado en Informática",
            "courses": ["Bases de Datos", "Compiladores", "  "]
        }))
        .unwrap();
        let saved = save_education(&pool, &form, &langs()).await.unwrap();
        assert_eq!(saved.slug, "grado-en-informatica-upm");

        let stored = load_educations(&pool).await.unwrap();
        assert_eq!(stored[0].course_names(), vec!["Bases de Datos", "Compiladores"]);

        let mut edit = form.clone();
        edit.id = Some(saved.id);
        edit.courses = vec!["Redes".to_string()];
        save_education(&pool, &edit, &langs()).await.unwrap();
        let stored = load_educations(&pool).await.unwrap();
        assert_eq!(stored[0].course_names(), vec!["Redes"]);
    }
}
