use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};

use crate::models::TagRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TagCount {
    pub tag: String,
    pub count: i64,
}

pub fn tag_slug(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "-")
}

/// Trims names and drops blanks and names whose slug repeats an earlier one.
pub fn normalize_tag_names(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .filter(|n| seen.insert(tag_slug(n)))
        .map(String::from)
        .collect()
}

/// Get-or-create for each tag name, returning ids in input order.
/// A tag is matched by name or by slug so `Rust` and `rust` share one row.
pub async fn resolve_tags(conn: &mut PgConnection, names: &[String]) -> Result<Vec<i32>, sqlx::Error> {
    let mut ids = Vec::new();
    for name in normalize_tag_names(names) {
        let slug = tag_slug(&name);
        let existing: Option<i32> =
            sqlx::query_scalar("SELECT id FROM tags WHERE name = $1 OR slug = $2 LIMIT 1")
                .bind(&name)
                .bind(&slug)
                .fetch_optional(&mut *conn)
                .await?;
        let id = match existing {
            Some(id) => id,
            None => {
                sqlx::query_scalar("INSERT INTO tags (name, slug) VALUES ($1, $2) RETURNING id")
                    .bind(&name)
                    .bind(&slug)
                    .fetch_one(&mut *conn)
                    .await?
            }
        };
        ids.push(id);
    }
    Ok(ids)
}

pub async fn list_tags(pool: &PgPool) -> Result<Vec<TagRow>, sqlx::Error> {
    sqlx::query_as::<_, TagRow>("SELECT id, name, slug, category FROM tags ORDER BY name")
        .fetch_all(pool)
        .await
}

/// Usage counts across projects and experiences, most used first.
pub async fn tag_counts(pool: &PgPool) -> Result<Vec<TagCount>, sqlx::Error> {
    sqlx::query_as::<_, TagCount>(
        r#"
        SELECT t.name AS tag, COUNT(*)::BIGINT AS count
        FROM tags t
        JOIN (
            SELECT tag_id FROM project_tags
            UNION ALL
            SELECT tag_id FROM experience_tags
        ) used ON used.tag_id = t.id
        GROUP BY t.name
        ORDER BY count DESC, t.name ASC
        "#,
    )
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_slug() {
        assert_eq!(tag_slug("  Machine Learning "), "machine-learning");
    }

    #[test]
    fn test_normalize_tag_names() {
        let names = vec![
            "Rust".to_string(),
            "  ".to_string(),
            "rust".to_string(),
            " Data Eng ".to_string(),
        ];
        assert_eq!(normalize_tag_names(&names), vec!["Rust", "Data Eng"]);
    }
}
