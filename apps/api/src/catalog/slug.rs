use std::collections::HashMap;

use sqlx::PgConnection;

use crate::errors::AppError;

const MAX_SLUG_LEN: usize = 64;
/// Leaves room for a `-NN` uniqueness suffix.
const MAX_BASE_LEN: usize = 56;

/// Tables whose rows carry a unique `slug` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugTable {
    Projects,
    Experiences,
    Educations,
    Skills,
    Certifications,
    Profiles,
}

impl SlugTable {
    fn table(self) -> &'static str {
        match self {
            SlugTable::Projects => "projects",
            SlugTable::Experiences => "experiences",
            SlugTable::Educations => "educations",
            SlugTable::Skills => "skills",
            SlugTable::Certifications => "certifications",
            SlugTable::Profiles => "profiles",
        }
    }

    fn fallback(self) -> &'static str {
        match self {
            SlugTable::Projects => "project",
            SlugTable::Experiences => "experience",
            SlugTable::Educations => "education",
            SlugTable::Skills => "skill",
            SlugTable::Certifications => "certification",
            SlugTable::Profiles => "profile",
        }
    }
}

/// URL-safe identifier: Latin accents folded to ASCII, other non-word
/// characters dropped, whitespace and hyphen runs collapsed to one `-`.
pub fn slugify(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    for c in text.to_lowercase().chars() {
        match fold_accent(c) {
            Some(folded) => cleaned.push_str(folded),
            None if c.is_ascii_alphanumeric() || c == '_' => cleaned.push(c),
            None if c.is_whitespace() || c == '-' => cleaned.push('-'),
            None => {}
        }
    }

    let mut slug = String::with_capacity(cleaned.len());
    for c in cleaned.chars() {
        if c == '-' && (slug.is_empty() || slug.ends_with('-')) {
            continue;
        }
        slug.push(c);
    }
    slug.trim_end_matches('-').to_string()
}

/// Replaces accented Latin letters with their ASCII spelling, keeping case
/// (`É` becomes `E`, `Æ` becomes `Ae`). Other characters pass through.
pub fn fold_to_ascii(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        let lower = c.to_lowercase().next().unwrap_or(c);
        match fold_accent(lower) {
            Some(folded) if c != lower => {
                let mut letters = folded.chars();
                if let Some(first) = letters.next() {
                    out.push(first.to_ascii_uppercase());
                    out.extend(letters);
                }
            }
            Some(folded) => out.push_str(folded),
            None => out.push(c),
        }
    }
    out
}

fn fold_accent(c: char) -> Option<&'static str> {
    Some(match c {
        'à'..='å' => "a",
        'æ' => "ae",
        'ç' => "c",
        'è'..='ë' => "e",
        'ì'..='ï' => "i",
        'ñ' => "n",
        'ò'..='ö' | 'ø' => "o",
        'œ' => "oe",
        'ß' => "ss",
        'ù'..='ü' => "u",
        'ý' | 'ÿ' => "y",
        _ => return None,
    })
}

/// First of `base`, `base-1`, `base-2`, … not used by another row.
/// `taken` maps existing slugs to their row ids; a slug owned by `own_id`
/// is free for that row.
pub fn next_available_slug(base: &str, taken: &HashMap<String, i32>, own_id: Option<i32>) -> String {
    let mut candidate = base.to_string();
    let mut counter = 1;
    loop {
        match taken.get(&candidate) {
            None => return candidate,
            Some(id) if Some(*id) == own_id => return candidate,
            Some(_) => {
                candidate = format!("{base}-{counter}");
                counter += 1;
            }
        }
    }
}

fn truncate(slug: &str, max: usize) -> String {
    slug.chars().take(max).collect::<String>().trim_end_matches('-').to_string()
}

/// Decides the slug for a row being saved.
///
/// An explicit slug is normalized and must not belong to another row (409).
/// Without one, a unique slug is derived from `source`.
pub async fn resolve_slug(
    conn: &mut PgConnection,
    table: SlugTable,
    requested: Option<&str>,
    source: Option<&str>,
    own_id: Option<i32>,
) -> Result<String, AppError> {
    if let Some(requested) = requested.map(str::trim).filter(|s| !s.is_empty()) {
        let slug = truncate(&slugify(requested), MAX_SLUG_LEN);
        if slug.is_empty() {
            return Err(AppError::Validation(format!(
                "Slug '{requested}' has no usable characters"
            )));
        }
        let owner: Option<i32> =
            sqlx::query_scalar(&format!("SELECT id FROM {} WHERE slug = $1", table.table()))
                .bind(&slug)
                .fetch_optional(&mut *conn)
                .await?;
        return match owner {
            Some(id) if Some(id) != own_id => Err(AppError::Conflict(format!(
                "Slug '{slug}' is already used by another {}",
                table.fallback()
            ))),
            _ => Ok(slug),
        };
    }

    let mut base = truncate(&slugify(source.unwrap_or_default()), MAX_BASE_LEN);
    if base.is_empty() {
        base = table.fallback().to_string();
    }

    let rows: Vec<(i32, String)> = sqlx::query_as(&format!(
        "SELECT id, slug FROM {} WHERE slug = $1 OR slug LIKE $2",
        table.table()
    ))
    .bind(&base)
    .bind(format!("{base}-%"))
    .fetch_all(&mut *conn)
    .await?;
    let taken: HashMap<String, i32> = rows.into_iter().map(|(id, slug)| (slug, id)).collect();

    Ok(next_available_slug(&base, &taken, own_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_to_ascii_keeps_case() {
        assert_eq!(fold_to_ascii("José Núñez"), "Jose Nunez");
        assert_eq!(fold_to_ascii("ÉMILE Æsir"), "EMILE Aesir");
        assert_eq!(fold_to_ascii("plain-text_1"), "plain-text_1");
    }

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Real-Time Data Pipeline"), "real-time-data-pipeline");
    }

    #[test]
    fn test_slugify_folds_accents() {
        assert_eq!(slugify("Ingeniería de Datos: Análisis"), "ingenieria-de-datos-analisis");
        assert_eq!(slugify("Straße Çà"), "strasse-ca");
    }

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("  --Hello   --  World--  "), "hello-world");
    }

    #[test]
    fn test_slugify_drops_symbols_keeps_underscore() {
        assert_eq!(slugify("C++ & snake_case!"), "c-snake_case");
    }

    #[test]
    fn test_slugify_only_symbols() {
        assert_eq!(slugify("!!! ???"), "");
    }

    #[test]
    fn test_next_available_slug_free() {
        assert_eq!(next_available_slug("demo", &HashMap::new(), None), "demo");
    }

    #[test]
    fn test_next_available_slug_counts_up() {
        let taken = HashMap::from([("demo".to_string(), 1), ("demo-1".to_string(), 2)]);
        assert_eq!(next_available_slug("demo", &taken, None), "demo-2");
    }

    #[test]
    fn test_next_available_slug_keeps_own() {
        let taken = HashMap::from([("demo".to_string(), 7)]);
        assert_eq!(next_available_slug("demo", &taken, Some(7)), "demo");
        assert_eq!(next_available_slug("demo", &taken, Some(8)), "demo-1");
    }

    #[test]
    fn test_truncate_strips_trailing_hyphen() {
        assert_eq!(truncate("abc-def", 4), "abc");
    }
}
