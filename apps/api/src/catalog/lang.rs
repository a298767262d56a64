use std::collections::HashMap;

use serde_json::Value;

use crate::models::Localized;

/// Flat `field_lang` form fields sent by the admin panel, e.g. `title_es`.
pub type LocalizedFields = HashMap<String, Value>;

/// Picks the translation for `lang`, falling back to the first stored one.
/// Callers load translations ordered by id, so the fallback is stable.
pub fn pick_translation<'a, T: Localized>(translations: &'a [T], lang: &str) -> Option<&'a T> {
    translations
        .iter()
        .find(|t| t.lang() == lang)
        .or_else(|| translations.first())
}

/// Trimmed, non-empty string value of `{field}_{lang}`.
pub fn localized_text(fields: &LocalizedFields, field: &str, lang: &str) -> Option<String> {
    fields
        .get(&format!("{field}_{lang}"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Non-null JSON value of `{field}_{lang}`.
pub fn localized_value(fields: &LocalizedFields, field: &str, lang: &str) -> Option<Value> {
    fields
        .get(&format!("{field}_{lang}"))
        .filter(|v| !v.is_null())
        .cloned()
}

/// Languages for which at least one of `fields` carries a value.
pub fn languages_with_content<'a>(
    fields: &LocalizedFields,
    names: &[&str],
    langs: &'a [String],
) -> Vec<&'a str> {
    langs
        .iter()
        .filter(|lang| {
            names
                .iter()
                .any(|name| localized_value(fields, name, lang).is_some_and(|v| !is_blank(&v)))
        })
        .map(String::as_str)
        .collect()
}

/// First title found, preferring English so generated slugs stay ASCII-friendly.
pub fn slug_source(fields: &LocalizedFields, field: &str, langs: &[String]) -> Option<String> {
    localized_text(fields, field, "en")
        .or_else(|| langs.iter().find_map(|l| localized_text(fields, field, l)))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Row(&'static str);

    impl Localized for Row {
        fn lang(&self) -> &str {
            self.0
        }
    }

    fn fields(value: Value) -> LocalizedFields {
        serde_json::from_value(value).unwrap()
    }

    fn langs() -> Vec<String> {
        vec!["es".to_string(), "en".to_string()]
    }

    #[test]
    fn test_pick_translation_exact_match() {
        let rows = [Row("es"), Row("en")];
        assert_eq!(pick_translation(&rows, "en").unwrap().0, "en");
    }

    #[test]
    fn test_pick_translation_falls_back_to_first() {
        let rows = [Row("es"), Row("en")];
        assert_eq!(pick_translation(&rows, "fr").unwrap().0, "es");
    }

    #[test]
    fn test_pick_translation_empty() {
        let rows: [Row; 0] = [];
        assert!(pick_translation(&rows, "es").is_none());
    }

    #[test]
    fn test_localized_text_trims_and_skips_blank() {
        let f = fields(json!({"title_es": "  Hola ", "title_en": "   "}));
        assert_eq!(localized_text(&f, "title", "es").as_deref(), Some("Hola"));
        assert_eq!(localized_text(&f, "title", "en"), None);
        assert_eq!(localized_text(&f, "subtitle", "es"), None);
    }

    #[test]
    fn test_languages_with_content_ignores_empty_values() {
        let f = fields(json!({
            "title_es": "Proyecto",
            "title_en": "",
            "content_en": {},
            "summary_en": null
        }));
        assert_eq!(languages_with_content(&f, &["title", "summary", "content"], &langs()), vec!["es"]);
    }

    #[test]
    fn test_slug_source_prefers_english() {
        let f = fields(json!({"title_es": "Tablero", "title_en": "Dashboard"}));
        assert_eq!(slug_source(&f, "title", &langs()).as_deref(), Some("Dashboard"));

        let f = fields(json!({"title_es": "Tablero"}));
        assert_eq!(slug_source(&f, "title", &langs()).as_deref(), Some("Tablero"));
    }
}
