use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A project link before it is stored in `project_urls`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectLink {
    pub url_type: String,
    pub url: String,
    pub label: Option<String>,
    pub sort_order: i32,
}

/// Normalizes the `url` field of a project payload.
///
/// Accepted shapes:
/// - a plain URL string, stored as the `live` link;
/// - an object `{type: url}`, or a string holding one, where `github`
///   sorts first;
/// - a list of `{type, url, label, order}` objects.
///
/// Blank URLs are skipped and only the first link of each type is kept.
pub fn parse_project_links(value: &Value) -> Vec<ProjectLink> {
    let links = match value {
        Value::String(raw) => parse_string(raw),
        Value::Object(map) => from_object(map),
        Value::Array(items) => from_list(items),
        _ => Vec::new(),
    };

    let mut seen = HashSet::new();
    links
        .into_iter()
        .filter(|link| seen.insert(link.url_type.clone()))
        .collect()
}

fn parse_string(raw: &str) -> Vec<ProjectLink> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }
    if raw.starts_with('{') {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw) {
            return from_object(&map);
        }
    }
    vec![ProjectLink {
        url_type: "live".to_string(),
        url: raw.to_string(),
        label: None,
        sort_order: 0,
    }]
}

fn from_object(map: &Map<String, Value>) -> Vec<ProjectLink> {
    let mut links: Vec<ProjectLink> = map
        .iter()
        .filter_map(|(url_type, url)| {
            let url = url.as_str().map(str::trim).filter(|u| !u.is_empty())?;
            Some(ProjectLink {
                url_type: url_type.clone(),
                url: url.to_string(),
                label: None,
                sort_order: if url_type == "github" { 0 } else { 1 },
            })
        })
        .collect();
    links.sort_by_key(|l| l.sort_order);
    links
}

fn from_list(items: &[Value]) -> Vec<ProjectLink> {
    items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            let url = item
                .get("url")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|u| !u.is_empty())?;
            let url_type = item
                .get("type")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or("live");
            let label = item
                .get("label")
                .and_then(Value::as_str)
                .filter(|l| !l.trim().is_empty())
                .map(String::from);
            let sort_order = item
                .get("order")
                .and_then(Value::as_i64)
                .and_then(|o| i32::try_from(o).ok())
                .unwrap_or(idx as i32);
            Some(ProjectLink {
                url_type: url_type.to_string(),
                url: url.to_string(),
                label,
                sort_order,
            })
        })
        .collect()
}
