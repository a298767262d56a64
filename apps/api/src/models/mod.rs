pub mod analytics;
pub mod career;
pub mod profile;
pub mod project;
pub mod skill;
pub mod user;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A translation row of any content table.
pub trait Localized {
    fn lang(&self) -> &str;
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TagRow {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub category: Option<String>,
}

/// A tag joined through an association table; `owner_id` is the project or
/// experience id it is attached to.
#[derive(Debug, Clone, FromRow)]
pub struct OwnedTagRow {
    pub owner_id: i32,
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub category: Option<String>,
}

impl From<OwnedTagRow> for TagRow {
    fn from(row: OwnedTagRow) -> Self {
        TagRow {
            id: row.id,
            name: row.name,
            slug: row.slug,
            category: row.category,
        }
    }
}
