//! Per-project interaction tracking: raw events plus running counters.

pub mod handlers;

use std::str::FromStr;

use serde_json::Value;
use sqlx::PgPool;
use tracing::debug;

use crate::errors::AppError;
use crate::models::analytics::{ProjectEventRow, ProjectStatsRow};

pub const DEFAULT_EVENT_LIMIT: i64 = 50;
pub const MAX_EVENT_LIMIT: i64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    View,
    Click,
    Hover,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::View => "view",
            EventType::Click => "click",
            EventType::Hover => "hover",
        }
    }

    /// Increments for (views, clicks, hovers).
    fn deltas(self) -> (i32, i32, i32) {
        match self {
            EventType::View => (1, 0, 0),
            EventType::Click => (0, 1, 0),
            EventType::Hover => (0, 0, 1),
        }
    }
}

impl FromStr for EventType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "view" => Ok(EventType::View),
            "click" => Ok(EventType::Click),
            "hover" => Ok(EventType::Hover),
            other => Err(AppError::Validation(format!(
                "Unknown event_type '{other}', expected view, click or hover"
            ))),
        }
    }
}

/// One tracked interaction, already validated.
#[derive(Debug)]
pub struct NewEvent {
    pub event_type: EventType,
    pub session_id: Option<String>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub referrer: Option<String>,
    pub event_data: Option<Value>,
}

/// Truncates to the column width, on a char boundary.
pub fn clip(value: Option<&str>, max_chars: usize) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| v.chars().take(max_chars).collect())
}

pub fn event_limit(requested: Option<i64>) -> i64 {
    requested
        .unwrap_or(DEFAULT_EVENT_LIMIT)
        .clamp(1, MAX_EVENT_LIMIT)
}

async fn project_id(pool: &PgPool, slug: &str) -> Result<i32, AppError> {
    sqlx::query_scalar::<_, i32>("SELECT id FROM projects WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::ProjectNotFound {
            slug: slug.to_string(),
        })
}

/// Stores the event and bumps the project's counter in one transaction.
pub async fn record_event(pool: &PgPool, slug: &str, event: &NewEvent) -> Result<(), AppError> {
    let project_id = project_id(pool, slug).await?;
    let (views, clicks, hovers) = event.event_type.deltas();

    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO project_events
            (project_id, event_type, session_id, user_agent, ip_address, referrer, event_data)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(project_id)
    .bind(event.event_type.as_str())
    .bind(&event.session_id)
    .bind(&event.user_agent)
    .bind(&event.ip_address)
    .bind(&event.referrer)
    .bind(&event.event_data)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO project_analytics
            (project_id, view_count, click_count, hover_count, last_viewed_at, last_clicked_at)
         VALUES ($1, $2, $3, $4,
                 CASE WHEN $2 > 0 THEN now() END,
                 CASE WHEN $3 > 0 THEN now() END)
         ON CONFLICT (project_id) DO UPDATE SET
            view_count = project_analytics.view_count + EXCLUDED.view_count,
            click_count = project_analytics.click_count + EXCLUDED.click_count,
            hover_count = project_analytics.hover_count + EXCLUDED.hover_count,
            last_viewed_at = COALESCE(EXCLUDED.last_viewed_at, project_analytics.last_viewed_at),
            last_clicked_at = COALESCE(EXCLUDED.last_clicked_at, project_analytics.last_clicked_at),
            updated_at = now()",
    )
    .bind(project_id)
    .bind(views)
    .bind(clicks)
    .bind(hovers)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    debug!("Recorded {} event for project {slug}", event.event_type.as_str());
    Ok(())
}

pub async fn project_stats(pool: &PgPool) -> Result<Vec<ProjectStatsRow>, sqlx::Error> {
    sqlx::query_as::<_, ProjectStatsRow>(
        "SELECT p.id AS project_id, p.slug,
                COALESCE(a.view_count, 0) AS view_count,
                COALESCE(a.click_count, 0) AS click_count,
                COALESCE(a.hover_count, 0) AS hover_count,
                a.last_viewed_at, a.last_clicked_at
         FROM projects p
         LEFT JOIN project_analytics a ON a.project_id = p.id
         ORDER BY view_count DESC, p.slug",
    )
    .fetch_all(pool)
    .await
}

pub async fn recent_events(pool: &PgPool, slug: &str, limit: i64) -> Result<Vec<ProjectEventRow>, AppError> {
    let project_id = project_id(pool, slug).await?;
    let events = sqlx::query_as::<_, ProjectEventRow>(
        "SELECT id, project_id, event_type, session_id, user_agent, ip_address,
                referrer, event_data, created_at
         FROM project_events
         WHERE project_id = $1
         ORDER BY created_at DESC, id DESC
         LIMIT $2",
    )
    .bind(project_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_parsing() {
        assert_eq!("View".parse::<EventType>().unwrap(), EventType::View);
        assert_eq!(" hover ".parse::<EventType>().unwrap(), EventType::Hover);
        assert!(matches!("scroll".parse::<EventType>(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_deltas_touch_one_counter() {
        assert_eq!(EventType::Click.deltas(), (0, 1, 0));
        assert_eq!(EventType::View.deltas(), (1, 0, 0));
    }

    #[test]
    fn test_event_limit_bounds() {
        assert_eq!(event_limit(None), 50);
        assert_eq!(event_limit(Some(0)), 1);
        assert_eq!(event_limit(Some(10_000)), 500);
        assert_eq!(event_limit(Some(120)), 120);
    }

    #[test]
    fn test_clip_respects_char_boundaries() {
        assert_eq!(clip(Some("ñandú"), 3).as_deref(), Some("ñan"));
        assert_eq!(clip(Some("   "), 10), None);
        assert_eq!(clip(None, 10), None);
    }

    fn event(event_type: EventType) -> NewEvent {
        NewEvent {
            event_type,
            session_id: Some("sess-1".to_string()),
            user_agent: Some("Mozilla/5.0".to_string()),
            ip_address: Some("203.0.113.9".to_string()),
            referrer: None,
            event_data: Some(serde_json::json!({"section": "hero"})),
        }
    }

    async fn insert_project(pool: &PgPool, slug: &str) {
        sqlx::query("INSERT INTO projects (slug) VALUES ($1)")
            .bind(slug)
            .execute(pool)
            .await
            .unwrap();
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_events_accumulate_counters(pool: PgPool) {
        insert_project(&pool, "demo").await;
        insert_project(&pool, "quiet").await;

        record_event(&pool, "demo", &event(EventType::View)).await.unwrap();
        record_event(&pool, "demo", &event(EventType::View)).await.unwrap();
        record_event(&pool, "demo", &event(EventType::Click)).await.unwrap();

        let stats = project_stats(&pool).await.unwrap();
        assert_eq!(stats.len(), 2);
        let demo = &stats[0];
        assert_eq!(demo.slug, "demo");
        assert_eq!((demo.view_count, demo.click_count, demo.hover_count), (2, 1, 0));
        assert!(demo.last_viewed_at.is_some());
        assert!(demo.last_clicked_at.is_some());

        let quiet = &stats[1];
        assert_eq!(quiet.slug, "quiet");
        assert_eq!(quiet.view_count, 0);
        assert!(quiet.last_viewed_at.is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_recent_events_are_limited_newest_first(pool: PgPool) {
        insert_project(&pool, "demo").await;
        for event_type in [EventType::View, EventType::Hover, EventType::Click] {
            record_event(&pool, "demo", &event(event_type)).await.unwrap();
        }

        let events = recent_events(&pool, "demo", 2).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "click");
        assert_eq!(events[1].event_type, "hover");
        assert_eq!(events[0].ip_address.as_deref(), Some("203.0.113.9"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_unknown_slug_is_not_found(pool: PgPool) {
        let err = record_event(&pool, "missing", &event(EventType::View))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ProjectNotFound { .. }));
    }
}
