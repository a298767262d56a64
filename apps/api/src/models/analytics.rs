use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// Counters of one project; projects never interacted with report zeros.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProjectStatsRow {
    pub project_id: i32,
    pub slug: String,
    pub view_count: i32,
    pub click_count: i32,
    pub hover_count: i32,
    pub last_viewed_at: Option<DateTime<Utc>>,
    pub last_clicked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProjectEventRow {
    pub id: i32,
    pub project_id: i32,
    pub event_type: String,
    pub session_id: Option<String>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub referrer: Option<String>,
    pub event_data: Option<Value>,
    pub created_at: DateTime<Utc>,
}
