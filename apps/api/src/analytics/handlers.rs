use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{clip, event_limit, project_stats, recent_events, record_event, EventType, NewEvent};
use crate::auth::AdminAccess;
use crate::errors::AppError;
use crate::rate_limit::client_ip;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EventBody {
    pub event_type: String,
    pub session_id: Option<String>,
    pub event_data: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<i64>,
}

fn header_str<'a>(headers: &'a HeaderMap, name: header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// POST /api/analytics/projects/:slug/events
pub async fn record_project_event(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(body): Json<EventBody>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let event_type: EventType = body.event_type.parse()?;
    let ip = client_ip(
        &headers,
        connect_info.as_ref(),
        state.config.trusted_proxy_hops,
    );

    let event = NewEvent {
        event_type,
        session_id: clip(body.session_id.as_deref(), 128),
        user_agent: clip(header_str(&headers, header::USER_AGENT), 512),
        ip_address: clip(ip.as_deref(), 45),
        referrer: clip(header_str(&headers, header::REFERER), 512),
        event_data: body.event_data.filter(|d| !d.is_null()),
    };
    record_event(&state.db, &slug, &event).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "slug": slug, "event_type": event_type.as_str() })),
    ))
}

/// GET /admin/analytics
pub async fn analytics_overview(
    State(state): State<AppState>,
    _admin: AdminAccess,
) -> Result<Json<Value>, AppError> {
    let projects = project_stats(&state.db).await?;
    Ok(Json(json!({ "count": projects.len(), "projects": projects })))
}

/// GET /admin/analytics/:slug/events
pub async fn project_events(
    State(state): State<AppState>,
    _admin: AdminAccess,
    Path(slug): Path<String>,
    Query(q): Query<EventsQuery>,
) -> Result<Json<Value>, AppError> {
    let events = recent_events(&state.db, &slug, event_limit(q.limit)).await?;
    Ok(Json(json!({ "slug": slug, "count": events.len(), "events": events })))
}
