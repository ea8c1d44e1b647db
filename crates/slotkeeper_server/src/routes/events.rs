//! Event endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use rusqlite::Connection;
use slotkeeper_core::{CreateEventRequest, Event, EventId, EventService, SqliteEventRepository};

use crate::routes::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/event/", get(list_events).post(create_event))
        .route("/event", get(list_events).post(create_event))
        .route("/event/{id}", delete(delete_event))
}

fn service(conn: &Connection) -> EventService<SqliteEventRepository<'_>> {
    EventService::new(SqliteEventRepository::new(conn))
}

/// GET /event/ - List all events
async fn list_events(State(state): State<AppState>) -> Result<Json<Vec<Event>>, ApiError> {
    let events = state
        .with_store(|conn| service(conn).list_events())
        .await??;

    Ok(Json(events))
}

/// POST /event/ - Create an event if it does not overlap any stored event
async fn create_event(
    State(state): State<AppState>,
    payload: Result<Json<CreateEventRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload?;

    state
        .with_store(move |conn| service(conn).create_event(&request))
        .await??;

    Ok(StatusCode::OK)
}

/// DELETE /event/{id} - Remove an event; unknown ids succeed
async fn delete_event(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: EventId = raw_id
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("event id `{raw_id}` is not an integer")))?;

    state
        .with_store(move |conn| service(conn).delete_event(id))
        .await??;

    Ok(StatusCode::OK)
}
