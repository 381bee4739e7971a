use crate::{
    error::AppError,
    models::{CreatedEvent, Event, NewEvent, VoteStatus},
    state::AppState,
};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventPayload {
    description: Option<String>,
    first_day: NaiveDate,
    last_day: NaiveDate,
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
}

pub async fn create_event_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateEventPayload>,
) -> Result<(StatusCode, Json<CreatedEvent>), AppError> {
    let created = app_state
        .store
        .create_event(NewEvent {
            description: payload.description,
            first_day: payload.first_day,
            last_day: payload.last_day,
            start_time: payload.start_time,
            end_time: payload.end_time,
            ttl_seconds: app_state.event_ttl_seconds,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_event_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Event>, AppError> {
    app_state.store.get_event(&id).await.map(Json)
}

#[derive(Deserialize)]
pub struct VotePayload {
    date: NaiveDate,
    status: String,
    user: String,
}

pub async fn vote_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<VotePayload>,
) -> Result<Json<Event>, AppError> {
    let status: VoteStatus = payload.status.parse()?;
    let user = payload.user.trim();
    if user.is_empty() {
        return Err(AppError::BadRequest("username must not be empty".to_string()));
    }

    app_state
        .store
        .apply_vote(&id, payload.date, status, user)
        .await
        .map(Json)
}

#[derive(Deserialize, Default)]
pub struct DeletePayload {
    pin: Option<String>,
}

pub async fn delete_event_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    // An empty body is a missing pin, not a malformed request.
    let payload: DeletePayload = if body.is_empty() {
        DeletePayload::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::BadRequest(e.to_string()))?
    };
    app_state.store.delete_event(&id, payload.pin.as_deref()).await?;
    Ok(Json(serde_json::json!({ "deleted": id })))
}

#[derive(Serialize)]
pub struct PurgeResponse {
    deleted: u64,
}

pub async fn purge_all_handler(
    State(app_state): State<AppState>,
) -> Result<Json<PurgeResponse>, AppError> {
    let deleted = app_state.store.purge_all().await?;
    Ok(Json(PurgeResponse { deleted }))
}
