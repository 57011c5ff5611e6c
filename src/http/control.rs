use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    AppState,
    error::{RouteError, RouteResult},
};
use crate::{
    consts::{BUILD_VERSION, COMMIT, NAME, VERSION},
    error::Error,
    notify::{Notification, NotificationClick},
    queue::PendingSubmission,
    worker::{Message, SyncReport, Worker},
};

fn active_worker(state: &AppState) -> RouteResult<Arc<Worker>> {
    state
        .registration
        .active()
        .ok_or(RouteError::NoActiveWorker())
}

/// POST /message
///
/// `GET_VERSION` 返回 `{"version": "<cache name>"}`，
/// `SKIP_WAITING` 没有回复内容
pub async fn message(
    State(state): State<AppState>,
    Json(message): Json<Message>,
) -> RouteResult<Response> {
    if message == Message::GetVersion && state.registration.active().is_none() {
        return Err(RouteError::NoActiveWorker());
    }
    let reply = state.registration.post_message(message).await;
    match reply {
        Some(reply) => Ok(Json(reply).into_response()),
        None => Ok(StatusCode::ACCEPTED.into_response()),
    }
}

/// POST /sync/{tag}
pub async fn sync(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> RouteResult<Json<SyncReport>> {
    let worker = active_worker(&state)?;
    let report = worker.on_sync(&tag).await?;
    Ok(Json(report))
}

/// POST /push
///
/// 请求体即推送负载，可以为空
pub async fn push(State(state): State<AppState>, body: Bytes) -> RouteResult<Json<Notification>> {
    let worker = active_worker(&state)?;
    let payload = (!body.is_empty()).then_some(body);
    let notification = worker.on_push(payload).await?;
    Ok(Json(notification))
}

/// POST /notifications/click
pub async fn notification_click(
    State(state): State<AppState>,
    Json(click): Json<NotificationClick>,
) -> RouteResult<StatusCode> {
    let worker = active_worker(&state)?;
    worker.on_notification_click(&click).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize, Debug)]
pub struct EnqueueRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub payload: serde_json::Value,
}

/// POST /queue/{category}
pub async fn enqueue(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Json(req): Json<EnqueueRequest>,
) -> RouteResult<(StatusCode, Json<PendingSubmission>)> {
    let worker = active_worker(&state)?;
    let submission = worker.enqueue(&category, req.id, req.payload).await?;
    Ok((StatusCode::CREATED, Json(submission)))
}

/// GET /queue/{category}
pub async fn list_queue(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> RouteResult<Json<Vec<PendingSubmission>>> {
    let worker = active_worker(&state)?;
    if worker.config().sync_for_category(&category).is_none() {
        return Err(Error::UnknownCategory(category).into());
    }
    let pending = worker.context().queue.list(&category).await?;
    debug!("{} pending {} submissions", pending.len(), category);
    Ok(Json(pending))
}

#[derive(Serialize, Debug)]
pub struct VersionInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub build_version: &'static str,
    pub commit: &'static str,
    pub active: Option<String>,
    pub waiting: Option<String>,
    pub installing: Option<String>,
}

/// GET /version
pub async fn version(State(state): State<AppState>) -> Json<VersionInfo> {
    let registration = &state.registration;
    let name_of = |worker: Option<Arc<Worker>>| worker.map(|w| w.cache_name().to_string());
    let info = VersionInfo {
        name: NAME,
        version: VERSION,
        build_version: BUILD_VERSION,
        commit: COMMIT,
        active: name_of(registration.active()),
        waiting: name_of(registration.waiting()),
        installing: name_of(registration.installing()),
    };
    info!("Version requested, active worker {:?}", info.active);
    Json(info)
}
