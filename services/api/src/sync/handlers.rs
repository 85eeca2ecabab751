use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use mlsync_common::types::SyncType;
use mlsync_db::sync_state::repositories::SyncStateRepository;
use mlsync_ingest::sync::RunOptions;

use crate::error::ApiError;
use crate::sync::requests::TriggerSyncRequest;
use crate::sync::responses::{SyncStateResponse, TriggerSyncResponse};
use crate::sync::runs::spawn_run;
use crate::AppState;

pub async fn trigger_sync(
    State(state): State<AppState>,
    Json(req): Json<TriggerSyncRequest>,
) -> Result<(StatusCode, Json<TriggerSyncResponse>), ApiError> {
    let sync_type = match req.sync_type.as_deref() {
        Some(raw) => raw.parse::<SyncType>()?,
        None => SyncType::default(),
    };
    let options = RunOptions {
        sync_type,
        limit: req.limit,
        reset: req.reset,
    };

    if !spawn_run(&state.syncers, &state.runs, options) {
        tracing::warn!(%sync_type, "sync trigger refused, run already in progress");
        return Ok((
            StatusCode::CONFLICT,
            Json(TriggerSyncResponse::new(
                false,
                format!("{sync_type} sync is already running"),
            )),
        ));
    }

    tracing::info!(%sync_type, limit = ?req.limit, reset = req.reset, "sync triggered");
    Ok((
        StatusCode::ACCEPTED,
        Json(TriggerSyncResponse::new(
            true,
            format!("{sync_type} sync started"),
        )),
    ))
}

pub async fn get_sync_state(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<SyncStateResponse>, ApiError> {
    let sync_type: SyncType = raw.parse()?;
    let data = state.syncers.get(sync_type).state_repo().get(sync_type).await?;
    Ok(Json(SyncStateResponse { data }))
}
