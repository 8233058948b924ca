use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::session::{self, SessionCommand, SessionSeed};
use crate::error::AppError;
use crate::models::geo::{GeoPoint, LocationFix};
use crate::models::navigation::{
    DestinationView, ExternalNavLinks, NavigationSnapshot, NavigationState, Platform, ScanHandoff,
    ScanKind,
};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(get_session).delete(close_session))
        .route("/sessions/:id/fixes", post(push_fix))
        .route("/sessions/:id/start", post(start_navigation))
        .route("/sessions/:id/pause", post(pause_navigation))
        .route("/sessions/:id/retry-resolve", post(retry_resolve))
        .route("/sessions/:id/reached", post(mark_reached))
        .route("/sessions/:id/external-nav", get(external_nav))
}

#[derive(Deserialize)]
pub struct CreateSessionRequest {
    pub order_id: String,
    pub kind: ScanKind,
    pub address: String,
    pub coordinate: Option<GeoPoint>,
    pub utc_offset_minutes: Option<i32>,
}

#[derive(Serialize)]
pub struct SessionCreated {
    pub id: Uuid,
    pub snapshot: NavigationSnapshot,
}

async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<Json<SessionCreated>, AppError> {
    if payload.address.trim().is_empty() && payload.coordinate.is_none() {
        return Err(AppError::BadRequest(
            "a destination address or coordinate is required".to_string(),
        ));
    }

    let seed = SessionSeed {
        id: Uuid::new_v4(),
        order_id: payload.order_id,
        scan_kind: payload.kind,
        address: payload.address,
        coordinate: payload.coordinate,
        utc_offset_minutes: payload.utc_offset_minutes.unwrap_or(0),
    };

    let id = seed.id;
    let snapshot = session::launch(&state, seed);

    Ok(Json(SessionCreated { id, snapshot }))
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<NavigationSnapshot>, AppError> {
    let snapshot = state
        .snapshots
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("session {} not found", id)))?;

    Ok(Json(snapshot.value().clone()))
}

async fn push_fix(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(fix): Json<LocationFix>,
) -> Result<StatusCode, AppError> {
    send_command(&state, id, SessionCommand::Fix(fix)).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn start_navigation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let current = snapshot_state(&state, id)?;
    if !matches!(
        current,
        NavigationState::Overview | NavigationState::Paused
    ) {
        return Err(AppError::Conflict(
            "navigation can only start from overview or paused".to_string(),
        ));
    }

    send_command(&state, id, SessionCommand::Start).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn pause_navigation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let current = snapshot_state(&state, id)?;
    if current != NavigationState::ActiveTurnByTurn {
        return Err(AppError::Conflict(
            "navigation is not active".to_string(),
        ));
    }

    send_command(&state, id, SessionCommand::Pause).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn retry_resolve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let failed = {
        let snapshot = state
            .snapshots
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("session {} not found", id)))?;
        matches!(snapshot.destination, DestinationView::Failed { .. })
    };
    if !failed {
        return Err(AppError::Conflict(
            "destination resolution has not failed".to_string(),
        ));
    }

    send_command(&state, id, SessionCommand::RetryResolve).await?;
    Ok(StatusCode::ACCEPTED)
}

/// The rider arrived: hand the order off to the scanning flow and shut the
/// session down.
async fn mark_reached(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScanHandoff>, AppError> {
    let (handoff, cmd_tx) = {
        let handle = state
            .sessions
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("session {} not found", id)))?;
        (
            ScanHandoff {
                order_id: handle.order_id.clone(),
                scan_type: handle.scan_kind,
            },
            handle.cmd_tx.clone(),
        )
    };

    let _ = cmd_tx.send(SessionCommand::Close).await;
    Ok(Json(handoff))
}

async fn close_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    send_command(&state, id, SessionCommand::Close).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct ExternalNavQuery {
    pub platform: Platform,
}

/// Deep links for handing the trip to the device's own navigation app.
async fn external_nav(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<ExternalNavQuery>,
) -> Result<Json<ExternalNavLinks>, AppError> {
    let destination = {
        let snapshot = state
            .snapshots
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("session {} not found", id)))?;
        match snapshot.destination {
            DestinationView::Resolved { coordinate, .. } => coordinate,
            _ => {
                return Err(AppError::Conflict(
                    "destination is not resolved yet".to_string(),
                ))
            }
        }
    };

    Ok(Json(ExternalNavLinks::to_destination(
        destination,
        query.platform,
    )))
}

fn snapshot_state(state: &AppState, id: Uuid) -> Result<NavigationState, AppError> {
    state
        .snapshots
        .get(&id)
        .map(|snapshot| snapshot.state)
        .ok_or_else(|| AppError::NotFound(format!("session {} not found", id)))
}

async fn send_command(
    state: &AppState,
    id: Uuid,
    command: SessionCommand,
) -> Result<(), AppError> {
    let cmd_tx = {
        let handle = state
            .sessions
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("session {} not found", id)))?;
        handle.cmd_tx.clone()
    };

    cmd_tx
        .send(command)
        .await
        .map_err(|_| AppError::Conflict(format!("session {} is shutting down", id)))?;

    Ok(())
}
