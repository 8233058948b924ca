use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::sequencer::{self, ToggleOutcome};
use crate::error::AppError;
use crate::models::shipment::{Hub, Rider, ShipmentCandidate};
use crate::models::stop::RouteDraft;
use crate::services::fleet::RouteRef;
use crate::state::{AppState, DraftSession};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drafts", post(create_draft))
        .route(
            "/drafts/:id",
            get(get_draft).patch(update_draft).delete(discard_draft),
        )
        .route("/drafts/:id/candidates", get(list_candidates))
        .route("/drafts/:id/stops/toggle", post(toggle_stop))
        .route("/drafts/:id/save", post(save_draft))
        .route("/hubs", get(list_hubs))
        .route("/hubs/:id/riders", get(list_riders))
}

#[derive(Deserialize, Default)]
pub struct CreateDraftRequest {
    pub name: Option<String>,
    pub hub_id: Option<String>,
    /// Set to edit an existing route: the draft is prepopulated from the
    /// fleet backend and saving becomes an update instead of a create.
    pub route_id: Option<String>,
}

async fn create_draft(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateDraftRequest>, JsonRejection>,
) -> Result<Json<RouteDraft>, AppError> {
    // A bodyless request opens a blank draft; a body that fails to parse
    // must not be mistaken for one.
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(JsonRejection::MissingJsonContentType(_)) => CreateDraftRequest::default(),
        Err(rejection) => return Err(AppError::BadRequest(rejection.body_text())),
    };

    let mut draft = RouteDraft::new();
    if let Some(route_id) = payload.route_id {
        let record = state.providers.fleet.fetch_route(&route_id).await?;
        draft.route_id = Some(route_id);
        draft.name = record.name;
        draft.hub_id = Some(record.hub_id);
        draft.rider_id = record.rider_id;
        draft.stops = record.stops;
        sequencer::renumber(&mut draft.stops);
    }

    if let Some(name) = payload.name {
        draft.name = name;
    }
    if let Some(hub_id) = payload.hub_id {
        draft.hub_id = Some(hub_id);
    }

    let hub = match draft.hub_id.as_deref() {
        Some(hub_id) => Some(resolve_hub(&state, hub_id).await?),
        None => None,
    };

    state
        .drafts
        .insert(draft.id, DraftSession::new(draft.clone(), hub));
    state
        .metrics
        .open_route_drafts
        .set(state.drafts.len() as i64);
    info!(draft_id = %draft.id, editing = draft.route_id.is_some(), "route draft opened");

    Ok(Json(draft))
}

async fn get_draft(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<RouteDraft>, AppError> {
    let mut entry = state
        .drafts
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("draft {} not found", id)))?;
    entry.touch();

    Ok(Json(entry.draft.clone()))
}

#[derive(Deserialize)]
pub struct UpdateDraftRequest {
    pub name: Option<String>,
    pub hub_id: Option<String>,
    pub rider_id: Option<String>,
}

async fn update_draft(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDraftRequest>,
) -> Result<Json<RouteDraft>, AppError> {
    // Resolve the hub before taking the map entry; no awaits under the lock.
    let hub = match payload.hub_id.as_deref() {
        Some(hub_id) => Some(resolve_hub(&state, hub_id).await?),
        None => None,
    };

    let mut entry = state
        .drafts
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("draft {} not found", id)))?;
    let session = entry.value_mut();
    session.touch();

    if let Some(name) = payload.name {
        session.draft.name = name;
    }
    if let Some(hub) = hub {
        let changed = session.draft.hub_id.as_deref() != Some(hub.id.as_str());
        session.draft.hub_id = Some(hub.id.clone());
        session.hub = Some(hub);
        if changed {
            // The pool belongs to the old hub now.
            session.candidates.clear();
        }
    }
    if let Some(rider_id) = payload.rider_id {
        session.draft.rider_id = Some(rider_id);
    }
    session.draft.updated_at = Utc::now();

    Ok(Json(session.draft.clone()))
}

#[derive(Deserialize, Default)]
pub struct CandidateQuery {
    pub search: Option<String>,
}

async fn list_candidates(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<CandidateQuery>,
) -> Result<Json<Vec<ShipmentCandidate>>, AppError> {
    let hub_id = {
        let entry = state
            .drafts
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("draft {} not found", id)))?;
        entry.draft.hub_id.clone().ok_or_else(|| {
            AppError::BadRequest("select a hub before loading shipments".to_string())
        })?
    };

    let fetched = state.providers.fleet.unassigned_shipments(&hub_id).await?;
    let pool = sequencer::dedup_candidates(fetched);
    let view = sequencer::filter_candidates(&pool, query.search.as_deref().unwrap_or(""));

    if let Some(mut entry) = state.drafts.get_mut(&id) {
        entry.touch();
        // The hub may have changed while the fetch was in flight; a pool for
        // the old hub must not repopulate the cache it invalidated.
        if entry.draft.hub_id.as_deref() == Some(hub_id.as_str()) {
            entry.candidates = pool;
        }
    }

    Ok(Json(view))
}

#[derive(Deserialize)]
pub struct ToggleRequest {
    pub shipment_id: String,
}

#[derive(Serialize)]
pub struct ToggleResponse {
    pub outcome: ToggleOutcome,
    pub draft: RouteDraft,
}

async fn toggle_stop(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ToggleRequest>,
) -> Result<Json<ToggleResponse>, AppError> {
    let mut entry = state
        .drafts
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("draft {} not found", id)))?;
    let session = entry.value_mut();
    session.touch();

    // Removal must work even when the candidate pool has gone stale.
    let already_selected = session
        .draft
        .stops
        .iter()
        .any(|stop| stop.shipment_id == payload.shipment_id);
    if already_selected {
        sequencer::remove_shipment(&mut session.draft.stops, &payload.shipment_id);
        session.draft.updated_at = Utc::now();
        return Ok(Json(ToggleResponse {
            outcome: ToggleOutcome::Removed,
            draft: session.draft.clone(),
        }));
    }

    let hub = session
        .hub
        .clone()
        .ok_or_else(|| AppError::BadRequest("select a hub before adding stops".to_string()))?;
    let candidate = session
        .candidates
        .iter()
        .find(|candidate| candidate.id == payload.shipment_id)
        .cloned()
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "shipment {} is not in the candidate list",
                payload.shipment_id
            ))
        })?;

    let outcome = sequencer::toggle_shipment(&mut session.draft.stops, &candidate, &hub);
    session.draft.updated_at = Utc::now();

    Ok(Json(ToggleResponse {
        outcome,
        draft: session.draft.clone(),
    }))
}

async fn save_draft(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<RouteRef>, AppError> {
    let (submission, route_id) = {
        let mut entry = state
            .drafts
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("draft {} not found", id)))?;
        entry.touch();
        let submission = match sequencer::validate_draft(&entry.draft) {
            Ok(submission) => submission,
            Err(problems) => {
                state
                    .metrics
                    .route_saves_total
                    .with_label_values(&["invalid"])
                    .inc();
                return Err(AppError::Validation(problems));
            }
        };
        (submission, entry.draft.route_id.clone())
    };

    let result = match &route_id {
        Some(existing) => {
            state
                .providers
                .fleet
                .update_route(existing, &submission)
                .await
        }
        None => state.providers.fleet.create_route(&submission).await,
    };

    match result {
        Ok(route_ref) => {
            state.drafts.remove(&id);
            state
                .metrics
                .open_route_drafts
                .set(state.drafts.len() as i64);
            state
                .metrics
                .route_saves_total
                .with_label_values(&["success"])
                .inc();
            info!(draft_id = %id, route_id = %route_ref.id, "route saved");
            Ok(Json(route_ref))
        }
        Err(err) => {
            state
                .metrics
                .route_saves_total
                .with_label_values(&["error"])
                .inc();
            warn!(draft_id = %id, error = %err, "route save failed; draft retained");
            Err(AppError::from(err))
        }
    }
}

async fn discard_draft(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .drafts
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("draft {} not found", id)))?;
    state
        .metrics
        .open_route_drafts
        .set(state.drafts.len() as i64);

    Ok(StatusCode::NO_CONTENT)
}

async fn list_hubs(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Hub>>, AppError> {
    let hubs = state.providers.fleet.hubs().await?;
    Ok(Json(hubs))
}

async fn list_riders(
    State(state): State<Arc<AppState>>,
    Path(hub_id): Path<String>,
) -> Result<Json<Vec<Rider>>, AppError> {
    let riders = state.providers.fleet.available_riders(&hub_id).await?;
    Ok(Json(riders))
}

async fn resolve_hub(state: &AppState, hub_id: &str) -> Result<Hub, AppError> {
    let hubs = state.providers.fleet.hubs().await?;
    hubs.into_iter()
        .find(|hub| hub.id == hub_id)
        .ok_or_else(|| AppError::NotFound(format!("hub {} not found", hub_id)))
}
